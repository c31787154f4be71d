//! Console streaming display.
//!
//! Prints each speaker's deltas as they arrive, then a stats line for the
//! finished message. Output goes to stdout; flushing per delta keeps the
//! stream visibly live.

use colloquy_core::transcript::AgentId;
use colloquy_team::{DeltaSink, StreamStats};
use std::io::Write;

pub struct ConsoleSink;

impl DeltaSink for ConsoleSink {
    fn turn_started(&mut self, speaker: &AgentId) {
        println!();
        println!("---------- {speaker} ----------");
    }

    fn delta(&mut self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    fn turn_finished(&mut self, _speaker: &AgentId, stats: &StreamStats) {
        println!();
        let mut line = format!(
            "[{} chunks, {} chars, {:.1}s",
            stats.deltas,
            stats.chars,
            stats.elapsed.as_secs_f64()
        );
        if let Some(usage) = &stats.usage {
            line.push_str(&format!(", {} tokens", usage.total_tokens));
        }
        line.push(']');
        println!("{line}");
    }
}
