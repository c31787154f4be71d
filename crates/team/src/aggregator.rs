//! Stream aggregation — reassembling one agent invocation's delta stream.
//!
//! Deltas are forwarded to a display sink in arrival order and concatenated
//! into exactly one finalized body. If the stream fails mid-flight, whatever
//! was received is preserved and the failure is flagged; partial output is
//! never silently discarded.

use colloquy_core::error::ProviderError;
use colloquy_core::provider::{ProviderToolCall, StreamChunk, Usage};
use colloquy_core::transcript::AgentId;
use std::time::{Duration, Instant};
use tracing::warn;

/// Where incremental output goes while a turn is streaming.
///
/// Implementations must not reorder or buffer deltas beyond display needs.
pub trait DeltaSink: Send {
    /// A new speaker's turn is starting.
    fn turn_started(&mut self, speaker: &AgentId);

    /// One delta arrived, in order.
    fn delta(&mut self, text: &str);

    /// The turn's stream finished (successfully or not).
    fn turn_finished(&mut self, speaker: &AgentId, stats: &StreamStats);
}

/// A sink that discards everything (headless runs, tests).
pub struct NullSink;

impl DeltaSink for NullSink {
    fn turn_started(&mut self, _speaker: &AgentId) {}
    fn delta(&mut self, _text: &str) {}
    fn turn_finished(&mut self, _speaker: &AgentId, _stats: &StreamStats) {}
}

/// Timing and length statistics for one aggregated stream.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// How many deltas arrived.
    pub deltas: usize,

    /// Total characters emitted.
    pub chars: usize,

    /// Wall time from first poll to stream end.
    pub elapsed: Duration,

    /// Token usage if the backend reported it.
    pub usage: Option<Usage>,
}

/// The reassembled result of one agent invocation.
#[derive(Debug)]
pub struct Aggregated {
    /// Concatenation of all deltas in arrival order.
    pub content: String,

    /// Tool calls the backend surfaced, if any.
    pub tool_calls: Vec<ProviderToolCall>,

    /// The stream failure, when the stream did not complete cleanly.
    /// `content` still holds everything received before the failure.
    pub error: Option<ProviderError>,

    pub stats: StreamStats,
}

/// Consume a delta stream to completion.
///
/// Delivers each delta to `sink` as it arrives. Returns once the end marker
/// (`done` chunk) is seen, the sender closes, or an error arrives.
pub async fn aggregate(
    speaker: &AgentId,
    mut rx: tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
    sink: &mut dyn DeltaSink,
) -> Aggregated {
    let started = Instant::now();
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut error = None;
    let mut stats = StreamStats::default();

    sink.turn_started(speaker);

    while let Some(item) = rx.recv().await {
        match item {
            Ok(chunk) => {
                if let Some(delta) = chunk.content {
                    stats.deltas += 1;
                    stats.chars += delta.chars().count();
                    sink.delta(&delta);
                    content.push_str(&delta);
                }
                tool_calls.extend(chunk.tool_calls);
                if let Some(usage) = chunk.usage {
                    stats.usage = Some(usage);
                }
                if chunk.done {
                    break;
                }
            }
            Err(e) => {
                warn!(speaker = %speaker, error = %e, chars = content.len(),
                      "Stream failed mid-flight, keeping partial output");
                error = Some(e);
                break;
            }
        }
    }

    stats.elapsed = started.elapsed();
    sink.turn_finished(speaker, &stats);

    Aggregated {
        content,
        tool_calls,
        error,
        stats,
    }
}
