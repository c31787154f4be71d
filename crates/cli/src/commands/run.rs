//! `colloquy run` — drive the teaching team on a task or learning script.

use crate::console::ConsoleSink;
use crate::roster;
use crate::script;
use crate::{RunArgs, SelectorKind};
use anyhow::Context;
use colloquy_team::{FixedOrder, ModelDriven, RunState, Selector, Team, ToolDispatcher};
use std::sync::Arc;
use tracing::info;

/// Returns whether every task halted on its termination condition.
pub async fn run(args: RunArgs) -> anyhow::Result<bool> {
    let tasks = collect_tasks(&args)?;

    std::fs::create_dir_all(&args.workspace)
        .with_context(|| format!("creating workspace {}", args.workspace.display()))?;
    let registry = colloquy_tools::sandboxed_registry(&args.workspace)
        .context("setting up the file tool sandbox")?;

    let provider = Arc::new(args.backend.provider().context("configuring the backend")?);
    let agents = roster::teaching_team(provider.clone(), &args.backend.model, &registry);

    let selector: Box<dyn Selector> = match args.selector {
        SelectorKind::Fixed => Box::new(FixedOrder),
        SelectorKind::Model => Box::new(ModelDriven::new(provider, &args.backend.model)),
    };

    let mut team = Team::new(agents, selector, roster::approval_condition())
        .context("assembling the team")?
        .with_dispatcher(ToolDispatcher::new(registry))
        .with_max_turns(args.max_turns)
        .context("setting the turn budget")?;

    let mut sink = ConsoleSink;
    let mut all_completed = true;

    for (index, task) in tasks.iter().enumerate() {
        team.reset();
        info!(task = index + 1, total = tasks.len(), "Starting task");

        let report = team.run(task.clone(), &mut sink).await;
        let completed = report.state == RunState::HaltedOnCondition;
        all_completed = all_completed && completed;

        println!();
        println!(
            "== Task {}/{}: {:?} after {} turns ({})",
            index + 1,
            tasks.len(),
            report.state,
            report.turns_taken,
            report.halt_reason
        );
    }

    Ok(all_completed)
}

fn collect_tasks(args: &RunArgs) -> anyhow::Result<Vec<String>> {
    if let Some(path) = &args.script {
        let markdown = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let sections = script::parse_sections(&markdown);
        anyhow::ensure!(
            !sections.is_empty(),
            "script {} has no '## ' sections",
            path.display()
        );
        Ok(sections.iter().map(script::TaskSection::as_task).collect())
    } else if let Some(task) = &args.task {
        Ok(vec![task.clone()])
    } else {
        anyhow::bail!("provide a task with --task or a learning script with --script");
    }
}
