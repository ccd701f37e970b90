use skein_core::StepStatus;
use skein_transcript::{fold, load_chunks, summarize_steps, FoldConfig, StepSummary};
use std::path::Path;

/// `skein steps <file>`
pub fn execute(file: &Path, config: &FoldConfig, json: bool) -> anyhow::Result<()> {
    let batch = load_chunks(file)?;
    let turns = fold(&batch.chunks, config);
    let steps = summarize_steps(&turns);

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }
    if steps.is_empty() {
        println!("(no plan in the last turn)");
        return Ok(());
    }
    for step in &steps {
        println!("{}", format_step(step));
    }
    Ok(())
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[ ]",
        StepStatus::Running => "[~]",
        StepStatus::Success => "[x]",
        StepStatus::Error => "[!]",
    }
}

fn format_step(step: &StepSummary) -> String {
    let title = step.title.as_deref().unwrap_or("(untitled)");
    format!(
        "{} {} {title} ({} items)",
        status_marker(step.status),
        step.id,
        step.items
    )
}
