use serde::Serialize;
use skein_core::{Step, StepStatus, Turn};

/// Steps of the plan in the last turn, for progress displays.
pub fn last_plan_steps(turns: &[Turn]) -> Option<&[Step]> {
    turns.last()?.plan().map(|plan| plan.steps())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: StepStatus,
    /// Number of items attributed to the step.
    pub items: usize,
}

pub fn summarize_steps(turns: &[Turn]) -> Vec<StepSummary> {
    last_plan_steps(turns)
        .unwrap_or_default()
        .iter()
        .map(|step| StepSummary {
            id: step.id.clone(),
            title: step.title.clone(),
            status: step.status,
            items: step.children.len(),
        })
        .collect()
}
