//! Plan trees: build from a declaration, then apply add/update/remove deltas.

use skein_core::{plan_action, Chunk, Item, Step, StepDecl};
use tracing::debug;

/// Turn a plan-declaration chunk into a plan item whose `children` are
/// the declared steps, each with no children of its own.
pub fn build_plan(mut declaration: Chunk) -> Item {
    let decls = declaration.detail.steps.take().unwrap_or_default();
    let mut plan = Item::from(declaration);
    plan.children = Some(decls.into_iter().map(Step::from).collect());
    plan
}

/// Apply a `plan_update` chunk to an open plan.
pub fn apply_delta(plan: &mut Item, delta: Chunk) {
    let action = delta.detail.action_str().map(str::to_string);
    let steps = delta.detail.steps.unwrap_or_default();
    match action.as_deref() {
        Some(plan_action::ADD) => add_steps(plan, steps),
        Some(plan_action::UPDATE) => update_steps(plan, steps),
        Some(plan_action::REMOVE) => remove_steps(plan, steps),
        other => debug!(action = ?other, "ignoring plan update with unknown action"),
    }
}

/// A repeated declaration for an already open plan merges by step id
/// instead of opening a second plan.
pub fn merge_declaration(plan: &mut Item, mut declaration: Chunk) {
    let steps = declaration.detail.steps.take().unwrap_or_default();
    update_steps(plan, steps);
}

fn add_steps(plan: &mut Item, decls: Vec<StepDecl>) {
    let steps = plan.steps_mut();
    for decl in decls {
        // Step ids stay unique: re-adding a known id updates it in place.
        match steps.iter_mut().find(|s| s.id == decl.id) {
            Some(existing) => merge_step(existing, decl),
            None => steps.push(Step::from(decl)),
        }
    }
}

fn update_steps(plan: &mut Item, decls: Vec<StepDecl>) {
    for decl in decls {
        match plan.step_mut(&decl.id) {
            Some(step) => merge_step(step, decl),
            None => debug!(step_id = %decl.id, "plan update for unknown step"),
        }
    }
}

fn remove_steps(plan: &mut Item, decls: Vec<StepDecl>) {
    let steps = plan.steps_mut();
    for decl in decls {
        match steps.iter().position(|s| s.id == decl.id) {
            Some(idx) => {
                steps.remove(idx);
            }
            None => debug!(step_id = %decl.id, "plan removal for unknown step"),
        }
    }
}

/// Shallow merge: every field present in the delta overwrites the step.
fn merge_step(step: &mut Step, decl: StepDecl) {
    let StepDecl {
        id: _,
        title,
        description,
        status,
        started_at,
        extra,
    } = decl;
    if title.is_some() {
        step.title = title;
    }
    if description.is_some() {
        step.description = description;
    }
    if let Some(status) = status {
        step.status = status;
    }
    if started_at.is_some() {
        step.started_at = started_at;
    }
    step.extend_extra(extra);
}
