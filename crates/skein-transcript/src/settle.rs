//! Idempotent passes run when an assistant turn is finalized.

use skein_core::{Item, Step, StepStatus, Turn};

/// Run the turn-close pipeline in its fixed order.
pub fn close_turn(turn: &mut Turn) {
    strip_status_pulses(turn);
    promote_running_steps(turn);
    hide_unstarted_steps(turn);
    hide_empty_steps(turn);
}

/// Drop status pulses at the turn level and inside every step.
pub fn strip_status_pulses(turn: &mut Turn) {
    strip_pulses(&mut turn.messages);
    for step in steps_mut(turn) {
        strip_pulses(&mut step.children);
    }
}

pub fn strip_pulses(items: &mut Vec<Item>) {
    items.retain(|item| !item.is_status_pulse());
}

pub fn promote_running_steps(turn: &mut Turn) {
    for step in steps_mut(turn) {
        if step.status == StepStatus::Running {
            step.status = StepStatus::Success;
        }
    }
}

/// Keep only steps that actually ran.
pub fn hide_unstarted_steps(turn: &mut Turn) {
    retain_steps(turn, |step| {
        matches!(step.status, StepStatus::Success | StepStatus::Running)
    });
}

pub fn hide_empty_steps(turn: &mut Turn) {
    retain_steps(turn, |step| !step.children.is_empty());
}

fn steps_mut(turn: &mut Turn) -> impl Iterator<Item = &mut Step> {
    turn.messages
        .iter_mut()
        .filter_map(|item| item.children.as_mut())
        .flat_map(|steps| steps.iter_mut())
}

fn retain_steps(turn: &mut Turn, keep: impl Fn(&Step) -> bool) {
    for item in turn.messages.iter_mut() {
        if let Some(steps) = item.children.as_mut() {
            steps.retain(|step| keep(step));
        }
    }
}
