//! The fold engine: a single left-to-right pass that turns a chunk stream
//! into conversation turns.
//!
//! Routing precedence per chunk:
//!
//! 1. ignored types/tools are skipped;
//! 2. a user chunk closes the open assistant turn and starts a user turn;
//! 3. anything else lazily opens an assistant turn;
//! 4. only the final status pulse of the input is shown;
//! 5. a plan declaration opens a plan, or merges into the open one;
//! 6. a plan update patches the open plan (dropped if none is open);
//! 7. a tool-less fragment sharing a `run_id` with an existing item is
//!    concatenated onto it;
//! 8. a tool call is renamed to its tool;
//! 9. a tool result merges into its pending call, or stands alone;
//! 10. user-input and terminal chunks attach at the turn level;
//! 11. a chunk naming a known `step_id` attaches to that step;
//! 12. anything else attaches to the running step, or the turn.

use skein_core::{chunk_type, Chunk, Item, Role, ToolState, Turn};
use tracing::{debug, trace};

use crate::config::FoldConfig;
use crate::pair::{is_fragment_of, is_pair, merge_result};
use crate::plan::{apply_delta, build_plan, merge_declaration};
use crate::settle::{close_turn, strip_pulses, strip_status_pulses};

/// Fold a complete chunk sequence into a transcript.
///
/// The input is only read; every chunk is cloned before it is attached.
pub fn fold(chunks: &[Chunk], config: &FoldConfig) -> Vec<Turn> {
    fold_incremental(Vec::new(), chunks, config)
}

/// Continue folding from a transcript produced by an earlier call.
///
/// `prior` is the result of folding everything before `chunks`. A trailing
/// thinking placeholder is discarded and a trailing assistant turn is
/// reopened in the state it had before it was closed, so folding a stream
/// in several slices gives the same transcript as folding it in one go.
pub fn fold_incremental(prior: Vec<Turn>, chunks: &[Chunk], config: &FoldConfig) -> Vec<Turn> {
    let last_pulse = chunks
        .iter()
        .rposition(|c| c.is_status_pulse() && !config.ignores(c));

    let mut folder = Folder::resume(prior, config);
    for (idx, chunk) in chunks.iter().enumerate() {
        folder.push(chunk.clone(), Some(idx) == last_pulse);
    }
    folder.finish()
}

struct Folder<'a> {
    config: &'a FoldConfig,
    turns: Vec<Turn>,
    current: Option<Turn>,
}

impl<'a> Folder<'a> {
    fn resume(mut turns: Vec<Turn>, config: &'a FoldConfig) -> Self {
        if turns.last().is_some_and(|t| t.placeholder) {
            turns.pop();
        }
        let reopen = turns.last().is_some_and(|t| !t.is_user());
        let current = if reopen {
            turns.pop().map(Turn::reopen)
        } else {
            None
        };
        Self {
            config,
            turns,
            current,
        }
    }

    fn push(&mut self, mut chunk: Chunk, is_last_pulse: bool) {
        if self.config.ignores(&chunk) {
            trace!(chunk_type = %chunk.chunk_type, "ignored chunk");
            return;
        }

        if chunk.is_user() {
            self.close_current();
            self.turns.push(Turn::user(chunk));
            return;
        }

        let turns = &mut self.turns;
        let current = self.current.get_or_insert_with(Turn::assistant);

        if chunk.is_status_pulse() {
            if is_last_pulse {
                attach_pulse(current, chunk);
            } else {
                trace!("superseded status pulse dropped");
            }
            return;
        }

        match chunk.chunk_type.as_str() {
            chunk_type::PLAN => {
                match current.plan_mut() {
                    Some(plan) => merge_declaration(plan, chunk),
                    None => {
                        strip_status_pulses(current);
                        current.messages.push(build_plan(chunk));
                    }
                }
                return;
            }
            chunk_type::PLAN_UPDATE => {
                match current.plan_mut() {
                    Some(plan) => apply_delta(plan, chunk),
                    None => debug!("plan update with no open plan dropped"),
                }
                return;
            }
            _ => {}
        }

        if chunk.tool().is_none() && chunk.run_id().is_some() {
            if let Some(first) = find_fragment_head(current, turns, &chunk) {
                first.append_content(chunk.content.as_deref());
                return;
            }
        }

        let mut tool_state = None;
        match chunk.chunk_type.as_str() {
            chunk_type::TOOL_CALL => {
                rename_to_tool(&mut chunk);
                tool_state = Some(ToolState::Pending);
            }
            chunk_type::TOOL_RESULT => {
                let pending = |item: &Item| {
                    item.tool_state == Some(ToolState::Pending) && is_pair(item, &chunk)
                };
                if let Some(call) = find_in_turn(current, &pending) {
                    merge_result(call, chunk);
                    return;
                }
                debug!(run_id = ?chunk.run_id(), "tool result without a pending call");
                rename_to_tool(&mut chunk);
                tool_state = Some(ToolState::Unmatched);
            }
            _ => {}
        }

        let item = Item {
            chunk,
            children: None,
            tool_state,
        };
        attach(current, item);
    }

    fn close_current(&mut self) {
        if let Some(mut turn) = self.current.take() {
            close_turn(&mut turn);
            self.turns.push(turn);
        }
    }

    fn finish(mut self) -> Vec<Turn> {
        if let Some(mut turn) = self.current.take() {
            if turn.is_finished() {
                let open = turn.clone();
                close_turn(&mut turn);
                turn.unsettled = Some(Box::new(open));
            }
            self.turns.push(turn);
        }
        if self.turns.last().is_some_and(Turn::is_user) {
            self.turns.push(thinking_turn(&self.config.thinking_text));
        }
        self.turns
    }
}

/// Route a non-pulse item: terminal items stay at the turn level, then an
/// explicit `step_id`, then the running step, then the turn.
fn attach(current: &mut Turn, item: Item) {
    if item.chunk_type == chunk_type::USER_INPUT || item.is_terminal() {
        strip_status_pulses(current);
        current.messages.push(item);
        return;
    }

    if let Some(step_id) = item.step_id.as_deref() {
        if let Some(step) = current.plan_mut().and_then(|p| p.step_mut(step_id)) {
            strip_pulses(&mut step.children);
            step.children.push(item);
            return;
        }
        debug!(step_id, "item names an unknown step");
    }

    if let Some(step) = current.plan_mut().and_then(|p| p.running_step_mut()) {
        step.children.push(item);
        return;
    }

    strip_status_pulses(current);
    current.messages.push(item);
}

/// Only one pulse is live at a time; it sits in the running step when
/// there is one.
fn attach_pulse(current: &mut Turn, pulse: Chunk) {
    strip_status_pulses(current);
    let item = Item::from(pulse);
    match current.plan_mut().and_then(|p| p.running_step_mut()) {
        Some(step) => step.children.push(item),
        None => current.messages.push(item),
    }
}

fn rename_to_tool(chunk: &mut Chunk) {
    if let Some(tool) = chunk.tool().map(str::to_string) {
        chunk.chunk_type = tool;
    }
}

/// The first item `fragment` continues: the open turn first, then settled
/// assistant turns from newest to oldest. User turns are never extended.
fn find_fragment_head<'t>(
    current: &'t mut Turn,
    settled: &'t mut [Turn],
    fragment: &Chunk,
) -> Option<&'t mut Item> {
    let matches = |item: &Item| !item.is_plan() && is_fragment_of(item, fragment);
    if let Some(found) = find_in_turn(current, &matches) {
        return Some(found);
    }
    settled
        .iter_mut()
        .rev()
        .filter(|turn| !turn.is_user())
        .find_map(|turn| find_in_turn(turn, &matches))
}

/// Search a turn's flat items, then the children of every step.
fn find_in_turn<'t>(turn: &'t mut Turn, pred: &dyn Fn(&Item) -> bool) -> Option<&'t mut Item> {
    if let Some(idx) = turn.messages.iter().position(|item| pred(item)) {
        return turn.messages.get_mut(idx);
    }
    turn.messages
        .iter_mut()
        .filter_map(|item| item.children.as_mut())
        .flat_map(|steps| steps.iter_mut())
        .flat_map(|step| step.children.iter_mut())
        .find(|item| pred(item))
}

fn thinking_turn(text: &str) -> Turn {
    let mut pulse = Chunk::new(chunk_type::LIVE_STATUS);
    pulse.content = Some(text.to_string());
    Turn {
        role: Role::Assistant,
        messages: vec![Item::from(pulse)],
        placeholder: true,
        unsettled: None,
    }
}
