//! Decide when two chunks are one logical operation, and how to combine them.

use skein_core::{chunk_type, Chunk, Item, ToolState};

/// Tool identity of a chunk: `detail.tool`, else its own `type` unless
/// that is one of the generic call/result markers.
pub fn tool_name(chunk: &Chunk) -> Option<&str> {
    chunk.tool().or(match chunk.chunk_type.as_str() {
        "" | chunk_type::TOOL_CALL | chunk_type::TOOL_RESULT => None,
        other => Some(other),
    })
}

/// True when `a` and `b` are the invocation and result of one tool run.
///
/// A side that names no tool is compatible with any tool. Identity comes
/// from a matching call id (`tool_use_id`/`tool_id`) or a matching
/// `run_id`; with neither, two chunks never pair. Symmetric.
pub fn is_pair(a: &Chunk, b: &Chunk) -> bool {
    let same_tool = match (tool_name(a), tool_name(b)) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    };
    if !same_tool {
        return false;
    }
    let same_call = matches!(
        (a.detail.call_id(), b.detail.call_id()),
        (Some(x), Some(y)) if x == y
    );
    let same_run = matches!((a.run_id(), b.run_id()), (Some(x), Some(y)) if x == y);
    same_call || same_run
}

/// True when `next` is a further streamed fragment of `existing`: same
/// type, same non-empty `run_id`, and neither carries a tool.
pub fn is_fragment_of(existing: &Chunk, next: &Chunk) -> bool {
    existing.tool().is_none()
        && next.tool().is_none()
        && existing.chunk_type == next.chunk_type
        && matches!((existing.run_id(), next.run_id()), (Some(x), Some(y)) if x == y)
}

/// Fold a tool result into the invocation item it pairs with.
///
/// The invocation keeps its `param`, `action` and `action_content`; the
/// result's id, timestamp, content, status and payload win.
pub fn merge_result(call: &mut Item, result: Chunk) {
    let Chunk {
        id,
        content,
        timestamp,
        detail,
        extra,
        ..
    } = result;

    if id.is_some() {
        call.id = id;
    }
    if timestamp.is_some() {
        call.timestamp = timestamp;
    }
    if content.is_some() {
        call.content = content;
    }

    let target = &mut call.chunk.detail;
    if detail.result.is_some() {
        target.result = detail.result;
    }
    if detail.status.is_some() {
        target.status = detail.status;
    }
    fill(&mut target.tool, detail.tool);
    fill(&mut target.run_id, detail.run_id);
    fill(&mut target.tool_id, detail.tool_id);
    fill(&mut target.tool_use_id, detail.tool_use_id);
    fill(&mut target.param, detail.param);
    fill(&mut target.action, detail.action);
    fill(&mut target.action_content, detail.action_content);
    target.extra.extend(detail.extra);
    call.extend_extra(extra);

    call.tool_state = Some(ToolState::Completed);
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(v: serde_json::Value) -> Chunk {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn pairs_by_run_id() {
        let call = chunk(json!({"type": "tool_call", "detail": {"tool": "search", "run_id": "r1"}}));
        let result = chunk(json!({"type": "tool_result", "detail": {"run_id": "r1"}}));
        assert!(is_pair(&call, &result));
    }

    #[test]
    fn pairs_by_call_id_across_key_names() {
        let call = chunk(json!({"type": "tool_call", "detail": {"tool": "shell", "tool_id": "t1"}}));
        let result = chunk(
            json!({"type": "tool_result", "detail": {"tool": "shell", "tool_use_id": "t1"}}),
        );
        assert!(is_pair(&call, &result));
    }

    #[test]
    fn different_tools_never_pair() {
        let call = chunk(json!({"type": "tool_call", "detail": {"tool": "search", "run_id": "r1"}}));
        let result = chunk(json!({"type": "tool_result", "detail": {"tool": "shell", "run_id": "r1"}}));
        assert!(!is_pair(&call, &result));
    }

    #[test]
    fn rewritten_type_still_names_the_tool() {
        let call = chunk(json!({"type": "search", "detail": {"run_id": "r1"}}));
        let other = chunk(json!({"type": "tool_result", "detail": {"tool": "browse", "run_id": "r1"}}));
        let same = chunk(json!({"type": "tool_result", "detail": {"tool": "search", "run_id": "r1"}}));
        assert!(!is_pair(&call, &other));
        assert!(is_pair(&call, &same));
    }

    #[test]
    fn no_identity_never_pairs() {
        let call = chunk(json!({"type": "tool_call", "detail": {"tool": "search"}}));
        let result = chunk(json!({"type": "tool_result", "detail": {"tool": "search"}}));
        assert!(!is_pair(&call, &result));
        let blank = chunk(json!({"type": "tool_result", "detail": {"tool": "search", "run_id": ""}}));
        assert!(!is_pair(&blank, &blank));
    }

    #[test]
    fn pairing_is_symmetric() {
        let samples = [
            json!({"type": "tool_call", "detail": {"tool": "search", "run_id": "r1"}}),
            json!({"type": "tool_result", "detail": {"run_id": "r1"}}),
            json!({"type": "tool_result", "detail": {"tool": "shell", "run_id": "r1"}}),
            json!({"type": "tool_call", "detail": {"tool": "shell", "tool_id": "t1"}}),
            json!({"type": "tool_result", "detail": {"tool_use_id": "t1"}}),
            json!({"type": "text", "detail": {"run_id": "r1"}}),
            json!({"type": "text"}),
        ];
        let chunks: Vec<Chunk> = samples.into_iter().map(chunk).collect();
        for a in &chunks {
            for b in &chunks {
                assert_eq!(is_pair(a, b), is_pair(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn fragments_need_same_type_and_no_tool() {
        let a = chunk(json!({"type": "text", "content": "Hel", "detail": {"run_id": "r1"}}));
        let b = chunk(json!({"type": "text", "content": "lo", "detail": {"run_id": "r1"}}));
        let other_type = chunk(json!({"type": "reasoning", "detail": {"run_id": "r1"}}));
        let with_tool = chunk(json!({"type": "text", "detail": {"tool": "x", "run_id": "r1"}}));
        assert!(is_fragment_of(&a, &b));
        assert!(!is_fragment_of(&a, &other_type));
        assert!(!is_fragment_of(&a, &with_tool));
        assert!(!is_fragment_of(&with_tool, &a));
    }

    #[test]
    fn merge_keeps_invocation_inputs_and_takes_result_outputs() {
        let mut call = Item::from(chunk(json!({
            "id": "c1",
            "type": "search",
            "content": "searching",
            "timestamp": 1,
            "detail": {"tool": "search", "run_id": "r1", "param": {"q": "rust"}, "action": "query", "status": "running"}
        })));
        call.tool_state = Some(ToolState::Pending);
        let result = chunk(json!({
            "id": "c2",
            "type": "tool_result",
            "content": "3 hits",
            "timestamp": 2,
            "detail": {"run_id": "r1", "param": {"q": "ignored"}, "status": "success", "result": ["a", "b", "c"], "elapsed_ms": 40}
        }));

        merge_result(&mut call, result);

        assert_eq!(call.chunk_type, "search");
        assert_eq!(call.id, Some(json!("c2")));
        assert_eq!(call.timestamp, Some(json!(2)));
        assert_eq!(call.content.as_deref(), Some("3 hits"));
        assert_eq!(call.detail.param, Some(json!({"q": "rust"})));
        assert_eq!(call.detail.action, Some(json!("query")));
        assert_eq!(call.detail.status.as_deref(), Some("success"));
        assert_eq!(call.detail.result, Some(json!(["a", "b", "c"])));
        assert_eq!(call.detail.extra["elapsed_ms"], 40);
        assert_eq!(call.tool_state, Some(ToolState::Completed));
    }

    #[test]
    fn merge_without_result_content_keeps_call_content() {
        let mut call = Item::from(chunk(json!({"type": "search", "content": "searching", "detail": {"run_id": "r1"}})));
        merge_result(&mut call, chunk(json!({"type": "tool_result", "detail": {"run_id": "r1"}})));
        assert_eq!(call.content.as_deref(), Some("searching"));
    }
}
