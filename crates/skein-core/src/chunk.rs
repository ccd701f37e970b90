use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::transcript::StepStatus;

/// Chunk `type` values the reducer reacts to structurally.
///
/// Anything else is an ordinary item. Tool invocations and results have
/// their `type` replaced by the tool name during folding, so the set of
/// item types seen by a renderer is open-ended.
pub mod chunk_type {
    pub const TEXT: &str = "text";
    pub const LIVE_STATUS: &str = "live_status";
    pub const PLAN: &str = "plan";
    pub const PLAN_UPDATE: &str = "plan_update";
    pub const TOOL_CALL: &str = "tool_call";
    pub const TOOL_RESULT: &str = "tool_result";
    pub const USER_INPUT: &str = "user_input";
    pub const AGENT_END_TASK: &str = "agent_end_task";
    pub const ERROR: &str = "error";
    pub const FINISH_REASON: &str = "finish_reason";

    /// Types that mark an assistant turn as finished.
    pub const TERMINAL: &[&str] = &[AGENT_END_TASK, ERROR, FINISH_REASON];

    pub fn is_terminal(chunk_type: &str) -> bool {
        TERMINAL.contains(&chunk_type)
    }
}

/// Plan-update actions carried in `detail.action`.
pub mod plan_action {
    pub const ADD: &str = "add";
    pub const UPDATE: &str = "update";
    pub const REMOVE: &str = "remove";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One event record from the stream (one JSON object per chunk).
///
/// Unknown top-level keys are kept in `extra` and written back out
/// unchanged, so a chunk survives folding without losing fields the
/// renderer may care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type", default)]
    pub chunk_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Detail::is_empty")]
    pub detail: Detail,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chunk {
    pub fn new(chunk_type: impl Into<String>) -> Self {
        Self {
            chunk_type: chunk_type.into(),
            ..Self::default()
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Some(Role::User)
    }

    pub fn is_status_pulse(&self) -> bool {
        self.chunk_type == chunk_type::LIVE_STATUS
    }

    pub fn is_terminal(&self) -> bool {
        chunk_type::is_terminal(&self.chunk_type)
    }

    /// Tool discriminant from `detail.tool`, if non-empty.
    pub fn tool(&self) -> Option<&str> {
        self.detail.tool()
    }

    /// `detail.run_id`, if non-empty.
    pub fn run_id(&self) -> Option<&str> {
        self.detail.run_id()
    }

    /// Append streamed text to `content`.
    pub fn append_content(&mut self, more: Option<&str>) {
        let Some(more) = more else {
            return;
        };
        match &mut self.content {
            Some(existing) => existing.push_str(more),
            None => self.content = Some(more.to_string()),
        }
    }
}

/// The tool-specific payload bag of a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Detail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Flat step records of a plan declaration or plan-update delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDecl>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Detail {
    pub fn is_empty(&self) -> bool {
        *self == Detail::default()
    }

    pub fn tool(&self) -> Option<&str> {
        non_empty(self.tool.as_deref())
    }

    pub fn run_id(&self) -> Option<&str> {
        non_empty(self.run_id.as_deref())
    }

    /// Call correlation id: `tool_use_id`, falling back to `tool_id`.
    pub fn call_id(&self) -> Option<&str> {
        non_empty(self.tool_use_id.as_deref()).or_else(|| non_empty(self.tool_id.as_deref()))
    }

    /// `action` when it is a plain string (plan-update deltas).
    pub fn action_str(&self) -> Option<&str> {
        self.action.as_ref().and_then(|a| a.as_str())
    }
}

/// A flat step record as declared by a plan or plan-update chunk.
///
/// Every field except `id` is optional so the same shape serves both a
/// full declaration and a partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepDecl {
    #[serde(default, deserialize_with = "string_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unrecognized statuses read as `pending`.
    #[serde(
        default,
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// ── Lenient fields ──

/// Ids are opaque: numbers and booleans are kept in their string form,
/// anything else reads as absent.
fn opt_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn string_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(opt_id(de)?.unwrap_or_default())
}

fn lenient_status<'de, D: Deserializer<'de>>(de: D) -> Result<Option<StepStatus>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => None,
        Some(value) => Some(StepStatus::deserialize(value).unwrap_or_default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_roundtrips_unknown_fields() {
        let raw = json!({
            "id": 7,
            "type": "text",
            "role": "assistant",
            "content": "hi",
            "session": "s1",
            "detail": {"run_id": "r1", "interrupt_data": {"x": 1}}
        });
        let chunk: Chunk = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(chunk.chunk_type, "text");
        assert_eq!(chunk.role, Some(Role::Assistant));
        assert_eq!(chunk.run_id(), Some("r1"));
        assert_eq!(chunk.extra["session"], "s1");
        assert_eq!(serde_json::to_value(&chunk).unwrap(), raw);
    }

    #[test]
    fn missing_detail_is_empty() {
        let chunk: Chunk = serde_json::from_value(json!({"type": "text"})).unwrap();
        assert!(chunk.detail.is_empty());
        assert!(chunk.tool().is_none());
        let out = serde_json::to_value(&chunk).unwrap();
        assert!(out.get("detail").is_none());
    }

    #[test]
    fn empty_ids_count_as_absent() {
        let chunk: Chunk = serde_json::from_value(json!({
            "type": "tool_call",
            "detail": {"tool": "", "run_id": "", "tool_id": "", "tool_use_id": "t9"}
        }))
        .unwrap();
        assert!(chunk.tool().is_none());
        assert!(chunk.run_id().is_none());
        assert_eq!(chunk.detail.call_id(), Some("t9"));
    }

    #[test]
    fn terminal_types() {
        assert!(Chunk::new("finish_reason").is_terminal());
        assert!(Chunk::new("error").is_terminal());
        assert!(Chunk::new("agent_end_task").is_terminal());
        assert!(!Chunk::new("user_input").is_terminal());
    }

    #[test]
    fn append_content_starts_from_none() {
        let mut chunk = Chunk::new("text");
        chunk.append_content(Some("Hel"));
        chunk.append_content(None);
        chunk.append_content(Some("lo"));
        assert_eq!(chunk.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn step_decl_parses_partial_record() {
        let decl: StepDecl =
            serde_json::from_value(json!({"id": "2", "status": "running", "eta": 3})).unwrap();
        assert_eq!(decl.status, Some(StepStatus::Running));
        assert!(decl.title.is_none());
        assert_eq!(decl.extra["eta"], 3);
    }

    #[test]
    fn numeric_step_ids_read_as_strings() {
        let chunk: Chunk = serde_json::from_value(json!({
            "type": "plan",
            "detail": {"steps": [{"id": 1, "status": "running"}, {"id": "2"}]}
        }))
        .unwrap();
        let steps = chunk.detail.steps.unwrap();
        assert_eq!(steps[0].id, "1");
        assert_eq!(steps[1].id, "2");

        let text: Chunk = serde_json::from_value(json!({
            "type": "text",
            "step_id": 1,
            "detail": {"run_id": 42, "tool_use_id": null}
        }))
        .unwrap();
        assert_eq!(text.step_id.as_deref(), Some("1"));
        assert_eq!(text.run_id(), Some("42"));
        assert!(text.detail.tool_use_id.is_none());
    }

    #[test]
    fn unknown_step_status_reads_as_pending() {
        let decl: StepDecl =
            serde_json::from_value(json!({"id": "1", "status": "paused"})).unwrap();
        assert_eq!(decl.status, Some(StepStatus::Pending));
        let decl: StepDecl = serde_json::from_value(json!({"id": "1", "status": "completed"})).unwrap();
        assert_eq!(decl.status, Some(StepStatus::Success));
        let decl: StepDecl = serde_json::from_value(json!({"id": "1", "status": null})).unwrap();
        assert!(decl.status.is_none());
    }
}
