use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

use crate::chunk::{Chunk, Role, StepDecl};

// ── Status enums ──

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    #[serde(alias = "in_progress")]
    Running,
    #[serde(alias = "completed", alias = "done")]
    Success,
    #[serde(alias = "failed")]
    Error,
}

/// Pairing state of a tool item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolState {
    /// An invocation still waiting for its result.
    Pending,
    /// An invocation merged with its result.
    Completed,
    /// A result that arrived with no matching invocation.
    Unmatched,
}

// ── Transcript types ──

/// A chunk attached to a turn. Plans are the only items with `children`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(flatten)]
    pub chunk: Chunk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_state: Option<ToolState>,
}

/// Keys an item writes itself; a chunk carrying them as unknown fields
/// would serialize them twice.
const ITEM_KEYS: &[&str] = &["children", "tool_state"];

impl From<Chunk> for Item {
    fn from(mut chunk: Chunk) -> Self {
        for key in ITEM_KEYS {
            chunk.extra.remove(*key);
        }
        Self {
            chunk,
            children: None,
            tool_state: None,
        }
    }
}

impl Deref for Item {
    type Target = Chunk;

    fn deref(&self) -> &Chunk {
        &self.chunk
    }
}

impl DerefMut for Item {
    fn deref_mut(&mut self) -> &mut Chunk {
        &mut self.chunk
    }
}

impl Item {
    pub fn is_plan(&self) -> bool {
        self.children.is_some()
    }

    pub fn steps(&self) -> &[Step] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn steps_mut(&mut self) -> &mut Vec<Step> {
        self.children.get_or_insert_with(Vec::new)
    }

    /// The step currently marked running, if any.
    pub fn running_step_mut(&mut self) -> Option<&mut Step> {
        self.children
            .as_mut()?
            .iter_mut()
            .find(|s| s.status == StepStatus::Running)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.children.as_mut()?.iter_mut().find(|s| s.id == id)
    }

    /// Add unknown top-level fields, skipping the item's own keys.
    pub fn extend_extra(&mut self, extra: Map<String, Value>) {
        self.chunk
            .extra
            .extend(extra.into_iter().filter(|(k, _)| !ITEM_KEYS.contains(&k.as_str())));
    }
}

/// One entry of a plan tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub children: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<StepDecl> for Step {
    fn from(decl: StepDecl) -> Self {
        let mut step = Self {
            id: decl.id,
            title: decl.title,
            description: decl.description,
            status: decl.status.unwrap_or_default(),
            started_at: decl.started_at,
            children: Vec::new(),
            extra: Map::new(),
        };
        step.extend_extra(decl.extra);
        step
    }
}

impl Step {
    /// Shallow-merge extra fields; `children` is owned by the tree.
    pub fn extend_extra(&mut self, extra: Map<String, Value>) {
        self.extra
            .extend(extra.into_iter().filter(|(k, _)| k != "children"));
    }
}

/// A top-level transcript unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    #[serde(default)]
    pub messages: Vec<Item>,
    /// Set only on the synthesized "thinking" turn.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    /// The turn as it stood before the close pipeline ran at end of
    /// input. Folding more chunks into the turn resumes from this state.
    #[serde(skip)]
    pub unsettled: Option<Box<Turn>>,
}

impl Turn {
    pub fn user(chunk: Chunk) -> Self {
        Self {
            role: Role::User,
            messages: vec![Item::from(chunk)],
            placeholder: false,
            unsettled: None,
        }
    }

    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            messages: Vec::new(),
            placeholder: false,
            unsettled: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn plan(&self) -> Option<&Item> {
        self.messages.iter().find(|i| i.is_plan())
    }

    pub fn plan_mut(&mut self) -> Option<&mut Item> {
        self.messages.iter_mut().find(|i| i.is_plan())
    }

    /// The state to keep folding into: the pre-close copy if the turn was
    /// settled at end of input, else the turn itself.
    pub fn reopen(mut self) -> Self {
        match self.unsettled.take() {
            Some(open) => *open,
            None => self,
        }
    }

    /// A turn is finished once it holds a terminal item.
    pub fn is_finished(&self) -> bool {
        self.messages.iter().any(|i| i.is_terminal())
    }
}
