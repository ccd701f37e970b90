use serde::{Deserialize, Serialize};
use skein_core::Turn;
use std::path::{Path, PathBuf};

use crate::error::TranscriptError;

/// Fold state persisted between incremental runs of one session.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoldSnapshot {
    /// Number of input chunks already folded into `turns`.
    pub consumed: usize,
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Pre-close state of the last turn, which `Turn` does not serialize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsettled: Option<Turn>,
    #[serde(default)]
    pub updated_at: String,
}

impl FoldSnapshot {
    pub fn path(state_dir: &Path, session_id: &str) -> PathBuf {
        state_dir.join(format!("fold_snapshot.{session_id}.json"))
    }

    pub fn load(state_dir: &Path, session_id: &str) -> Result<Option<Self>, TranscriptError> {
        let path = Self::path(state_dir, session_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| TranscriptError::io(&path, e))?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| TranscriptError::json(path.display().to_string(), e))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, state_dir: &Path, session_id: &str) -> Result<(), TranscriptError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| TranscriptError::json("fold snapshot", e))?;
        skein_store::write_atomic(&Self::path(state_dir, session_id), data.as_bytes())?;
        Ok(())
    }

    /// Store a fold result, keeping the last turn's pre-close state.
    pub fn set_turns(&mut self, turns: Vec<Turn>) {
        self.unsettled = turns
            .last()
            .and_then(|turn| turn.unsettled.as_deref())
            .cloned();
        self.turns = turns;
    }

    /// Take the stored transcript with the last turn's pre-close state
    /// reattached, ready to resume folding.
    pub fn take_turns(&mut self) -> Vec<Turn> {
        let mut turns = std::mem::take(&mut self.turns);
        if let (Some(last), Some(open)) = (turns.last_mut(), self.unsettled.take()) {
            last.unsettled = Some(Box::new(open));
        }
        turns
    }

    /// If the input shrank below what was consumed, the stream was
    /// replaced: start over. Returns true on reset.
    pub fn detect_truncation(&mut self, available: usize) -> bool {
        if available < self.consumed {
            self.consumed = 0;
            self.turns.clear();
            self.unsettled = None;
            return true;
        }
        false
    }
}
