use serde::{Deserialize, Serialize};
use skein_core::Chunk;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::TranscriptError;

pub const ENV_IGNORE: &str = "SKEIN_IGNORE";
pub const ENV_THINKING_TEXT: &str = "SKEIN_THINKING_TEXT";

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "skein.json";

const DEFAULT_THINKING_TEXT: &str = "Thinking...";
const DEFAULT_IGNORE: &[&str] = &[
    "ping",
    "heartbeat",
    "session_info",
    "token_usage",
    "title_generation",
];

/// Knobs for the fold engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoldConfig {
    /// Chunk types or tool names that never become items.
    #[serde(default = "default_ignore")]
    pub ignore: BTreeSet<String>,
    /// Content of the status pulse in a synthesized placeholder turn.
    #[serde(default = "default_thinking_text")]
    pub thinking_text: String,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            thinking_text: default_thinking_text(),
        }
    }
}

fn default_ignore() -> BTreeSet<String> {
    DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect()
}

fn default_thinking_text() -> String {
    DEFAULT_THINKING_TEXT.to_string()
}

impl FoldConfig {
    /// True when the chunk's type or tool is in the ignore set.
    pub fn ignores(&self, chunk: &Chunk) -> bool {
        self.ignore.contains(&chunk.chunk_type)
            || chunk.tool().is_some_and(|tool| self.ignore.contains(tool))
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, TranscriptError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TranscriptError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| TranscriptError::json(path.display().to_string(), e))
    }

    /// Apply `SKEIN_IGNORE` and `SKEIN_THINKING_TEXT` from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_IGNORE).ok().as_deref(),
            std::env::var(ENV_THINKING_TEXT).ok().as_deref(),
        )
    }

    /// `ignore` is a comma-separated list added to the ignore set.
    pub fn with_overrides(mut self, ignore: Option<&str>, thinking_text: Option<&str>) -> Self {
        if let Some(list) = ignore {
            self.ignore.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(text) = thinking_text.filter(|t| !t.trim().is_empty()) {
            self.thinking_text = text.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg: FoldConfig = serde_json::from_value(json!({"thinking_text": "Hmm"})).unwrap();
        assert_eq!(cfg.thinking_text, "Hmm");
        assert!(cfg.ignore.contains("heartbeat"));
    }

    #[test]
    fn ignores_by_type_or_tool() {
        let cfg = FoldConfig::default();
        let by_type: Chunk = serde_json::from_value(json!({"type": "ping"})).unwrap();
        let by_tool: Chunk =
            serde_json::from_value(json!({"type": "tool_call", "detail": {"tool": "token_usage"}}))
                .unwrap();
        let kept: Chunk = serde_json::from_value(json!({"type": "text"})).unwrap();
        assert!(cfg.ignores(&by_type));
        assert!(cfg.ignores(&by_tool));
        assert!(!cfg.ignores(&kept));
    }

    #[test]
    fn overrides_extend_ignore_set() {
        let cfg = FoldConfig::default().with_overrides(Some(" audit, ,trace_span"), Some("Working"));
        assert!(cfg.ignore.contains("audit"));
        assert!(cfg.ignore.contains("trace_span"));
        assert!(cfg.ignore.contains("ping"));
        assert!(!cfg.ignore.contains(""));
        assert_eq!(cfg.thinking_text, "Working");
    }

    #[test]
    fn blank_thinking_override_is_ignored() {
        let cfg = FoldConfig::default().with_overrides(None, Some("  "));
        assert_eq!(cfg.thinking_text, DEFAULT_THINKING_TEXT);
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skein.json");
        std::fs::write(&path, r#"{"ignore": ["noise"]}"#).unwrap();
        let cfg = FoldConfig::load(&path).unwrap();
        assert_eq!(cfg.ignore.len(), 1);
        assert!(cfg.ignore.contains("noise"));
        assert_eq!(cfg.thinking_text, DEFAULT_THINKING_TEXT);
    }

    #[test]
    fn load_reports_bad_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skein.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FoldConfig::load(&path).unwrap_err();
        assert!(matches!(err, TranscriptError::Json { .. }));
    }
}
