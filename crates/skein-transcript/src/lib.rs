mod config;
mod error;
mod fold;
mod pair;
mod plan;
mod session;
mod settle;
mod snapshot;
mod source;
mod summary;

pub use config::{FoldConfig, DEFAULT_CONFIG_FILE, ENV_IGNORE, ENV_THINKING_TEXT};
pub use error::TranscriptError;
pub use fold::{fold, fold_incremental};
pub use pair::{is_pair, merge_result, tool_name};
pub use plan::{apply_delta, build_plan, merge_declaration};
pub use session::{fold_session, SessionFold, SessionStats};
pub use settle::{
    close_turn, hide_empty_steps, hide_unstarted_steps, promote_running_steps,
    strip_status_pulses,
};
pub use snapshot::FoldSnapshot;
pub use source::{load_chunks, parse_chunks, ChunkBatch, SourceStats};
pub use summary::{last_plan_steps, summarize_steps, StepSummary};
