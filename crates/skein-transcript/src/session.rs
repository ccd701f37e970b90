use serde::Serialize;
use skein_core::{Chunk, Turn};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::config::FoldConfig;
use crate::error::TranscriptError;
use crate::fold::fold_incremental;
use crate::snapshot::FoldSnapshot;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStats {
    pub from_chunk: usize,
    pub to_chunk: usize,
    pub folded: usize,
    /// True when the snapshot was discarded because the input shrank.
    pub reset: bool,
}

#[derive(Debug, Clone)]
pub struct SessionFold {
    pub turns: Vec<Turn>,
    pub stats: SessionStats,
}

/// Fold only the chunks a session has not seen yet.
///
/// `chunks` is the whole stream so far. The session snapshot in
/// `state_dir` records how much of it was already folded; the rest is
/// folded on top of the saved transcript and the snapshot is updated.
pub fn fold_session(
    state_dir: &Path,
    session_id: &str,
    chunks: &[Chunk],
    config: &FoldConfig,
) -> Result<SessionFold, TranscriptError> {
    std::fs::create_dir_all(state_dir).map_err(|e| TranscriptError::io(state_dir, e))?;
    let session_id = skein_store::sanitize_session_id(session_id);

    let lock_path = state_dir.join(format!("fold.{session_id}.lock"));
    let _lock = skein_store::lock_file(&lock_path)?;

    let mut snapshot = FoldSnapshot::load(state_dir, &session_id)?.unwrap_or_default();
    let reset = snapshot.detect_truncation(chunks.len());
    let from_chunk = snapshot.consumed;

    let prior = snapshot.take_turns();
    snapshot.set_turns(fold_incremental(prior, &chunks[from_chunk..], config));
    snapshot.consumed = chunks.len();
    snapshot.updated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    snapshot.save(state_dir, &session_id)?;

    let stats = SessionStats {
        from_chunk,
        to_chunk: chunks.len(),
        folded: chunks.len() - from_chunk,
        reset,
    };
    info!(
        session = %session_id,
        from = stats.from_chunk,
        to = stats.to_chunk,
        reset,
        "folded session"
    );

    Ok(SessionFold {
        turns: snapshot.turns,
        stats,
    })
}
