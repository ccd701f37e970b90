use serde::Serialize;
use skein_core::Chunk;
use std::path::Path;
use tracing::warn;

use crate::error::TranscriptError;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStats {
    pub records_read: usize,
    pub chunks: usize,
    pub skipped: usize,
}

/// Chunks read from a source, in stream order.
#[derive(Debug, Default, Clone)]
pub struct ChunkBatch {
    pub chunks: Vec<Chunk>,
    pub stats: SourceStats,
}

/// Load chunks from a file holding either a JSON array or JSON Lines.
pub fn load_chunks(path: &Path) -> Result<ChunkBatch, TranscriptError> {
    let text = std::fs::read_to_string(path).map_err(|e| TranscriptError::io(path, e))?;
    parse_chunks(&text)
}

/// Parse chunks from text. A leading `[` means one JSON array; anything
/// else is read as one chunk per line.
///
/// Records that are not valid chunks are skipped and counted. Only a
/// malformed top-level array is an error.
pub fn parse_chunks(text: &str) -> Result<ChunkBatch, TranscriptError> {
    if text.trim_start().starts_with('[') {
        let records: Vec<serde_json::Value> =
            serde_json::from_str(text).map_err(|e| TranscriptError::json("chunk array", e))?;
        let mut batch = ChunkBatch::default();
        for (idx, record) in records.into_iter().enumerate() {
            batch.stats.records_read += 1;
            match serde_json::from_value::<Chunk>(record) {
                Ok(chunk) => batch.chunks.push(chunk),
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping malformed chunk");
                    batch.stats.skipped += 1;
                }
            }
        }
        batch.stats.chunks = batch.chunks.len();
        return Ok(batch);
    }

    let mut batch = ChunkBatch::default();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        batch.stats.records_read += 1;
        match serde_json::from_str::<Chunk>(line) {
            Ok(chunk) => batch.chunks.push(chunk),
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed chunk");
                batch.stats.skipped += 1;
            }
        }
    }
    batch.stats.chunks = batch.chunks.len();
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_lines_skips_garbage() {
        let text = concat!(
            "{\"type\":\"text\",\"role\":\"user\",\"content\":\"hi\"}\n",
            "\n",
            "not json\n",
            "{\"type\":\"text\",\"role\":\"robot\"}\n",
            "{\"type\":\"live_status\"}\n",
        );
        let batch = parse_chunks(text).unwrap();
        assert_eq!(batch.chunks.len(), 2);
        assert_eq!(
            batch.stats,
            SourceStats {
                records_read: 4,
                chunks: 2,
                skipped: 2
            }
        );
        assert!(batch.chunks[0].is_user());
        assert!(batch.chunks[1].is_status_pulse());
    }

    #[test]
    fn parse_json_array() {
        let text = r#"  [{"type":"text"}, 3, {"type":"finish_reason"}]"#;
        let batch = parse_chunks(text).unwrap();
        assert_eq!(batch.chunks.len(), 2);
        assert_eq!(batch.stats.skipped, 1);
        assert!(batch.chunks[1].is_terminal());
    }

    #[test]
    fn broken_array_is_an_error() {
        let err = parse_chunks("[{\"type\":\"text\"}").unwrap_err();
        assert!(matches!(err, TranscriptError::Json { .. }));
    }

    #[test]
    fn empty_input_gives_empty_batch() {
        let batch = parse_chunks("").unwrap();
        assert!(batch.chunks.is_empty());
        assert_eq!(batch.stats.records_read, 0);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_chunks(Path::new("/nonexistent/chunks.jsonl")).unwrap_err();
        assert!(matches!(err, TranscriptError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chunks.jsonl");
        std::fs::write(&path, "{\"type\":\"text\"}\n{\"type\":\"error\"}\n").unwrap();
        let batch = load_chunks(&path).unwrap();
        assert_eq!(batch.chunks.len(), 2);
    }
}
