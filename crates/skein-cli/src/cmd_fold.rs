use skein_core::Turn;
use skein_transcript::{fold, fold_session, load_chunks, FoldConfig};
use std::path::Path;
use tracing::debug;

/// `skein fold <file>`
pub fn execute(
    file: &Path,
    config: &FoldConfig,
    pretty: bool,
    session: Option<&str>,
    state_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let turns = fold_file(file, config, session, state_dir)?;
    println!("{}", render(&turns, pretty)?);
    Ok(())
}

fn fold_file(
    file: &Path,
    config: &FoldConfig,
    session: Option<&str>,
    state_dir: Option<&Path>,
) -> anyhow::Result<Vec<Turn>> {
    let batch = load_chunks(file)?;
    debug!(
        file = %file.display(),
        chunks = batch.stats.chunks,
        skipped = batch.stats.skipped,
        "loaded chunks"
    );

    let Some(session) = session else {
        return Ok(fold(&batch.chunks, config));
    };
    let state_dir = state_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(skein_store::state_dir);
    let result = fold_session(&state_dir, session, &batch.chunks, config)?;
    Ok(result.turns)
}

fn render(turns: &[Turn], pretty: bool) -> anyhow::Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(turns)?
    } else {
        serde_json::to_string(turns)?
    };
    Ok(out)
}
