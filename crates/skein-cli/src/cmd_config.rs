use skein_transcript::{FoldConfig, DEFAULT_CONFIG_FILE};
use std::path::Path;
use tracing::debug;

/// Effective config: defaults, then the config file, then the environment.
///
/// An explicit `--config` path must exist; the implicit `skein.json` in
/// the working directory is optional.
pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<FoldConfig> {
    let base = match explicit {
        Some(path) => FoldConfig::load(path)?,
        None => {
            let implicit = cwd.join(DEFAULT_CONFIG_FILE);
            if implicit.exists() {
                debug!(path = %implicit.display(), "using config file");
                FoldConfig::load(&implicit)?
            } else {
                FoldConfig::default()
            }
        }
    };
    Ok(base.with_env_overrides())
}

/// `skein config`
pub fn show(config: &FoldConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
