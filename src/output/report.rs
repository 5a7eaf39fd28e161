//! Broken-urls report

use crate::output::{OutputError, RunStats};
use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Name of the report inside the output directory
pub const BROKEN_URLS_FILE: &str = "broken-urls.txt";

/// Writes every broken url with its reason to `directory`
///
/// The report starts with a commented header (generation time and config
/// fingerprint), followed by one `url<TAB>reason` line per url, sorted by url.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written report
/// * `Err(OutputError::Write)` - The report could not be written
pub fn write_broken_urls(
    directory: &Path,
    stats: &RunStats,
    config_hash: Option<&str>,
) -> Result<PathBuf, OutputError> {
    let path = directory.join(BROKEN_URLS_FILE);
    let broken = stats.broken_urls();

    let mut content = String::new();
    let _ = writeln!(content, "# swarmload broken urls");
    let _ = writeln!(content, "# generated: {}", Utc::now().to_rfc3339());
    if let Some(hash) = config_hash {
        let _ = writeln!(content, "# config: {}", hash);
    }
    let _ = writeln!(content, "# count: {}", broken.len());
    for (url, reason) in broken {
        let _ = writeln!(content, "{}\t{}", url, reason);
    }

    std::fs::write(&path, content).map_err(|source| OutputError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Broken urls written to {}", path.display());
    Ok(path)
}
