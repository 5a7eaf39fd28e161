//! Response body sink
//!
//! Every response body is counted. When saving is enabled, each request also
//! gets its own file in the output directory, appended to chunk by chunk as
//! the body arrives.

use crate::config::{OutputConfig, OutputMode};
use crate::output::OutputError;
use crate::target::TargetId;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Separator between the url and the target id in body filenames
const FILENAME_SEPARATOR: &str = "_____";

/// Builds the body filename for a request
///
/// Every character that is not ASCII alphanumeric becomes `_`. Target ids are
/// unique within a run and always end the name, so two requests of one run
/// never share a file.
///
/// # Example
///
/// ```
/// use swarmload::output::make_filename;
/// use swarmload::{QueueTargetStore, TargetStore};
///
/// let mut store = QueueTargetStore::new(1);
/// let id = store.add("https://example.com/a?b=c".to_string());
/// assert_eq!(
///     make_filename("https://example.com/a?b=c", id),
///     "https___example_com_a_b_c_____0"
/// );
/// ```
pub fn make_filename(url: &str, id: TargetId) -> String {
    format!("{}{}{}", url, FILENAME_SEPARATOR, id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Where response bodies go
#[derive(Debug, Clone, Default)]
pub struct BodySink {
    directory: Option<PathBuf>,
}

impl BodySink {
    /// A sink that only counts bytes
    pub fn discard() -> Self {
        Self { directory: None }
    }

    /// A sink that saves bodies into an existing `directory`
    pub fn save_to(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }

    /// Creates the output directory if the configuration needs one
    ///
    /// The directory must not exist yet.
    ///
    /// # Returns
    ///
    /// * `Ok(BodySink)` - Sink matching the configured output mode
    /// * `Err(OutputError::CreateDirectory)` - The directory could not be created
    pub fn prepare(config: &OutputConfig) -> Result<Self, OutputError> {
        if !config.needs_directory() {
            return Ok(Self::discard());
        }

        let path = PathBuf::from(&config.destination);
        std::fs::create_dir(&path).map_err(|source| OutputError::CreateDirectory {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Created output directory {}", path.display());

        match config.mode {
            OutputMode::Save => Ok(Self::save_to(path)),
            OutputMode::None => Ok(Self::discard()),
        }
    }

    /// Directory bodies are saved to, if saving is enabled
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Opens a writer for the body of one request
    pub fn writer(&self, url: &str, id: TargetId) -> BodyWriter {
        BodyWriter {
            path: self
                .directory
                .as_ref()
                .map(|directory| directory.join(make_filename(url, id))),
            file: None,
            bytes: 0,
        }
    }
}

/// Receives the body of one response
///
/// The file is only created when the first chunk arrives.
#[derive(Debug)]
pub struct BodyWriter {
    path: Option<PathBuf>,
    file: Option<File>,
    bytes: u64,
}

impl BodyWriter {
    /// Counts `chunk` and appends it to the body file when saving
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), OutputError> {
        self.bytes += chunk.len() as u64;

        let Some(path) = &self.path else {
            return Ok(());
        };

        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|source| OutputError::Write {
                    path: path.clone(),
                    source,
                })?;
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk)
                .await
                .map_err(|source| OutputError::Write {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Flushes whatever was written
    pub async fn finish(&mut self) -> Result<(), OutputError> {
        if let (Some(path), Some(file)) = (&self.path, self.file.as_mut()) {
            file.flush().await.map_err(|source| OutputError::Write {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Bytes received so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
