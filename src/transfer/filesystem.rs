//! Filesystem transfer surface.

use super::TransferSurface;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes downloads into a directory and reads picked files from disk.
#[derive(Debug, Clone)]
pub struct FilesystemTransfer {
    output_dir: PathBuf,
    max_bytes: Option<u64>,
}

impl FilesystemTransfer {
    /// Creates a transfer surface writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_bytes: None,
        }
    }

    /// Refuses to read picked files larger than `max_bytes`.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl TransferSurface for FilesystemTransfer {
    fn download(&self, bytes: &[u8], filename: &str) -> Result<String> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            return Err(Error::InvalidInput(format!(
                "invalid download file name: '{filename}'"
            )));
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| Error::OperationFailed {
            operation: "create_output_dir".to_string(),
            cause: format!("{}: {e}", self.output_dir.display()),
        })?;

        // Write beside the target and rename so a crash never leaves a truncated snapshot.
        let path = self.output_dir.join(filename);
        let partial = self.output_dir.join(format!(".{filename}.partial"));
        fs::write(&partial, bytes).map_err(|e| Error::OperationFailed {
            operation: "write_snapshot".to_string(),
            cause: format!("{}: {e}", partial.display()),
        })?;
        fs::rename(&partial, &path).map_err(|e| Error::OperationFailed {
            operation: "rename_snapshot".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Ok(path.display().to_string())
    }

    fn pick_file(&self, location: &str) -> Result<Vec<u8>> {
        let path = Path::new(location);
        let metadata = fs::metadata(path).map_err(|e| Error::OperationFailed {
            operation: "open_snapshot".to_string(),
            cause: format!("{location}: {e}"),
        })?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!("{location} is not a file")));
        }
        if let Some(max) = self.max_bytes {
            if metadata.len() > max {
                return Err(Error::InvalidInput(format!(
                    "{location} is {} bytes, larger than the {max} byte limit",
                    metadata.len()
                )));
            }
        }

        fs::read(path).map_err(|e| Error::OperationFailed {
            operation: "read_snapshot".to_string(),
            cause: format!("{location}: {e}"),
        })
    }
}
