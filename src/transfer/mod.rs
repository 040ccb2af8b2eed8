//! Transfer surface: moving snapshot bytes in and out of the process.
//!
//! The engine produces bytes and consumes bytes; where they come from or go
//! to is the transfer surface's business. [`FilesystemTransfer`] is the
//! implementation used by the CLI.

mod filesystem;

pub use filesystem::FilesystemTransfer;

use crate::Result;
use chrono::{DateTime, Utc};

/// Produces downloadable files and accepts operator-supplied files.
pub trait TransferSurface: Send + Sync {
    /// Delivers `bytes` as a file named `filename`.
    ///
    /// Returns a human-readable location of the delivered file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn download(&self, bytes: &[u8], filename: &str) -> Result<String>;

    /// Reads the file the operator selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn pick_file(&self, location: &str) -> Result<Vec<u8>>;
}

/// Returns the download name for a snapshot taken at `at`.
#[must_use]
pub fn snapshot_filename(at: DateTime<Utc>) -> String {
    format!("snapshot-{}.json", at.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_filename_embeds_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 23, 59, 0).unwrap();
        assert_eq!(snapshot_filename(at), "snapshot-2026-03-07.json");
    }
}
