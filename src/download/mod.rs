//! Download stage of the mirror
//!
//! This module turns pending submission pages into files on disk:
//! - Resolving the direct image link of each submission page
//! - Size-verified, resumable transfers with atomic finalization
//! - File names and modification times derived from the site's naming scheme

mod filename;
mod timestamp;
mod worker;

pub use filename::{is_broken_name, target_filename};
pub use timestamp::{apply_timestamp, recover_timestamp};
pub use worker::{DownloadReport, DownloadWorkerPool};

/// How a single pending submission was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The image was transferred and stored
    Downloaded { filename: String, bytes: u64 },

    /// A file of the advertised size was already on disk
    AlreadyPresent { filename: String },

    /// The submission page has no download link
    NoDownloadLink,
}
