//! Run and ledger statistics
//!
//! This module provides the counters a mirror run accumulates and the
//! summary printed from the ledger by `--stats`.

use crate::download::DownloadReport;
use crate::storage::Ledger;
use crate::MirrorError;
use std::time::Duration;

/// Counters of one mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Artists scanned
    pub artists: usize,

    /// Listing pages fetched successfully
    pub listing_pages: usize,

    /// Submission pages queued for download
    pub queued: usize,

    /// Images transferred
    pub downloaded: usize,

    /// Images found on disk with the advertised size
    pub already_present: usize,

    /// Submission pages without a download link
    pub no_download_link: usize,

    /// Items abandoned after an error
    pub failed: usize,

    /// Body bytes written
    pub bytes: u64,

    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Adds the tally of a download batch
    pub fn absorb(&mut self, report: &DownloadReport) {
        self.downloaded += report.downloaded;
        self.already_present += report.already_present;
        self.no_download_link += report.no_download_link;
        self.failed += report.failed;
        self.bytes += report.bytes;
    }

    /// Logs a one-line summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Mirror finished in {:.1}s: {} artists, {} listing pages, {} queued, {} downloaded ({} bytes), {} already present, {} without download link, {} failed",
            self.elapsed.as_secs_f64(),
            self.artists,
            self.listing_pages,
            self.queued,
            self.downloaded,
            self.bytes,
            self.already_present,
            self.no_download_link,
            self.failed
        );
    }
}

/// What the ledger currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStatistics {
    /// Total number of entries
    pub entries: u64,

    /// Entries confirming a saved file
    pub downloaded: u64,
}

/// Loads statistics from the ledger
///
/// # Arguments
///
/// * `ledger` - The ledger to query
///
/// # Returns
///
/// * `Ok(LedgerStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to query the ledger
pub fn load_statistics(ledger: &dyn Ledger) -> Result<LedgerStatistics, MirrorError> {
    Ok(LedgerStatistics {
        entries: ledger.count_entries()?,
        downloaded: ledger.count_downloaded()?,
    })
}

/// Prints ledger statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Ledger Statistics ===\n");

    println!("Overview:");
    println!("  Ledger entries: {}", stats.entries);
    println!("  Confirmed downloads: {}", stats.downloaded);

    let unconfirmed = stats.entries.saturating_sub(stats.downloaded);
    if unconfirmed > 0 {
        println!("  Without file name: {}", unconfirmed);
    }
    println!();

    let percentage = if stats.entries > 0 {
        (stats.downloaded as f64 / stats.entries as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Completion: {:.1}% ({} / {} entries confirmed on disk)",
        percentage, stats.downloaded, stats.entries
    );
}
