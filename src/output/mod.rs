//! Output module for run summaries and reports
//!
//! This module handles:
//! - Accumulating statistics over a mirror run
//! - Summarizing the ledger for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, LedgerStatistics, RunStatistics};
