//! URL handling module for Gallery-Mirror
//!
//! This module provides the canonical page key used by the ledger and the
//! natural ordering applied to every batch of keys before processing.

mod natural;
mod normalize;

// Re-export main functions
pub use natural::{natural_cmp, sort_naturally};
pub use normalize::{page_key, resolve_against};
