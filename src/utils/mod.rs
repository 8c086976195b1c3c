//!
//! Utility module for the payment watcher.
//!
//! Re-exports formatting helpers used by the envelope decoder.
/// Utility functions for formatting and display
pub mod index;

pub use index::format_token_amount;

/// Number of implied decimal places in ledger amounts (stroops).
pub const STROOP_DECIMALS: u32 = 7;
