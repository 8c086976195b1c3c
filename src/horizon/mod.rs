//! Horizon transport
//!
//! This module provides the client and types for reading Stellar transactions from a
//! Horizon server, either as bounded historical pages or as a live event stream. The
//! watcher only talks to the network through [`LedgerTransport`].

/// HTTP client implementing the transport
mod client;
/// Type definitions for Horizon resources
mod types;

pub use client::HorizonClient;
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Live feed of transactions
pub type TransactionStream =
	Pin<Box<dyn Stream<Item = Result<TransactionRecord, HorizonError>> + Send>>;

/// Source of ledger transactions.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
	/// Fetch one bounded page of historical transactions.
	async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<TransactionRecord>, HorizonError>;

	/// Open a live subscription starting at `cursor` (`"now"` for the tip).
	async fn subscribe(
		&self,
		account: Option<&str>,
		cursor: &str,
	) -> Result<TransactionStream, HorizonError>;
}
