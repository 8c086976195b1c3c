//! Types for the Horizon REST and streaming API

use crate::payments::PagingToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transaction resource as returned by `/transactions`.
///
/// Only the fields the watcher reads are kept; everything else in the Horizon
/// payload is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    #[serde(default)]
    pub id: String,
    pub hash: String,
    #[serde(default)]
    pub ledger: u32,
    /// Decimal cursor of the transaction; its operations follow at `+1..=+k`
    pub paging_token: String,
    #[serde(default = "default_successful")]
    pub successful: bool,
    pub source_account: String,
    /// Base64 XDR `TransactionEnvelope`
    pub envelope_xdr: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub operation_count: u32,
}

fn default_successful() -> bool {
    true
}

/// One page of a Horizon collection
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedded<T> {
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn into_records(self) -> Vec<T> {
        self.embedded.records
    }
}

/// Parameters of a paged transaction fetch; pages are always ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Restrict to transactions touching this account
    pub account: Option<String>,
    pub cursor: PagingToken,
    pub limit: u32,
}

/// Error types for Horizon transport
#[derive(Debug, thiserror::Error)]
pub enum HorizonError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Horizon returned status {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid Horizon URL: {0}")]
    UrlError(String),

    #[error("Refusing insecure connection to {0}; set allow_http to permit it")]
    InsecureTransport(String),

    #[error("Invalid header value: {0}")]
    HeaderError(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Event stream error: {0}")]
    StreamError(String),

    #[error("Event stream closed by server")]
    StreamClosed,

    #[error("No stream activity for {0:?}")]
    StreamIdle(Duration),
}
