//! Watcher state, status snapshots and errors

use crate::horizon::HorizonError;
use crate::payments::PagingToken;
use serde::Serialize;

/// Lifecycle of the stream/resume controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    /// Never started
    #[default]
    Idle,
    /// Paging through historical transactions
    Backfilling,
    /// Subscribed to the live stream
    Live,
    /// Waiting out the reconnect delay after a transport failure
    ReconnectPending,
    /// Stopped by the caller
    Stopped,
}

impl WatcherState {
    /// A backfill or subscription is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, WatcherState::Backfilling | WatcherState::Live)
    }
}

/// Snapshot published after every controller step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WatcherStatus {
    pub state: WatcherState,
    /// Position marker; the last fully dispatched transaction
    pub cursor: PagingToken,
    /// Transactions waiting for dispatch
    pub queued: usize,
    /// Reconnects scheduled since the watcher was created
    pub reconnects: u64,
}

/// Error types for watcher construction
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Horizon error: {0}")]
    HorizonError(#[from] HorizonError),
}
