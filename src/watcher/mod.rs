//! Payment watcher
//!
//! This module ties the transport and the payment decoder together. A single
//! controller task decides between backfilling from a historical cursor and
//! following the live stream, reconnects after transport failures, and hands queued
//! transactions one at a time to the dispatch worker, which delivers payment events
//! and advances the position marker.

/// Stream/resume controller task
mod controller;
/// Start options and active callbacks
mod options;
/// Public watcher handle
mod service;
/// State, status and error types
mod types;
/// Sequential dispatch worker
mod worker;

pub use options::{ErrorCallback, MessageCallback, StartOptions};
pub use service::PaymentWatcher;
pub use types::*;
