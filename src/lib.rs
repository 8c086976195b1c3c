//! Stellar payment watcher
//!
//! Follows a Horizon server's transaction stream, extracts payment operations and
//! delivers them to a callback in ledger order. The watcher backfills from a
//! caller-supplied cursor, switches to the live stream once caught up, and
//! reconnects after transport failures without ever moving its cursor backwards.
//!
//! ```no_run
//! use payment_watcher::{PaymentWatcher, StartOptions, WatcherConfig};
//!
//! # async fn run() -> Result<(), payment_watcher::WatcherError> {
//! let watcher = PaymentWatcher::new(WatcherConfig::default())?;
//! watcher.start(
//!     StartOptions::new()
//!         .cursor("121693057904021504".parse().unwrap())
//!         .on_message(|payment| println!("{} {} -> {}", payment.amount, payment.asset_code, payment.to)),
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod horizon;
pub mod payments;
pub mod utils;
pub mod watcher;

pub use crate::config::{Network, WatcherConfig, load_config};
pub use crate::horizon::{HorizonClient, HorizonError, LedgerTransport};
pub use crate::payments::{PagingToken, PaymentEvent};
pub use crate::watcher::{PaymentWatcher, StartOptions, WatcherError, WatcherState, WatcherStatus};
