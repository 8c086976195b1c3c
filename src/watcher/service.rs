use super::controller::{Command, Controller};
use super::options::StartOptions;
use super::types::{WatcherError, WatcherStatus};
use crate::config::WatcherConfig;
use crate::horizon::{HorizonClient, LedgerTransport};
use crate::payments::{EnvelopeDecoder, TransactionDecoder, XdrEnvelopeDecoder};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a running payment watcher.
///
/// Creating a watcher spawns its controller task, so construction must happen
/// inside a Tokio runtime. Dropping the handle stops the watcher.
pub struct PaymentWatcher {
	config: WatcherConfig,
	commands: mpsc::UnboundedSender<Command>,
	status: watch::Receiver<WatcherStatus>,
	task: JoinHandle<()>,
}

impl PaymentWatcher {
	/// Create a watcher reading from the configured Horizon server.
	pub fn new(config: WatcherConfig) -> Result<Self, WatcherError> {
		let config = config.normalized();
		let client = HorizonClient::new(&config)?;
		Ok(Self::with_transport(config, Arc::new(client)))
	}

	/// Create a watcher over any ledger transport.
	pub fn with_transport(config: WatcherConfig, transport: Arc<dyn LedgerTransport>) -> Self {
		Self::with_decoder(config, transport, Arc::new(XdrEnvelopeDecoder))
	}

	/// Create a watcher with a custom envelope decoder.
	pub fn with_decoder(
		config: WatcherConfig,
		transport: Arc<dyn LedgerTransport>,
		envelopes: Arc<dyn EnvelopeDecoder>,
	) -> Self {
		let config = config.normalized();
		let decoder = TransactionDecoder::with_envelope_decoder(config.network.clone(), envelopes);

		let (commands, command_rx) = mpsc::unbounded_channel();
		let (status_tx, status) = watch::channel(WatcherStatus::default());
		let controller = Controller::new(config.clone(), transport, decoder, status_tx);
		let task = tokio::spawn(controller.run(command_rx));

		Self {
			config,
			commands,
			status,
			task,
		}
	}

	/// Start or resume watching.
	///
	/// A no-op apart from replacing the allow-list and callbacks while a backfill or
	/// subscription is already running.
	pub fn start(&self, options: StartOptions) {
		self.send(Command::Start(options));
	}

	/// Stop watching. Safe to call in any state; `start` may be called again later.
	pub fn stop(&self) {
		self.send(Command::Stop);
	}

	/// Latest published status
	pub fn status(&self) -> WatcherStatus {
		self.status.borrow().clone()
	}

	/// Receiver notified whenever the status changes
	pub fn subscribe_status(&self) -> watch::Receiver<WatcherStatus> {
		self.status.clone()
	}

	pub fn config(&self) -> &WatcherConfig {
		&self.config
	}

	/// Stop the watcher, wait for the controller to exit and return its final status.
	pub async fn shutdown(self) -> WatcherStatus {
		let Self {
			commands,
			status,
			task,
			..
		} = self;
		drop(commands);
		if let Err(e) = task.await {
			warn!("Watcher controller ended abnormally: {}", e);
		}
		status.borrow().clone()
	}

	fn send(&self, command: Command) {
		if self.commands.send(command).is_err() {
			warn!("Failed to send command; watcher controller is not running");
		}
	}
}
