//! Stream/resume controller.
//!
//! One task owns the position marker, the dispatch queue, the subscription task and
//! the reconnect timer. The public handle talks to it over a command channel; page
//! fetches and the live subscription report back over an internal signal channel.
//! Every signal carries the generation it was started under, and the generation is
//! bumped whenever the controller abandons in-flight work, so late results from a
//! stopped or superseded run are dropped.

use super::options::{StartOptions, Subscribers};
use super::types::{WatcherState, WatcherStatus};
use super::worker::DispatchWorker;
use crate::config::WatcherConfig;
use crate::horizon::{HorizonError, LedgerTransport, PageRequest, TransactionRecord};
use crate::payments::{PagingToken, TransactionDecoder};
use backoff::backoff::{Backoff, Constant};
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

/// Live subscriptions begin at the ledger tip
const LIVE_CURSOR: &str = "now";

pub(crate) enum Command {
	Start(StartOptions),
	Stop,
}

enum Signal {
	Page {
		generation: u64,
		result: Result<Vec<TransactionRecord>, HorizonError>,
	},
	Live {
		generation: u64,
		event: LiveEvent,
	},
}

enum LiveEvent {
	Record(TransactionRecord),
	Failed(HorizonError),
}

pub(crate) struct Controller {
	config: WatcherConfig,
	transport: Arc<dyn LedgerTransport>,
	worker: DispatchWorker,
	subscribers: Subscribers,

	state: WatcherState,
	cursor: PagingToken,
	generation: u64,
	reconnects: u64,

	/// A backfill page is being fetched
	page_in_flight: bool,
	/// Request the next page once the queue drains
	awaiting_drain: bool,
	/// Cursor the last non-empty page was requested with
	page_cursor: Option<PagingToken>,

	subscription: Option<JoinHandle<()>>,
	reconnect: Option<Pin<Box<Sleep>>>,
	reconnect_backoff: Constant,

	signals_tx: mpsc::UnboundedSender<Signal>,
	signals_rx: mpsc::UnboundedReceiver<Signal>,
	status: watch::Sender<WatcherStatus>,
}

impl Controller {
	pub(crate) fn new(
		config: WatcherConfig,
		transport: Arc<dyn LedgerTransport>,
		decoder: TransactionDecoder,
		status: watch::Sender<WatcherStatus>,
	) -> Self {
		let (signals_tx, signals_rx) = mpsc::unbounded_channel();
		let reconnect_backoff = Constant::new(config.reconnect_delay());

		Self {
			config,
			transport,
			worker: DispatchWorker::new(decoder),
			subscribers: Subscribers::default(),
			state: WatcherState::Idle,
			cursor: PagingToken::START,
			generation: 0,
			reconnects: 0,
			page_in_flight: false,
			awaiting_drain: false,
			page_cursor: None,
			subscription: None,
			reconnect: None,
			reconnect_backoff,
			signals_tx,
			signals_rx,
			status,
		}
	}

	/// Run until the command channel closes.
	pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
		loop {
			tokio::select! {
				biased;

				command = commands.recv() => match command {
					Some(Command::Start(options)) => self.start(options),
					Some(Command::Stop) => self.stop(),
					None => {
						debug!("Watcher handle dropped, shutting down controller");
						self.stop();
						self.publish_status();
						break;
					}
				},
				Some(signal) = self.signals_rx.recv() => self.handle_signal(signal),
				_ = reconnect_elapsed(&mut self.reconnect) => {
					self.reconnect = None;
					info!("Reconnect delay elapsed, resuming from cursor {}", self.cursor);
					self.resume();
				}
				_ = std::future::ready(()), if self.worker.has_pending() => {
					if let Some(dispatched) = self.worker.process_next(&mut self.cursor, &self.subscribers) {
						debug!(
							"Dispatched transaction {} ({} payment(s) delivered), cursor {}",
							dispatched.hash, dispatched.delivered, dispatched.cursor
						);
					}
					self.publish_status();
					tokio::task::yield_now().await;
				}
			}

			self.continue_backfill();
			self.publish_status();
		}
	}

	fn start(&mut self, options: StartOptions) {
		let requested = self.subscribers.merge(options);

		if self.state.is_active() {
			debug!("Watcher already {:?}, ignoring start", self.state);
			return;
		}

		self.cancel_reconnect();
		if let Some(requested) = requested {
			if requested > self.cursor {
				self.cursor = requested;
			} else if requested < self.cursor {
				debug!(
					"Keeping cursor {} over less advanced {}",
					self.cursor, requested
				);
			}
		}

		info!("Starting watcher from cursor {}", self.cursor);
		self.resume();
	}

	fn stop(&mut self) {
		self.abandon_in_flight();
		self.cancel_reconnect();

		let discarded = self.worker.clear();
		if discarded > 0 {
			info!("Discarded {} undispatched transaction(s)", discarded);
		}

		if self.state != WatcherState::Stopped {
			info!("Watcher stopped at cursor {}", self.cursor);
		}
		self.state = WatcherState::Stopped;
	}

	/// Enter backfill or live mode depending on the marker.
	fn resume(&mut self) {
		self.generation += 1;
		if self.cursor.is_start() {
			self.go_live();
		} else {
			self.state = WatcherState::Backfilling;
			self.awaiting_drain = true;
			self.continue_backfill();
		}
	}

	/// Request the next page once the previous one is fully dispatched.
	fn continue_backfill(&mut self) {
		if self.state != WatcherState::Backfilling
			|| !self.awaiting_drain
			|| self.page_in_flight
			|| !self.worker.is_empty()
		{
			return;
		}
		self.awaiting_drain = false;

		if let Some(page_cursor) = self.page_cursor.take() {
			if self.cursor <= page_cursor {
				warn!(
					"Backfill page from cursor {} did not advance the cursor, switching to live",
					page_cursor
				);
				self.go_live();
				return;
			}
		}

		self.request_page();
	}

	fn request_page(&mut self) {
		let request = PageRequest {
			account: self.subscribers.scoped_account(),
			cursor: self.cursor,
			limit: self.config.page_size,
		};
		debug!(
			"Requesting backfill page after cursor {} (limit {})",
			request.cursor, request.limit
		);

		self.page_in_flight = true;
		self.page_cursor = Some(self.cursor);

		let generation = self.generation;
		let transport = self.transport.clone();
		let signals = self.signals_tx.clone();
		tokio::spawn(async move {
			let result = transport.fetch_page(&request).await;
			let _ = signals.send(Signal::Page { generation, result });
		});
	}

	fn go_live(&mut self) {
		self.state = WatcherState::Live;
		self.awaiting_drain = false;
		self.page_cursor = None;

		let account = self.subscribers.scoped_account();
		info!(
			"Subscribing to live transactions{}",
			account
				.as_deref()
				.map(|a| format!(" for {}", a))
				.unwrap_or_default()
		);

		let generation = self.generation;
		let idle_timeout = self.config.stream_idle_timeout();
		let transport = self.transport.clone();
		let signals = self.signals_tx.clone();
		self.subscription = Some(tokio::spawn(async move {
			let send = |event| signals.send(Signal::Live { generation, event }).is_ok();

			let mut stream = match transport.subscribe(account.as_deref(), LIVE_CURSOR).await {
				Ok(stream) => stream,
				Err(e) => {
					send(LiveEvent::Failed(e));
					return;
				}
			};

			loop {
				let failure = match tokio::time::timeout(idle_timeout, stream.next()).await {
					Ok(Some(Ok(record))) => {
						if !send(LiveEvent::Record(record)) {
							return;
						}
						continue;
					}
					Ok(Some(Err(e))) => e,
					Ok(None) => HorizonError::StreamClosed,
					Err(_) => HorizonError::StreamIdle(idle_timeout),
				};
				send(LiveEvent::Failed(failure));
				return;
			}
		}));
	}

	fn handle_signal(&mut self, signal: Signal) {
		match signal {
			Signal::Page { generation, result } => {
				if generation != self.generation || self.state != WatcherState::Backfilling {
					debug!("Ignoring page result from generation {}", generation);
					return;
				}
				self.page_in_flight = false;

				match result {
					Ok(records) if records.is_empty() => {
						info!("Backfill caught up at cursor {}", self.cursor);
						self.go_live();
					}
					Ok(records) => {
						debug!("Enqueueing {} backfilled transaction(s)", records.len());
						for record in records {
							self.worker.enqueue(record);
						}
						self.awaiting_drain = true;
					}
					Err(e) => self.fail(e),
				}
			}
			Signal::Live { generation, event } => {
				if generation != self.generation || self.state != WatcherState::Live {
					debug!("Ignoring stream event from generation {}", generation);
					return;
				}

				match event {
					LiveEvent::Record(record) => {
						debug!("Received live transaction {}", record.hash);
						self.worker.enqueue(record);
					}
					LiveEvent::Failed(e) => self.fail(e),
				}
			}
		}
	}

	/// Report a transport failure and schedule the reconnect.
	fn fail(&mut self, error: HorizonError) {
		warn!("Transport failure while {:?}: {}", self.state, error);
		self.subscribers.report(&error);

		self.abandon_in_flight();
		let delay = self
			.reconnect_backoff
			.next_backoff()
			.unwrap_or_else(|| self.config.reconnect_delay());
		self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
		self.reconnects += 1;
		self.state = WatcherState::ReconnectPending;
		info!("Reconnecting in {:?}", delay);
	}

	/// Close the subscription and make any outstanding page result stale.
	fn abandon_in_flight(&mut self) {
		if let Some(subscription) = self.subscription.take() {
			subscription.abort();
		}
		self.generation += 1;
		self.page_in_flight = false;
		self.awaiting_drain = false;
		self.page_cursor = None;
	}

	fn cancel_reconnect(&mut self) {
		if self.reconnect.take().is_some() {
			debug!("Cancelled pending reconnect");
		}
	}

	fn publish_status(&self) {
		let next = WatcherStatus {
			state: self.state,
			cursor: self.cursor,
			queued: self.worker.len(),
			reconnects: self.reconnects,
		};
		self.status.send_if_modified(|current| {
			if *current == next {
				false
			} else {
				*current = next;
				true
			}
		});
	}
}

impl Drop for Controller {
	fn drop(&mut self) {
		if let Some(subscription) = self.subscription.take() {
			subscription.abort();
		}
	}
}

async fn reconnect_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
	match timer {
		Some(sleep) => sleep.as_mut().await,
		None => std::future::pending().await,
	}
}
