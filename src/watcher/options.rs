use crate::horizon::HorizonError;
use crate::payments::{PagingToken, PaymentEvent};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Called once per delivered payment, in dispatch order
pub type MessageCallback = Arc<dyn Fn(&PaymentEvent) + Send + Sync>;
/// Called once per transport failure, before the reconnect is scheduled
pub type ErrorCallback = Arc<dyn Fn(&HorizonError) + Send + Sync>;

/// Options for [`PaymentWatcher::start`](super::PaymentWatcher::start).
///
/// Every field is optional; unset fields keep the value from the previous start.
#[derive(Clone, Default)]
pub struct StartOptions {
	/// Resume after this position; never rewinds a more advanced marker
	pub cursor: Option<PagingToken>,
	/// Destination allow-list; empty accepts every account
	pub accounts: Option<Vec<String>>,
	pub on_message: Option<MessageCallback>,
	pub on_error: Option<ErrorCallback>,
}

impl StartOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cursor(mut self, cursor: PagingToken) -> Self {
		self.cursor = Some(cursor);
		self
	}

	pub fn accounts<I, S>(mut self, accounts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.accounts = Some(accounts.into_iter().map(Into::into).collect());
		self
	}

	pub fn on_message(mut self, callback: impl Fn(&PaymentEvent) + Send + Sync + 'static) -> Self {
		self.on_message = Some(Arc::new(callback));
		self
	}

	pub fn on_error(mut self, callback: impl Fn(&HorizonError) + Send + Sync + 'static) -> Self {
		self.on_error = Some(Arc::new(callback));
		self
	}
}

impl fmt::Debug for StartOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StartOptions")
			.field("cursor", &self.cursor)
			.field("accounts", &self.accounts)
			.field("on_message", &self.on_message.is_some())
			.field("on_error", &self.on_error.is_some())
			.finish()
	}
}

/// Allow-list and callbacks currently in effect
#[derive(Clone)]
pub(crate) struct Subscribers {
	accounts: Vec<String>,
	on_message: MessageCallback,
	on_error: ErrorCallback,
}

impl Default for Subscribers {
	fn default() -> Self {
		Self {
			accounts: Vec::new(),
			on_message: Arc::new(|event: &PaymentEvent| {
				info!(
					"Payment {}: {} {} from {} to {}",
					event.id, event.amount, event.asset_code, event.from, event.to
				);
			}),
			on_error: Arc::new(|e: &HorizonError| {
				error!("Transport error: {}", e);
			}),
		}
	}
}

impl Subscribers {
	/// Replace whatever the options set; returns the requested cursor.
	pub(crate) fn merge(&mut self, options: StartOptions) -> Option<PagingToken> {
		if let Some(accounts) = options.accounts {
			self.accounts = accounts;
		}
		if let Some(on_message) = options.on_message {
			self.on_message = on_message;
		}
		if let Some(on_error) = options.on_error {
			self.on_error = on_error;
		}
		options.cursor
	}

	pub(crate) fn accepts(&self, event: &PaymentEvent) -> bool {
		self.accounts.is_empty() || self.accounts.iter().any(|account| *account == event.to)
	}

	/// Account to scope server-side requests to, when exactly one is watched.
	pub(crate) fn scoped_account(&self) -> Option<String> {
		match self.accounts.as_slice() {
			[account] => Some(account.clone()),
			_ => None,
		}
	}

	pub(crate) fn notify(&self, event: &PaymentEvent) {
		(self.on_message)(event)
	}

	pub(crate) fn report(&self, error: &HorizonError) {
		(self.on_error)(error)
	}
}
