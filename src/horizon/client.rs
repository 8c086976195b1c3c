//!
//! HTTP client for the Horizon transactions API.
//!
//! Historical pages come from `GET /transactions` (or the account-scoped
//! `/accounts/{id}/transactions`) and the live feed from the same path requested as
//! `text/event-stream`. Both are exposed through [`LedgerTransport`].

use super::types::*;
use super::{LedgerTransport, TransactionStream};
use crate::config::WatcherConfig;
use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, error, info};

const CLIENT_NAME: &str = "stellar-payment-watcher";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_ORDER: &str = "asc";

/// Horizon REST and streaming client
#[derive(Clone)]
pub struct HorizonClient {
	/// The underlying HTTP client, carrying the identification headers.
	http_client: Client,
	/// Horizon base URL without a trailing slash.
	base_url: String,
}

impl HorizonClient {
	/// Create a client for the configured Horizon server.
	///
	/// # Errors
	/// Returns `HorizonError::InsecureTransport` for an `http://` URL unless
	/// `allow_http` is set, and `HorizonError::UrlError` for anything that is not an
	/// absolute HTTP(S) URL.
	pub fn new(config: &WatcherConfig) -> Result<Self, HorizonError> {
		let url = reqwest::Url::parse(&config.horizon_url)
			.map_err(|e| HorizonError::UrlError(format!("{}: {}", config.horizon_url, e)))?;

		match url.scheme() {
			"https" => {}
			"http" if config.allow_http => {}
			"http" => return Err(HorizonError::InsecureTransport(config.horizon_url.clone())),
			other => {
				return Err(HorizonError::UrlError(format!(
					"unsupported scheme {} in {}",
					other, config.horizon_url
				)));
			}
		}

		let http_client = Client::builder()
			.default_headers(client_headers(config)?)
			.build()?;

		Ok(Self {
			http_client,
			base_url: config.horizon_url.trim_end_matches('/').to_string(),
		})
	}

	/// Transactions collection URL, account-scoped when `account` is given.
	pub fn transactions_url(&self, account: Option<&str>) -> String {
		match account {
			Some(account) => format!("{}/accounts/{}/transactions", self.base_url, account),
			None => format!("{}/transactions", self.base_url),
		}
	}

	/// Fetch one page of transactions.
	pub async fn fetch_transactions(
		&self,
		request: &PageRequest,
	) -> Result<Vec<TransactionRecord>, HorizonError> {
		let url = self.transactions_url(request.account.as_deref());
		debug!(
			"Fetching transactions from {} (cursor {}, limit {})",
			url, request.cursor, request.limit
		);

		let response = self
			.http_client
			.get(&url)
			.query(&[
				("cursor", request.cursor.to_string()),
				("order", PAGE_ORDER.to_string()),
				("limit", request.limit.to_string()),
			])
			.timeout(PAGE_TIMEOUT)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			error!("Horizon returned {} for {}: {}", status, url, body);
			return Err(HorizonError::StatusError {
				status: status.as_u16(),
				body,
			});
		}

		let body = response.bytes().await?;
		let page: Page<TransactionRecord> = serde_json::from_slice(&body)?;
		let records = page.into_records();
		debug!("Fetched {} transaction(s)", records.len());
		Ok(records)
	}

	/// Open a server-sent-event stream of transactions starting after `cursor`.
	///
	/// Handshake frames and other non-object payloads are skipped. The stream
	/// yields `HorizonError::StreamClosed` as its last item when the server ends
	/// the response.
	pub async fn stream_transactions(
		&self,
		account: Option<&str>,
		cursor: &str,
	) -> Result<TransactionStream, HorizonError> {
		let url = self.transactions_url(account);
		info!("Opening transaction stream {} from cursor {}", url, cursor);

		let response = self
			.http_client
			.get(&url)
			.query(&[("cursor", cursor)])
			.header(ACCEPT, "text/event-stream")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(HorizonError::StatusError {
				status: status.as_u16(),
				body,
			});
		}
		debug!("Transaction stream established, status {}", status);

		let records = response
			.bytes_stream()
			.eventsource()
			.filter_map(|event| async move {
				match event {
					Ok(event) => record_from_event(&event.data),
					Err(EventStreamError::Transport(e)) => Some(Err(HorizonError::HttpError(e))),
					Err(e) => {
						error!("Malformed event stream frame: {}", e);
						Some(Err(HorizonError::StreamError(e.to_string())))
					}
				}
			})
			.chain(stream::once(async { Err(HorizonError::StreamClosed) }));

		Ok(Box::pin(records))
	}
}

#[async_trait]
impl LedgerTransport for HorizonClient {
	async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<TransactionRecord>, HorizonError> {
		self.fetch_transactions(request).await
	}

	async fn subscribe(
		&self,
		account: Option<&str>,
		cursor: &str,
	) -> Result<TransactionStream, HorizonError> {
		self.stream_transactions(account, cursor).await
	}
}

fn client_headers(config: &WatcherConfig) -> Result<HeaderMap, HorizonError> {
	let mut headers = HeaderMap::new();
	headers.insert(
		HeaderName::from_static("x-client-name"),
		HeaderValue::from_static(CLIENT_NAME),
	);
	headers.insert(
		HeaderName::from_static("x-client-version"),
		HeaderValue::from_static(CLIENT_VERSION),
	);
	if let Some(app_name) = &config.app_name {
		headers.insert(
			HeaderName::from_static("x-app-name"),
			HeaderValue::from_str(app_name)?,
		);
	}
	if let Some(app_version) = &config.app_version {
		headers.insert(
			HeaderName::from_static("x-app-version"),
			HeaderValue::from_str(app_version)?,
		);
	}
	Ok(headers)
}

/// Interpret the data of one SSE event as a transaction record.
fn record_from_event(data: &str) -> Option<Result<TransactionRecord, HorizonError>> {
	let value: serde_json::Value = match serde_json::from_str(data) {
		Ok(value) => value,
		Err(_) => {
			debug!("Skipping non-JSON stream frame: {}", data);
			return None;
		}
	};

	if !value.is_object() {
		debug!("Skipping stream frame: {}", data);
		return None;
	}

	match serde_json::from_value::<TransactionRecord>(value) {
		Ok(record) => Some(Ok(record)),
		Err(e) => {
			error!("Failed to deserialize streamed transaction: {}", e);
			error!("Raw data was: {}", data);
			Some(Err(HorizonError::JsonError(e)))
		}
	}
}
