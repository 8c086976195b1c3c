//! Sequential dispatch of queued transactions.
//!
//! The worker owns the pending queue. Each call to [`DispatchWorker::process_next`]
//! handles exactly one transaction; the controller yields between calls so a long
//! backlog never starves timers or incoming stream events.

use super::options::Subscribers;
use crate::horizon::TransactionRecord;
use crate::payments::{PagingToken, TransactionDecoder, parse_payment};
use std::collections::VecDeque;
use tracing::warn;

/// Outcome of dispatching one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dispatched {
	pub hash: String,
	/// Payments handed to the message callback
	pub delivered: usize,
	pub cursor: PagingToken,
}

pub(crate) struct DispatchWorker {
	queue: VecDeque<TransactionRecord>,
	processing: bool,
	decoder: TransactionDecoder,
}

impl DispatchWorker {
	pub(crate) fn new(decoder: TransactionDecoder) -> Self {
		Self {
			queue: VecDeque::new(),
			processing: false,
			decoder,
		}
	}

	pub(crate) fn enqueue(&mut self, transaction: TransactionRecord) {
		self.queue.push_back(transaction);
	}

	pub(crate) fn has_pending(&self) -> bool {
		!self.processing && !self.queue.is_empty()
	}

	pub(crate) fn len(&self) -> usize {
		self.queue.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}

	/// Drop every undispatched transaction, returning how many there were.
	pub(crate) fn clear(&mut self) -> usize {
		let discarded = self.queue.len();
		self.queue.clear();
		discarded
	}

	/// Dispatch the oldest queued transaction and advance `cursor` past it.
	///
	/// Decode failures deliver nothing but still advance the cursor. A record whose
	/// paging token cannot be read leaves the cursor where it was.
	pub(crate) fn process_next(
		&mut self,
		cursor: &mut PagingToken,
		subscribers: &Subscribers,
	) -> Option<Dispatched> {
		if self.processing {
			return None;
		}
		let transaction = self.queue.pop_front()?;
		self.processing = true;

		let payments = self
			.decoder
			.parse_transaction(&transaction)
			.unwrap_or_default();

		let mut delivered = 0;
		for event in payments.into_iter().filter_map(|p| parse_payment(Some(p))) {
			if subscribers.accepts(&event) {
				subscribers.notify(&event);
				delivered += 1;
			}
		}

		match transaction
			.paging_token
			.parse::<PagingToken>()
			.and_then(|token| token.last_operation(transaction.operation_count))
		{
			Ok(last) if last > *cursor => *cursor = last,
			Ok(_) => {}
			Err(e) => warn!(
				"Not advancing cursor past transaction {}: {}",
				transaction.hash, e
			),
		}

		self.processing = false;

		Some(Dispatched {
			hash: transaction.hash,
			delivered,
			cursor: *cursor,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Network;
	use crate::payments::{
		Asset, DecodeError, DecodedEnvelope, EnvelopeDecoder, LedgerOperation, Memo,
		OperationBody, PaymentEvent,
	};
	use crate::watcher::StartOptions;
	use chrono::Utc;
	use std::sync::{Arc, Mutex};

	/// Envelope text is a comma-separated list of destinations; `"bad"` fails
	struct Destinations;

	impl EnvelopeDecoder for Destinations {
		fn decode_envelope(
			&self,
			envelope: &str,
			_network: &Network,
		) -> Result<DecodedEnvelope, DecodeError> {
			if envelope == "bad" {
				return Err(DecodeError::EnvelopeError("bad envelope".into()));
			}
			Ok(DecodedEnvelope {
				source_account: "GSOURCE".into(),
				memo: Memo::Text("hello".into()),
				operations: envelope
					.split(',')
					.map(|to| LedgerOperation {
						source_account: None,
						body: OperationBody::Payment {
							destination: to.into(),
							asset: Asset::credit("USD", "GISSUER"),
							amount: "50.0".into(),
						},
					})
					.collect(),
			})
		}
	}

	fn transaction(paging_token: &str, envelope: &str, operation_count: u32) -> TransactionRecord {
		TransactionRecord {
			id: paging_token.into(),
			hash: format!("hash-{}", paging_token),
			ledger: 1,
			paging_token: paging_token.into(),
			successful: true,
			source_account: "GSOURCE".into(),
			envelope_xdr: envelope.into(),
			created_at: Utc::now(),
			operation_count,
		}
	}

	fn worker() -> DispatchWorker {
		DispatchWorker::new(TransactionDecoder::with_envelope_decoder(
			Network::Public,
			Arc::new(Destinations),
		))
	}

	fn recording(accounts: &[&str]) -> (Subscribers, Arc<Mutex<Vec<PaymentEvent>>>) {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let mut subscribers = Subscribers::default();
		subscribers.merge(
			StartOptions::new()
				.accounts(accounts.iter().copied())
				.on_message(move |event| sink.lock().unwrap().push(event.clone())),
		);
		(subscribers, seen)
	}

	#[test]
	fn dispatches_and_advances_cursor() {
		let mut worker = worker();
		let (subscribers, seen) = recording(&[]);
		let mut cursor = PagingToken::START;

		worker.enqueue(transaction("1000", "GA", 1));
		let dispatched = worker.process_next(&mut cursor, &subscribers).unwrap();

		assert_eq!(dispatched.delivered, 1);
		assert_eq!(cursor.to_string(), "1000");
		let seen = seen.lock().unwrap();
		assert_eq!(seen[0].id.to_string(), "1001");
		assert_eq!(seen[0].memo, "hello");
		assert_eq!(seen[0].transaction_hash, "hash-1000");
	}

	#[test]
	fn processes_in_fifo_order() {
		let mut worker = worker();
		let (subscribers, seen) = recording(&[]);
		let mut cursor = PagingToken::START;

		worker.enqueue(transaction("1000", "GA", 1));
		worker.enqueue(transaction("2000", "GB,GC", 2));
		worker.enqueue(transaction("3000", "GD", 1));
		while worker.process_next(&mut cursor, &subscribers).is_some() {}

		let ids: Vec<String> = seen.lock().unwrap().iter().map(|e| e.id.to_string()).collect();
		assert_eq!(ids, vec!["1001", "2001", "2002", "3001"]);
		assert_eq!(cursor.to_string(), "3000");
		assert_eq!(worker.len(), 0);
		assert!(!worker.has_pending());
	}

	#[test]
	fn cursor_lands_on_last_operation() {
		let mut worker = worker();
		let (subscribers, _) = recording(&[]);
		let mut cursor = PagingToken::START;

		worker.enqueue(transaction("2000", "GA,GB,GC", 3));
		worker.process_next(&mut cursor, &subscribers);
		assert_eq!(cursor.to_string(), "2002");
	}

	#[test]
	fn filters_by_allow_list() {
		let mut worker = worker();
		let (subscribers, seen) = recording(&["GA"]);
		let mut cursor = PagingToken::START;

		worker.enqueue(transaction("1000", "GB,GA", 2));
		let dispatched = worker.process_next(&mut cursor, &subscribers).unwrap();

		assert_eq!(dispatched.delivered, 1);
		let seen = seen.lock().unwrap();
		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].to, "GA");
		assert_eq!(seen[0].id.to_string(), "1002");
	}

	#[test]
	fn decode_failure_still_advances() {
		let mut worker = worker();
		let (subscribers, seen) = recording(&[]);
		let mut cursor = PagingToken::START;

		worker.enqueue(transaction("5000", "bad", 4));
		let dispatched = worker.process_next(&mut cursor, &subscribers).unwrap();

		assert_eq!(dispatched.delivered, 0);
		assert!(seen.lock().unwrap().is_empty());
		assert_eq!(cursor.to_string(), "5003");
	}

	#[test]
	fn never_moves_cursor_backwards() {
		let mut worker = worker();
		let (subscribers, _) = recording(&[]);
		let mut cursor: PagingToken = 9000u64.into();

		worker.enqueue(transaction("1000", "GA", 1));
		worker.process_next(&mut cursor, &subscribers);
		assert_eq!(cursor.to_string(), "9000");
	}

	#[test]
	fn unreadable_token_leaves_cursor() {
		let mut worker = worker();
		let (subscribers, _) = recording(&[]);
		let mut cursor: PagingToken = 10u64.into();

		worker.enqueue(transaction("abc", "GA", 1));
		assert!(worker.process_next(&mut cursor, &subscribers).is_some());
		assert_eq!(cursor.to_string(), "10");
	}

	#[test]
	fn clear_discards_pending() {
		let mut worker = worker();
		worker.enqueue(transaction("1", "GA", 1));
		worker.enqueue(transaction("2", "GA", 1));
		assert_eq!(worker.clear(), 2);
		assert!(!worker.has_pending());
	}
}
