use super::operation::normalize_operation;
use super::types::{DecodeError, DecodedEnvelope, PaymentRecord};
use crate::config::Network;
use crate::horizon::TransactionRecord;
use crate::payments::PagingToken;
use std::sync::Arc;
use tracing::{debug, error};

/// Turns a raw base64 envelope into its decoded form.
pub trait EnvelopeDecoder: Send + Sync {
	fn decode_envelope(
		&self,
		envelope: &str,
		network: &Network,
	) -> Result<DecodedEnvelope, DecodeError>;
}

/// Extracts payment records from raw ledger transactions.
#[derive(Clone)]
pub struct TransactionDecoder {
	network: Network,
	envelopes: Arc<dyn EnvelopeDecoder>,
}

impl TransactionDecoder {
	pub fn with_envelope_decoder(network: Network, envelopes: Arc<dyn EnvelopeDecoder>) -> Self {
		Self { network, envelopes }
	}

	/// Decode one transaction into the payments it carries, in operation order.
	///
	/// Operation `i` gets the id `paging_token + (i + 1)`, so ids grow within a
	/// transaction and stay below the next transaction's token.
	pub fn parse_transaction(
		&self,
		transaction: &TransactionRecord,
	) -> Result<Vec<PaymentRecord>, DecodeError> {
		let envelope = self
			.envelopes
			.decode_envelope(&transaction.envelope_xdr, &self.network)
			.map_err(|e| {
				error!(
					"[PARSE_TRANSACTION] Failed to decode envelope of {}: {}",
					transaction.hash, e
				);
				error!("[PARSE_TRANSACTION] Envelope: {}", transaction.envelope_xdr);
				e
			})?;

		let paging_token: PagingToken = transaction.paging_token.parse()?;
		let memo = envelope.memo.decode();

		let mut payments = Vec::new();
		for (index, operation) in envelope.operations.iter().enumerate() {
			let Some(payment) = normalize_operation(operation) else {
				continue;
			};

			let from = operation
				.source_account
				.clone()
				.unwrap_or_else(|| envelope.source_account.clone());

			payments.push(PaymentRecord {
				id: paging_token.offset(index as u64 + 1)?,
				from,
				to: payment.to,
				amount: payment.amount,
				asset_code: payment.asset_code,
				asset_issuer: payment.asset_issuer,
				memo: Some(memo.clone()),
				transaction_hash: Some(transaction.hash.clone()),
				created_at: transaction.created_at,
			});
		}

		debug!(
			"Transaction {} carries {} payment(s) in {} operation(s)",
			transaction.hash,
			payments.len(),
			envelope.operations.len()
		);

		Ok(payments)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::payments::types::{Asset, LedgerOperation, Memo, OperationBody};
	use chrono::{TimeZone, Utc};

	/// Returns a fixed envelope regardless of input; `"bad"` fails
	struct FixedEnvelope(DecodedEnvelope);

	impl EnvelopeDecoder for FixedEnvelope {
		fn decode_envelope(
			&self,
			envelope: &str,
			_network: &Network,
		) -> Result<DecodedEnvelope, DecodeError> {
			if envelope == "bad" {
				return Err(DecodeError::EnvelopeError("truncated".into()));
			}
			Ok(self.0.clone())
		}
	}

	fn record(paging_token: &str, envelope_xdr: &str) -> TransactionRecord {
		TransactionRecord {
			id: "tx".into(),
			hash: "deadbeef".into(),
			ledger: 1,
			paging_token: paging_token.into(),
			successful: true,
			source_account: "GSOURCE".into(),
			envelope_xdr: envelope_xdr.into(),
			created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
			operation_count: 1,
		}
	}

	fn decoder(envelope: DecodedEnvelope) -> TransactionDecoder {
		TransactionDecoder::with_envelope_decoder(Network::Public, Arc::new(FixedEnvelope(envelope)))
	}

	fn payment(destination: &str) -> OperationBody {
		OperationBody::Payment {
			destination: destination.into(),
			asset: Asset::credit("USD", "GISSUER"),
			amount: "50.0".into(),
		}
	}

	#[test]
	fn single_payment_gets_next_id() {
		let decoder = decoder(DecodedEnvelope {
			source_account: "GSOURCE".into(),
			memo: Memo::Text("hello".into()),
			operations: vec![LedgerOperation {
				source_account: None,
				body: payment("GA"),
			}],
		});

		let payments = decoder.parse_transaction(&record("1000", "ok")).unwrap();

		assert_eq!(payments.len(), 1);
		let p = &payments[0];
		assert_eq!(p.id.to_string(), "1001");
		assert_eq!(p.from, "GSOURCE");
		assert_eq!(p.to, "GA");
		assert_eq!(p.amount, "50.0");
		assert_eq!(p.asset_code, "USD");
		assert_eq!(p.asset_issuer.as_deref(), Some("GISSUER"));
		assert_eq!(p.memo.as_deref(), Some("hello"));
		assert_eq!(p.transaction_hash.as_deref(), Some("deadbeef"));
	}

	#[test]
	fn ids_follow_operation_index_and_skip_non_payments() {
		let decoder = decoder(DecodedEnvelope {
			source_account: "GSOURCE".into(),
			memo: Memo::None,
			operations: vec![
				LedgerOperation {
					source_account: None,
					body: payment("GA"),
				},
				LedgerOperation {
					source_account: None,
					body: OperationBody::Unsupported("ManageData".into()),
				},
				LedgerOperation {
					source_account: Some("GOPSOURCE".into()),
					body: payment("GB"),
				},
			],
		});

		let payments = decoder
			.parse_transaction(&record("121693057904021504", "ok"))
			.unwrap();

		let ids: Vec<String> = payments.iter().map(|p| p.id.to_string()).collect();
		assert_eq!(ids, vec!["121693057904021505", "121693057904021507"]);
		assert_eq!(payments[0].from, "GSOURCE");
		assert_eq!(payments[1].from, "GOPSOURCE");
		assert_eq!(payments[1].memo.as_deref(), Some(""));
	}

	#[test]
	fn envelope_failure_is_reported() {
		let decoder = decoder(DecodedEnvelope {
			source_account: "GSOURCE".into(),
			memo: Memo::None,
			operations: vec![],
		});

		let err = decoder.parse_transaction(&record("1000", "bad")).unwrap_err();
		assert!(matches!(err, DecodeError::EnvelopeError(_)));
	}

	#[test]
	fn invalid_paging_token_is_reported() {
		let decoder = decoder(DecodedEnvelope {
			source_account: "GSOURCE".into(),
			memo: Memo::None,
			operations: vec![],
		});

		let err = decoder.parse_transaction(&record("now", "ok")).unwrap_err();
		assert!(matches!(err, DecodeError::TokenError(_)));
	}
}
