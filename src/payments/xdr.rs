//! XDR envelope decoding backed by `stellar-xdr`.

use super::decoder::EnvelopeDecoder;
use super::types::{Asset, DecodeError, DecodedEnvelope, LedgerOperation, Memo, OperationBody};
use crate::config::Network;
use crate::utils::{STROOP_DECIMALS, format_token_amount};
use stellar_xdr::curr as xdr;
use stellar_xdr::curr::{Limits, ReadXdr};

/// Nesting bound for envelopes read off the network
const MAX_XDR_DEPTH: u32 = 500;

/// Decodes base64 `TransactionEnvelope`s.
///
/// The network passphrase only matters for transaction hashing, which this
/// decoder does not do, so it is accepted and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct XdrEnvelopeDecoder;

impl EnvelopeDecoder for XdrEnvelopeDecoder {
	fn decode_envelope(
		&self,
		envelope: &str,
		_network: &Network,
	) -> Result<DecodedEnvelope, DecodeError> {
		let envelope = xdr::TransactionEnvelope::from_xdr_base64(envelope, read_limits(envelope))
			.map_err(|e| DecodeError::EnvelopeError(e.to_string()))?;

		Ok(match envelope {
			xdr::TransactionEnvelope::TxV0(v0) => DecodedEnvelope {
				source_account: ed25519_strkey(&v0.tx.source_account_ed25519),
				memo: memo(&v0.tx.memo),
				operations: operations(&v0.tx.operations),
			},
			xdr::TransactionEnvelope::Tx(v1) => v1_envelope(&v1.tx),
			xdr::TransactionEnvelope::TxFeeBump(fee_bump) => match &fee_bump.tx.inner_tx {
				xdr::FeeBumpTransactionInnerTx::Tx(inner) => v1_envelope(&inner.tx),
			},
		})
	}
}

/// The decoded body can never be longer than its base64 text.
fn read_limits(envelope: &str) -> Limits {
	Limits {
		depth: MAX_XDR_DEPTH,
		len: envelope.len(),
	}
}

fn v1_envelope(tx: &xdr::Transaction) -> DecodedEnvelope {
	DecodedEnvelope {
		source_account: muxed_strkey(&tx.source_account),
		memo: memo(&tx.memo),
		operations: operations(&tx.operations),
	}
}

fn operations(ops: &[xdr::Operation]) -> Vec<LedgerOperation> {
	ops.iter()
		.map(|op| LedgerOperation {
			source_account: op.source_account.as_ref().map(muxed_strkey),
			body: operation_body(&op.body),
		})
		.collect()
}

fn operation_body(body: &xdr::OperationBody) -> OperationBody {
	match body {
		xdr::OperationBody::Payment(op) => OperationBody::Payment {
			destination: muxed_strkey(&op.destination),
			asset: asset(&op.asset),
			amount: amount(op.amount),
		},
		xdr::OperationBody::PathPaymentStrictReceive(op) => {
			OperationBody::PathPaymentStrictReceive {
				destination: muxed_strkey(&op.destination),
				send_asset: asset(&op.send_asset),
				send_max: amount(op.send_max),
				dest_asset: asset(&op.dest_asset),
				dest_amount: amount(op.dest_amount),
			}
		}
		xdr::OperationBody::PathPaymentStrictSend(op) => OperationBody::PathPaymentStrictSend {
			destination: muxed_strkey(&op.destination),
			send_asset: asset(&op.send_asset),
			send_amount: amount(op.send_amount),
			dest_asset: asset(&op.dest_asset),
			dest_min: amount(op.dest_min),
		},
		other => OperationBody::Unsupported(other.name().to_string()),
	}
}

fn memo(memo: &xdr::Memo) -> Memo {
	match memo {
		xdr::Memo::None => Memo::None,
		xdr::Memo::Text(text) => Memo::Text(text.to_utf8_string_lossy()),
		xdr::Memo::Id(id) => Memo::Id(*id),
		xdr::Memo::Hash(hash) => Memo::Hash(hash.0),
		xdr::Memo::Return(hash) => Memo::Return(hash.0),
	}
}

fn asset(asset: &xdr::Asset) -> Asset {
	match asset {
		xdr::Asset::Native => Asset::Native,
		xdr::Asset::CreditAlphanum4(a) => {
			Asset::credit(asset_code(&a.asset_code.0), account_strkey(&a.issuer))
		}
		xdr::Asset::CreditAlphanum12(a) => {
			Asset::credit(asset_code(&a.asset_code.0), account_strkey(&a.issuer))
		}
	}
}

/// Asset codes are NUL-padded to 4 or 12 bytes
fn asset_code(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes)
		.trim_end_matches('\0')
		.to_string()
}

fn amount(stroops: i64) -> String {
	format_token_amount(stroops, STROOP_DECIMALS)
}

fn ed25519_strkey(key: &xdr::Uint256) -> String {
	stellar_strkey::ed25519::PublicKey(key.0).to_string()
}

fn account_strkey(account: &xdr::AccountId) -> String {
	match &account.0 {
		xdr::PublicKey::PublicKeyTypeEd25519(key) => ed25519_strkey(key),
	}
}

fn muxed_strkey(account: &xdr::MuxedAccount) -> String {
	match account {
		xdr::MuxedAccount::Ed25519(key) => ed25519_strkey(key),
		xdr::MuxedAccount::MuxedEd25519(muxed) => stellar_strkey::ed25519::MuxedAccount {
			ed25519: muxed.ed25519.0,
			id: muxed.id,
		}
		.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stellar_xdr::curr::WriteXdr;

	const SOURCE: [u8; 32] = [1; 32];
	const DESTINATION: [u8; 32] = [2; 32];
	const ISSUER: [u8; 32] = [3; 32];

	fn g(key: [u8; 32]) -> String {
		stellar_strkey::ed25519::PublicKey(key).to_string()
	}

	fn usd() -> xdr::Asset {
		xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
			asset_code: xdr::AssetCode4(*b"USD\0"),
			issuer: xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(ISSUER))),
		})
	}

	fn v1(memo: xdr::Memo, operations: Vec<xdr::Operation>) -> String {
		let tx = xdr::Transaction {
			source_account: xdr::MuxedAccount::Ed25519(xdr::Uint256(SOURCE)),
			fee: 100,
			seq_num: xdr::SequenceNumber(1),
			cond: xdr::Preconditions::None,
			memo,
			operations: operations.try_into().unwrap(),
			ext: xdr::TransactionExt::V0,
		};
		xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
			tx,
			signatures: Default::default(),
		})
		.to_xdr_base64(Limits::none())
		.unwrap()
	}

	fn payment_op(amount: i64) -> xdr::Operation {
		xdr::Operation {
			source_account: None,
			body: xdr::OperationBody::Payment(xdr::PaymentOp {
				destination: xdr::MuxedAccount::Ed25519(xdr::Uint256(DESTINATION)),
				asset: usd(),
				amount,
			}),
		}
	}

	#[test]
	fn decodes_v1_payment() {
		let envelope = v1(
			xdr::Memo::Text("hello".try_into().unwrap()),
			vec![payment_op(500_000_000)],
		);

		let decoded = XdrEnvelopeDecoder
			.decode_envelope(&envelope, &Network::Public)
			.unwrap();

		assert_eq!(decoded.source_account, g(SOURCE));
		assert_eq!(decoded.memo, Memo::Text("hello".into()));
		assert_eq!(
			decoded.operations,
			vec![LedgerOperation {
				source_account: None,
				body: OperationBody::Payment {
					destination: g(DESTINATION),
					asset: Asset::credit("USD", g(ISSUER)),
					amount: "50.0000000".into(),
				},
			}]
		);
	}

	#[test]
	fn decodes_strict_send_and_muxed_source() {
		let op = xdr::Operation {
			source_account: Some(xdr::MuxedAccount::MuxedEd25519(xdr::MuxedAccountMed25519 {
				id: 7,
				ed25519: xdr::Uint256(SOURCE),
			})),
			body: xdr::OperationBody::PathPaymentStrictSend(xdr::PathPaymentStrictSendOp {
				send_asset: usd(),
				send_amount: 1_000_000_000,
				destination: xdr::MuxedAccount::Ed25519(xdr::Uint256(DESTINATION)),
				dest_asset: xdr::Asset::Native,
				dest_min: 950_000_000,
				path: Default::default(),
			}),
		};
		let envelope = v1(xdr::Memo::Id(42), vec![op]);

		let decoded = XdrEnvelopeDecoder
			.decode_envelope(&envelope, &Network::Testnet)
			.unwrap();

		assert_eq!(decoded.memo, Memo::Id(42));
		let operation = &decoded.operations[0];
		assert!(operation.source_account.as_deref().unwrap().starts_with('M'));
		assert_eq!(
			operation.body,
			OperationBody::PathPaymentStrictSend {
				destination: g(DESTINATION),
				send_asset: Asset::credit("USD", g(ISSUER)),
				send_amount: "100.0000000".into(),
				dest_asset: Asset::Native,
				dest_min: "95.0000000".into(),
			}
		);
	}

	#[test]
	fn other_operations_are_unsupported() {
		let op = xdr::Operation {
			source_account: None,
			body: xdr::OperationBody::Inflation,
		};
		let envelope = v1(xdr::Memo::None, vec![op, payment_op(1)]);

		let decoded = XdrEnvelopeDecoder
			.decode_envelope(&envelope, &Network::Public)
			.unwrap();

		assert!(matches!(decoded.operations[0].body, OperationBody::Unsupported(_)));
		assert!(matches!(decoded.operations[1].body, OperationBody::Payment { .. }));
	}

	#[test]
	fn bounds_reads_by_envelope_length() {
		let envelope = v1(xdr::Memo::None, vec![payment_op(1)]);
		let limits = read_limits(&envelope);
		assert_eq!(limits.depth, MAX_XDR_DEPTH);
		assert_eq!(limits.len, envelope.len());

		let truncated = &envelope[..envelope.len() - 8];
		assert!(matches!(
			XdrEnvelopeDecoder.decode_envelope(truncated, &Network::Public),
			Err(DecodeError::EnvelopeError(_))
		));
	}

	#[test]
	fn rejects_garbage() {
		let err = XdrEnvelopeDecoder
			.decode_envelope("not an envelope", &Network::Public)
			.unwrap_err();
		assert!(matches!(err, DecodeError::EnvelopeError(_)));
	}
}
