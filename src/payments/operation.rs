use super::types::{Asset, LedgerOperation, OperationBody};

/// Receiver-side view of a payment-moving operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayment {
	pub to: String,
	pub asset_code: String,
	pub asset_issuer: Option<String>,
	pub amount: String,
}

impl NormalizedPayment {
	fn received(destination: &str, asset: &Asset, amount: &str) -> Self {
		Self {
			to: destination.to_string(),
			asset_code: asset.code().to_string(),
			asset_issuer: asset.issuer().map(str::to_string),
			amount: amount.to_string(),
		}
	}
}

/// Map an operation onto the uniform payment shape.
///
/// Path payments report the destination asset and the amount the receiver gets.
/// Strict-send path payments only carry the guaranteed minimum on the receiving
/// side, so that is the amount recorded. Returns `None` for every other kind.
pub fn normalize_operation(operation: &LedgerOperation) -> Option<NormalizedPayment> {
	match &operation.body {
		OperationBody::Payment {
			destination,
			asset,
			amount,
		} => Some(NormalizedPayment::received(destination, asset, amount)),
		OperationBody::PathPaymentStrictReceive {
			destination,
			dest_asset,
			dest_amount,
			..
		} => Some(NormalizedPayment::received(
			destination,
			dest_asset,
			dest_amount,
		)),
		OperationBody::PathPaymentStrictSend {
			destination,
			dest_asset,
			dest_min,
			..
		} => Some(NormalizedPayment::received(destination, dest_asset, dest_min)),
		OperationBody::Unsupported(_) => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn op(body: OperationBody) -> LedgerOperation {
		LedgerOperation {
			source_account: None,
			body,
		}
	}

	#[test]
	fn simple_payment() {
		let normalized = normalize_operation(&op(OperationBody::Payment {
			destination: "GDEST".into(),
			asset: Asset::credit("USD", "GISSUER"),
			amount: "50.0".into(),
		}))
		.unwrap();

		assert_eq!(
			normalized,
			NormalizedPayment {
				to: "GDEST".into(),
				asset_code: "USD".into(),
				asset_issuer: Some("GISSUER".into()),
				amount: "50.0".into(),
			}
		);
	}

	#[test]
	fn strict_receive_reports_destination_side() {
		let normalized = normalize_operation(&op(OperationBody::PathPaymentStrictReceive {
			destination: "GDEST".into(),
			send_asset: Asset::Native,
			send_max: "900.0000000".into(),
			dest_asset: Asset::credit("EUR", "GEURISSUER"),
			dest_amount: "10.0000000".into(),
		}))
		.unwrap();

		assert_eq!(normalized.asset_code, "EUR");
		assert_eq!(normalized.asset_issuer.as_deref(), Some("GEURISSUER"));
		assert_eq!(normalized.amount, "10.0000000");
	}

	#[test]
	fn strict_send_reports_destination_minimum() {
		let normalized = normalize_operation(&op(OperationBody::PathPaymentStrictSend {
			destination: "GDEST".into(),
			send_asset: Asset::credit("USD", "GISSUER"),
			send_amount: "100.0000000".into(),
			dest_asset: Asset::Native,
			dest_min: "95.5000000".into(),
		}))
		.unwrap();

		assert_eq!(normalized.to, "GDEST");
		assert_eq!(normalized.asset_code, "XLM");
		assert_eq!(normalized.asset_issuer, None);
		assert_eq!(normalized.amount, "95.5000000");
	}

	#[test]
	fn other_operations_are_not_payments() {
		assert!(normalize_operation(&op(OperationBody::Unsupported("CreateAccount".into()))).is_none());
	}
}
