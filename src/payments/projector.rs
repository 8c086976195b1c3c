use super::types::{PaymentEvent, PaymentRecord};

/// Project an internal payment record onto the public event shape.
///
/// Memo and transaction hash default to empty strings.
pub fn parse_payment(payment: Option<PaymentRecord>) -> Option<PaymentEvent> {
	let payment = payment?;

	Some(PaymentEvent {
		id: payment.id,
		from: payment.from,
		to: payment.to,
		amount: payment.amount,
		asset_code: payment.asset_code,
		asset_issuer: payment.asset_issuer,
		memo: payment.memo.unwrap_or_default(),
		transaction_hash: payment.transaction_hash.unwrap_or_default(),
		created_at: payment.created_at,
	})
}
