use rust_decimal::Decimal;

/// Render an integer amount with `decimals` implied fractional digits.
///
/// Trailing zeros are kept so every amount of the same asset has the same width,
/// e.g. `500000000` with 7 decimals is `"50.0000000"`.
pub fn format_token_amount(amount: i64, decimals: u32) -> String {
	Decimal::new(amount, decimals).to_string()
}
