//! Paging tokens used as stream cursors and synthetic payment ids.
//!
//! Horizon paging tokens are decimal integers that routinely exceed the 53 bits a
//! float can represent exactly. Arithmetic here goes through `rust_decimal`, which
//! keeps every digit and reports overflow instead of wrapping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error raised while parsing or offsetting a paging token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
	#[error("Invalid paging token {0:?}: {1}")]
	Invalid(String, &'static str),

	#[error("Paging token {0} cannot be offset by {1}")]
	Overflow(String, u64),
}

/// Ordered, non-negative decimal integer position in the ledger stream.
///
/// Comparison is numeric, so `"999" < "1000"` even though the strings sort the
/// other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PagingToken(Decimal);

impl PagingToken {
	/// Sentinel meaning "start from the live stream".
	pub const START: PagingToken = PagingToken(Decimal::ZERO);

	pub fn is_start(&self) -> bool {
		self.0.is_zero()
	}

	/// Token `n` positions after this one.
	pub fn offset(&self, n: u64) -> Result<Self, TokenError> {
		self.0
			.checked_add(Decimal::from(n))
			.map(Self)
			.ok_or_else(|| TokenError::Overflow(self.to_string(), n))
	}

	/// Token of the last operation of a transaction whose own token is `self`.
	///
	/// A transaction with `k` operations ends at `self + (k - 1)`; an empty
	/// transaction ends at `self`.
	pub fn last_operation(&self, operation_count: u32) -> Result<Self, TokenError> {
		self.offset(u64::from(operation_count.max(1) - 1))
	}
}

impl Default for PagingToken {
	fn default() -> Self {
		Self::START
	}
}

impl FromStr for PagingToken {
	type Err = TokenError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = s.trim();
		if digits.is_empty() {
			return Err(TokenError::Invalid(s.to_string(), "empty token"));
		}
		if !digits.bytes().all(|b| b.is_ascii_digit()) {
			return Err(TokenError::Invalid(
				s.to_string(),
				"expected a non-negative integer",
			));
		}

		Decimal::from_str_exact(digits)
			.map(Self)
			.map_err(|_| TokenError::Invalid(s.to_string(), "too many digits"))
	}
}

impl TryFrom<String> for PagingToken {
	type Error = TokenError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<PagingToken> for String {
	fn from(token: PagingToken) -> Self {
		token.to_string()
	}
}

impl From<u64> for PagingToken {
	fn from(value: u64) -> Self {
		Self(Decimal::from(value))
	}
}

impl fmt::Display for PagingToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
