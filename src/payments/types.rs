//! Types shared by the envelope decoder, the operation normalizer and the projector

use super::token::{PagingToken, TokenError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset moved by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// The network's native asset (lumens)
    Native,
    /// An issued credit asset (alphanum4 or alphanum12)
    Credit { code: String, issuer: String },
}

impl Asset {
    pub fn credit(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Asset::Credit {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    /// Asset code as reported to consumers; the native asset is `XLM`.
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => "XLM",
            Asset::Credit { code, .. } => code,
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        match self {
            Asset::Native => None,
            Asset::Credit { issuer, .. } => Some(issuer),
        }
    }
}

/// Transaction memo by declared variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Memo {
    #[default]
    None,
    Id(u64),
    Text(String),
    Hash([u8; 32]),
    Return([u8; 32]),
}

impl Memo {
    /// Memo rendered as the string delivered with each payment.
    ///
    /// Id and text memos are returned verbatim, hash and return-hash memos as
    /// standard base64, and a missing memo as an empty string.
    pub fn decode(&self) -> String {
        match self {
            Memo::None => String::new(),
            Memo::Id(id) => id.to_string(),
            Memo::Text(text) => text.clone(),
            Memo::Hash(hash) | Memo::Return(hash) => BASE64.encode(hash),
        }
    }
}

/// One decoded ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOperation {
    /// Operation-level source account, when it overrides the transaction's
    pub source_account: Option<String>,
    pub body: OperationBody,
}

/// Operation kinds the watcher understands.
///
/// Every other ledger operation lands in `Unsupported` with its kind name so it
/// is skipped explicitly rather than misread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationBody {
    Payment {
        destination: String,
        asset: Asset,
        amount: String,
    },
    /// Also covers the legacy path payment, which shares its discriminant
    PathPaymentStrictReceive {
        destination: String,
        send_asset: Asset,
        send_max: String,
        dest_asset: Asset,
        dest_amount: String,
    },
    PathPaymentStrictSend {
        destination: String,
        send_asset: Asset,
        send_amount: String,
        dest_asset: Asset,
        dest_min: String,
    },
    Unsupported(String),
}

/// Transaction envelope reduced to the fields the watcher reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    pub source_account: String,
    pub memo: Memo,
    pub operations: Vec<LedgerOperation>,
}

/// Internal payment record produced by the transaction decoder.
///
/// Carries optional fields that the projector defaults before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: PagingToken,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub asset_code: String,
    pub asset_issuer: Option<String>,
    pub memo: Option<String>,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment event delivered to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Synthetic id, ordered across and within transactions
    pub id: PagingToken,
    pub from: String,
    pub to: String,
    /// Decimal amount received by `to`
    pub amount: String,
    pub asset_code: String,
    /// Absent for the native asset
    pub asset_issuer: Option<String>,
    pub memo: String,
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Error types for transaction decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Envelope decode error: {0}")]
    EnvelopeError(String),

    #[error("Paging token error: {0}")]
    TokenError(#[from] TokenError),
}
