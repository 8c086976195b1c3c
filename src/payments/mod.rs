//! Transaction-to-payment normalization
//!
//! Decodes raw ledger transactions into uniformly shaped payment events. Each
//! payment operation becomes one event whose id is derived from the transaction's
//! paging token, so events order globally by id.

/// Envelope decoding trait and the transaction decoder
mod decoder;
/// Operation-level normalization
mod operation;
/// Internal record to public event projection
mod projector;
/// Paging token arithmetic
mod token;
/// Shared payment types
mod types;
/// XDR-backed envelope decoder
mod xdr;

pub use decoder::{EnvelopeDecoder, TransactionDecoder};
pub use operation::{NormalizedPayment, normalize_operation};
pub use projector::parse_payment;
pub use token::{PagingToken, TokenError};
pub use types::*;
pub use xdr::XdrEnvelopeDecoder;
