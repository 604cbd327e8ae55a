use thiserror::Error;

/// Returned whenever a reader runs out of bytes or meets a value its
/// encoding cannot produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("serde error: buffer exhausted or value out of range")]
pub struct SerdeErr;
