use thiserror::Error;

use cryptex_crypto::{DecryptError, EncryptError};
use cryptex_storage::StoreError;

/// Failures a lifecycle operation can return to its caller.
///
/// All of these are surfaced synchronously and never retried inside the
/// engine (the version-conflict retry in create is internal and bounded).
/// Audit failures are deliberately absent: they are logged, not returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Actor does not own the enclosing project.
    #[error("unauthorized")]
    Unauthorized,
    /// Entity absent or soft-deleted. Deliberately indistinguishable from
    /// a project the actor cannot see.
    #[error("not found")]
    NotFound,
    #[error("ttl must be at least 1 day")]
    InvalidTtl,
    #[error("nothing to update")]
    NothingToUpdate,
    /// Revoked secrets accept no further value/ttl updates.
    #[error("secret is revoked and cannot be modified")]
    RevokedImmutable,
    #[error("secret has expired")]
    Expired,
    #[error("secret is revoked")]
    Revoked,
    #[error(transparent)]
    Encrypt(#[from] EncryptError),
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
    #[error("store error: {0}")]
    Store(StoreError),
    /// A store call exceeded its timeout; no partial write happened.
    #[error("store unavailable")]
    StoreUnavailable,
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => EngineError::NotFound,
            StoreError::Unavailable(_) => EngineError::StoreUnavailable,
            other => EngineError::Store(other),
        }
    }
}
