//! Storage abstraction for the secret lifecycle service.
//!
//! Defines the [`Store`] trait that persistence backends implement, the
//! record/parameter types that cross that seam, and [`StoreError`].

use thiserror::Error;

mod store;
mod types;

pub use store::*;
pub use types::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
