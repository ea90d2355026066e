//! The secret lifecycle engine.
//!
//! Orchestrates the envelope cipher, store, and audit trail to implement
//! create/read/update/revoke/delete for secrets and their enclosing
//! projects, plus the background retention sweeper that permanently
//! erases soft-deleted rows once the retention window elapses.

mod engine;
mod error;
mod sweeper;

pub use engine::Engine;
pub use error::EngineError;
pub use sweeper::RetentionSweeper;
