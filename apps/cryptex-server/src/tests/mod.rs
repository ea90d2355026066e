//! Server unit and integration tests.
//!
//! - `common` - shared test helpers
//! - `projects` - project handler tests
//! - `secrets` - secret and audit handler tests

pub mod common;
