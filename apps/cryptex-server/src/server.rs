//! Server state shared across handlers.

use std::sync::Arc;

use cryptex_engine::Engine;

/// gRPC service state: everything a handler needs is reachable through
/// the engine.
pub struct CryptexServer {
    pub engine: Arc<Engine>,
}

impl CryptexServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}
