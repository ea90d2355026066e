//! Common test helpers for handler tests.

use std::sync::Arc;

use tonic::Request;
use uuid::Uuid;

use crate::server::CryptexServer;
use cryptex_audit::{AuditRecorder, StoreAuditLog};
use cryptex_crypto::{EncryptionKey, EnvelopeCipher};
use cryptex_engine::Engine;
use cryptex_storage::ActorId;
use cryptex_store_sqlite::SqliteStore;

/// Test helper: create a CryptexServer over in-memory SQLite. The store
/// handle is returned too so tests can inspect rows directly.
pub async fn create_test_server() -> (CryptexServer, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let cipher = Arc::new(EnvelopeCipher::new(
        &EncryptionKey::from_bytes(&[5u8; 32]).unwrap(),
    ));
    let (audit, _worker) = AuditRecorder::spawn(Arc::new(StoreAuditLog::new(store.clone())));
    let engine = Arc::new(Engine::new(store.clone(), cipher, audit));
    (CryptexServer::new(engine), store)
}

pub fn new_actor() -> ActorId {
    ActorId(Uuid::now_v7())
}

/// Wrap a message in a request carrying the actor identity the way the
/// gateway would.
pub fn authed<T>(actor: &ActorId, msg: T) -> Request<T> {
    let mut req = Request::new(msg);
    req.metadata_mut()
        .insert("x-actor-id", actor.0.to_string().parse().unwrap());
    req
}
