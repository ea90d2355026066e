//! Audit trail for secret lifecycle transitions.
//!
//! Defines the `AuditLog` trait for persisting audit events, the types
//! representing auditable actions, and a fire-and-forget recorder that
//! drains a bounded queue into the sink. Audit failures are logged and
//! never surfaced to the mutation that triggered them, so the trail is
//! best-effort rather than transactionally consistent with the data it
//! describes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use cryptex_storage::{ActorId, AuditEntryParams, ProjectId, SecretId, Store};

/// Default capacity of the recorder's work queue.
pub const QUEUE_CAPACITY: usize = 256;

/// Categories of auditable actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Project operations
    ProjectCreate,
    ProjectUpdate,
    ProjectDelete,

    // Secret operations
    SecretCreate,
    SecretUpdate,
    SecretRevoke,
    SecretDelete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::ProjectCreate => "project.create",
            AuditAction::ProjectUpdate => "project.update",
            AuditAction::ProjectDelete => "project.delete",
            AuditAction::SecretCreate => "secret.create",
            AuditAction::SecretUpdate => "secret.update",
            AuditAction::SecretRevoke => "secret.revoke",
            AuditAction::SecretDelete => "secret.delete",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project.create" => Ok(AuditAction::ProjectCreate),
            "project.update" => Ok(AuditAction::ProjectUpdate),
            "project.delete" => Ok(AuditAction::ProjectDelete),
            "secret.create" => Ok(AuditAction::SecretCreate),
            "secret.update" => Ok(AuditAction::SecretUpdate),
            "secret.revoke" => Ok(AuditAction::SecretRevoke),
            "secret.delete" => Ok(AuditAction::SecretDelete),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

/// A single auditable lifecycle transition.
///
/// Actor is absent for system-originated events. The message never
/// contains plaintext secret values.
#[derive(Clone, Debug)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub actor: Option<ActorId>,
    pub project_id: Option<ProjectId>,
    pub secret_id: Option<SecretId>,
    pub action: AuditAction,
    pub message: String,
}

impl AuditEvent {
    /// Create a new audit event builder
    pub fn builder(action: AuditAction, message: impl Into<String>) -> AuditEventBuilder {
        AuditEventBuilder::new(action, message)
    }

    /// Render the process-log mirror line:
    /// `action=<tag> user=<uuid> project=<uuid> secret=<uuid> message="<text>"`.
    fn log_line(&self) -> String {
        fn or_dash(id: Option<uuid::Uuid>) -> String {
            id.map(|u| u.to_string()).unwrap_or_else(|| "-".to_string())
        }
        format!(
            "action={} user={} project={} secret={} message=\"{}\"",
            self.action,
            or_dash(self.actor.map(|a| a.0)),
            or_dash(self.project_id.map(|p| p.0)),
            or_dash(self.secret_id.map(|s| s.0)),
            self.message,
        )
    }
}

/// Builder for constructing audit events
pub struct AuditEventBuilder {
    actor: Option<ActorId>,
    project_id: Option<ProjectId>,
    secret_id: Option<SecretId>,
    action: AuditAction,
    message: String,
}

impl AuditEventBuilder {
    pub fn new(action: AuditAction, message: impl Into<String>) -> Self {
        Self {
            actor: None,
            project_id: None,
            secret_id: None,
            action,
            message: message.into(),
        }
    }

    pub fn actor(mut self, actor: &ActorId) -> Self {
        self.actor = Some(*actor);
        self
    }

    pub fn project_id(mut self, project_id: &ProjectId) -> Self {
        self.project_id = Some(*project_id);
        self
    }

    pub fn secret_id(mut self, secret_id: &SecretId) -> Self {
        self.secret_id = Some(*secret_id);
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            timestamp: Utc::now(),
            actor: self.actor,
            project_id: self.project_id,
            secret_id: self.secret_id,
            action: self.action,
            message: self.message,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink failure: {0}")]
    Sink(String),
}

/// Persistence seam for audit events.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Store-backed audit sink: appends to the audit table.
pub struct StoreAuditLog {
    store: Arc<dyn Store>,
}

impl StoreAuditLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditLog for StoreAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.store
            .append_audit_entry(&AuditEntryParams {
                actor: event.actor,
                project_id: event.project_id,
                secret_id: event.secret_id,
                action: event.action.to_string(),
                message: event.message.clone(),
            })
            .await
            .map(|_| ())
            .map_err(|e| AuditError::Sink(e.to_string()))
    }
}

/// Fire-and-forget front end over an [`AuditLog`].
///
/// Events go onto a bounded queue drained by a dedicated worker task.
/// `emit` never blocks and never fails the caller: a full queue drops the
/// event with a warning, and sink failures are logged by the worker. Every
/// emitted event is mirrored to the process log regardless of sink outcome.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditEvent>,
}

impl AuditRecorder {
    /// Spawn the worker with the default queue capacity. The returned
    /// handle completes once every recorder clone has been dropped and the
    /// queue is drained.
    pub fn spawn(sink: Arc<dyn AuditLog>) -> (Self, tokio::task::JoinHandle<()>) {
        Self::spawn_with_capacity(sink, QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        sink: Arc<dyn AuditLog>,
        capacity: usize,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AuditEvent>(capacity);
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.record(&event).await {
                    warn!(action = %event.action, error = %e, "audit write failed; event lost");
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Queue an event for recording. Best-effort: the triggering
    /// operation's outcome must never depend on this call.
    pub fn emit(&self, event: AuditEvent) {
        info!(target: "audit", "{}", event.log_line());
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "audit queue full; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[test]
    fn action_tags_round_trip() {
        for action in [
            AuditAction::ProjectCreate,
            AuditAction::ProjectUpdate,
            AuditAction::ProjectDelete,
            AuditAction::SecretCreate,
            AuditAction::SecretUpdate,
            AuditAction::SecretRevoke,
            AuditAction::SecretDelete,
        ] {
            let tag = action.to_string();
            assert_eq!(AuditAction::from_str(&tag).unwrap(), action);
        }
        assert!(AuditAction::from_str("secret.rotate").is_err());
    }

    #[test]
    fn builder_sets_context_fields() {
        let actor = ActorId(Uuid::now_v7());
        let project = ProjectId(Uuid::now_v7());
        let secret = SecretId(Uuid::now_v7());

        let event = AuditEvent::builder(AuditAction::SecretRevoke, "Secret revoked")
            .actor(&actor)
            .project_id(&project)
            .secret_id(&secret)
            .build();

        assert_eq!(event.actor, Some(actor));
        assert_eq!(event.project_id, Some(project));
        assert_eq!(event.secret_id, Some(secret));
        assert_eq!(event.action, AuditAction::SecretRevoke);
        assert_eq!(event.message, "Secret revoked");
    }

    #[test]
    fn log_line_format() {
        let actor = ActorId(Uuid::now_v7());
        let event = AuditEvent::builder(AuditAction::ProjectCreate, "Project created successfully")
            .actor(&actor)
            .build();
        let line = event.log_line();
        assert!(line.starts_with(&format!("action=project.create user={}", actor.0)));
        assert!(line.contains("project=- secret=-"));
        assert!(line.ends_with("message=\"Project created successfully\""));
    }

    struct CapturingSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditLog for CapturingSink {
        async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditLog for FailingSink {
        async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            Err(AuditError::Sink("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn recorder_delivers_to_sink() {
        let sink = Arc::new(CapturingSink {
            events: Mutex::new(vec![]),
        });
        let (recorder, worker) = AuditRecorder::spawn(sink.clone());

        recorder.emit(AuditEvent::builder(AuditAction::SecretCreate, "Secret created with version 1").build());
        recorder.emit(AuditEvent::builder(AuditAction::SecretDelete, "Secret deleted").build());

        drop(recorder);
        worker.await.unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::SecretCreate);
        assert_eq!(events[1].action, AuditAction::SecretDelete);
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let (recorder, worker) = AuditRecorder::spawn(Arc::new(FailingSink));
        recorder.emit(AuditEvent::builder(AuditAction::SecretUpdate, "Secret updated (version 2)").build());
        drop(recorder);
        // worker survives the failure and exits cleanly on channel close
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        // a sink that never completes, so the queue cannot drain
        struct StuckSink;
        #[async_trait]
        impl AuditLog for StuckSink {
            async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
                std::future::pending().await
            }
        }

        let (recorder, worker) = AuditRecorder::spawn_with_capacity(Arc::new(StuckSink), 1);
        for _ in 0..10 {
            recorder.emit(AuditEvent::builder(AuditAction::SecretCreate, "x").build());
        }
        // reaching this point at all is the assertion: emit never blocked
        drop(recorder);
        worker.abort();
    }
}
