//! Record, parameter, and identifier types crossing the storage seam.

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ───────────────────────────── Identifiers ─────────────────────────────

/// Actor (user) identifier. Identity resolution happens upstream; the
/// store only ever compares these for ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActorId(pub Uuid);

/// Project identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProjectId(pub Uuid);

/// Secret identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SecretId(pub Uuid);

/// Audit entry identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AuditEntryId(pub Uuid);

// ───────────────────────────── Projects ────────────────────────────────

/// Project record. A non-null `deleted_at` makes the row invisible to
/// every store operation except the purge pass.
#[derive(Clone, Debug)]
pub struct Project {
    pub id: ProjectId,
    pub owner: ActorId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a project.
#[derive(Clone, Debug)]
pub struct CreateProjectParams {
    pub owner: ActorId,
    pub name: String,
    pub description: Option<String>,
}

/// Partial project update; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateProjectParams {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ───────────────────────────── Secrets ─────────────────────────────────

/// Secret record. The value is an opaque sealed blob; plaintext never
/// touches the store.
#[derive(Clone, Debug)]
pub struct Secret {
    pub id: SecretId,
    pub project_id: ProjectId,
    pub name: String,
    pub ciphertext: String,
    pub version: i64,
    pub ttl_days: Option<i64>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for inserting a new secret row.
#[derive(Clone, Debug)]
pub struct CreateSecretParams {
    pub project_id: ProjectId,
    pub name: String,
    pub ciphertext: String,
    pub version: i64,
    pub ttl_days: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial secret update; `None` fields are left untouched. The store
/// bumps `updated_at` on every update.
#[derive(Clone, Debug, Default)]
pub struct UpdateSecretParams {
    pub ciphertext: Option<String>,
    pub version: Option<i64>,
    pub ttl_days: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: Option<bool>,
}

// ───────────────────────────── Audit entries ───────────────────────────

/// Append-only audit record. Actor is absent for system-originated
/// events (e.g. the retention sweeper).
#[derive(Clone, Debug)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor: Option<ActorId>,
    pub project_id: Option<ProjectId>,
    pub secret_id: Option<SecretId>,
    pub action: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for appending an audit entry.
#[derive(Clone, Debug)]
pub struct AuditEntryParams {
    pub actor: Option<ActorId>,
    pub project_id: Option<ProjectId>,
    pub secret_id: Option<SecretId>,
    pub action: String,
    pub message: String,
}
