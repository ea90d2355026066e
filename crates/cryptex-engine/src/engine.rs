//! Lifecycle operations for projects and secrets.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use zeroize::Zeroizing;

use cryptex_audit::{AuditAction, AuditEvent, AuditRecorder};
use cryptex_crypto::EnvelopeCipher;
use cryptex_storage::{
    ActorId, AuditEntry, CreateProjectParams, CreateSecretParams, Project, ProjectId, Secret,
    SecretId, Store, StoreError, UpdateProjectParams, UpdateSecretParams,
};

use crate::EngineError;

/// Bound on create retries when racing another writer for the next
/// version of the same `(project, name)`.
const CREATE_VERSION_ATTEMPTS: usize = 8;

/// Default bound on any single store call.
const DEFAULT_STORE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Orchestrates cipher, store, and audit trail for every lifecycle
/// operation. Holds no mutable state of its own; the store is the only
/// shared resource.
pub struct Engine {
    store: Arc<dyn Store>,
    cipher: Arc<EnvelopeCipher>,
    audit: AuditRecorder,
    store_timeout: StdDuration,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, cipher: Arc<EnvelopeCipher>, audit: AuditRecorder) -> Self {
        Self {
            store,
            cipher,
            audit,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: StdDuration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Bound a store call; elapsed timeout means no partial write and a
    /// `StoreUnavailable` for the caller.
    async fn store_call<T, F>(&self, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(res) => res.map_err(EngineError::from),
            Err(_) => Err(EngineError::StoreUnavailable),
        }
    }

    /// Load the project and verify the actor owns it.
    ///
    /// A soft-deleted project is indistinguishable from an absent one;
    /// a live project owned by someone else yields `Unauthorized`.
    async fn authorize(&self, actor: &ActorId, project_id: &ProjectId) -> Result<Project, EngineError> {
        let project = self.store_call(self.store.get_project(project_id)).await?;
        if project.owner != *actor {
            return Err(EngineError::Unauthorized);
        }
        Ok(project)
    }

    fn validate_ttl(ttl_days: Option<i64>) -> Result<(), EngineError> {
        match ttl_days {
            Some(d) if d < 1 => Err(EngineError::InvalidTtl),
            _ => Ok(()),
        }
    }

    // ───────────────────────────── Projects ─────────────────────────────

    pub async fn create_project(
        &self,
        actor: &ActorId,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, EngineError> {
        let project = self
            .store_call(self.store.create_project(&CreateProjectParams {
                owner: *actor,
                name: name.to_string(),
                description,
            }))
            .await?;

        self.audit.emit(
            AuditEvent::builder(AuditAction::ProjectCreate, "Project created successfully")
                .actor(actor)
                .project_id(&project.id)
                .build(),
        );
        Ok(project)
    }

    pub async fn get_project(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
    ) -> Result<Project, EngineError> {
        self.authorize(actor, project_id).await
    }

    pub async fn list_projects(&self, actor: &ActorId) -> Result<Vec<Project>, EngineError> {
        self.store_call(self.store.list_projects(actor)).await
    }

    pub async fn update_project(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Project, EngineError> {
        if name.is_none() && description.is_none() {
            return Err(EngineError::NothingToUpdate);
        }
        self.authorize(actor, project_id).await?;

        let project = self
            .store_call(
                self.store
                    .update_project(project_id, &UpdateProjectParams { name, description }),
            )
            .await?;

        self.audit.emit(
            AuditEvent::builder(AuditAction::ProjectUpdate, "Project details updated")
                .actor(actor)
                .project_id(project_id)
                .build(),
        );
        Ok(project)
    }

    /// Soft-delete a project. Secrets under it are not cascaded: they stay
    /// live rows but become unreachable, since every access path re-loads
    /// the project and a soft-deleted project reads as absent.
    pub async fn delete_project(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
    ) -> Result<(), EngineError> {
        self.authorize(actor, project_id).await?;
        self.store_call(self.store.soft_delete_project(project_id))
            .await?;

        self.audit.emit(
            AuditEvent::builder(AuditAction::ProjectDelete, "Project deleted successfully")
                .actor(actor)
                .project_id(project_id)
                .build(),
        );
        Ok(())
    }

    /// Recent audit entries for a project the actor owns, newest first.
    pub async fn list_audit_entries(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, EngineError> {
        self.authorize(actor, project_id).await?;
        self.store_call(self.store.list_audit_entries(project_id, limit))
            .await
    }

    // ───────────────────────────── Secrets ──────────────────────────────

    /// Create a new secret version under `(project, name)`.
    ///
    /// Version is latest+1 (1 for a fresh name). The unique index on
    /// `(project_id, name, version)` turns a lost race into
    /// `AlreadyExists`, which we answer by re-reading the latest version
    /// and retrying, so concurrent creators still produce a contiguous
    /// sequence.
    pub async fn create_secret(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
        name: &str,
        value: &[u8],
        ttl_days: Option<i64>,
    ) -> Result<Secret, EngineError> {
        self.authorize(actor, project_id).await?;
        Self::validate_ttl(ttl_days)?;

        let ciphertext = self.cipher.seal(value)?;

        let mut attempts = 0;
        let secret = loop {
            let latest = self
                .store_call(self.store.get_latest_secret(project_id, name))
                .await?;
            let version = latest.map(|s| s.version + 1).unwrap_or(1);
            let expires_at = ttl_days.map(|d| Utc::now() + Duration::days(d));

            match self
                .store_call(self.store.create_secret(&CreateSecretParams {
                    project_id: *project_id,
                    name: name.to_string(),
                    ciphertext: ciphertext.clone(),
                    version,
                    ttl_days,
                    expires_at,
                }))
                .await
            {
                Ok(secret) => break secret,
                Err(EngineError::Store(StoreError::AlreadyExists))
                | Err(EngineError::Store(StoreError::Conflict)) => {
                    attempts += 1;
                    if attempts >= CREATE_VERSION_ATTEMPTS {
                        return Err(EngineError::Store(StoreError::Conflict));
                    }
                }
                Err(e) => return Err(e),
            }
        };

        self.audit.emit(
            AuditEvent::builder(
                AuditAction::SecretCreate,
                format!("Secret created with version {}", secret.version),
            )
            .actor(actor)
            .project_id(project_id)
            .secret_id(&secret.id)
            .build(),
        );
        Ok(secret)
    }

    /// Read and decrypt a secret.
    ///
    /// Check order: absent/soft-deleted, then ownership, then expiry, then
    /// revocation. Expiry is a read-time predicate only; an expired secret
    /// stays active in storage and can still be revoked or deleted.
    pub async fn read_secret(
        &self,
        actor: &ActorId,
        secret_id: &SecretId,
    ) -> Result<(Secret, Zeroizing<Vec<u8>>), EngineError> {
        let secret = self.store_call(self.store.get_secret(secret_id)).await?;
        self.authorize(actor, &secret.project_id).await?;

        if let Some(expires_at) = secret.expires_at {
            if Utc::now() >= expires_at {
                return Err(EngineError::Expired);
            }
        }
        if secret.revoked {
            return Err(EngineError::Revoked);
        }

        let plaintext = self.cipher.open(&secret.ciphertext)?;
        Ok((secret, plaintext))
    }

    /// Update a secret's value and/or ttl.
    ///
    /// A new value re-seals and bumps the version; a ttl change recomputes
    /// the expiry from now (ttl is always relative to the latest touch)
    /// and leaves the version alone.
    pub async fn update_secret(
        &self,
        actor: &ActorId,
        secret_id: &SecretId,
        new_value: Option<&[u8]>,
        ttl_days: Option<i64>,
    ) -> Result<Secret, EngineError> {
        if new_value.is_none() && ttl_days.is_none() {
            return Err(EngineError::NothingToUpdate);
        }
        Self::validate_ttl(ttl_days)?;

        let current = self.store_call(self.store.get_secret(secret_id)).await?;
        self.authorize(actor, &current.project_id).await?;
        if current.revoked {
            return Err(EngineError::RevokedImmutable);
        }

        let mut params = UpdateSecretParams::default();
        if let Some(value) = new_value {
            params.ciphertext = Some(self.cipher.seal(value)?);
            params.version = Some(current.version + 1);
        }
        if let Some(days) = ttl_days {
            params.ttl_days = Some(days);
            params.expires_at = Some(Utc::now() + Duration::days(days));
        }

        let secret = self
            .store_call(self.store.update_secret(secret_id, &params))
            .await?;

        self.audit.emit(
            AuditEvent::builder(
                AuditAction::SecretUpdate,
                format!("Secret updated (version {})", secret.version),
            )
            .actor(actor)
            .project_id(&secret.project_id)
            .secret_id(secret_id)
            .build(),
        );
        Ok(secret)
    }

    /// Mark a secret revoked. Revoking an already-revoked secret succeeds
    /// unchanged; revocation is terminal for mutation but the secret can
    /// still be soft-deleted.
    pub async fn revoke_secret(
        &self,
        actor: &ActorId,
        secret_id: &SecretId,
    ) -> Result<Secret, EngineError> {
        let current = self.store_call(self.store.get_secret(secret_id)).await?;
        self.authorize(actor, &current.project_id).await?;

        let secret = self
            .store_call(self.store.update_secret(
                secret_id,
                &UpdateSecretParams {
                    revoked: Some(true),
                    ..Default::default()
                },
            ))
            .await?;

        self.audit.emit(
            AuditEvent::builder(AuditAction::SecretRevoke, "Secret revoked")
                .actor(actor)
                .project_id(&secret.project_id)
                .secret_id(secret_id)
                .build(),
        );
        Ok(secret)
    }

    /// Soft-delete a secret regardless of its revoked/expired status.
    pub async fn delete_secret(
        &self,
        actor: &ActorId,
        secret_id: &SecretId,
    ) -> Result<(), EngineError> {
        let current = self.store_call(self.store.get_secret(secret_id)).await?;
        self.authorize(actor, &current.project_id).await?;

        self.store_call(self.store.soft_delete_secret(secret_id))
            .await?;

        self.audit.emit(
            AuditEvent::builder(AuditAction::SecretDelete, "Secret deleted")
                .actor(actor)
                .project_id(&current.project_id)
                .secret_id(secret_id)
                .build(),
        );
        Ok(())
    }
}
