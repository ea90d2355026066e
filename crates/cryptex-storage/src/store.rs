//! The Store trait that backends implement.

use chrono::Duration;

use crate::types::*;
use crate::StoreError;

/// The storage trait the lifecycle engine depends on.
///
/// All read/update operations are scoped to live rows (`deleted_at IS
/// NULL`); only the purge passes see soft-deleted data. Mapping "row is
/// soft-deleted" to a business error is the engine's job — here it is
/// simply [`StoreError::NotFound`].
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────── Projects ─────────────────────────────

    /// Insert a new project and return the stored record.
    async fn create_project(&self, params: &CreateProjectParams) -> Result<Project, StoreError>;

    /// Get a live project by id.
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError>;

    /// List live projects owned by an actor, newest first.
    async fn list_projects(&self, owner: &ActorId) -> Result<Vec<Project>, StoreError>;

    /// Partially update a live project and return the new record.
    async fn update_project(
        &self,
        project_id: &ProjectId,
        params: &UpdateProjectParams,
    ) -> Result<Project, StoreError>;

    /// Set a live project's soft-delete timestamp to now.
    async fn soft_delete_project(&self, project_id: &ProjectId) -> Result<(), StoreError>;

    /// Hard-delete soft-deleted projects whose deletion timestamp is older
    /// than `now - older_than`. Returns the number of rows removed.
    async fn purge_projects(&self, older_than: Duration) -> Result<u64, StoreError>;

    // ───────────────────────────── Secrets ──────────────────────────────

    /// Insert a new secret row. The backend enforces uniqueness of
    /// `(project_id, name, version)`, so two writers racing on the same
    /// version surface as [`StoreError::AlreadyExists`].
    async fn create_secret(&self, params: &CreateSecretParams) -> Result<Secret, StoreError>;

    /// Get a live secret by id.
    async fn get_secret(&self, secret_id: &SecretId) -> Result<Secret, StoreError>;

    /// Row with the maximum version for `(project, name)`, or `None` if
    /// the name has never been used. Soft-deleted rows count here: the
    /// version sequence never restarts, which keeps the uniqueness
    /// constraint honest.
    async fn get_latest_secret(
        &self,
        project_id: &ProjectId,
        name: &str,
    ) -> Result<Option<Secret>, StoreError>;

    /// Partially update a live secret and return the new record.
    async fn update_secret(
        &self,
        secret_id: &SecretId,
        params: &UpdateSecretParams,
    ) -> Result<Secret, StoreError>;

    /// Set a live secret's soft-delete timestamp to now.
    async fn soft_delete_secret(&self, secret_id: &SecretId) -> Result<(), StoreError>;

    /// Hard-delete soft-deleted secrets older than `now - older_than`.
    async fn purge_secrets(&self, older_than: Duration) -> Result<u64, StoreError>;

    // ───────────────────────────── Audit ────────────────────────────────

    /// Append an audit entry. Never updates or deletes existing rows.
    async fn append_audit_entry(
        &self,
        params: &AuditEntryParams,
    ) -> Result<AuditEntryId, StoreError>;

    /// Most recent audit entries for a project, newest first.
    async fn list_audit_entries(
        &self,
        project_id: &ProjectId,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // Compile-time check that the trait stays object safe.
    struct NoopStore;

    #[async_trait::async_trait]
    impl Store for NoopStore {
        async fn create_project(
            &self,
            _params: &CreateProjectParams,
        ) -> Result<Project, StoreError> {
            Err(StoreError::Backend("noop".into()))
        }
        async fn get_project(&self, _project_id: &ProjectId) -> Result<Project, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn list_projects(&self, _owner: &ActorId) -> Result<Vec<Project>, StoreError> {
            Ok(vec![])
        }
        async fn update_project(
            &self,
            _project_id: &ProjectId,
            _params: &UpdateProjectParams,
        ) -> Result<Project, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn soft_delete_project(&self, _project_id: &ProjectId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn purge_projects(&self, _older_than: Duration) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn create_secret(&self, _params: &CreateSecretParams) -> Result<Secret, StoreError> {
            Err(StoreError::Backend("noop".into()))
        }
        async fn get_secret(&self, _secret_id: &SecretId) -> Result<Secret, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn get_latest_secret(
            &self,
            _project_id: &ProjectId,
            _name: &str,
        ) -> Result<Option<Secret>, StoreError> {
            Ok(None)
        }
        async fn update_secret(
            &self,
            _secret_id: &SecretId,
            _params: &UpdateSecretParams,
        ) -> Result<Secret, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn soft_delete_secret(&self, _secret_id: &SecretId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn purge_secrets(&self, _older_than: Duration) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn append_audit_entry(
            &self,
            _params: &AuditEntryParams,
        ) -> Result<AuditEntryId, StoreError> {
            Ok(AuditEntryId(Uuid::now_v7()))
        }
        async fn list_audit_entries(
            &self,
            _project_id: &ProjectId,
            _limit: i64,
        ) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn store_trait_is_object_safe() {
        let store: Box<dyn Store> = Box::new(NoopStore);
        assert!(store.list_projects(&ActorId(Uuid::now_v7())).await.is_ok());
        assert!(matches!(
            store.get_secret(&SecretId(Uuid::now_v7())).await,
            Err(StoreError::NotFound)
        ));
    }
}
