//! SQLite-backed [`Store`] implementation.
//!
//! UUIDs are bound as strings and timestamps as epoch seconds. The
//! `(project_id, name, version)` unique index is what makes concurrent
//! secret creation safe: a lost race surfaces as `AlreadyExists` and the
//! caller retries with a fresh latest version.

use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use cryptex_storage::{
    ActorId, AuditEntry, AuditEntryId, AuditEntryParams, CreateProjectParams, CreateSecretParams,
    Project, ProjectId, Secret, SecretId, Store, StoreError, UpdateProjectParams,
    UpdateSecretParams,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.cryptex/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".cryptex");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

// ───────────────────────────── Row mapping ─────────────────────────────

type ProjectRow = (String, String, String, Option<String>, i64, i64, Option<i64>);

type SecretRow = (
    String,
    String,
    String,
    String,
    i64,
    Option<i64>,
    i64,
    i64,
    i64,
    Option<i64>,
    Option<i64>,
);

type AuditRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    i64,
);

const PROJECT_COLS: &str = "id,owner,name,description,created_at,updated_at,deleted_at";
const SECRET_COLS: &str =
    "id,project_id,name,ciphertext,version,ttl_days,revoked,created_at,updated_at,expires_at,deleted_at";
const AUDIT_COLS: &str = "id,actor,project_id,secret_id,action,message,created_at";

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn ts(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("bad timestamp {secs}")))
}

fn opt_ts(secs: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    secs.map(ts).transpose()
}

fn project_from_row(row: ProjectRow) -> Result<Project, StoreError> {
    let (id, owner, name, description, created_at, updated_at, deleted_at) = row;
    Ok(Project {
        id: ProjectId(parse_uuid(&id)?),
        owner: ActorId(parse_uuid(&owner)?),
        name,
        description,
        created_at: ts(created_at)?,
        updated_at: ts(updated_at)?,
        deleted_at: opt_ts(deleted_at)?,
    })
}

fn secret_from_row(row: SecretRow) -> Result<Secret, StoreError> {
    let (
        id,
        project_id,
        name,
        ciphertext,
        version,
        ttl_days,
        revoked,
        created_at,
        updated_at,
        expires_at,
        deleted_at,
    ) = row;
    Ok(Secret {
        id: SecretId(parse_uuid(&id)?),
        project_id: ProjectId(parse_uuid(&project_id)?),
        name,
        ciphertext,
        version,
        ttl_days,
        revoked: revoked != 0,
        created_at: ts(created_at)?,
        updated_at: ts(updated_at)?,
        expires_at: opt_ts(expires_at)?,
        deleted_at: opt_ts(deleted_at)?,
    })
}

fn audit_from_row(row: AuditRow) -> Result<AuditEntry, StoreError> {
    let (id, actor, project_id, secret_id, action, message, created_at) = row;
    Ok(AuditEntry {
        id: AuditEntryId(parse_uuid(&id)?),
        actor: actor.as_deref().map(parse_uuid).transpose()?.map(ActorId),
        project_id: project_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(ProjectId),
        secret_id: secret_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(SecretId),
        action,
        message,
        created_at: ts(created_at)?,
    })
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Projects ─────────────────────────────

    async fn create_project(&self, params: &CreateProjectParams) -> Result<Project, StoreError> {
        let id = ProjectId(Uuid::now_v7());
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO projects(id,owner,name,description,created_at,updated_at)
             VALUES(?,?,?,?,?,?)",
        )
        .bind(id.0.to_string())
        .bind(params.owner.0.to_string())
        .bind(&params.name)
        .bind(&params.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        self.get_project(&id).await
    }

    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLS} FROM projects WHERE id=? AND deleted_at IS NULL"
        ))
        .bind(project_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => project_from_row(row),
        }
    }

    async fn list_projects(&self, owner: &ActorId) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLS} FROM projects
             WHERE owner=? AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.into_iter().map(project_from_row).collect()
    }

    async fn update_project(
        &self,
        project_id: &ProjectId,
        params: &UpdateProjectParams,
    ) -> Result<Project, StoreError> {
        let current = self.get_project(project_id).await?;
        let name = params.name.clone().unwrap_or(current.name);
        let description = params.description.clone().or(current.description);

        let res = sqlx::query(
            "UPDATE projects SET name=?,description=?,updated_at=?
             WHERE id=? AND deleted_at IS NULL",
        )
        .bind(&name)
        .bind(&description)
        .bind(Utc::now().timestamp())
        .bind(project_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_project(project_id).await
    }

    async fn soft_delete_project(&self, project_id: &ProjectId) -> Result<(), StoreError> {
        sqlx::query("UPDATE projects SET deleted_at=? WHERE id=? AND deleted_at IS NULL")
            .bind(Utc::now().timestamp())
            .bind(project_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn purge_projects(&self, older_than: Duration) -> Result<u64, StoreError> {
        let threshold = (Utc::now() - older_than).timestamp();
        let res = sqlx::query("DELETE FROM projects WHERE deleted_at IS NOT NULL AND deleted_at < ?")
            .bind(threshold)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(res.rows_affected())
    }

    // ───────────────────────────── Secrets ──────────────────────────────

    async fn create_secret(&self, params: &CreateSecretParams) -> Result<Secret, StoreError> {
        let id = SecretId(Uuid::now_v7());
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO secrets(id,project_id,name,ciphertext,version,ttl_days,revoked,created_at,updated_at,expires_at)
             VALUES(?,?,?,?,?,?,0,?,?,?)",
        )
        .bind(id.0.to_string())
        .bind(params.project_id.0.to_string())
        .bind(&params.name)
        .bind(&params.ciphertext)
        .bind(params.version)
        .bind(params.ttl_days)
        .bind(now)
        .bind(now)
        .bind(params.expires_at.map(|t| t.timestamp()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let s = e.to_string();
            if s.contains("UNIQUE") {
                StoreError::AlreadyExists
            } else {
                StoreError::Backend(s)
            }
        })?;

        self.get_secret(&id).await
    }

    async fn get_secret(&self, secret_id: &SecretId) -> Result<Secret, StoreError> {
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {SECRET_COLS} FROM secrets WHERE id=? AND deleted_at IS NULL"
        ))
        .bind(secret_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => secret_from_row(row),
        }
    }

    async fn get_latest_secret(
        &self,
        project_id: &ProjectId,
        name: &str,
    ) -> Result<Option<Secret>, StoreError> {
        // Soft-deleted rows are included on purpose: the version sequence
        // for a name never restarts while old rows still exist.
        let row = sqlx::query_as::<_, SecretRow>(&format!(
            "SELECT {SECRET_COLS} FROM secrets
             WHERE project_id=? AND name=?
             ORDER BY version DESC LIMIT 1"
        ))
        .bind(project_id.0.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        row.map(secret_from_row).transpose()
    }

    async fn update_secret(
        &self,
        secret_id: &SecretId,
        params: &UpdateSecretParams,
    ) -> Result<Secret, StoreError> {
        let current = self.get_secret(secret_id).await?;
        let ciphertext = params.ciphertext.clone().unwrap_or(current.ciphertext);
        let version = params.version.unwrap_or(current.version);
        let ttl_days = params.ttl_days.or(current.ttl_days);
        let expires_at = params.expires_at.or(current.expires_at);
        let revoked = params.revoked.unwrap_or(current.revoked);

        let res = sqlx::query(
            "UPDATE secrets SET ciphertext=?,version=?,ttl_days=?,expires_at=?,revoked=?,updated_at=?
             WHERE id=? AND deleted_at IS NULL",
        )
        .bind(&ciphertext)
        .bind(version)
        .bind(ttl_days)
        .bind(expires_at.map(|t| t.timestamp()))
        .bind(revoked as i64)
        .bind(Utc::now().timestamp())
        .bind(secret_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_secret(secret_id).await
    }

    async fn soft_delete_secret(&self, secret_id: &SecretId) -> Result<(), StoreError> {
        sqlx::query("UPDATE secrets SET deleted_at=? WHERE id=? AND deleted_at IS NULL")
            .bind(Utc::now().timestamp())
            .bind(secret_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn purge_secrets(&self, older_than: Duration) -> Result<u64, StoreError> {
        let threshold = (Utc::now() - older_than).timestamp();
        let res = sqlx::query("DELETE FROM secrets WHERE deleted_at IS NOT NULL AND deleted_at < ?")
            .bind(threshold)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(res.rows_affected())
    }

    // ───────────────────────────── Audit ────────────────────────────────

    async fn append_audit_entry(
        &self,
        params: &AuditEntryParams,
    ) -> Result<AuditEntryId, StoreError> {
        let id = AuditEntryId(Uuid::now_v7());
        sqlx::query(
            "INSERT INTO audit_entries(id,actor,project_id,secret_id,action,message,created_at)
             VALUES(?,?,?,?,?,?,?)",
        )
        .bind(id.0.to_string())
        .bind(params.actor.map(|a| a.0.to_string()))
        .bind(params.project_id.map(|p| p.0.to_string()))
        .bind(params.secret_id.map(|s| s.0.to_string()))
        .bind(&params.action)
        .bind(&params.message)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(id)
    }

    async fn list_audit_entries(
        &self,
        project_id: &ProjectId,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {AUDIT_COLS} FROM audit_entries
             WHERE project_id=?
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(project_id.0.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.into_iter().map(audit_from_row).collect()
    }
}
