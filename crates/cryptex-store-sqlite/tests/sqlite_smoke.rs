use chrono::{Duration, Utc};
use cryptex_storage::{
    ActorId, AuditEntryParams, CreateProjectParams, CreateSecretParams, Store, StoreError,
    UpdateProjectParams, UpdateSecretParams,
};
use cryptex_store_sqlite::SqliteStore;
use uuid::Uuid;

fn project_params(owner: ActorId, name: &str) -> CreateProjectParams {
    CreateProjectParams {
        owner,
        name: name.to_string(),
        description: None,
    }
}

fn secret_params(
    project_id: cryptex_storage::ProjectId,
    name: &str,
    version: i64,
) -> CreateSecretParams {
    CreateSecretParams {
        project_id,
        name: name.to_string(),
        ciphertext: format!("blob-v{version}"),
        version,
        ttl_days: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn project_crud_happy_path() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());

    let p = s.create_project(&project_params(owner, "infra")).await.unwrap();
    assert_eq!(p.name, "infra");
    assert_eq!(p.owner, owner);
    assert!(p.deleted_at.is_none());

    let got = s.get_project(&p.id).await.unwrap();
    assert_eq!(got.id, p.id);

    let updated = s
        .update_project(
            &p.id,
            &UpdateProjectParams {
                name: Some("infra-prod".into()),
                description: Some("production credentials".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "infra-prod");
    assert_eq!(updated.description.as_deref(), Some("production credentials"));

    // partial update leaves the other field alone
    let updated = s
        .update_project(&p.id, &UpdateProjectParams::default())
        .await
        .unwrap();
    assert_eq!(updated.name, "infra-prod");
    assert_eq!(updated.description.as_deref(), Some("production credentials"));
}

#[tokio::test]
async fn list_projects_scopes_by_owner_and_liveness() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let alice = ActorId(Uuid::now_v7());
    let bob = ActorId(Uuid::now_v7());

    let p1 = s.create_project(&project_params(alice, "one")).await.unwrap();
    let _p2 = s.create_project(&project_params(alice, "two")).await.unwrap();
    let _p3 = s.create_project(&project_params(bob, "theirs")).await.unwrap();

    assert_eq!(s.list_projects(&alice).await.unwrap().len(), 2);
    assert_eq!(s.list_projects(&bob).await.unwrap().len(), 1);

    s.soft_delete_project(&p1.id).await.unwrap();
    let remaining = s.list_projects(&alice).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "two");

    assert!(matches!(
        s.get_project(&p1.id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn secret_versions_and_latest() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();

    assert!(s.get_latest_secret(&p.id, "db-pass").await.unwrap().is_none());

    let v1 = s.create_secret(&secret_params(p.id, "db-pass", 1)).await.unwrap();
    assert_eq!(v1.version, 1);
    assert!(!v1.revoked);

    let v2 = s.create_secret(&secret_params(p.id, "db-pass", 2)).await.unwrap();
    let latest = s.get_latest_secret(&p.id, "db-pass").await.unwrap().unwrap();
    assert_eq!(latest.id, v2.id);
    assert_eq!(latest.version, 2);

    // same name under a different project is independent
    let other = s.create_project(&project_params(owner, "q")).await.unwrap();
    assert!(s.get_latest_secret(&other.id, "db-pass").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_version_is_rejected() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();

    s.create_secret(&secret_params(p.id, "k", 1)).await.unwrap();
    assert!(matches!(
        s.create_secret(&secret_params(p.id, "k", 1)).await,
        Err(StoreError::AlreadyExists)
    ));
}

#[tokio::test]
async fn latest_version_survives_soft_delete() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();

    let v1 = s.create_secret(&secret_params(p.id, "k", 1)).await.unwrap();
    s.soft_delete_secret(&v1.id).await.unwrap();

    assert!(matches!(
        s.get_secret(&v1.id).await,
        Err(StoreError::NotFound)
    ));

    // deleted rows still anchor the version sequence
    let latest = s.get_latest_secret(&p.id, "k").await.unwrap().unwrap();
    assert_eq!(latest.version, 1);
    assert!(latest.deleted_at.is_some());
}

#[tokio::test]
async fn update_secret_partial_fields() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();
    let sec = s.create_secret(&secret_params(p.id, "k", 1)).await.unwrap();

    let expires = Utc::now() + Duration::days(3);
    let updated = s
        .update_secret(
            &sec.id,
            &UpdateSecretParams {
                ttl_days: Some(3),
                expires_at: Some(expires),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 1, "ttl-only update keeps version");
    assert_eq!(updated.ttl_days, Some(3));
    assert_eq!(
        updated.expires_at.map(|t| t.timestamp()),
        Some(expires.timestamp())
    );
    assert_eq!(updated.ciphertext, "blob-v1");

    let updated = s
        .update_secret(
            &sec.id,
            &UpdateSecretParams {
                ciphertext: Some("blob-v2".into()),
                version: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.ciphertext, "blob-v2");
    assert_eq!(updated.ttl_days, Some(3), "ttl untouched by value update");

    let revoked = s
        .update_secret(
            &sec.id,
            &UpdateSecretParams {
                revoked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(revoked.revoked);
}

#[tokio::test]
async fn update_missing_secret_is_not_found() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    assert!(matches!(
        s.update_secret(
            &cryptex_storage::SecretId(Uuid::now_v7()),
            &UpdateSecretParams::default()
        )
        .await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn purge_respects_retention_threshold() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();
    let sec = s.create_secret(&secret_params(p.id, "k", 1)).await.unwrap();

    s.soft_delete_secret(&sec.id).await.unwrap();
    s.soft_delete_project(&p.id).await.unwrap();

    // deleted moments ago: a 7-day window removes nothing
    assert_eq!(s.purge_secrets(Duration::days(7)).await.unwrap(), 0);
    assert_eq!(s.purge_projects(Duration::days(7)).await.unwrap(), 0);
    let survivor = s.get_latest_secret(&p.id, "k").await.unwrap();
    assert!(survivor.is_some());

    // zero-length window removes everything soft-deleted
    assert_eq!(s.purge_secrets(Duration::seconds(-1)).await.unwrap(), 1);
    assert_eq!(s.purge_projects(Duration::seconds(-1)).await.unwrap(), 1);
    assert!(s.get_latest_secret(&p.id, "k").await.unwrap().is_none());
}

#[tokio::test]
async fn purge_leaves_live_rows_alone() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();
    let sec = s.create_secret(&secret_params(p.id, "k", 1)).await.unwrap();

    assert_eq!(s.purge_secrets(Duration::seconds(-1)).await.unwrap(), 0);
    assert_eq!(s.purge_projects(Duration::seconds(-1)).await.unwrap(), 0);
    assert!(s.get_secret(&sec.id).await.is_ok());
    assert!(s.get_project(&p.id).await.is_ok());
}

#[tokio::test]
async fn audit_entries_append_and_list() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let owner = ActorId(Uuid::now_v7());
    let p = s.create_project(&project_params(owner, "p")).await.unwrap();

    for i in 0..3 {
        s.append_audit_entry(&AuditEntryParams {
            actor: Some(owner),
            project_id: Some(p.id),
            secret_id: None,
            action: "secret.create".to_string(),
            message: format!("Secret created with version {}", i + 1),
        })
        .await
        .unwrap();
    }
    // system-originated entry without an actor
    s.append_audit_entry(&AuditEntryParams {
        actor: None,
        project_id: Some(p.id),
        secret_id: None,
        action: "project.delete".to_string(),
        message: "Project deleted successfully".to_string(),
    })
    .await
    .unwrap();

    let entries = s.list_audit_entries(&p.id, 10).await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].action, "project.delete");
    assert!(entries[0].actor.is_none());

    let limited = s.list_audit_entries(&p.id, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn on_disk_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("t.db").display());

    let owner = ActorId(Uuid::now_v7());
    let project_id = {
        let s = SqliteStore::open(&url).await.unwrap();
        s.create_project(&project_params(owner, "persisted"))
            .await
            .unwrap()
            .id
    };

    let s = SqliteStore::open(&url).await.unwrap();
    let p = s.get_project(&project_id).await.unwrap();
    assert_eq!(p.name, "persisted");
}
