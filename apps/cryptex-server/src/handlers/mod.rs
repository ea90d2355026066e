//! Handler modules for the gRPC service implementation
//!
//! Organized by domain:
//! - projects: create, get, list, update, delete
//! - secrets: create, get, update, revoke, delete
//! - audit: per-project audit log queries
//!
//! The boundary's job is small and strict: resolve the actor from request
//! metadata, reject obviously malformed payloads before the engine runs,
//! and map engine failures to transport status codes.

pub mod audit;
pub mod projects;
pub mod secrets;

use tonic::{metadata::MetadataMap, Request, Response, Status};
use uuid::Uuid;

use crate::server::CryptexServer;
use cryptex_engine::EngineError;
use cryptex_proto::cryptex_service_server::CryptexService;
use cryptex_proto::*;
use cryptex_storage::{ActorId, ProjectId, SecretId};

/// Metadata key carrying the caller's identity, set by the upstream
/// gateway after authentication.
pub const ACTOR_METADATA_KEY: &str = "x-actor-id";

/// Resolve the already-authenticated actor from request metadata.
pub fn actor_from_metadata(metadata: &MetadataMap) -> Result<ActorId, Status> {
    let value = metadata
        .get(ACTOR_METADATA_KEY)
        .ok_or_else(|| Status::unauthenticated("missing x-actor-id metadata"))?;
    let s = value
        .to_str()
        .map_err(|_| Status::unauthenticated("invalid x-actor-id metadata"))?;
    let id = Uuid::try_parse(s).map_err(|_| Status::unauthenticated("invalid x-actor-id metadata"))?;
    Ok(ActorId(id))
}

pub fn parse_project_id(s: &str) -> Result<ProjectId, Status> {
    Uuid::try_parse(s)
        .map(ProjectId)
        .map_err(|_| Status::invalid_argument("invalid project id"))
}

pub fn parse_secret_id(s: &str) -> Result<SecretId, Status> {
    Uuid::try_parse(s)
        .map(SecretId)
        .map_err(|_| Status::invalid_argument("invalid secret id"))
}

/// Map engine failures to transport status codes.
///
/// NotFound stays generic on purpose: a non-owner probing for existence
/// learns nothing beyond "not found or not yours".
pub fn map_engine_error(e: EngineError) -> Status {
    match e {
        EngineError::Unauthorized => Status::permission_denied("not authorized for this project"),
        EngineError::NotFound => Status::not_found("not found"),
        EngineError::InvalidTtl => Status::invalid_argument("ttl must be at least 1 day"),
        EngineError::NothingToUpdate => {
            Status::invalid_argument("at least one field must be provided")
        }
        EngineError::RevokedImmutable => {
            Status::failed_precondition("secret is revoked and cannot be modified")
        }
        EngineError::Expired => Status::failed_precondition("secret has expired"),
        EngineError::Revoked => Status::failed_precondition("secret is revoked"),
        EngineError::Encrypt(e) => Status::internal(format!("Failed to seal secret: {}", e)),
        EngineError::Decrypt(e) => Status::internal(format!("Failed to open secret: {}", e)),
        EngineError::Store(e) => Status::internal(format!("Store error: {}", e)),
        EngineError::StoreUnavailable => Status::unavailable("store unavailable"),
    }
}

pub fn project_to_proto(p: cryptex_storage::Project) -> Project {
    Project {
        id: p.id.0.to_string(),
        name: p.name,
        description: p.description,
        created_at: p.created_at.timestamp(),
        updated_at: p.updated_at.timestamp(),
    }
}

pub fn secret_to_proto(s: cryptex_storage::Secret) -> SecretMeta {
    SecretMeta {
        id: s.id.0.to_string(),
        project_id: s.project_id.0.to_string(),
        name: s.name,
        version: s.version,
        ttl_days: s.ttl_days,
        revoked: s.revoked,
        created_at: s.created_at.timestamp(),
        updated_at: s.updated_at.timestamp(),
        expires_at: s.expires_at.map(|t| t.timestamp()),
    }
}

#[tonic::async_trait]
impl CryptexService for CryptexServer {
    // ───────────────────────────── Projects ─────────────────────────────

    async fn create_project(
        &self,
        request: Request<CreateProjectRequest>,
    ) -> Result<Response<ProjectResponse>, Status> {
        projects::create_project(self, request).await
    }

    async fn get_project(
        &self,
        request: Request<GetProjectRequest>,
    ) -> Result<Response<ProjectResponse>, Status> {
        projects::get_project(self, request).await
    }

    async fn list_projects(
        &self,
        request: Request<ListProjectsRequest>,
    ) -> Result<Response<ListProjectsResponse>, Status> {
        projects::list_projects(self, request).await
    }

    async fn update_project(
        &self,
        request: Request<UpdateProjectRequest>,
    ) -> Result<Response<ProjectResponse>, Status> {
        projects::update_project(self, request).await
    }

    async fn delete_project(
        &self,
        request: Request<DeleteProjectRequest>,
    ) -> Result<Response<DeleteProjectResponse>, Status> {
        projects::delete_project(self, request).await
    }

    // ───────────────────────────── Secrets ──────────────────────────────

    async fn create_secret(
        &self,
        request: Request<CreateSecretRequest>,
    ) -> Result<Response<SecretResponse>, Status> {
        secrets::create_secret(self, request).await
    }

    async fn get_secret(
        &self,
        request: Request<GetSecretRequest>,
    ) -> Result<Response<GetSecretResponse>, Status> {
        secrets::get_secret(self, request).await
    }

    async fn update_secret(
        &self,
        request: Request<UpdateSecretRequest>,
    ) -> Result<Response<SecretResponse>, Status> {
        secrets::update_secret(self, request).await
    }

    async fn revoke_secret(
        &self,
        request: Request<RevokeSecretRequest>,
    ) -> Result<Response<SecretResponse>, Status> {
        secrets::revoke_secret(self, request).await
    }

    async fn delete_secret(
        &self,
        request: Request<DeleteSecretRequest>,
    ) -> Result<Response<DeleteSecretResponse>, Status> {
        secrets::delete_secret(self, request).await
    }

    // ───────────────────────────── Audit ────────────────────────────────

    async fn list_audit_entries(
        &self,
        request: Request<ListAuditEntriesRequest>,
    ) -> Result<Response<ListAuditEntriesResponse>, Status> {
        audit::list_audit_entries(self, request).await
    }
}
