//! Audit log query handlers

use tonic::{Request, Response, Status};

use cryptex_proto::{AuditEntry, ListAuditEntriesRequest, ListAuditEntriesResponse};

use super::{actor_from_metadata, map_engine_error, parse_project_id};
use crate::server::CryptexServer;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

pub async fn list_audit_entries(
    server: &CryptexServer,
    request: Request<ListAuditEntriesRequest>,
) -> Result<Response<ListAuditEntriesResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let project_id = parse_project_id(&req.project_id)?;

    let limit = match req.limit {
        n if n <= 0 => DEFAULT_LIMIT,
        n => n.min(MAX_LIMIT),
    };

    let entries = server
        .engine
        .list_audit_entries(&actor, &project_id, limit)
        .await
        .map_err(map_engine_error)?
        .into_iter()
        .map(|e| AuditEntry {
            id: e.id.0.to_string(),
            actor: e.actor.map(|a| a.0.to_string()),
            project_id: e.project_id.map(|p| p.0.to_string()),
            secret_id: e.secret_id.map(|s| s.0.to_string()),
            action: e.action,
            message: e.message,
            created_at: e.created_at.timestamp(),
        })
        .collect();

    Ok(Response::new(ListAuditEntriesResponse { entries }))
}
