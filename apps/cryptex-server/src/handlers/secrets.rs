//! Secret handlers: create, get, update, revoke, delete
//!
//! The decrypted value appears only in the GetSecret response body; it is
//! never logged and never included in metadata responses.

use tonic::{Request, Response, Status};

use cryptex_proto::{
    CreateSecretRequest, DeleteSecretRequest, DeleteSecretResponse, GetSecretRequest,
    GetSecretResponse, RevokeSecretRequest, SecretResponse, UpdateSecretRequest,
};

use super::{
    actor_from_metadata, map_engine_error, parse_project_id, parse_secret_id, secret_to_proto,
};
use crate::server::CryptexServer;

pub async fn create_secret(
    server: &CryptexServer,
    request: Request<CreateSecretRequest>,
) -> Result<Response<SecretResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let project_id = parse_project_id(&req.project_id)?;

    if req.name.trim().is_empty() {
        return Err(Status::invalid_argument("secret name must not be empty"));
    }
    if req.value.is_empty() {
        return Err(Status::invalid_argument("secret value must not be empty"));
    }

    let secret = server
        .engine
        .create_secret(&actor, &project_id, &req.name, &req.value, req.ttl_days)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(SecretResponse {
        secret: Some(secret_to_proto(secret)),
    }))
}

pub async fn get_secret(
    server: &CryptexServer,
    request: Request<GetSecretRequest>,
) -> Result<Response<GetSecretResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let secret_id = parse_secret_id(&req.secret_id)?;

    let (secret, plaintext) = server
        .engine
        .read_secret(&actor, &secret_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(GetSecretResponse {
        secret: Some(secret_to_proto(secret)),
        value: plaintext.to_vec(),
    }))
}

pub async fn update_secret(
    server: &CryptexServer,
    request: Request<UpdateSecretRequest>,
) -> Result<Response<SecretResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let secret_id = parse_secret_id(&req.secret_id)?;

    if req.value.is_none() && req.ttl_days.is_none() {
        return Err(Status::invalid_argument(
            "at least one field must be provided",
        ));
    }
    if matches!(&req.value, Some(v) if v.is_empty()) {
        return Err(Status::invalid_argument("secret value must not be empty"));
    }

    let secret = server
        .engine
        .update_secret(&actor, &secret_id, req.value.as_deref(), req.ttl_days)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(SecretResponse {
        secret: Some(secret_to_proto(secret)),
    }))
}

pub async fn revoke_secret(
    server: &CryptexServer,
    request: Request<RevokeSecretRequest>,
) -> Result<Response<SecretResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let secret_id = parse_secret_id(&req.secret_id)?;

    let secret = server
        .engine
        .revoke_secret(&actor, &secret_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(SecretResponse {
        secret: Some(secret_to_proto(secret)),
    }))
}

pub async fn delete_secret(
    server: &CryptexServer,
    request: Request<DeleteSecretRequest>,
) -> Result<Response<DeleteSecretResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let secret_id = parse_secret_id(&req.secret_id)?;

    server
        .engine
        .delete_secret(&actor, &secret_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(DeleteSecretResponse {}))
}
