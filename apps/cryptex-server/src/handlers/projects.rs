//! Project handlers: create, get, list, update, delete

use tonic::{Request, Response, Status};

use cryptex_proto::{
    CreateProjectRequest, DeleteProjectRequest, DeleteProjectResponse, GetProjectRequest,
    ListProjectsRequest, ListProjectsResponse, ProjectResponse, UpdateProjectRequest,
};

use super::{actor_from_metadata, map_engine_error, parse_project_id, project_to_proto};
use crate::server::CryptexServer;

pub async fn create_project(
    server: &CryptexServer,
    request: Request<CreateProjectRequest>,
) -> Result<Response<ProjectResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();

    if req.name.trim().is_empty() {
        return Err(Status::invalid_argument("project name must not be empty"));
    }

    let project = server
        .engine
        .create_project(&actor, &req.name, req.description)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(ProjectResponse {
        project: Some(project_to_proto(project)),
    }))
}

pub async fn get_project(
    server: &CryptexServer,
    request: Request<GetProjectRequest>,
) -> Result<Response<ProjectResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let project_id = parse_project_id(&req.project_id)?;

    let project = server
        .engine
        .get_project(&actor, &project_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(ProjectResponse {
        project: Some(project_to_proto(project)),
    }))
}

pub async fn list_projects(
    server: &CryptexServer,
    request: Request<ListProjectsRequest>,
) -> Result<Response<ListProjectsResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;

    let projects = server
        .engine
        .list_projects(&actor)
        .await
        .map_err(map_engine_error)?
        .into_iter()
        .map(project_to_proto)
        .collect();

    Ok(Response::new(ListProjectsResponse { projects }))
}

pub async fn update_project(
    server: &CryptexServer,
    request: Request<UpdateProjectRequest>,
) -> Result<Response<ProjectResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let project_id = parse_project_id(&req.project_id)?;

    if req.name.is_none() && req.description.is_none() {
        return Err(Status::invalid_argument(
            "at least one field must be provided",
        ));
    }
    if matches!(&req.name, Some(n) if n.trim().is_empty()) {
        return Err(Status::invalid_argument("project name must not be empty"));
    }

    let project = server
        .engine
        .update_project(&actor, &project_id, req.name, req.description)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(ProjectResponse {
        project: Some(project_to_proto(project)),
    }))
}

pub async fn delete_project(
    server: &CryptexServer,
    request: Request<DeleteProjectRequest>,
) -> Result<Response<DeleteProjectResponse>, Status> {
    let actor = actor_from_metadata(request.metadata())?;
    let req = request.into_inner();
    let project_id = parse_project_id(&req.project_id)?;

    server
        .engine
        .delete_project(&actor, &project_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Response::new(DeleteProjectResponse {}))
}
