use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};

use super::{
    ApiError, api_error,
    types::{ActorRequest, EditCellRequest},
};
use crate::{
    AppState,
    model::{Column, Datacell, Extract},
    service::{CorpusMutations, CorpusQueries},
};

pub fn extract_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/extracts/{id}", get(get_extract))
        .route("/extracts/{id}/columns", get(list_columns))
        .route("/extracts/{id}/cells", get(list_cells))
        .route("/datacells/{id}", patch(edit_datacell))
        .route("/datacells/{id}/approve", post(approve_datacell))
        .route("/datacells/{id}/reject", post(reject_datacell))
}

async fn get_extract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Extract>, ApiError> {
    let extract = state
        .service
        .extract(&id)
        .await
        .map_err(api_error("load extract"))?;
    Ok(Json(extract))
}

async fn list_columns(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Column>>, ApiError> {
    let columns = state
        .service
        .extract_columns(&id)
        .await
        .map_err(api_error("list extract columns"))?;
    Ok(Json(columns))
}

async fn list_cells(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Datacell>>, ApiError> {
    let cells = state
        .service
        .extract_cells(&id)
        .await
        .map_err(api_error("list extract cells"))?;
    Ok(Json(cells))
}

async fn edit_datacell(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EditCellRequest>,
) -> Result<Json<Datacell>, ApiError> {
    let cell = state
        .service
        .edit_datacell(&id, request.corrected_data)
        .await
        .map_err(api_error("edit datacell"))?;
    Ok(Json(cell))
}

async fn approve_datacell(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<Datacell>, ApiError> {
    let cell = state
        .service
        .approve_datacell(&id, &request.actor)
        .await
        .map_err(api_error("approve datacell"))?;
    Ok(Json(cell))
}

async fn reject_datacell(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<Datacell>, ApiError> {
    let cell = state
        .service
        .reject_datacell(&id, &request.actor)
        .await
        .map_err(api_error("reject datacell"))?;
    Ok(Json(cell))
}
