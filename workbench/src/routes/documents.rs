use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};

use super::{
    ApiError, api_error,
    types::{AnnotationIdsRequest, AnnotationParams, SearchParams},
};
use crate::{
    AppState,
    model::{Annotation, Document, Relation},
    service::{AnalysisFilter, AnnotationQuery, CorpusMutations, CorpusQueries, DocumentFilter},
};

pub fn document_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/documents/{id}/annotations", get(list_annotations))
        .route("/documents/{id}/relations", get(list_relations))
        .route("/documents/{id}/search", get(search_annotations))
        .route("/annotations/{id}", delete(delete_annotation))
        .route("/relations/{id}", delete(delete_relation))
        .route(
            "/relations/{id}/remove-annotations",
            post(remove_annotations_from_relation),
        )
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = state
        .service
        .documents(&filter)
        .await
        .map_err(api_error("list documents"))?;
    Ok(Json(documents))
}

async fn list_annotations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<AnnotationParams>,
) -> Result<Json<Vec<Annotation>>, ApiError> {
    let query = AnnotationQuery {
        document_id: id,
        corpus_id: params.corpus_id,
        analysis: AnalysisFilter::from_param(params.analysis.as_deref()),
        structural: params.structural,
    };
    let annotations = state
        .service
        .annotations(&query)
        .await
        .map_err(api_error("list annotations"))?;
    Ok(Json(annotations))
}

async fn list_relations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<AnnotationParams>,
) -> Result<Json<Vec<Relation>>, ApiError> {
    let analysis = AnalysisFilter::from_param(params.analysis.as_deref());
    let relations = state
        .service
        .relations(&id, params.corpus_id.as_deref(), &analysis)
        .await
        .map_err(api_error("list relations"))?;
    Ok(Json(relations))
}

async fn search_annotations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Annotation>>, ApiError> {
    let hits = state
        .service
        .search_annotations(&id, params.corpus_id.as_deref(), &params.term)
        .await
        .map_err(api_error("search annotations"))?;
    Ok(Json(hits))
}

async fn delete_annotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_annotation(&id)
        .await
        .map_err(api_error("delete annotation"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_relation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_relation(&id)
        .await
        .map_err(api_error("delete relation"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Responds with `null` when the relation lost its last member.
async fn remove_annotations_from_relation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AnnotationIdsRequest>,
) -> Result<Json<Option<Relation>>, ApiError> {
    let relation = state
        .service
        .remove_annotations_from_relation(&id, &request.annotation_ids)
        .await
        .map_err(api_error("update relation"))?;
    Ok(Json(relation))
}
