use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::info;

use super::{
    ApiError, api_error,
    types::{
        AskCorpusRequest, CorpusListParams, CreateCorpusRequest, DocumentIdsRequest,
        StartImportRequest,
    },
};
use crate::{
    AppState,
    model::{
        Annotation, Corpus, CorpusAction, CorpusPatch, CorpusQuery, CorpusStats, ImportJob,
        LabelSet,
    },
    service::{CorpusActionInput, CorpusMutations, CorpusQueries},
};

pub fn corpus_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/corpuses", get(list_corpuses).post(create_corpus))
        .route(
            "/corpuses/{id}",
            get(get_corpus).patch(update_corpus).delete(delete_corpus),
        )
        .route("/corpuses/{id}/stats", get(corpus_stats))
        .route("/corpuses/{id}/documents/remove", post(remove_documents))
        .route("/corpuses/{id}/actions", get(list_actions))
        .route("/corpus-actions", post(create_action))
        .route("/corpuses/{id}/queries", get(list_queries).post(ask_corpus))
        .route("/corpus-queries/{id}", get(get_query))
        .route("/corpus-queries/{id}/sources", get(query_sources))
        .route("/label-sets/{id}", get(get_label_set))
        .route("/imports", post(start_import))
        .route("/imports/{id}", get(get_import))
}

async fn list_corpuses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CorpusListParams>,
) -> Result<Json<Vec<Corpus>>, ApiError> {
    let corpuses = state
        .service
        .corpuses(params.text.as_deref())
        .await
        .map_err(api_error("list corpuses"))?;
    Ok(Json(corpuses))
}

async fn create_corpus(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCorpusRequest>,
) -> Result<(StatusCode, Json<Corpus>), ApiError> {
    let corpus = state
        .service
        .create_corpus(request.corpus, &request.actor)
        .await
        .map_err(api_error("create corpus"))?;
    Ok((StatusCode::CREATED, Json(corpus)))
}

async fn get_corpus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Corpus>, ApiError> {
    let corpus = state
        .service
        .corpus(&id)
        .await
        .map_err(api_error("load corpus"))?;
    Ok(Json(corpus))
}

async fn update_corpus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<CorpusPatch>,
) -> Result<Json<Corpus>, ApiError> {
    let corpus = state
        .service
        .update_corpus(&id, patch)
        .await
        .map_err(api_error("update corpus"))?;
    Ok(Json(corpus))
}

async fn delete_corpus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_corpus(&id)
        .await
        .map_err(api_error("delete corpus"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn corpus_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CorpusStats>, ApiError> {
    let stats = state
        .service
        .corpus_stats(&id)
        .await
        .map_err(api_error("load corpus stats"))?;
    Ok(Json(stats))
}

async fn remove_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DocumentIdsRequest>,
) -> Result<Json<Corpus>, ApiError> {
    let corpus = state
        .service
        .remove_documents_from_corpus(&id, &request.document_ids)
        .await
        .map_err(api_error("remove documents from corpus"))?;
    Ok(Json(corpus))
}

async fn list_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CorpusAction>>, ApiError> {
    let actions = state
        .service
        .corpus_actions(&id)
        .await
        .map_err(api_error("list corpus actions"))?;
    Ok(Json(actions))
}

async fn create_action(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CorpusActionInput>,
) -> Result<(StatusCode, Json<CorpusAction>), ApiError> {
    let action = state
        .service
        .create_corpus_action(input)
        .await
        .map_err(api_error("create corpus action"))?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn list_queries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CorpusQuery>>, ApiError> {
    let queries = state
        .service
        .corpus_queries(&id)
        .await
        .map_err(api_error("list corpus queries"))?;
    Ok(Json(queries))
}

async fn ask_corpus(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AskCorpusRequest>,
) -> Result<(StatusCode, Json<CorpusQuery>), ApiError> {
    let query = state
        .service
        .create_corpus_query(&id, &request.query, &request.actor)
        .await
        .map_err(api_error("create corpus query"))?;
    Ok((StatusCode::CREATED, Json(query)))
}

async fn get_query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CorpusQuery>, ApiError> {
    let query = state
        .service
        .corpus_query(&id)
        .await
        .map_err(api_error("load corpus query"))?;
    Ok(Json(query))
}

async fn query_sources(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Annotation>>, ApiError> {
    let sources = state
        .service
        .corpus_query_sources(&id)
        .await
        .map_err(api_error("load corpus query sources"))?;
    Ok(Json(sources))
}

async fn get_label_set(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LabelSet>, ApiError> {
    let label_set = state
        .service
        .label_set(&id)
        .await
        .map_err(api_error("load label set"))?;
    Ok(Json(label_set))
}

async fn start_import(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartImportRequest>,
) -> Result<(StatusCode, Json<ImportJob>), ApiError> {
    let job = state
        .service
        .start_corpus_import(request.upload, &request.actor)
        .await
        .map_err(api_error("start import"))?;
    info!(job_id = %job.id, "import accepted");
    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn get_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ImportJob>, ApiError> {
    let job = state
        .service
        .import_job(&id)
        .await
        .map_err(api_error("load import job"))?;
    Ok(Json(job))
}
