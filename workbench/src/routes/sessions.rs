use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    sync::RwLock,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use ts_rs::TS;

use super::{
    ApiError,
    types::{OpenSessionRequest, ScrollResponse, SessionResponse},
};
use crate::{
    AppState,
    model::{CorpusInput, CorpusPatch, generate_id},
    service::{CorpusBackend, DocumentFilter},
    state::{Notice, Viewport, Workbench, WorkbenchState},
};

/// Remembers scroll requests until the front end collects them.
#[derive(Default)]
pub struct RecordingViewport {
    requested: Mutex<Vec<String>>,
}

impl RecordingViewport {
    pub fn drain(&self) -> Vec<String> {
        match self.requested.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Viewport for RecordingViewport {
    fn scroll_into_view(&self, annotation_id: &str) {
        match self.requested.lock() {
            Ok(mut guard) => guard.push(annotation_id.to_string()),
            Err(poisoned) => poisoned.into_inner().push(annotation_id.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct Session {
    pub workbench: Workbench,
    pub viewport: Arc<RecordingViewport>,
}

struct SessionEntry {
    session: Session,
    last_seen: Instant,
}

/// Server-hosted workbenches keyed by session id.
///
/// Closing a session tears its workbench down but keeps the entry, so late
/// commands see a conflict instead of an unknown id. [`sweep`](Self::sweep)
/// forgets entries nobody touched within the idle timeout.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub async fn open(
        &self,
        backend: Arc<dyn CorpusBackend>,
        viewer: &str,
        search_debounce: Duration,
    ) -> (String, Session) {
        let viewport = Arc::new(RecordingViewport::default());
        let workbench = Workbench::new(backend, viewport.clone(), viewer)
            .with_search_debounce(search_debounce);
        workbench.initialize();

        let session = Session {
            workbench,
            viewport,
        };
        let id = generate_id("session");
        self.sessions.write().await.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        (id, session)
    }

    /// Looks a session up and counts the lookup as activity while it is live.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        if !entry.session.workbench.is_torn_down() {
            entry.last_seen = Instant::now();
        }
        Some(entry.session.clone())
    }

    /// Tears the session down. Returns false for unknown or already closed ids.
    pub async fn close(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !entry.session.workbench.is_torn_down() => {
                entry.session.workbench.teardown();
                entry.last_seen = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Drops sessions idle for at least `idle`, tearing down the live ones.
    pub async fn sweep(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            if entry.last_seen.elapsed() < idle {
                return true;
            }
            if !entry.session.workbench.is_torn_down() {
                entry.session.workbench.teardown();
                info!(session_id = %id, "idle session expired");
            }
            false
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Sweeps the session registry every `every` until `shutdown` fires.
pub async fn run_sweeper(
    state: Arc<AppState>,
    idle: Duration,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let expired = state.sessions.sweep(idle).await;
                if expired > 0 {
                    debug!(expired, "swept idle sessions");
                }
            }
        }
    }
}

/// One workbench operation, tagged by `op`.
#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[serde(tag = "op", rename_all = "snake_case")]
#[ts(export)]
pub enum SessionCommand {
    RefreshCorpuses {
        #[serde(default)]
        text: Option<String>,
    },
    OpenCorpus {
        corpus_id: String,
    },
    CloseCorpus,
    CreateCorpus {
        corpus: CorpusInput,
    },
    UpdateCorpus {
        corpus_id: String,
        patch: CorpusPatch,
    },
    DeleteCorpus {
        corpus_id: String,
    },
    RemoveDocuments {
        document_ids: Vec<String>,
    },
    RefreshImport {
        job_id: String,
    },
    RefreshQueries,
    AskCorpus {
        query: String,
    },
    SetDocumentFilter {
        filter: DocumentFilter,
    },
    RefreshDocuments,
    OpenDocument {
        document_id: String,
    },
    CloseDocument,
    ToggleAnnotation {
        annotation_id: String,
    },
    ToggleRelation {
        relation_id: String,
    },
    ClearSelection,
    RegisterElement {
        annotation_id: String,
    },
    UnregisterElement {
        annotation_id: String,
    },
    SetShowStructural {
        show: bool,
    },
    SetLabelFilter {
        label_ids: Vec<String>,
    },
    SetSearchTerm {
        term: String,
    },
    RunSearch,
    SetActivePane {
        index: usize,
    },
    OpenExtract {
        extract_id: String,
    },
    RefreshExtract,
    CloseExtract,
    EditCell {
        cell_id: String,
        corrected_data: Value,
    },
    ApproveCell {
        cell_id: String,
    },
    RejectCell {
        cell_id: String,
    },
    DeleteAnnotation {
        annotation_id: String,
    },
    DeleteRelation {
        relation_id: String,
    },
    RemoveAnnotationFromRelation {
        relation_id: String,
        annotation_id: String,
    },
}

impl SessionCommand {
    pub async fn apply(self, workbench: &Workbench) -> Result<()> {
        match self {
            SessionCommand::RefreshCorpuses { text } => {
                workbench.refresh_corpuses(text.as_deref()).await
            }
            SessionCommand::OpenCorpus { corpus_id } => workbench.open_corpus(&corpus_id).await,
            SessionCommand::CloseCorpus => workbench.close_corpus(),
            SessionCommand::CreateCorpus { corpus } => {
                workbench.create_corpus(corpus).await.map(drop)
            }
            SessionCommand::UpdateCorpus { corpus_id, patch } => {
                workbench.update_corpus(&corpus_id, patch).await.map(drop)
            }
            SessionCommand::DeleteCorpus { corpus_id } => {
                workbench.delete_corpus(&corpus_id).await.map(drop)
            }
            SessionCommand::RemoveDocuments { document_ids } => workbench
                .remove_documents_from_corpus(&document_ids)
                .await
                .map(drop),
            SessionCommand::RefreshImport { job_id } => {
                workbench.refresh_import(&job_id).await.map(drop)
            }
            SessionCommand::RefreshQueries => workbench.refresh_corpus_queries().await,
            SessionCommand::AskCorpus { query } => workbench.ask_corpus(&query).await.map(drop),
            SessionCommand::SetDocumentFilter { filter } => {
                workbench.set_document_filter(filter).await
            }
            SessionCommand::RefreshDocuments => workbench.refresh_documents().await,
            SessionCommand::OpenDocument { document_id } => {
                workbench.open_document(&document_id).await.map(drop)
            }
            SessionCommand::CloseDocument => workbench.close_document(),
            SessionCommand::ToggleAnnotation { annotation_id } => {
                workbench.toggle_annotation(&annotation_id).map(drop)
            }
            SessionCommand::ToggleRelation { relation_id } => {
                workbench.toggle_relation(&relation_id).map(drop)
            }
            SessionCommand::ClearSelection => workbench.clear_selection(),
            SessionCommand::RegisterElement { annotation_id } => {
                workbench.register_element(&annotation_id);
                Ok(())
            }
            SessionCommand::UnregisterElement { annotation_id } => {
                workbench.unregister_element(&annotation_id);
                Ok(())
            }
            SessionCommand::SetShowStructural { show } => workbench.set_show_structural(show),
            SessionCommand::SetLabelFilter { label_ids } => workbench.set_label_filter(label_ids),
            SessionCommand::SetSearchTerm { term } => workbench.set_search_term(&term),
            SessionCommand::RunSearch => workbench.run_search().await,
            SessionCommand::SetActivePane { index } => workbench.set_active_pane(index).map(drop),
            SessionCommand::OpenExtract { extract_id } => {
                workbench.open_extract(&extract_id).await.map(drop)
            }
            SessionCommand::RefreshExtract => workbench.refresh_extract().await,
            SessionCommand::CloseExtract => workbench.close_extract(),
            SessionCommand::EditCell {
                cell_id,
                corrected_data,
            } => workbench.edit_cell(&cell_id, corrected_data).await.map(drop),
            SessionCommand::ApproveCell { cell_id } => {
                workbench.approve_cell(&cell_id).await.map(drop)
            }
            SessionCommand::RejectCell { cell_id } => {
                workbench.reject_cell(&cell_id).await.map(drop)
            }
            SessionCommand::DeleteAnnotation { annotation_id } => {
                workbench.delete_annotation(&annotation_id).await.map(drop)
            }
            SessionCommand::DeleteRelation { relation_id } => {
                workbench.delete_relation(&relation_id).await.map(drop)
            }
            SessionCommand::RemoveAnnotationFromRelation {
                relation_id,
                annotation_id,
            } => workbench
                .remove_annotation_from_relation(&relation_id, &annotation_id)
                .await
                .map(drop),
        }
    }
}

pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", get(get_session).delete(close_session))
        .route("/sessions/{id}/commands", post(run_command))
        .route("/sessions/{id}/notices/drain", post(drain_notices))
        .route("/sessions/{id}/scrolls", post(drain_scrolls))
}

fn unknown_session(id: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("session {id} not found"))
}

fn closed_session(id: &str) -> ApiError {
    (StatusCode::CONFLICT, format!("session {id} is closed"))
}

async fn find_session(state: &AppState, id: &str) -> Result<Session, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| unknown_session(id))
}

async fn live_session(state: &AppState, id: &str) -> Result<Session, ApiError> {
    let session = find_session(state, id).await?;
    if session.workbench.is_torn_down() {
        return Err(closed_session(id));
    }
    Ok(session)
}

async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let backend: Arc<dyn CorpusBackend> = state.service.clone();
    let (session_id, session) = state
        .sessions
        .open(backend, &request.viewer, state.config.search.debounce())
        .await;
    info!(session_id = %session_id, viewer = %request.viewer, "session opened");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            state: session.workbench.snapshot(),
        }),
    ))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkbenchState>, ApiError> {
    let session = live_session(&state, &id).await?;
    Ok(Json(session.workbench.snapshot()))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    find_session(&state, &id).await?;
    if !state.sessions.close(&id).await {
        return Err(closed_session(&id));
    }
    info!(session_id = %id, "session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn run_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(command): Json<SessionCommand>,
) -> Result<Json<WorkbenchState>, ApiError> {
    let session = find_session(&state, &id).await?;
    command
        .apply(&session.workbench)
        .await
        .map_err(|err| (StatusCode::CONFLICT, format!("session {id} is not usable: {err}")))?;
    Ok(Json(session.workbench.snapshot()))
}

async fn drain_notices(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Notice>>, ApiError> {
    let session = find_session(&state, &id).await?;
    let notices = session
        .workbench
        .drain_notices()
        .map_err(|err| (StatusCode::CONFLICT, format!("session {id} is not usable: {err}")))?;
    Ok(Json(notices))
}

async fn drain_scrolls(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScrollResponse>, ApiError> {
    let session = live_session(&state, &id).await?;
    Ok(Json(ScrollResponse {
        annotation_ids: session.viewport.drain(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{LocalCorpusService, Storages};

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_and_closed_ones_linger() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend: Arc<dyn CorpusBackend> = Arc::new(LocalCorpusService::new(Arc::new(
            Storages::new(dir.path(), None),
        )));
        let registry = SessionRegistry::default();
        let idle = Duration::from_secs(60);
        let debounce = Duration::from_millis(10);

        let (active, _) = registry.open(backend.clone(), "alice", debounce).await;
        let (stale, stale_session) = registry.open(backend.clone(), "bob", debounce).await;
        let (closed, _) = registry.open(backend, "carol", debounce).await;

        assert!(registry.close(&closed).await);
        assert!(!registry.close(&closed).await);
        assert!(
            registry
                .get(&closed)
                .await
                .is_some_and(|session| session.workbench.is_torn_down())
        );

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(registry.sweep(idle).await, 0);
        assert!(registry.get(&active).await.is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(registry.sweep(idle).await, 2);
        assert!(stale_session.workbench.is_torn_down());
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&closed).await.is_none());
        assert!(registry.get(&active).await.is_some());
        assert_eq!(registry.len().await, 1);
    }
}
