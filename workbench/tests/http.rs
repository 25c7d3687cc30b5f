mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use workbench::{
    AppState,
    client::RemoteCorpusService,
    config::{AppConfig, SearchConfig, ServerConfig, SessionConfig},
    model::CorpusInput,
    routes::{self, sessions::SessionRegistry},
    service::{
        AnnotationQuery, CorpusMutations, CorpusQueries, DocumentFilter, ServiceError,
    },
    state::{NoopViewport, Workbench},
    storage::StoragesStatus,
};

use common::{CORPUS, EXTRACT_DONE, Fixture, open_service, seed};

async fn serve(fixture: &Fixture) -> Result<String> {
    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        working_dir: fixture.dir.path().display().to_string(),
        search: SearchConfig { debounce_ms: 20 },
        sessions: SessionConfig::default(),
    };
    let state = Arc::new(AppState {
        config: Arc::new(config),
        service: Arc::new(fixture.service.clone()),
        sessions: SessionRegistry::default(),
        storages_status: StoragesStatus::Initialized,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.ok();
    });
    Ok(format!("http://{addr}"))
}

async fn seeded_server() -> Result<(Fixture, String)> {
    let fixture = open_service(TempDir::new()?).await?;
    seed(&fixture.storages).await?;
    let base = serve(&fixture).await?;
    Ok((fixture, base))
}

#[tokio::test]
async fn remote_client_mirrors_local_service() -> Result<()> {
    let (_fixture, base) = seeded_server().await?;
    let remote = RemoteCorpusService::new(&base)?;

    let health = reqwest::get(format!("{base}/health")).await?;
    assert_eq!(health.status(), StatusCode::OK);

    let corpuses = remote.corpuses(Some("invoi")).await?;
    assert_eq!(corpuses.len(), 1);
    assert_eq!(corpuses[0].title, "Invoices");

    let missing = remote.corpus("nope").await.unwrap_err();
    assert!(matches!(
        missing.downcast_ref::<ServiceError>(),
        Some(ServiceError::NotFound { .. })
    ));
    let invalid = remote
        .create_corpus(CorpusInput::default(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(
        invalid.downcast_ref::<ServiceError>(),
        Some(ServiceError::Invalid(_))
    ));

    let docs = remote
        .documents(&DocumentFilter {
            corpus_id: Some(CORPUS.to_string()),
            text: Some("loan".to_string()),
            ..Default::default()
        })
        .await?;
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["doc-2"]);

    let mut query = AnnotationQuery::for_document("doc-1", Some(CORPUS));
    query.structural = Some(true);
    let structural = remote.annotations(&query).await?;
    assert_eq!(structural.len(), 1);
    assert_eq!(structural[0].id, "ann-header");

    let hits = remote
        .search_annotations("doc-1", Some(CORPUS), "ann-2")
        .await?;
    assert_eq!(hits.len(), 1);

    let cell = remote.approve_datacell("cell-done", "dave").await?;
    assert_eq!(cell.approved_by.as_deref(), Some("dave"));

    let queries = remote.corpus_queries(CORPUS).await?;
    assert_eq!(queries.len(), 2);
    let sources = remote.corpus_query_sources(&queries[0].id).await?;
    let source_ids: Vec<_> = sources.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(source_ids, vec!["ann-3", "ann-1"]);
    let asked = remote
        .create_corpus_query(CORPUS, "Is there a renewal clause?", "erin")
        .await?;
    assert!(asked.is_loading());
    assert_eq!(remote.corpus_query(&asked.id).await?, asked);
    let blank = remote.create_corpus_query(CORPUS, " ", "erin").await.unwrap_err();
    assert!(matches!(
        blank.downcast_ref::<ServiceError>(),
        Some(ServiceError::Invalid(_))
    ));

    let emptied = remote
        .remove_annotations_from_relation("rel-2", &["ann-3".to_string()])
        .await?;
    assert!(emptied.is_none());
    remote.delete_annotation("ann-2").await?;
    assert!(remote.delete_annotation("ann-2").await.is_err());
    Ok(())
}

#[tokio::test]
async fn workbench_runs_against_remote_backend() -> Result<()> {
    let (_fixture, base) = seeded_server().await?;
    let remote = Arc::new(RemoteCorpusService::new(&base)?);
    let workbench = Workbench::new(remote, Arc::new(NoopViewport), "alice");
    workbench.initialize();

    workbench.open_corpus(CORPUS).await?;
    assert!(workbench.open_document("doc-1").await?);
    assert!(workbench.toggle_relation("rel-1")?);
    assert_eq!(
        workbench.snapshot().selection.annotations,
        vec!["ann-1", "ann-2", "ann-3"]
    );

    assert!(workbench.open_extract(EXTRACT_DONE).await?);
    assert!(workbench.reject_cell("cell-done").await?);
    let state = workbench.snapshot();
    let cell = state
        .extract
        .as_ref()
        .and_then(|grid| grid.cell("cell-done"))
        .expect("cell loaded");
    assert_eq!(cell.rejected_by.as_deref(), Some("alice"));
    assert!(state.notices.is_empty());

    workbench.open_corpus("missing").await?;
    let notices = workbench.drain_notices()?;
    assert_eq!(notices.len(), 1);
    assert_eq!(
        workbench.snapshot().opened_corpus.map(|c| c.id),
        Some(CORPUS.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn sessions_drive_a_server_side_workbench() -> Result<()> {
    let (_fixture, base) = seeded_server().await?;
    let http = reqwest::Client::new();

    let opened = http
        .post(format!("{base}/sessions"))
        .json(&json!({ "viewer": "alice" }))
        .send()
        .await?;
    assert_eq!(opened.status(), StatusCode::CREATED);
    let opened: Value = opened.json().await?;
    let session_id = opened["session_id"].as_str().expect("session id").to_string();
    let commands = format!("{base}/sessions/{session_id}/commands");

    for command in [
        json!({ "op": "open_corpus", "corpus_id": CORPUS }),
        json!({ "op": "open_document", "document_id": "doc-1" }),
        json!({ "op": "register_element", "annotation_id": "ann-1" }),
    ] {
        let res = http.post(&commands).json(&command).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let state: Value = http
        .post(&commands)
        .json(&json!({ "op": "toggle_annotation", "annotation_id": "ann-1" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(state["selection"]["annotations"], json!(["ann-1"]));
    assert_eq!(state["panes"]["panes"], json!(["annotated_text", "relationships"]));

    let scrolls: Value = http
        .post(format!("{base}/sessions/{session_id}/scrolls"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(scrolls["annotation_ids"], json!(["ann-1"]));

    let res = http
        .post(&commands)
        .json(&json!({ "op": "open_document", "document_id": "doc-3" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let notices: Value = http
        .post(format!("{base}/sessions/{session_id}/notices/drain"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(notices.as_array().map(Vec::len), Some(1));
    assert_eq!(notices[0]["level"], "warning");

    let closed = http
        .delete(format!("{base}/sessions/{session_id}"))
        .send()
        .await?;
    assert_eq!(closed.status(), StatusCode::NO_CONTENT);
    let late = http
        .post(&commands)
        .json(&json!({ "op": "clear_selection" }))
        .send()
        .await?;
    assert_eq!(late.status(), StatusCode::CONFLICT);
    let snapshot = http.get(format!("{base}/sessions/{session_id}")).send().await?;
    assert_eq!(snapshot.status(), StatusCode::CONFLICT);
    let closed_again = http
        .delete(format!("{base}/sessions/{session_id}"))
        .send()
        .await?;
    assert_eq!(closed_again.status(), StatusCode::CONFLICT);

    let unknown = http
        .post(format!("{base}/sessions/session-missing/commands"))
        .json(&json!({ "op": "clear_selection" }))
        .send()
        .await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    Ok(())
}
