#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;
use workbench::{
    model::{
        Annotation, Column, Corpus, CorpusQuery, Datacell, Document, Extract, LabelRef, LabelSet,
        Permission, Relation,
    },
    service::{LocalCorpusService, Storages},
    storage::StorageManager,
};

pub const CORPUS: &str = "corpus-1";
pub const OTHER_CORPUS: &str = "corpus-2";
pub const LABEL_SET: &str = "labelset-1";
pub const EXTRACT_DONE: &str = "extract-done";
pub const EXTRACT_RUNNING: &str = "extract-running";
pub const QUERY_ANSWERED: &str = "query-answered";
pub const QUERY_FAILED: &str = "query-failed";

pub struct Fixture {
    pub dir: TempDir,
    pub storages: Arc<Storages>,
    pub service: LocalCorpusService,
    pub manager: StorageManager,
}

pub async fn open_service(dir: TempDir) -> anyhow::Result<Fixture> {
    let storages = Arc::new(Storages::new(dir.path(), None));
    let mut manager = StorageManager::new();
    storages.register_all(&mut manager);
    manager.initialize_all().await?;
    let service = LocalCorpusService::new(storages.clone());
    Ok(Fixture {
        dir,
        storages,
        service,
        manager,
    })
}

pub fn label(id: &str) -> LabelRef {
    LabelRef {
        id: id.to_string(),
        text: id.trim_start_matches("label-").to_string(),
    }
}

pub fn annotation(id: &str, document_id: &str, page: u32, label_id: &str) -> Annotation {
    Annotation {
        id: id.to_string(),
        document_id: document_id.to_string(),
        corpus_id: Some(CORPUS.to_string()),
        page,
        label: label(label_id),
        raw_text: format!("text of {id}"),
        ..Default::default()
    }
}

pub fn relation(id: &str, document_id: &str, source: &[&str], target: &[&str]) -> Relation {
    Relation {
        id: id.to_string(),
        document_id: document_id.to_string(),
        corpus_id: Some(CORPUS.to_string()),
        label: label("label-refers"),
        source_ids: source.iter().map(|s| s.to_string()).collect(),
        target_ids: target.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn document(id: &str, title: &str, description: &str, age_minutes: i64) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        metadata: json!({}),
        page_count: 3,
        created: Utc::now() - Duration::minutes(age_minutes),
    }
}

/// Two corpuses over three documents, a small annotation graph on `doc-1`,
/// one finished plus one running extract, and three corpus queries.
pub async fn seed(storages: &Storages) -> anyhow::Result<()> {
    let now = Utc::now();
    storages
        .label_sets
        .insert(
            LABEL_SET,
            LabelSet {
                id: LABEL_SET.to_string(),
                title: "Contract labels".to_string(),
                labels: Vec::new(),
            },
        )
        .await?;

    storages
        .corpuses
        .insert(
            CORPUS,
            Corpus {
                id: CORPUS.to_string(),
                title: "Contracts".to_string(),
                description: "Signed leases".to_string(),
                label_set: Some(LABEL_SET.to_string()),
                creator: "alice".to_string(),
                my_permissions: vec![Permission::Read, Permission::Update],
                document_ids: vec!["doc-1".into(), "doc-2".into()],
                created: now - Duration::hours(2),
                modified: now - Duration::hours(2),
                ..Default::default()
            },
        )
        .await?;
    storages
        .corpuses
        .insert(
            OTHER_CORPUS,
            Corpus {
                id: OTHER_CORPUS.to_string(),
                title: "Invoices".to_string(),
                creator: "bob".to_string(),
                my_permissions: vec![Permission::Read],
                document_ids: vec!["doc-2".into(), "doc-3".into()],
                created: now - Duration::hours(1),
                modified: now - Duration::hours(1),
                ..Default::default()
            },
        )
        .await?;

    for doc in [
        document("doc-1", "Lease agreement", "Office lease", 30),
        document("doc-2", "Loan agreement", "Bank LOAN terms", 20),
        document("doc-3", "Invoice 42", "March invoice", 10),
    ] {
        storages.documents.insert(&doc.id.clone(), doc).await?;
    }

    let mut structural = annotation("ann-header", "doc-1", 1, "label-header");
    structural.structural = true;
    structural.corpus_id = None;
    let mut analyzed = annotation("ann-auto", "doc-1", 3, "label-party");
    analyzed.analysis_id = Some("analysis-1".to_string());
    let mut other_corpus = annotation("ann-other", "doc-2", 1, "label-total");
    other_corpus.corpus_id = Some(OTHER_CORPUS.to_string());

    for ann in [
        annotation("ann-1", "doc-1", 2, "label-party"),
        annotation("ann-2", "doc-1", 1, "label-date"),
        annotation("ann-3", "doc-1", 2, "label-party"),
        structural,
        analyzed,
        other_corpus,
    ] {
        storages.annotations.insert(&ann.id.clone(), ann).await?;
    }

    for rel in [
        relation("rel-1", "doc-1", &["ann-1"], &["ann-2", "ann-3"]),
        relation("rel-2", "doc-1", &["ann-3"], &[]),
    ] {
        storages.relations.insert(&rel.id.clone(), rel).await?;
    }

    storages
        .extracts
        .insert(
            EXTRACT_DONE,
            Extract {
                id: EXTRACT_DONE.to_string(),
                name: "Parties".to_string(),
                corpus_id: Some(CORPUS.to_string()),
                column_ids: vec!["col-1".into()],
                document_ids: vec!["doc-1".into()],
                started: Some(now - Duration::minutes(5)),
                finished: Some(now - Duration::minutes(1)),
                error: None,
            },
        )
        .await?;
    storages
        .extracts
        .insert(
            EXTRACT_RUNNING,
            Extract {
                id: EXTRACT_RUNNING.to_string(),
                name: "Dates".to_string(),
                corpus_id: Some(CORPUS.to_string()),
                column_ids: vec!["col-1".into()],
                document_ids: vec!["doc-1".into(), "doc-2".into()],
                started: Some(now - Duration::minutes(5)),
                finished: None,
                error: None,
            },
        )
        .await?;
    storages
        .columns
        .insert(
            "col-1",
            Column {
                id: "col-1".to_string(),
                name: "Party".to_string(),
                query: "Who are the parties?".to_string(),
                output_type: "str".to_string(),
                is_list: false,
            },
        )
        .await?;

    for cell in [
        Datacell {
            id: "cell-done".to_string(),
            extract_id: EXTRACT_DONE.to_string(),
            document_id: "doc-1".to_string(),
            column_id: "col-1".to_string(),
            data: Some(json!({"data": "Acme"})),
            rejected_by: Some("carol".to_string()),
            started: Some(now - Duration::minutes(4)),
            completed: Some(now - Duration::minutes(2)),
            ..Default::default()
        },
        Datacell {
            id: "cell-running".to_string(),
            extract_id: EXTRACT_RUNNING.to_string(),
            document_id: "doc-1".to_string(),
            column_id: "col-1".to_string(),
            started: Some(now - Duration::minutes(4)),
            ..Default::default()
        },
    ] {
        storages.datacells.insert(&cell.id.clone(), cell).await?;
    }

    let asked = |id: &str, corpus_id: &str, query: &str, minutes_ago: i64| CorpusQuery {
        id: id.to_string(),
        corpus_id: corpus_id.to_string(),
        query: query.to_string(),
        creator: "alice".to_string(),
        response: None,
        source_ids: Vec::new(),
        created: now - Duration::minutes(minutes_ago),
        started: None,
        completed: None,
        failed: None,
        stacktrace: None,
    };
    let mut answered = asked(QUERY_ANSWERED, CORPUS, "Who signed the lease?", 9);
    answered.response = Some("Acme and Globex".to_string());
    answered.source_ids = vec!["ann-3".into(), "ann-gone".into(), "ann-1".into()];
    answered.started = Some(now - Duration::minutes(8));
    answered.completed = Some(now - Duration::minutes(7));
    let mut failed = asked(QUERY_FAILED, CORPUS, "What is the rent?", 6);
    failed.started = Some(now - Duration::minutes(5));
    failed.failed = Some(now - Duration::minutes(4));
    failed.stacktrace = Some("model timed out".to_string());
    for query in [
        answered,
        failed,
        asked("query-other", OTHER_CORPUS, "Total due?", 3),
    ] {
        storages.corpus_queries.insert(&query.id.clone(), query).await?;
    }

    storages.persist_all().await
}
