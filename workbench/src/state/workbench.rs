use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};
use ts_rs::TS;

use super::{
    AnnotationFilters, CellEdit, ContainerStatus, Debouncer, ElementRefs, ExtractGrid, Notice,
    NoticeLevel, PaneInputs, PaneSet, SearchState, Selection, SelectionChange, StateContainer,
    Viewport,
};
use crate::{
    client::upload::encode_upload,
    model::{
        Annotation, Corpus, CorpusInput, CorpusPatch, CorpusQuery, CorpusStats, Datacell,
        Document, ImportJob, ImportStatus, LabelSet, Relation,
    },
    service::{AnalysisFilter, AnnotationQuery, CorpusBackend, DocumentFilter},
};

/// Everything one viewer session has opened, selected, filtered and searched.
#[derive(Default, Clone, Debug, Serialize, TS)]
#[ts(export)]
pub struct WorkbenchState {
    pub corpuses: Vec<Corpus>,
    pub corpus_search: Option<String>,
    pub opened_corpus: Option<Corpus>,
    pub label_set: Option<LabelSet>,
    pub corpus_stats: Option<CorpusStats>,
    pub document_filter: DocumentFilter,
    pub documents: Vec<Document>,
    pub opened_document: Option<Document>,
    pub annotations: Vec<Annotation>,
    pub relations: Vec<Relation>,
    pub visible_annotations: Vec<Annotation>,
    pub filters: AnnotationFilters,
    pub selection: Selection,
    pub search: SearchState,
    pub panes: PaneSet,
    pub extract: Option<ExtractGrid>,
    pub imports: Vec<ImportJob>,
    /// Questions asked of the opened corpus, oldest first.
    pub queries: Vec<CorpusQuery>,
    pub notices: Vec<Notice>,
}

impl WorkbenchState {
    /// Re-runs the filter pipeline and pane composition.
    fn rederive(&mut self) {
        self.visible_annotations = self.filters.apply(&self.annotations);
        let inputs = PaneInputs {
            viewing_extract: self.extract.is_some(),
            has_annotations: !self.visible_annotations.is_empty(),
            has_relations: !self.relations.is_empty(),
            has_search_results: !self.search.results.is_empty(),
            can_annotate: self.opened_corpus.as_ref().is_some_and(Corpus::can_annotate),
        };
        self.panes.recompute(&inputs);
    }

    /// Some query of the opened corpus is still waiting for its answer.
    pub fn queries_loading(&self) -> bool {
        self.queries.iter().any(CorpusQuery::is_loading)
    }

    fn opened_corpus_id(&self) -> Option<String> {
        self.opened_corpus.as_ref().map(|corpus| corpus.id.clone())
    }

    fn opened_document_id(&self) -> Option<String> {
        self.opened_document.as_ref().map(|doc| doc.id.clone())
    }

    fn reset_document(&mut self) {
        self.opened_document = None;
        self.annotations.clear();
        self.relations.clear();
        self.selection.clear();
        self.search = SearchState::default();
    }

    fn reset_corpus(&mut self) {
        self.reset_document();
        self.opened_corpus = None;
        self.label_set = None;
        self.corpus_stats = None;
        self.document_filter = DocumentFilter::default();
        self.documents.clear();
        self.queries.clear();
        self.extract = None;
    }
}

/// Controller for one viewer's annotation session.
///
/// Backend failures never escape: they become [`Notice`]s on the state. The
/// only errors returned are container lifecycle errors (use before
/// [`initialize`](Self::initialize) or after [`teardown`](Self::teardown)).
#[derive(Clone)]
pub struct Workbench {
    container: Arc<StateContainer<WorkbenchState>>,
    backend: Arc<dyn CorpusBackend>,
    refs: Arc<Mutex<ElementRefs>>,
    debouncer: Arc<Debouncer>,
    viewer: Arc<str>,
}

impl Workbench {
    pub fn new(
        backend: Arc<dyn CorpusBackend>,
        viewport: Arc<dyn Viewport>,
        viewer: impl Into<String>,
    ) -> Self {
        Self {
            container: Arc::new(StateContainer::new()),
            backend,
            refs: Arc::new(Mutex::new(ElementRefs::new(viewport))),
            debouncer: Arc::new(Debouncer::default()),
            viewer: Arc::from(viewer.into()),
        }
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Arc::new(Debouncer::new(delay));
        self
    }

    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    fn refs(&self) -> MutexGuard<'_, ElementRefs> {
        match self.refs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push_notice(&self, notice: Notice) -> Result<()> {
        self.container.update(|state| state.notices.push(notice))
    }

    fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.push_notice(Notice::warning(message))
    }

    fn report(&self, summary: &str, err: &anyhow::Error) -> Result<()> {
        self.push_notice(Notice::failure(summary, err))
    }

    // lifecycle

    pub fn initialize(&self) {
        self.container.initialize(WorkbenchState::default());
        info!(viewer = %self.viewer, "workbench initialized");
    }

    pub fn teardown(&self) {
        self.debouncer.cancel();
        self.refs().clear();
        self.container.teardown();
        info!(viewer = %self.viewer, "workbench torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.container.status() == ContainerStatus::TornDown
    }

    pub fn snapshot(&self) -> WorkbenchState {
        self.container.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkbenchState> {
        self.container.subscribe()
    }

    pub fn drain_notices(&self) -> Result<Vec<Notice>> {
        self.container
            .update(|state| std::mem::take(&mut state.notices))
    }

    // corpuses

    pub async fn refresh_corpuses(&self, text: Option<&str>) -> Result<()> {
        match self.backend.corpuses(text).await {
            Ok(corpuses) => self.container.update(|state| {
                state.corpus_search = text.map(str::to_string);
                state.corpuses = corpuses;
            }),
            Err(err) => self.report("Could not load corpuses", &err),
        }
    }

    async fn reload_corpuses(&self) -> Result<()> {
        let text = self.container.read(|state| state.corpus_search.clone());
        self.refresh_corpuses(text.as_deref()).await
    }

    pub async fn open_corpus(&self, id: &str) -> Result<()> {
        let corpus = match self.backend.corpus(id).await {
            Ok(corpus) => corpus,
            Err(err) => return self.report("Could not open corpus", &err),
        };

        let label_set = match &corpus.label_set {
            Some(label_set_id) => match self.backend.label_set(label_set_id).await {
                Ok(label_set) => Some(label_set),
                Err(err) => {
                    self.report("Could not load label set", &err)?;
                    None
                }
            },
            None => None,
        };
        let stats = match self.backend.corpus_stats(id).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                self.report("Could not load corpus stats", &err)?;
                None
            }
        };

        self.debouncer.cancel();
        self.refs().clear();
        self.container.update(|state| {
            state.reset_corpus();
            state.document_filter = DocumentFilter {
                corpus_id: Some(corpus.id.clone()),
                ..Default::default()
            };
            state.opened_corpus = Some(corpus);
            state.label_set = label_set;
            state.corpus_stats = stats;
            state.rederive();
        })?;
        info!(corpus_id = %id, "corpus opened");

        self.refresh_documents().await
    }

    pub fn close_corpus(&self) -> Result<()> {
        self.debouncer.cancel();
        self.refs().clear();
        self.container.update(|state| {
            state.reset_corpus();
            state.rederive();
        })
    }

    pub async fn create_corpus(&self, input: CorpusInput) -> Result<Option<Corpus>> {
        match self.backend.create_corpus(input, &self.viewer).await {
            Ok(corpus) => {
                self.push_notice(Notice::success(format!("Created corpus {}", corpus.title)))?;
                self.reload_corpuses().await?;
                Ok(Some(corpus))
            }
            Err(err) => {
                self.report("Could not create corpus", &err)?;
                Ok(None)
            }
        }
    }

    pub async fn update_corpus(&self, id: &str, patch: CorpusPatch) -> Result<Option<Corpus>> {
        match self.backend.update_corpus(id, patch).await {
            Ok(corpus) => {
                self.container.update(|state| {
                    if let Some(existing) = state.corpuses.iter_mut().find(|c| c.id == corpus.id) {
                        *existing = corpus.clone();
                    }
                    if state.opened_corpus_id().as_deref() == Some(corpus.id.as_str()) {
                        state.opened_corpus = Some(corpus.clone());
                        state.rederive();
                    }
                    state
                        .notices
                        .push(Notice::success(format!("Updated corpus {}", corpus.title)));
                })?;
                Ok(Some(corpus))
            }
            Err(err) => {
                self.report("Could not update corpus", &err)?;
                Ok(None)
            }
        }
    }

    pub async fn delete_corpus(&self, id: &str) -> Result<bool> {
        if let Err(err) = self.backend.delete_corpus(id).await {
            self.report("Could not delete corpus", &err)?;
            return Ok(false);
        }

        let was_open = self
            .container
            .read(|state| state.opened_corpus_id().as_deref() == Some(id));
        if was_open {
            self.debouncer.cancel();
            self.refs().clear();
        }
        self.container.update(|state| {
            state.corpuses.retain(|corpus| corpus.id != id);
            if was_open {
                state.reset_corpus();
                state.rederive();
            }
            state.notices.push(Notice::success("Corpus deleted"));
        })?;
        Ok(true)
    }

    pub async fn remove_documents_from_corpus(&self, document_ids: &[String]) -> Result<bool> {
        let Some(corpus_id) = self.container.read(WorkbenchState::opened_corpus_id) else {
            self.warn("Open a corpus before removing documents")?;
            return Ok(false);
        };
        if document_ids.is_empty() {
            self.warn("No documents selected")?;
            return Ok(false);
        }

        let corpus = match self
            .backend
            .remove_documents_from_corpus(&corpus_id, document_ids)
            .await
        {
            Ok(corpus) => corpus,
            Err(err) => {
                self.report("Could not remove documents", &err)?;
                return Ok(false);
            }
        };

        self.container.update(|state| {
            state
                .documents
                .retain(|doc| !document_ids.contains(&doc.id));
            let closes_open_doc = state
                .opened_document_id()
                .is_some_and(|id| document_ids.contains(&id));
            if closes_open_doc {
                state.reset_document();
            }
            if let Some(stats) = state.corpus_stats.as_mut() {
                stats.total_docs = corpus.document_ids.len();
            }
            state.opened_corpus = Some(corpus);
            state.rederive();
            state.notices.push(Notice::success(format!(
                "Removed {} document(s) from corpus",
                document_ids.len()
            )));
        })?;
        Ok(true)
    }

    /// Encodes a local export bundle and submits it as a corpus import.
    pub async fn start_import(&self, path: &Path) -> Result<Option<ImportJob>> {
        let upload = match encode_upload(path).await {
            Ok(upload) => upload,
            Err(err) => {
                self.report("Could not read import file", &err)?;
                return Ok(None);
            }
        };

        match self.backend.start_corpus_import(upload, &self.viewer).await {
            Ok(job) => {
                self.container.update(|state| {
                    state.imports.push(job.clone());
                    state
                        .notices
                        .push(Notice::new(NoticeLevel::Info, format!("Importing {}", job.filename)));
                })?;
                Ok(Some(job))
            }
            Err(err) => {
                self.report("Could not start import", &err)?;
                Ok(None)
            }
        }
    }

    /// Polls an import job; a finished import refreshes the corpus list.
    pub async fn refresh_import(&self, job_id: &str) -> Result<Option<ImportJob>> {
        let job = match self.backend.import_job(job_id).await {
            Ok(job) => job,
            Err(err) => {
                self.report("Could not load import status", &err)?;
                return Ok(None);
            }
        };

        let previous = self.container.update(|state| {
            let previous = state
                .imports
                .iter()
                .find(|known| known.id == job.id)
                .map(|known| known.status);
            state.imports.retain(|known| known.id != job.id);
            state.imports.push(job.clone());
            previous
        })?;

        if previous != Some(job.status) {
            match job.status {
                ImportStatus::Processed => {
                    self.push_notice(Notice::success(format!("Imported {}", job.filename)))?;
                    self.reload_corpuses().await?;
                }
                ImportStatus::Failed => {
                    let reason = job.error_msg.clone().unwrap_or_default();
                    self.push_notice(Notice::new(
                        NoticeLevel::Error,
                        format!("Import of {} failed: {reason}", job.filename),
                    ))?;
                }
                ImportStatus::Pending | ImportStatus::Processing => {}
            }
        }
        Ok(Some(job))
    }

    // corpus queries

    pub async fn refresh_corpus_queries(&self) -> Result<()> {
        let Some(corpus_id) = self.container.read(WorkbenchState::opened_corpus_id) else {
            return self.warn("Open a corpus to see its queries");
        };
        match self.backend.corpus_queries(&corpus_id).await {
            Ok(queries) => self.container.update(|state| {
                if state.opened_corpus_id().as_deref() == Some(corpus_id.as_str()) {
                    state.queries = queries;
                }
            }),
            Err(err) => self.report("Could not load corpus queries", &err),
        }
    }

    /// Records a question against the opened corpus.
    pub async fn ask_corpus(&self, query: &str) -> Result<Option<CorpusQuery>> {
        let Some(corpus_id) = self.container.read(WorkbenchState::opened_corpus_id) else {
            self.warn("Open a corpus before asking it a question")?;
            return Ok(None);
        };
        if query.trim().is_empty() {
            self.warn("Enter a question first")?;
            return Ok(None);
        }

        match self
            .backend
            .create_corpus_query(&corpus_id, query, &self.viewer)
            .await
        {
            Ok(created) => {
                self.container.update(|state| {
                    if state.opened_corpus_id().as_deref() == Some(corpus_id.as_str()) {
                        state.queries.push(created.clone());
                    }
                    state
                        .notices
                        .push(Notice::new(NoticeLevel::Info, "Question submitted"));
                })?;
                debug!(query_id = %created.id, "corpus query submitted");
                Ok(Some(created))
            }
            Err(err) => {
                self.report("Could not submit question", &err)?;
                Ok(None)
            }
        }
    }

    // documents

    pub async fn set_document_filter(&self, filter: DocumentFilter) -> Result<()> {
        self.container.update(|state| {
            let corpus_id = state.opened_corpus_id().or(filter.corpus_id.clone());
            state.document_filter = DocumentFilter { corpus_id, ..filter };
        })?;
        self.refresh_documents().await
    }

    pub async fn refresh_documents(&self) -> Result<()> {
        let filter = self.container.read(|state| state.document_filter.clone());
        match self.backend.documents(&filter).await {
            Ok(documents) => self.container.update(|state| {
                // a newer filter owns the list
                if state.document_filter == filter {
                    state.documents = documents;
                }
            }),
            Err(err) => self.report("Could not load documents", &err),
        }
    }

    async fn load_graph(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
    ) -> Result<(Vec<Annotation>, Vec<Relation>)> {
        let query = AnnotationQuery::for_document(document_id, corpus_id);
        let analysis = AnalysisFilter::Any;
        futures::try_join!(
            self.backend.annotations(&query),
            self.backend.relations(document_id, corpus_id, &analysis),
        )
    }

    pub async fn open_document(&self, id: &str) -> Result<bool> {
        let (document, corpus_id) = self.container.read(|state| {
            (
                state.documents.iter().find(|doc| doc.id == id).cloned(),
                state.opened_corpus_id(),
            )
        });
        let Some(document) = document else {
            self.warn(format!("Document {id} is not in the current list"))?;
            return Ok(false);
        };

        let (annotations, relations) = match self.load_graph(id, corpus_id.as_deref()).await {
            Ok(graph) => graph,
            Err(err) => {
                self.report("Could not load annotations", &err)?;
                return Ok(false);
            }
        };

        self.debouncer.cancel();
        self.refs().clear();
        self.container.update(|state| {
            state.reset_document();
            state.opened_document = Some(document);
            state.annotations = annotations;
            state.relations = relations;
            state.extract = None;
            state.rederive();
        })?;
        info!(document_id = %id, "document opened");
        Ok(true)
    }

    pub fn close_document(&self) -> Result<()> {
        self.debouncer.cancel();
        self.refs().clear();
        self.container.update(|state| {
            state.reset_document();
            state.rederive();
        })
    }

    /// Refetches the open document's annotations and relations.
    pub async fn reload_annotations(&self) -> Result<()> {
        let (document_id, corpus_id) = self.container.read(|state| {
            (state.opened_document_id(), state.opened_corpus_id())
        });
        let Some(document_id) = document_id else {
            return Ok(());
        };

        let (annotations, relations) =
            match self.load_graph(&document_id, corpus_id.as_deref()).await {
                Ok(graph) => graph,
                Err(err) => return self.report("Could not reload annotations", &err),
            };

        self.container.update(|state| {
            if state.opened_document_id().as_deref() != Some(document_id.as_str()) {
                return;
            }
            let loaded: std::collections::HashSet<&str> =
                annotations.iter().map(|a| a.id.as_str()).collect();
            state.selection.retain_loaded(&loaded, &relations);
            state
                .search
                .results
                .retain(|hit| loaded.contains(hit.id.as_str()));
            state.annotations = annotations;
            state.relations = relations;
            state.rederive();
        })
    }

    // selection

    pub fn toggle_annotation(&self, id: &str) -> Result<SelectionChange> {
        let change = self
            .container
            .update(|state| state.selection.toggle_annotation(id))?;
        if let SelectionChange::Selected(id) = &change {
            self.refs().scroll_to(id);
        }
        Ok(change)
    }

    /// Selects the relation and its members, or deselects it. Unknown ids only warn.
    pub fn toggle_relation(&self, relation_id: &str) -> Result<bool> {
        let outcome = self.container.update(|state| {
            let relation = state
                .relations
                .iter()
                .find(|relation| relation.id == relation_id)
                .cloned()?;
            let members = relation.member_ids();
            let selected = state.selection.toggle_relation(&relation, members.clone());
            Some((selected, members))
        })?;

        match outcome {
            Some((true, members)) => {
                if let Some(first) = members.first() {
                    self.refs().scroll_to(first);
                }
                Ok(true)
            }
            Some((false, _)) => Ok(false),
            None => {
                self.warn(format!("Relation {relation_id} is not loaded"))?;
                Ok(false)
            }
        }
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.container.update(|state| state.selection.clear())
    }

    pub fn register_element(&self, annotation_id: &str) {
        self.refs().register(annotation_id);
    }

    pub fn unregister_element(&self, annotation_id: &str) {
        self.refs().unregister(annotation_id);
    }

    // filters

    pub fn set_show_structural(&self, show: bool) -> Result<()> {
        self.container.update(|state| {
            state.filters.show_structural = show;
            state.rederive();
        })
    }

    pub fn set_label_filter(&self, label_ids: Vec<String>) -> Result<()> {
        self.container.update(|state| {
            state.filters.label_filter = label_ids;
            state.rederive();
        })
    }

    // search

    /// Records the term and schedules a search once typing pauses.
    pub fn set_search_term(&self, term: &str) -> Result<()> {
        self.container
            .update(|state| state.search.term = term.to_string())?;

        if term.trim().is_empty() {
            self.debouncer.cancel();
            return self.container.update(|state| {
                state.search.results.clear();
                state.rederive();
            });
        }

        let workbench = self.clone();
        self.debouncer.call(async move {
            if let Err(err) = workbench.run_search().await {
                debug!(error = %err, "debounced search dropped");
            }
        });
        Ok(())
    }

    /// Searches the open document for the current term right away.
    pub async fn run_search(&self) -> Result<()> {
        let (term, document_id, corpus_id) = self.container.read(|state| {
            (
                state.search.term.trim().to_string(),
                state.opened_document_id(),
                state.opened_corpus_id(),
            )
        });

        if term.is_empty() {
            return self.container.update(|state| {
                state.search.results.clear();
                state.rederive();
            });
        }
        let Some(document_id) = document_id else {
            return self.warn("Open a document to search it");
        };

        match self
            .backend
            .search_annotations(&document_id, corpus_id.as_deref(), &term)
            .await
        {
            Ok(results) => self.container.update(|state| {
                if state.opened_document_id().as_deref() != Some(document_id.as_str()) {
                    return;
                }
                debug!(term = %term, hits = results.len(), "search completed");
                state.search.results = results;
                state.rederive();
            }),
            Err(err) => self.report("Search failed", &err),
        }
    }

    // panes

    pub fn set_active_pane(&self, index: usize) -> Result<bool> {
        self.container
            .update(|state| state.panes.set_active(index))
    }

    // extracts

    pub async fn open_extract(&self, extract_id: &str) -> Result<bool> {
        let loaded = futures::try_join!(
            self.backend.extract(extract_id),
            self.backend.extract_columns(extract_id),
            self.backend.extract_cells(extract_id),
        );
        match loaded {
            Ok((extract, columns, cells)) => {
                self.container.update(|state| {
                    state.extract = Some(ExtractGrid::new(extract, columns, cells));
                    state.rederive();
                })?;
                info!(extract_id = %extract_id, "extract opened");
                Ok(true)
            }
            Err(err) => {
                self.report("Could not load extract", &err)?;
                Ok(false)
            }
        }
    }

    pub async fn refresh_extract(&self) -> Result<()> {
        let Some(extract_id) = self
            .container
            .read(|state| state.extract.as_ref().map(|grid| grid.extract.id.clone()))
        else {
            return self.warn("No extract is open");
        };

        let loaded = futures::try_join!(
            self.backend.extract(&extract_id),
            self.backend.extract_cells(&extract_id),
        );
        match loaded {
            Ok((extract, cells)) => self.container.update(|state| {
                if let Some(grid) = state.extract.as_mut().filter(|g| g.extract.id == extract_id) {
                    grid.extract = extract;
                    grid.cells = cells;
                }
            }),
            Err(err) => self.report("Could not refresh extract", &err),
        }
    }

    pub fn close_extract(&self) -> Result<()> {
        self.container.update(|state| {
            state.extract = None;
            state.rederive();
        })
    }

    pub async fn edit_cell(&self, cell_id: &str, corrected: Value) -> Result<bool> {
        self.review_cell(cell_id, CellEdit::Correct(corrected)).await
    }

    pub async fn approve_cell(&self, cell_id: &str) -> Result<bool> {
        self.review_cell(cell_id, CellEdit::Approve).await
    }

    pub async fn reject_cell(&self, cell_id: &str) -> Result<bool> {
        self.review_cell(cell_id, CellEdit::Reject).await
    }

    async fn review_cell(&self, cell_id: &str, edit: CellEdit) -> Result<bool> {
        let blocked = self.container.read(|state| match &state.extract {
            Some(grid) => grid.edit_blocked(cell_id, &edit),
            None => Some(format!("Open an extract to {} cells", edit.verb())),
        });
        if let Some(reason) = blocked {
            self.warn(reason)?;
            return Ok(false);
        }

        let verb = edit.verb();
        let result: Result<Datacell> = match edit {
            CellEdit::Correct(value) => self.backend.edit_datacell(cell_id, value).await,
            CellEdit::Approve => self.backend.approve_datacell(cell_id, &self.viewer).await,
            CellEdit::Reject => self.backend.reject_datacell(cell_id, &self.viewer).await,
        };

        match result {
            Ok(cell) => {
                self.container.update(|state| {
                    if let Some(grid) = state.extract.as_mut() {
                        grid.replace_cell(cell);
                    }
                })?;
                debug!(cell_id = %cell_id, verb, "cell updated");
                Ok(true)
            }
            Err(err) => {
                self.report(&format!("Could not {verb} cell"), &err)?;
                Ok(false)
            }
        }
    }

    // annotation graph

    fn require_document(&self, action: &str) -> Result<bool> {
        if self.container.read(|state| state.opened_document.is_some()) {
            return Ok(true);
        }
        self.warn(format!("Open a document to {action}"))?;
        Ok(false)
    }

    pub async fn delete_annotation(&self, annotation_id: &str) -> Result<bool> {
        if !self.require_document("delete annotations")? {
            return Ok(false);
        }
        if let Err(err) = self.backend.delete_annotation(annotation_id).await {
            self.report("Could not delete annotation", &err)?;
            return Ok(false);
        }
        self.refs().unregister(annotation_id);
        self.push_notice(Notice::success("Annotation deleted"))?;
        self.reload_annotations().await?;
        Ok(true)
    }

    pub async fn delete_relation(&self, relation_id: &str) -> Result<bool> {
        if !self.require_document("delete relations")? {
            return Ok(false);
        }
        if let Err(err) = self.backend.delete_relation(relation_id).await {
            self.report("Could not delete relation", &err)?;
            return Ok(false);
        }
        self.push_notice(Notice::success("Relation deleted"))?;
        self.reload_annotations().await?;
        Ok(true)
    }

    pub async fn remove_annotation_from_relation(
        &self,
        relation_id: &str,
        annotation_id: &str,
    ) -> Result<bool> {
        if !self.require_document("edit relations")? {
            return Ok(false);
        }
        let ids = [annotation_id.to_string()];
        match self
            .backend
            .remove_annotations_from_relation(relation_id, &ids)
            .await
        {
            Ok(Some(_)) => self.push_notice(Notice::success("Removed annotation from relation"))?,
            Ok(None) => self.push_notice(Notice::success("Relation emptied and deleted"))?,
            Err(err) => {
                self.report("Could not update relation", &err)?;
                return Ok(false);
            }
        }
        self.reload_annotations().await?;
        Ok(true)
    }
}
