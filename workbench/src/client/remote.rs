use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    model::{
        Annotation, Column, Corpus, CorpusAction, CorpusInput, CorpusPatch, CorpusQuery,
        CorpusStats, Datacell, Document, Extract, ImportJob, LabelSet, Relation, UploadPayload,
    },
    routes::types::{
        ActorRequest, AnnotationIdsRequest, AnnotationParams, AskCorpusRequest, CorpusListParams,
        CreateCorpusRequest, DocumentIdsRequest, EditCellRequest, SearchParams,
        StartImportRequest,
    },
    service::{
        AnalysisFilter, AnnotationQuery, CorpusActionInput, CorpusMutations, CorpusQueries,
        DocumentFilter, ServiceError,
    },
};

/// Talks to a workbench server over its HTTP API.
pub struct RemoteCorpusService {
    http: Client,
    base: String,
}

impl RemoteCorpusService {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;
        Ok(Self::with_client(http, base))
    }

    pub fn with_client(http: Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base))
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let res = builder
            .send()
            .await
            .with_context(|| format!("network error calling {what}"))?;
        let status = res.status();
        debug!(%status, what, "remote call finished");
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound {
                kind: "remote resource",
                id: body,
            }
            .into(),
            StatusCode::BAD_REQUEST => ServiceError::Invalid(body).into(),
            _ => anyhow!("{what} failed with {status}: {body}"),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.send(builder, what)
            .await?
            .json::<T>()
            .await
            .with_context(|| format!("invalid response body from {what}"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.fetch(self.request(Method::GET, path), path).await
    }

    async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.fetch(self.request(Method::GET, path).query(query), path)
            .await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(self.request(method, path).json(body), path).await
    }
}

#[async_trait]
impl CorpusQueries for RemoteCorpusService {
    async fn corpuses(&self, text: Option<&str>) -> Result<Vec<Corpus>> {
        let params = CorpusListParams {
            text: text.map(str::to_string),
        };
        self.get_with("/corpuses", &params).await
    }

    async fn corpus(&self, id: &str) -> Result<Corpus> {
        self.get(&format!("/corpuses/{id}")).await
    }

    async fn corpus_stats(&self, id: &str) -> Result<CorpusStats> {
        self.get(&format!("/corpuses/{id}/stats")).await
    }

    async fn label_set(&self, id: &str) -> Result<LabelSet> {
        self.get(&format!("/label-sets/{id}")).await
    }

    async fn documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        self.get_with("/documents", filter).await
    }

    async fn annotations(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>> {
        let params = AnnotationParams {
            corpus_id: query.corpus_id.clone(),
            analysis: query.analysis.as_param().map(str::to_string),
            structural: query.structural,
        };
        self.get_with(&format!("/documents/{}/annotations", query.document_id), &params)
            .await
    }

    async fn relations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        analysis: &AnalysisFilter,
    ) -> Result<Vec<Relation>> {
        let params = AnnotationParams {
            corpus_id: corpus_id.map(str::to_string),
            analysis: analysis.as_param().map(str::to_string),
            structural: None,
        };
        self.get_with(&format!("/documents/{document_id}/relations"), &params)
            .await
    }

    async fn search_annotations(
        &self,
        document_id: &str,
        corpus_id: Option<&str>,
        term: &str,
    ) -> Result<Vec<Annotation>> {
        let params = SearchParams {
            corpus_id: corpus_id.map(str::to_string),
            term: term.to_string(),
        };
        self.get_with(&format!("/documents/{document_id}/search"), &params)
            .await
    }

    async fn extract(&self, id: &str) -> Result<Extract> {
        self.get(&format!("/extracts/{id}")).await
    }

    async fn extract_columns(&self, extract_id: &str) -> Result<Vec<Column>> {
        self.get(&format!("/extracts/{extract_id}/columns")).await
    }

    async fn extract_cells(&self, extract_id: &str) -> Result<Vec<Datacell>> {
        self.get(&format!("/extracts/{extract_id}/cells")).await
    }

    async fn corpus_actions(&self, corpus_id: &str) -> Result<Vec<CorpusAction>> {
        self.get(&format!("/corpuses/{corpus_id}/actions")).await
    }

    async fn import_job(&self, id: &str) -> Result<ImportJob> {
        self.get(&format!("/imports/{id}")).await
    }

    async fn corpus_queries(&self, corpus_id: &str) -> Result<Vec<CorpusQuery>> {
        self.get(&format!("/corpuses/{corpus_id}/queries")).await
    }

    async fn corpus_query(&self, id: &str) -> Result<CorpusQuery> {
        self.get(&format!("/corpus-queries/{id}")).await
    }

    async fn corpus_query_sources(&self, id: &str) -> Result<Vec<Annotation>> {
        self.get(&format!("/corpus-queries/{id}/sources")).await
    }
}

#[async_trait]
impl CorpusMutations for RemoteCorpusService {
    async fn create_corpus(&self, input: CorpusInput, actor: &str) -> Result<Corpus> {
        let body = CreateCorpusRequest {
            actor: actor.to_string(),
            corpus: input,
        };
        self.send_json(Method::POST, "/corpuses", &body).await
    }

    async fn update_corpus(&self, id: &str, patch: CorpusPatch) -> Result<Corpus> {
        self.send_json(Method::PATCH, &format!("/corpuses/{id}"), &patch)
            .await
    }

    async fn delete_corpus(&self, id: &str) -> Result<()> {
        let path = format!("/corpuses/{id}");
        self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    async fn remove_documents_from_corpus(
        &self,
        corpus_id: &str,
        document_ids: &[String],
    ) -> Result<Corpus> {
        let body = DocumentIdsRequest {
            document_ids: document_ids.to_vec(),
        };
        self.send_json(
            Method::POST,
            &format!("/corpuses/{corpus_id}/documents/remove"),
            &body,
        )
        .await
    }

    async fn start_corpus_import(&self, upload: UploadPayload, actor: &str) -> Result<ImportJob> {
        let body = StartImportRequest {
            actor: actor.to_string(),
            upload,
        };
        self.send_json(Method::POST, "/imports", &body).await
    }

    async fn edit_datacell(&self, cell_id: &str, corrected: Value) -> Result<Datacell> {
        let body = EditCellRequest {
            corrected_data: corrected,
        };
        self.send_json(Method::PATCH, &format!("/datacells/{cell_id}"), &body)
            .await
    }

    async fn approve_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell> {
        let body = ActorRequest {
            actor: actor.to_string(),
        };
        self.send_json(Method::POST, &format!("/datacells/{cell_id}/approve"), &body)
            .await
    }

    async fn reject_datacell(&self, cell_id: &str, actor: &str) -> Result<Datacell> {
        let body = ActorRequest {
            actor: actor.to_string(),
        };
        self.send_json(Method::POST, &format!("/datacells/{cell_id}/reject"), &body)
            .await
    }

    async fn delete_annotation(&self, id: &str) -> Result<()> {
        let path = format!("/annotations/{id}");
        self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    async fn delete_relation(&self, id: &str) -> Result<()> {
        let path = format!("/relations/{id}");
        self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    async fn remove_annotations_from_relation(
        &self,
        relation_id: &str,
        annotation_ids: &[String],
    ) -> Result<Option<Relation>> {
        let body = AnnotationIdsRequest {
            annotation_ids: annotation_ids.to_vec(),
        };
        self.send_json(
            Method::POST,
            &format!("/relations/{relation_id}/remove-annotations"),
            &body,
        )
        .await
    }

    async fn create_corpus_action(&self, input: CorpusActionInput) -> Result<CorpusAction> {
        self.send_json(Method::POST, "/corpus-actions", &input).await
    }

    async fn create_corpus_query(
        &self,
        corpus_id: &str,
        query: &str,
        actor: &str,
    ) -> Result<CorpusQuery> {
        let body = AskCorpusRequest {
            actor: actor.to_string(),
            query: query.to_string(),
        };
        self.send_json(Method::POST, &format!("/corpuses/{corpus_id}/queries"), &body)
            .await
    }
}
