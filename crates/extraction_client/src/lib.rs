use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use core_types::{
    AgentQuery, ContentExtractor, EmbeddingRequest, EmbeddingResult, ExtractionResult,
    FileUpload, QueryResult,
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for the extraction/query backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = %url, "posting to backend");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!(%status, body = %text, "backend request failed");
        bail!("HTTP error! status: {}", status.as_u16());
    }
    response
        .json::<T>()
        .await
        .context("invalid backend response json")
}

fn pdf_form(file: &FileUpload) -> Result<Form> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .with_context(|| format!("invalid content type `{}`", file.content_type))?;
    Ok(Form::new().part("file", part))
}

#[async_trait]
impl ContentExtractor for BackendClient {
    async fn extract_pdf(&self, file: &FileUpload) -> Result<ExtractionResult> {
        let url = self.endpoint("extract/pdf");
        debug!(url = %url, file = %file.file_name, bytes = file.size(), "uploading pdf for extraction");
        let response = self
            .http
            .post(&url)
            .multipart(pdf_form(file)?)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;
        decode_response(response).await
    }

    async fn extract_url(&self, url: &str) -> Result<ExtractionResult> {
        #[derive(Serialize)]
        struct UrlRequest<'a> {
            url: &'a str,
        }

        self.post_json("extract/url", &UrlRequest { url }).await
    }

    async fn query_agent(&self, query: &AgentQuery) -> Result<QueryResult> {
        self.post_json("query", query).await
    }

    async fn generate_knowledge_embedding(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResult> {
        self.post_json("knowledge_embedding", request).await
    }
}
