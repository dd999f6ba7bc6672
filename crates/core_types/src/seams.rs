use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AgentId, AuthUser, Credentials, FileUpload, KnowledgeBaseId, Session, UserId};
use crate::query::{Table, TableQuery};

pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send + 'static>>;

/// Row-level CRUD against the hosted relational store.
///
/// Rows travel as JSON so the trait stays object safe; callers decode into the
/// typed models.
#[async_trait]
pub trait TableClient: Send + Sync {
    async fn select(&self, table: Table, query: &TableQuery) -> Result<Vec<Value>>;
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;
    /// Updates the single row matched by `query` and returns it.
    async fn update(&self, table: Table, query: &TableQuery, patch: Value) -> Result<Value>;
    async fn delete(&self, table: Table, query: &TableQuery) -> Result<()>;
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Returns `None` when the platform requires email confirmation first.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>>;
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;
    async fn sign_out(&self) -> Result<()>;
    async fn update_password(&self, password: &str) -> Result<AuthUser>;
    fn current_session(&self) -> Option<Session>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, file: &FileUpload) -> Result<()>;
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record: Option<Value>,
    pub old_record: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Table,
    pub owner: Option<UserId>,
}

impl ChangeFilter {
    pub fn new(table: Table) -> Self {
        Self { table, owner: None }
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Row filter in the platform's `column=op.value` syntax.
    pub fn row_filter(&self) -> Option<String> {
        self.owner.map(|owner| format!("user_id=eq.{owner}"))
    }
}

#[async_trait]
pub trait RealtimeClient: Send + Sync {
    /// Opens a change feed; dropping the stream closes the channel.
    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeStream>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentQuery {
    pub agent_id: AgentId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRequest {
    pub user_id: UserId,
    pub knowledge_base_id: KnowledgeBaseId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The extraction/query backend. Transport failures and non-2xx responses are
/// errors; a 2xx body with `success: false` is returned as-is.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract_pdf(&self, file: &FileUpload) -> Result<ExtractionResult>;
    async fn extract_url(&self, url: &str) -> Result<ExtractionResult>;
    async fn query_agent(&self, query: &AgentQuery) -> Result<QueryResult>;
    async fn generate_knowledge_embedding(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Default,
    Warning,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub variant: ToastVariant,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Default,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Warning,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Transient user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}
