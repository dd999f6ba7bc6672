use chrono::{DateTime, Utc};
use mime_guess::MimeGuess;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type KnowledgeBaseId = Uuid;
pub type KnowledgeItemId = Uuid;
pub type AgentId = Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UiLanguage {
    #[default]
    EnUs,
    ZhCn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBase {
    pub id: KnowledgeBaseId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseInsert {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KnowledgeBasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeItemKind {
    Pdf,
    Url,
    Text,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeItemStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeItem {
    pub id: KnowledgeItemId,
    pub user_id: UserId,
    pub knowledge_base_id: KnowledgeBaseId,
    #[serde(rename = "type")]
    pub kind: KnowledgeItemKind,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub status: KnowledgeItemStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl KnowledgeItem {
    /// Short provenance line shown under the item title.
    pub fn source_label(&self) -> String {
        match self.kind {
            KnowledgeItemKind::Url => self.url.clone().unwrap_or_default(),
            KnowledgeItemKind::Pdf => {
                format!("PDF • {}", self.file_name.as_deref().unwrap_or(&self.title))
            }
            KnowledgeItemKind::Text => "Custom Text".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeItemInsert {
    pub user_id: UserId,
    pub knowledge_base_id: KnowledgeBaseId,
    #[serde(rename = "type")]
    pub kind: KnowledgeItemKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub status: KnowledgeItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KnowledgeItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<KnowledgeItemStatus>,
}

impl KnowledgeItemPatch {
    pub fn completed(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            status: Some(KnowledgeItemStatus::Completed),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(KnowledgeItemStatus::Error),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub knowledge_base_id: KnowledgeBaseId,
    #[serde(default)]
    pub prompt_content: Option<String>,
    pub status: AgentStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn greeting(&self) -> String {
        self.prompt_content
            .as_deref()
            .and_then(|prompt| prompt.split('\n').next())
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| {
                format!(
                    "Hello! I'm {}, your AI assistant. How can I help you today?",
                    self.name
                )
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInsert {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub knowledge_base_id: KnowledgeBaseId,
    pub prompt_content: Option<String>,
    pub status: AgentStatus,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AgentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<KnowledgeBaseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_content: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A file picked by the user, held in memory until it is sent upstream.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub const PDF_MIME: &'static str = "application/pdf";

    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Content type implied by a file name's extension.
    pub fn guess_content_type(file_name: &str) -> String {
        MimeGuess::from_path(file_name)
            .first_or_octet_stream()
            .to_string()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == Self::PDF_MIME
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Text after the last dot, or the whole name when there is none.
    pub fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(&self.file_name)
    }
}
