mod models;
mod query;
mod route;
mod seams;

pub use models::{
    Agent, AgentId, AgentInsert, AgentKind, AgentPatch, AgentStatus, AuthUser, Credentials,
    FileUpload, KnowledgeBase, KnowledgeBaseId, KnowledgeBaseInsert, KnowledgeBasePatch,
    KnowledgeItem, KnowledgeItemId, KnowledgeItemInsert, KnowledgeItemKind, KnowledgeItemPatch,
    KnowledgeItemStatus, Session, UiLanguage, UserId,
};
pub use query::{Order, Table, TableQuery};
pub use route::AppRoute;
pub use seams::{
    AgentQuery, AuthClient, ChangeEvent, ChangeFilter, ChangeKind, ChangeStream, ContentExtractor,
    EmbeddingRequest, EmbeddingResult, ExtractionResult, Notifier, ObjectStorage, QueryResult,
    RealtimeClient, TableClient, Toast, ToastVariant,
};
