use core_types::{Agent, EmbeddingRequest, FileUpload, ToastVariant};
use tracing::{info, warn};

use crate::agents::{AgentDraft, AgentService};
use crate::error::{ServiceError, ServiceResult, ValidationError};

pub const DEFAULT_GREETING_TEMPLATE: &str = "Hello! I'm your AI assistant. I'm here to help you with any questions you might have. How can I assist you today?";

pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Thank you for your message. I'm processing your request and will provide you with the most accurate information based on my knowledge base. Please give me a moment to find the best answer for you.";

/// Where an agent's `prompt_content` comes from.
#[derive(Debug, Clone)]
pub enum PromptSource {
    Manual { greeting: String, message: String },
    Pdf(FileUpload),
}

impl Default for PromptSource {
    fn default() -> Self {
        PromptSource::Manual {
            greeting: DEFAULT_GREETING_TEMPLATE.to_owned(),
            message: DEFAULT_MESSAGE_TEMPLATE.to_owned(),
        }
    }
}

pub fn compose_prompt(greeting: &str, message: &str) -> String {
    format!("{greeting}\n\n{message}").trim().to_owned()
}

impl AgentService {
    /// Resolves the prompt, inserts the agent, then asks the backend to embed
    /// the agent's knowledge base. Embedding failure only warns.
    pub async fn create_with_prompt(
        &self,
        draft: AgentDraft,
        source: PromptSource,
    ) -> ServiceResult<Agent> {
        let (name, knowledge_base_id) = self.validate(&draft)?;
        let prompt = match source {
            PromptSource::Manual { greeting, message } => compose_prompt(&greeting, &message),
            PromptSource::Pdf(file) => self.prompt_from_pdf(file).await?,
        };

        let agent = self
            .insert(draft, name, knowledge_base_id, Some(prompt))
            .await?;
        self.generate_embedding(&agent).await;
        Ok(agent)
    }

    async fn prompt_from_pdf(&self, file: FileUpload) -> ServiceResult<String> {
        if !file.is_pdf() {
            return Err(self.ctx.fail(
                "agents.pdf_required",
                ValidationError::NotPdf(file.content_type).into(),
            ));
        }
        let message = match self.ctx.extractor().extract_pdf(&file).await {
            Ok(result) if result.success => return Ok(result.content),
            Ok(result) => result
                .error
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "Failed to extract PDF content".to_owned()),
            Err(err) => err.to_string(),
        };
        warn!(file_name = %file.file_name, error = %message, "prompt extraction failed");
        Err(self
            .ctx
            .report("toast.error", ServiceError::Extraction(message)))
    }

    async fn generate_embedding(&self, agent: &Agent) {
        let request = EmbeddingRequest {
            user_id: agent.user_id,
            knowledge_base_id: agent.knowledge_base_id,
        };
        let failure = match self
            .ctx
            .extractor()
            .generate_knowledge_embedding(&request)
            .await
        {
            Ok(result) if result.success => {
                info!(agent_id = %agent.id, knowledge_base_id = %agent.knowledge_base_id, "knowledge embedding generated");
                return;
            }
            Ok(result) => result.error.unwrap_or_default(),
            Err(err) => err.to_string(),
        };
        warn!(agent_id = %agent.id, error = %failure, "knowledge embedding failed");
        self.ctx.toaster.show(
            ToastVariant::Warning,
            "agents.embedding_failed.title",
            "agents.embedding_failed.desc",
        );
    }
}
