pub mod agent_builder;
pub mod agents;
pub mod auth;
pub mod avatar;
pub mod cache;
pub mod context;
pub mod error;
pub mod ingestion;
pub mod knowledge_bases;
pub mod knowledge_items;
pub mod realtime;
pub mod toast;
pub mod usage;

#[cfg(test)]
mod testing;

use core_types::Agent;

pub use agent_builder::{
    DEFAULT_GREETING_TEMPLATE, DEFAULT_MESSAGE_TEMPLATE, PromptSource, compose_prompt,
};
pub use agents::{AgentDraft, AgentService};
pub use auth::AuthService;
pub use avatar::AvatarService;
pub use cache::{QueryCache, QueryKey};
pub use context::{ServiceSettings, StudioClients, StudioContext};
pub use error::{ServiceError, ServiceResult, ValidationError};
pub use ingestion::IngestionService;
pub use knowledge_bases::{KnowledgeBaseService, default_selection};
pub use knowledge_items::{KnowledgeItemService, NewKnowledgeItem};
pub use realtime::WatchGuard;
pub use toast::{ToastLog, Toaster};
pub use usage::{Sender, UsageMessage, UsageMode, UsageSession, UsageState, VoiceTimings};

/// Every service, sharing one context.
#[derive(Clone)]
pub struct Studio {
    pub auth: AuthService,
    pub knowledge_bases: KnowledgeBaseService,
    pub knowledge_items: KnowledgeItemService,
    pub ingestion: IngestionService,
    pub agents: AgentService,
    pub avatars: AvatarService,
    ctx: StudioContext,
}

impl Studio {
    pub fn new(ctx: StudioContext) -> Self {
        Self {
            auth: AuthService::new(ctx.clone()),
            knowledge_bases: KnowledgeBaseService::new(ctx.clone()),
            knowledge_items: KnowledgeItemService::new(ctx.clone()),
            ingestion: IngestionService::new(ctx.clone()),
            agents: AgentService::new(ctx.clone()),
            avatars: AvatarService::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &StudioContext {
        &self.ctx
    }

    pub fn usage(&self, agent: Agent) -> UsageSession {
        UsageSession::new(self.ctx.clone(), agent)
    }
}

#[cfg(test)]
mod tests {
    use core_types::{FileUpload, KnowledgeItemStatus};

    use super::*;
    use crate::testing::{Harness, extracted};

    #[tokio::test]
    async fn knowledge_base_to_agent_walkthrough() {
        let harness = Harness::new();
        let studio = Studio::new(harness.ctx.clone());

        let base = studio
            .knowledge_bases
            .create("Product docs", Some("Manuals"))
            .await
            .expect("base");
        let selected = default_selection(&studio.knowledge_bases.list().await.expect("list"), None);
        assert_eq!(selected, Some(base.id));

        harness
            .extractor
            .push_pdf(Ok(extracted("Quarterly Report", "Revenue grew.")));
        studio
            .ingestion
            .add_pdf(
                selected,
                FileUpload::new("report.pdf", FileUpload::PDF_MIME, vec![0; 64]),
            )
            .await
            .expect("pdf");
        studio
            .ingestion
            .add_text(selected, "Hours", "9 to 5")
            .await
            .expect("text");

        let items = studio.knowledge_items.list(base.id).await.expect("items");
        assert_eq!(items.len(), 2);
        assert!(
            items
                .iter()
                .all(|item| item.status == KnowledgeItemStatus::Completed)
        );

        let agent = studio
            .agents
            .create_with_prompt(
                AgentDraft {
                    name: "Helper".to_owned(),
                    knowledge_base_id: selected,
                    ..AgentDraft::default()
                },
                PromptSource::default(),
            )
            .await
            .expect("agent");
        let session = studio.usage(agent);
        session.start_chat();
        assert_eq!(
            session.snapshot().messages[0].text,
            DEFAULT_GREETING_TEMPLATE
        );
    }
}
