use core_types::{
    Agent, AgentId, AgentInsert, AgentKind, AgentPatch, AgentStatus, ChangeFilter,
    KnowledgeBase, KnowledgeBaseId, Table, TableQuery, UserId,
};
use tracing::{error, info};

use crate::cache::QueryKey;
use crate::context::{StudioContext, decode_row, decode_rows, encode_row};
use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::knowledge_bases::non_blank;
use crate::realtime::{self, WatchGuard};

/// Form input for a new agent, before a prompt is attached.
#[derive(Debug, Clone, Default)]
pub struct AgentDraft {
    pub name: String,
    pub description: Option<String>,
    pub kind: AgentKind,
    pub knowledge_base_id: Option<KnowledgeBaseId>,
    pub status: AgentStatus,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct AgentService {
    pub(crate) ctx: StudioContext,
}

impl AgentService {
    pub fn new(ctx: StudioContext) -> Self {
        Self { ctx }
    }

    pub fn cache_key(owner: UserId) -> QueryKey {
        QueryKey::new(Table::Agents, owner)
    }

    pub fn cached(&self) -> Vec<Agent> {
        self.ctx
            .current_user()
            .and_then(|user| self.ctx.cache.peek(&Self::cache_key(user.id)))
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.ctx
            .current_user()
            .is_some_and(|user| self.ctx.cache.is_loading(&Self::cache_key(user.id)))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Agent>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(Vec::new());
        };
        let key = Self::cache_key(user.id);
        if let Some(agents) = self.ctx.cache.get(&key) {
            return Ok(agents);
        }

        let loading = self.ctx.cache.begin_loading(&key);
        let query = TableQuery::new().eq("user_id", user.id).newest_first();
        let fetched = async {
            let rows = self.ctx.tables().select(Table::Agents, &query).await?;
            decode_rows::<Agent>(rows)
        }
        .await;

        match fetched {
            Ok(agents) => {
                self.ctx.cache.finish_loading(loading, agents.clone());
                Ok(agents)
            }
            Err(err) => {
                error!(error = %err, "failed to fetch agents");
                Err(self.ctx.fail(
                    "agents.fetch_failed",
                    ServiceError::remote("select agents")(err),
                ))
            }
        }
    }

    /// Creates an agent with the given prompt text.
    pub async fn create(
        &self,
        draft: AgentDraft,
        prompt_content: Option<String>,
    ) -> ServiceResult<Agent> {
        let (name, knowledge_base_id) = self.validate(&draft)?;
        self.insert(draft, name, knowledge_base_id, prompt_content)
            .await
    }

    /// Name first, then knowledge base; both checked before any request.
    pub(crate) fn validate(&self, draft: &AgentDraft) -> ServiceResult<(String, KnowledgeBaseId)> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(self
                .ctx
                .fail("agents.name_required", ValidationError::EmptyName.into()));
        }
        let Some(knowledge_base_id) = draft.knowledge_base_id else {
            return Err(self
                .ctx
                .fail("agents.kb_required", ValidationError::NoKnowledgeBase.into()));
        };
        Ok((name.to_owned(), knowledge_base_id))
    }

    pub(crate) async fn insert(
        &self,
        draft: AgentDraft,
        name: String,
        knowledge_base_id: KnowledgeBaseId,
        prompt_content: Option<String>,
    ) -> ServiceResult<Agent> {
        let owner = self.ctx.require_user()?;
        let insert = AgentInsert {
            user_id: owner,
            name,
            description: non_blank(draft.description.as_deref()),
            kind: draft.kind,
            knowledge_base_id,
            prompt_content,
            status: draft.status,
            avatar_url: draft.avatar_url,
        };

        let created = async {
            let row = self
                .ctx
                .tables()
                .insert(Table::Agents, encode_row(&insert)?)
                .await?;
            decode_row::<Agent>(row)
        }
        .await;

        match created {
            Ok(agent) => {
                info!(agent_id = %agent.id, knowledge_base_id = %knowledge_base_id, "agent created");
                self.ctx.cache.invalidate(&Self::cache_key(owner));
                self.ctx.toaster.success("agents.created");
                Ok(agent)
            }
            Err(err) => {
                error!(error = %err, "failed to create agent");
                Err(self.ctx.fail(
                    "agents.create_failed",
                    ServiceError::remote("insert agents")(err),
                ))
            }
        }
    }

    pub async fn update(&self, id: AgentId, mut patch: AgentPatch) -> ServiceResult<Agent> {
        if let Some(name) = patch.name.as_mut() {
            *name = name.trim().to_owned();
            if name.is_empty() {
                return Err(self
                    .ctx
                    .fail("agents.name_required", ValidationError::EmptyName.into()));
            }
        }
        let owner = self.ctx.require_user()?;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);

        let updated = async {
            let row = self
                .ctx
                .tables()
                .update(Table::Agents, &query, encode_row(&patch)?)
                .await?;
            decode_row::<Agent>(row)
        }
        .await;

        match updated {
            Ok(agent) => {
                info!(agent_id = %id, "agent updated");
                self.ctx.cache.invalidate(&Self::cache_key(owner));
                self.ctx.toaster.success("agents.updated");
                Ok(agent)
            }
            Err(err) => {
                error!(agent_id = %id, error = %err, "failed to update agent");
                Err(self.ctx.fail(
                    "agents.update_failed",
                    ServiceError::remote("update agents")(err),
                ))
            }
        }
    }

    pub async fn delete(&self, id: AgentId) -> ServiceResult<()> {
        let owner = self.ctx.require_user()?;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);
        if let Err(err) = self.ctx.tables().delete(Table::Agents, &query).await {
            error!(agent_id = %id, error = %err, "failed to delete agent");
            return Err(self.ctx.fail(
                "agents.delete_failed",
                ServiceError::remote("delete agents")(err),
            ));
        }

        info!(agent_id = %id, "agent deleted");
        self.ctx.cache.invalidate(&Self::cache_key(owner));
        self.ctx.toaster.success("agents.deleted");
        Ok(())
    }

    pub async fn watch(&self) -> ServiceResult<Option<WatchGuard>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(None);
        };
        realtime::watch(&self.ctx, ChangeFilter::new(Table::Agents).owned_by(user.id)).await
    }

    pub fn knowledge_base_name(&self, id: KnowledgeBaseId, bases: &[KnowledgeBase]) -> String {
        bases
            .iter()
            .find(|base| base.id == id)
            .map(|base| base.name.clone())
            .unwrap_or_else(|| self.ctx.toaster.t("agents.unknown_kb"))
    }
}
