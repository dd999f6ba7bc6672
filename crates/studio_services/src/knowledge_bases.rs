use core_types::{
    ChangeFilter, KnowledgeBase, KnowledgeBaseId, KnowledgeBaseInsert, KnowledgeBasePatch, Table,
    TableQuery, UserId,
};
use tracing::{error, info};

use crate::cache::QueryKey;
use crate::context::{StudioContext, decode_row, decode_rows, encode_row};
use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::realtime::{self, WatchGuard};

#[derive(Clone)]
pub struct KnowledgeBaseService {
    ctx: StudioContext,
}

impl KnowledgeBaseService {
    pub fn new(ctx: StudioContext) -> Self {
        Self { ctx }
    }

    pub fn cache_key(owner: UserId) -> QueryKey {
        QueryKey::new(Table::KnowledgeBases, owner)
    }

    /// Last fetched list for the signed-in user, possibly stale.
    pub fn cached(&self) -> Vec<KnowledgeBase> {
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

    /// The user's bases, newest first. Signed out yields an empty list.
    pub async fn list(&self) -> ServiceResult<Vec<KnowledgeBase>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(Vec::new());
        };
        let key = Self::cache_key(user.id);
        if let Some(bases) = self.ctx.cache.get(&key) {
            return Ok(bases);
        }

        let loading = self.ctx.cache.begin_loading(&key);
        let query = TableQuery::new().eq("user_id", user.id).newest_first();
        let fetched = async {
            let rows = self.ctx.tables().select(Table::KnowledgeBases, &query).await?;
            decode_rows::<KnowledgeBase>(rows)
        }
        .await;

        match fetched {
            Ok(bases) => {
                self.ctx.cache.finish_loading(loading, bases.clone());
                Ok(bases)
            }
            Err(err) => {
                error!(error = %err, "failed to fetch knowledge bases");
                Err(self.ctx.fail(
                    "kb.fetch_failed",
                    ServiceError::remote("select knowledge_bases")(err),
                ))
            }
        }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> ServiceResult<KnowledgeBase> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.ctx.fail("kb.name_required", ValidationError::EmptyName.into()));
        }
        let owner = self.ctx.require_user()?;
        let insert = KnowledgeBaseInsert {
            user_id: owner,
            name: name.to_owned(),
            description: non_blank(description),
        };

        let created = async {
            let row = self
                .ctx
                .tables()
                .insert(Table::KnowledgeBases, encode_row(&insert)?)
                .await?;
            decode_row::<KnowledgeBase>(row)
        }
        .await;

        match created {
            Ok(base) => {
                info!(knowledge_base_id = %base.id, "knowledge base created");
                self.ctx.cache.invalidate(&Self::cache_key(owner));
                self.ctx.toaster.success("kb.created");
                Ok(base)
            }
            Err(err) => {
                error!(error = %err, "failed to create knowledge base");
                Err(self.ctx.fail(
                    "kb.create_failed",
                    ServiceError::remote("insert knowledge_bases")(err),
                ))
            }
        }
    }

    pub async fn update(
        &self,
        id: KnowledgeBaseId,
        mut patch: KnowledgeBasePatch,
    ) -> ServiceResult<KnowledgeBase> {
        if let Some(name) = patch.name.as_mut() {
            *name = name.trim().to_owned();
            if name.is_empty() {
                return Err(self.ctx.fail("kb.name_required", ValidationError::EmptyName.into()));
            }
        }
        if let Some(description) = patch.description.as_mut() {
            *description = non_blank(description.as_deref());
        }
        let owner = self.ctx.require_user()?;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);

        let updated = async {
            let row = self
                .ctx
                .tables()
                .update(Table::KnowledgeBases, &query, encode_row(&patch)?)
                .await?;
            decode_row::<KnowledgeBase>(row)
        }
        .await;

        match updated {
            Ok(base) => {
                info!(knowledge_base_id = %id, "knowledge base updated");
                self.ctx.cache.invalidate(&Self::cache_key(owner));
                self.ctx.toaster.success("kb.updated");
                Ok(base)
            }
            Err(err) => {
                error!(knowledge_base_id = %id, error = %err, "failed to update knowledge base");
                Err(self.ctx.fail(
                    "kb.update_failed",
                    ServiceError::remote("update knowledge_bases")(err),
                ))
            }
        }
    }

    /// Deletes a base. Items cascade on the server, so every item list of the
    /// owner is invalidated too.
    pub async fn delete(&self, id: KnowledgeBaseId) -> ServiceResult<()> {
        let owner = self.ctx.require_user()?;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);
        if let Err(err) = self.ctx.tables().delete(Table::KnowledgeBases, &query).await {
            error!(knowledge_base_id = %id, error = %err, "failed to delete knowledge base");
            return Err(self.ctx.fail(
                "kb.delete_failed",
                ServiceError::remote("delete knowledge_bases")(err),
            ));
        }

        info!(knowledge_base_id = %id, "knowledge base deleted");
        self.ctx.cache.invalidate(&Self::cache_key(owner));
        self.ctx.cache.invalidate_owner(Table::KnowledgeItems, owner);
        self.ctx.toaster.success("kb.deleted");
        Ok(())
    }

    pub async fn watch(&self) -> ServiceResult<Option<WatchGuard>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(None);
        };
        realtime::watch(
            &self.ctx,
            ChangeFilter::new(Table::KnowledgeBases).owned_by(user.id),
        )
        .await
    }
}

/// Keeps `current` while it still exists, otherwise falls back to the first base.
pub fn default_selection(
    bases: &[KnowledgeBase],
    current: Option<KnowledgeBaseId>,
) -> Option<KnowledgeBaseId> {
    current
        .filter(|id| bases.iter().any(|base| base.id == *id))
        .or_else(|| bases.first().map(|base| base.id))
}

pub(crate) fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
