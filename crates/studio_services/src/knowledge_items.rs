use core_types::{
    ChangeFilter, KnowledgeBaseId, KnowledgeItem, KnowledgeItemId, KnowledgeItemInsert,
    KnowledgeItemKind, KnowledgeItemPatch, KnowledgeItemStatus, Table, TableQuery, ToastVariant,
    UserId,
};
use tracing::{debug, error, info};

use crate::cache::QueryKey;
use crate::context::{StudioContext, decode_row, decode_rows, encode_row};
use crate::error::{ServiceError, ServiceResult};
use crate::realtime::{self, WatchGuard};

#[derive(Debug, Clone)]
pub struct NewKnowledgeItem {
    pub knowledge_base_id: KnowledgeBaseId,
    pub kind: KnowledgeItemKind,
    pub title: String,
    pub content: Option<String>,
    pub status: KnowledgeItemStatus,
    pub url: Option<String>,
    pub file_name: Option<String>,
}

/// Item rows of one knowledge base. `create` and `update` do not toast; the
/// ingestion workflow reports on their behalf.
#[derive(Clone)]
pub struct KnowledgeItemService {
    ctx: StudioContext,
}

impl KnowledgeItemService {
    pub fn new(ctx: StudioContext) -> Self {
        Self { ctx }
    }

    pub fn cache_key(owner: UserId, knowledge_base_id: KnowledgeBaseId) -> QueryKey {
        QueryKey::scoped(Table::KnowledgeItems, owner, knowledge_base_id)
    }

    pub fn cached(&self, knowledge_base_id: KnowledgeBaseId) -> Vec<KnowledgeItem> {
        self.ctx
            .current_user()
            .and_then(|user| {
                self.ctx
                    .cache
                    .peek(&Self::cache_key(user.id, knowledge_base_id))
            })
            .unwrap_or_default()
    }

    pub fn is_loading(&self, knowledge_base_id: KnowledgeBaseId) -> bool {
        self.ctx.current_user().is_some_and(|user| {
            self.ctx
                .cache
                .is_loading(&Self::cache_key(user.id, knowledge_base_id))
        })
    }

    pub async fn list(&self, knowledge_base_id: KnowledgeBaseId) -> ServiceResult<Vec<KnowledgeItem>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(Vec::new());
        };
        let key = Self::cache_key(user.id, knowledge_base_id);
        if let Some(items) = self.ctx.cache.get(&key) {
            return Ok(items);
        }

        let loading = self.ctx.cache.begin_loading(&key);
        let query = TableQuery::new()
            .eq("knowledge_base_id", knowledge_base_id)
            .eq("user_id", user.id)
            .newest_first();
        let fetched = async {
            let rows = self.ctx.tables().select(Table::KnowledgeItems, &query).await?;
            decode_rows::<KnowledgeItem>(rows)
        }
        .await;

        match fetched {
            Ok(items) => {
                debug!(knowledge_base_id = %knowledge_base_id, count = items.len(), "knowledge items fetched");
                self.ctx.cache.finish_loading(loading, items.clone());
                Ok(items)
            }
            Err(err) => {
                error!(knowledge_base_id = %knowledge_base_id, error = %err, "failed to fetch knowledge items");
                Err(self.ctx.fail(
                    "items.fetch_failed",
                    ServiceError::remote("select knowledge_items")(err),
                ))
            }
        }
    }

    pub async fn create(&self, item: NewKnowledgeItem) -> ServiceResult<KnowledgeItem> {
        let owner = self
            .ctx
            .current_user()
            .ok_or(ServiceError::NotAuthenticated)?
            .id;
        let insert = KnowledgeItemInsert {
            user_id: owner,
            knowledge_base_id: item.knowledge_base_id,
            kind: item.kind,
            title: item.title,
            content: item.content,
            status: item.status,
            url: item.url,
            file_name: item.file_name,
        };
        let row = async {
            let row = self
                .ctx
                .tables()
                .insert(Table::KnowledgeItems, encode_row(&insert)?)
                .await?;
            decode_row::<KnowledgeItem>(row)
        }
        .await
        .map_err(ServiceError::remote("insert knowledge_items"))?;

        info!(item_id = %row.id, kind = ?row.kind, status = ?row.status, "knowledge item created");
        self.ctx
            .cache
            .invalidate(&Self::cache_key(owner, row.knowledge_base_id));
        Ok(row)
    }

    pub async fn update(
        &self,
        id: KnowledgeItemId,
        patch: KnowledgeItemPatch,
    ) -> ServiceResult<KnowledgeItem> {
        let owner = self
            .ctx
            .current_user()
            .ok_or(ServiceError::NotAuthenticated)?
            .id;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);
        let row = async {
            let row = self
                .ctx
                .tables()
                .update(Table::KnowledgeItems, &query, encode_row(&patch)?)
                .await?;
            decode_row::<KnowledgeItem>(row)
        }
        .await
        .map_err(ServiceError::remote("update knowledge_items"))?;

        info!(item_id = %id, status = ?row.status, "knowledge item updated");
        self.ctx
            .cache
            .invalidate(&Self::cache_key(owner, row.knowledge_base_id));
        Ok(row)
    }

    pub async fn delete(&self, id: KnowledgeItemId) -> ServiceResult<()> {
        let owner = self.ctx.require_user()?;
        let query = TableQuery::new().eq("id", id).eq("user_id", owner);
        if let Err(err) = self.ctx.tables().delete(Table::KnowledgeItems, &query).await {
            error!(item_id = %id, error = %err, "failed to delete knowledge item");
            return Err(self.ctx.report(
                "items.delete_failed",
                ServiceError::remote("delete knowledge_items")(err),
            ));
        }

        info!(item_id = %id, "knowledge item deleted");
        self.ctx.cache.invalidate_owner(Table::KnowledgeItems, owner);
        self.ctx
            .toaster
            .show(ToastVariant::Default, "items.deleted.title", "items.deleted.desc");
        Ok(())
    }

    pub async fn watch(&self) -> ServiceResult<Option<WatchGuard>> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(None);
        };
        realtime::watch(
            &self.ctx,
            ChangeFilter::new(Table::KnowledgeItems).owned_by(user.id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{GatedTables, Harness, TableOp};

    fn text_item(knowledge_base_id: KnowledgeBaseId, title: &str) -> NewKnowledgeItem {
        NewKnowledgeItem {
            knowledge_base_id,
            kind: KnowledgeItemKind::Text,
            title: title.to_owned(),
            content: Some("body".to_owned()),
            status: KnowledgeItemStatus::Completed,
            url: None,
            file_name: None,
        }
    }

    #[tokio::test]
    async fn lists_are_scoped_to_one_base() {
        let harness = Harness::new();
        let service = KnowledgeItemService::new(harness.ctx.clone());
        let (docs, faq) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        service.create(text_item(docs, "a")).await.expect("a");
        service.create(text_item(faq, "b")).await.expect("b");
        service.create(text_item(docs, "c")).await.expect("c");

        let titles: Vec<String> = service
            .list(docs)
            .await
            .expect("list")
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, vec!["c", "a"]);
        assert_eq!(service.cached(faq).len(), 0);
        assert_eq!(service.list(faq).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn create_and_update_stay_quiet() {
        let harness = Harness::new();
        let service = KnowledgeItemService::new(harness.ctx.clone());
        let item = service
            .create(text_item(uuid::Uuid::new_v4(), "draft"))
            .await
            .expect("create");
        let updated = service
            .update(item.id, KnowledgeItemPatch::completed("final", "text"))
            .await
            .expect("update");
        assert_eq!(updated.title, "final");
        assert!(harness.toasts.snapshot().is_empty());

        harness.tables.fail_on(Table::KnowledgeItems, TableOp::Insert);
        let err = service
            .create(text_item(uuid::Uuid::new_v4(), "x"))
            .await
            .expect_err("fails");
        assert!(matches!(err, ServiceError::Remote { .. }));
        assert!(harness.toasts.snapshot().is_empty());
    }

    #[tokio::test]
    async fn delete_toasts_outcome() {
        let harness = Harness::new();
        let service = KnowledgeItemService::new(harness.ctx.clone());
        let item = service
            .create(text_item(uuid::Uuid::new_v4(), "gone"))
            .await
            .expect("create");

        service.delete(item.id).await.expect("delete");
        assert_eq!(harness.toast_titles(), vec!["Item deleted"]);
        assert!(harness.tables.rows(Table::KnowledgeItems).is_empty());

        harness.tables.fail_on(Table::KnowledgeItems, TableOp::Delete);
        service.delete(item.id).await.expect_err("fails");
        let last = harness.toasts.last().expect("toast");
        assert_eq!(last.title, "Delete failed");
        assert_eq!(last.description, "permission denied for table knowledge_items");
        assert_eq!(last.variant, ToastVariant::Destructive);
    }

    #[tokio::test]
    async fn loading_flag_spans_the_fetch() {
        let harness = Harness::new();
        let gated = Arc::new(GatedTables::new(harness.tables.clone()));
        let service = KnowledgeItemService::new(harness.context_with_tables(gated.clone()));
        let kb = uuid::Uuid::new_v4();
        assert!(!service.is_loading(kb));

        let fetch = tokio::spawn({
            let service = service.clone();
            async move { service.list(kb).await }
        });
        gated.rows_read().await;
        assert!(service.is_loading(kb));

        gated.release();
        fetch.await.expect("join").expect("list");
        assert!(!service.is_loading(kb));
    }
}
