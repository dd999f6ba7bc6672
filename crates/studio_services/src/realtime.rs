use core_types::{ChangeEvent, ChangeFilter, ChangeKind, Table};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::QueryCache;
use crate::context::StudioContext;
use crate::error::{ServiceError, ServiceResult};

/// Live change subscription; dropping it tears the channel down.
#[derive(Debug)]
pub struct WatchGuard {
    table: Table,
    task: JoinHandle<()>,
}

impl WatchGuard {
    pub fn table(&self) -> Table {
        self.table
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        debug!(table = self.table.name(), "realtime watch dropped");
        self.task.abort();
    }
}

/// Subscribes to changes matching `filter` and marks the affected cache
/// entries stale on every event. Returns `None` when realtime is disabled.
pub async fn watch(ctx: &StudioContext, filter: ChangeFilter) -> ServiceResult<Option<WatchGuard>> {
    let Some(realtime) = ctx.clients.realtime.clone() else {
        return Ok(None);
    };
    let table = filter.table;
    let mut stream = realtime.subscribe(filter.clone()).await.map_err(|err| {
        warn!(table = table.name(), error = %err, "realtime subscribe failed");
        ServiceError::remote("subscribe")(err)
    })?;
    info!(table = table.name(), "watching for changes");

    let cache = ctx.cache.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            apply_change(&cache, &filter, &event);
        }
        debug!(table = filter.table.name(), "change stream ended");
    });
    Ok(Some(WatchGuard { table, task }))
}

pub(crate) fn apply_change(cache: &QueryCache, filter: &ChangeFilter, event: &ChangeEvent) {
    debug!(table = event.table.name(), kind = ?event.kind, "change received");
    match filter.owner {
        Some(owner) => cache.invalidate_owner(event.table, owner),
        None => cache.invalidate_table(event.table),
    }
    // Base deletes cascade to their items on the server.
    if event.table == Table::KnowledgeBases && event.kind == ChangeKind::Delete {
        match filter.owner {
            Some(owner) => cache.invalidate_owner(Table::KnowledgeItems, owner),
            None => cache.invalidate_table(Table::KnowledgeItems),
        }
    }
}
