use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use core_types::{Table, TableClient, TableQuery};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::Platform;
use crate::error::ensure_success;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Row CRUD over PostgREST (`/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct RestApi {
    platform: Platform,
}

impl RestApi {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn table_url(&self, table: Table, query: &TableQuery) -> Result<Url> {
        let mut url = self.platform.url(&format!("rest/v1/{}", table.name()))?;
        encode_query(&mut url, query);
        Ok(url)
    }
}

/// Appends `select=*`, one `column=eq.value` pair per filter and the ordering.
pub(crate) fn encode_query(url: &mut Url, query: &TableQuery) {
    let mut pairs = url.query_pairs_mut();
    pairs.append_pair("select", "*");
    for (column, value) in &query.filters {
        pairs.append_pair(column, &format!("eq.{value}"));
    }
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        pairs.append_pair("order", &format!("{}.{direction}", order.column));
    }
}

#[async_trait]
impl TableClient for RestApi {
    async fn select(&self, table: Table, query: &TableQuery) -> Result<Vec<Value>> {
        let url = self.table_url(table, query)?;
        debug!(table = table.name(), url = %url, "select");
        let response = self
            .platform
            .authorize(self.platform.http.get(url))
            .send()
            .await
            .with_context(|| format!("failed to query {}", table.name()))?;
        let response = ensure_success(response, "select").await?;
        response
            .json::<Vec<Value>>()
            .await
            .context("invalid row list json")
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let url = self.table_url(table, &TableQuery::new())?;
        debug!(table = table.name(), "insert");
        let response = self
            .platform
            .authorize(self.platform.http.post(url))
            .header("Prefer", "return=representation")
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(&row)
            .send()
            .await
            .with_context(|| format!("failed to insert into {}", table.name()))?;
        let response = ensure_success(response, "insert").await?;
        response.json::<Value>().await.context("invalid row json")
    }

    async fn update(&self, table: Table, query: &TableQuery, patch: Value) -> Result<Value> {
        if query.filters.is_empty() {
            return Err(anyhow!("refusing unfiltered update on {}", table.name()));
        }
        let url = self.table_url(table, query)?;
        debug!(table = table.name(), url = %url, "update");
        let response = self
            .platform
            .authorize(self.platform.http.patch(url))
            .header("Prefer", "return=representation")
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(&patch)
            .send()
            .await
            .with_context(|| format!("failed to update {}", table.name()))?;
        let response = ensure_success(response, "update").await?;
        response.json::<Value>().await.context("invalid row json")
    }

    async fn delete(&self, table: Table, query: &TableQuery) -> Result<()> {
        if query.filters.is_empty() {
            return Err(anyhow!("refusing unfiltered delete on {}", table.name()));
        }
        let url = self.table_url(table, query)?;
        debug!(table = table.name(), url = %url, "delete");
        let response = self
            .platform
            .authorize(self.platform.http.delete(url))
            .send()
            .await
            .with_context(|| format!("failed to delete from {}", table.name()))?;
        ensure_success(response, "delete").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::SupabaseClient;

    #[test]
    fn encodes_filters_and_order() {
        let owner = Uuid::new_v4();
        let mut url = Url::parse("https://demo.supabase.co/rest/v1/knowledge_items").expect("url");
        let query = TableQuery::new()
            .eq("user_id", owner)
            .eq("knowledge_base_id", "kb 1")
            .newest_first();
        encode_query(&mut url, &query);

        assert_eq!(
            url.query(),
            Some(
                format!(
                    "select=*&user_id=eq.{owner}&knowledge_base_id=eq.kb+1&order=created_at.desc"
                )
                .as_str()
            )
        );
    }

    #[tokio::test]
    async fn unfiltered_writes_are_refused_locally() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon").expect("client");
        let rest = client.rest();
        let err = rest
            .delete(Table::Agents, &TableQuery::new())
            .await
            .expect_err("no filters");
        assert!(err.to_string().contains("unfiltered delete"));

        let err = rest
            .update(Table::Agents, &TableQuery::new(), serde_json::json!({}))
            .await
            .expect_err("no filters");
        assert!(err.to_string().contains("unfiltered update"));
    }
}
