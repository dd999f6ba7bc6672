//! In-memory collaborators for exercising services without a network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use core_types::{
    AgentQuery, AuthClient, AuthUser, ChangeEvent, ChangeFilter, ChangeStream, ContentExtractor,
    Credentials, EmbeddingRequest, EmbeddingResult, ExtractionResult, FileUpload, ObjectStorage,
    QueryResult, RealtimeClient, Session, Table, TableClient, TableQuery,
};
use i18n::I18n;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use crate::context::{ServiceSettings, StudioClients, StudioContext};
use crate::toast::{ToastLog, Toaster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// Row store keyed by table with equality filtering, newest-first ordering,
/// generated ids and timestamps, and kb -> item cascade on delete.
#[derive(Default)]
pub struct MemoryTables {
    rows: Mutex<HashMap<Table, Vec<Value>>>,
    failing: Mutex<HashSet<(Table, TableOp)>>,
    calls: Mutex<Vec<(Table, TableOp)>>,
    clock: Mutex<i64>,
}

impl MemoryTables {
    pub fn fail_on(&self, table: Table, op: TableOp) {
        self.failing.lock().insert((table, op));
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.rows.lock().get(&table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<(Table, TableOp)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn enter(&self, table: Table, op: TableOp) -> Result<()> {
        self.calls.lock().push((table, op));
        if self.failing.lock().contains(&(table, op)) {
            bail!("permission denied for table {}", table.name());
        }
        Ok(())
    }

    fn tick(&self) -> String {
        let mut clock = self.clock.lock();
        *clock += 1;
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).single().unwrap_or_default();
        (base + Duration::seconds(*clock)).to_rfc3339()
    }
}

/// [`MemoryTables`] whose `select` holds its rows until released, to stage
/// changes that land while a fetch is in flight.
pub struct GatedTables {
    inner: Arc<MemoryTables>,
    read: Notify,
    release: Notify,
}

impl GatedTables {
    pub fn new(inner: Arc<MemoryTables>) -> Self {
        Self {
            inner,
            read: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a `select` has read its rows and is waiting.
    pub async fn rows_read(&self) {
        self.read.notified().await;
    }

    /// Lets one waiting (or the next) `select` return.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl TableClient for GatedTables {
    async fn select(&self, table: Table, query: &TableQuery) -> Result<Vec<Value>> {
        let rows = self.inner.select(table, query).await?;
        self.read.notify_one();
        self.release.notified().await;
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, query: &TableQuery, patch: Value) -> Result<Value> {
        self.inner.update(table, query, patch).await
    }

    async fn delete(&self, table: Table, query: &TableQuery) -> Result<()> {
        self.inner.delete(table, query).await
    }
}

fn matches(row: &Value, query: &TableQuery) -> bool {
    query.filters.iter().all(|(column, expected)| match row.get(column) {
        Some(Value::String(actual)) => actual == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == *expected,
    })
}

#[async_trait]
impl TableClient for MemoryTables {
    async fn select(&self, table: Table, query: &TableQuery) -> Result<Vec<Value>> {
        self.enter(table, TableOp::Select)?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, query))
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let key = |row: &Value| row[&order.column].as_str().unwrap_or_default().to_owned();
                let ordering = key(a).cmp(&key(b));
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.enter(table, TableOp::Insert)?;
        let Value::Object(mut row) = row else {
            bail!("insert expects an object");
        };
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let now = Value::String(self.tick());
        row.insert("created_at".to_owned(), now.clone());
        row.insert("updated_at".to_owned(), now);
        let row = Value::Object(row);
        self.rows.lock().entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, query: &TableQuery, patch: Value) -> Result<Value> {
        self.enter(table, TableOp::Update)?;
        let Value::Object(patch) = patch else {
            bail!("update expects an object");
        };
        let updated_at = self.tick();
        let mut rows = self.rows.lock();
        let row = rows
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|row| matches(row, query))
            .ok_or_else(|| anyhow!("JSON object requested, multiple (or no) rows returned"))?;
        if let Value::Object(fields) = row {
            merge(fields, patch);
            fields.insert("updated_at".to_owned(), Value::String(updated_at));
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, query: &TableQuery) -> Result<()> {
        self.enter(table, TableOp::Delete)?;
        let mut rows = self.rows.lock();
        let entries = rows.entry(table).or_default();
        let removed: Vec<String> = entries
            .iter()
            .filter(|row| matches(row, query))
            .filter_map(|row| row["id"].as_str().map(str::to_owned))
            .collect();
        entries.retain(|row| !matches(row, query));

        if table == Table::KnowledgeBases {
            rows.entry(Table::KnowledgeItems).or_default().retain(|item| {
                !removed
                    .iter()
                    .any(|id| item["knowledge_base_id"].as_str() == Some(id.as_str()))
            });
        }
        Ok(())
    }
}

fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

pub type Scripted<T> = std::result::Result<T, String>;

/// Extractor that replays queued responses and counts calls.
#[derive(Default)]
pub struct ScriptedExtractor {
    pdf: Mutex<VecDeque<Scripted<ExtractionResult>>>,
    url: Mutex<VecDeque<Scripted<ExtractionResult>>>,
    query: Mutex<VecDeque<Scripted<QueryResult>>>,
    embedding: Mutex<VecDeque<Scripted<EmbeddingResult>>>,
    calls: Mutex<Vec<&'static str>>,
    queries: Mutex<Vec<AgentQuery>>,
    embeddings: Mutex<Vec<EmbeddingRequest>>,
}

impl ScriptedExtractor {
    pub fn push_pdf(&self, result: Scripted<ExtractionResult>) {
        self.pdf.lock().push_back(result);
    }

    pub fn push_url(&self, result: Scripted<ExtractionResult>) {
        self.url.lock().push_back(result);
    }

    pub fn push_query(&self, result: Scripted<QueryResult>) {
        self.query.lock().push_back(result);
    }

    pub fn push_embedding(&self, result: Scripted<EmbeddingResult>) {
        self.embedding.lock().push_back(result);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn queries(&self) -> Vec<AgentQuery> {
        self.queries.lock().clone()
    }

    pub fn embeddings(&self) -> Vec<EmbeddingRequest> {
        self.embeddings.lock().clone()
    }

    fn next<T>(&self, name: &'static str, queue: &Mutex<VecDeque<Scripted<T>>>) -> Result<T> {
        self.calls.lock().push(name);
        match queue.lock().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted response for {name}")),
        }
    }
}

pub fn extracted(title: &str, content: &str) -> ExtractionResult {
    ExtractionResult {
        content: content.to_owned(),
        title: title.to_owned(),
        success: true,
        error: None,
    }
}

#[async_trait]
impl ContentExtractor for ScriptedExtractor {
    async fn extract_pdf(&self, _file: &FileUpload) -> Result<ExtractionResult> {
        self.next("extract_pdf", &self.pdf)
    }

    async fn extract_url(&self, _url: &str) -> Result<ExtractionResult> {
        self.next("extract_url", &self.url)
    }

    async fn query_agent(&self, query: &AgentQuery) -> Result<QueryResult> {
        self.queries.lock().push(query.clone());
        self.next("query", &self.query)
    }

    async fn generate_knowledge_embedding(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResult> {
        self.embeddings.lock().push(request.clone());
        self.calls.lock().push("knowledge_embedding");
        match self.embedding.lock().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(EmbeddingResult {
                success: true,
                error: None,
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeAuth {
    session: Mutex<Option<Session>>,
    failure: Mutex<Option<String>>,
    confirm_email: Mutex<bool>,
    passwords: Mutex<Vec<String>>,
}

impl FakeAuth {
    pub fn signed_in(user: AuthUser) -> Self {
        let auth = Self::default();
        *auth.session.lock() = Some(session_for(user));
        auth
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_owned());
    }

    pub fn require_email_confirmation(&self) {
        *self.confirm_email.lock() = true;
    }

    pub fn passwords(&self) -> Vec<String> {
        self.passwords.lock().clone()
    }

    fn check(&self) -> Result<()> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

fn session_for(user: AuthUser) -> Session {
    Session {
        access_token: "test-token".to_owned(),
        refresh_token: None,
        expires_at: None,
        user,
    }
}

#[async_trait]
impl AuthClient for FakeAuth {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>> {
        self.check()?;
        if *self.confirm_email.lock() {
            return Ok(None);
        }
        let session = session_for(AuthUser {
            id: Uuid::new_v4(),
            email: Some(credentials.email.clone()),
        });
        *self.session.lock() = Some(session.clone());
        Ok(Some(session))
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        self.check()?;
        let session = session_for(AuthUser {
            id: Uuid::new_v4(),
            email: Some(credentials.email.clone()),
        });
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.lock() = None;
        self.check()
    }

    async fn update_password(&self, password: &str) -> Result<AuthUser> {
        self.check()?;
        let user = self
            .session
            .lock()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or_else(|| anyhow!("Auth session missing!"))?;
        self.passwords.lock().push(password.to_owned());
        Ok(user)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.lock().clone()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, usize>>,
    removed: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl MemoryStorage {
    pub fn fail(&self) {
        *self.failing.lock() = true;
    }

    pub fn objects(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, bucket: &str, path: &str, file: &FileUpload) -> Result<()> {
        if *self.failing.lock() {
            bail!("The resource already exists");
        }
        self.objects
            .lock()
            .insert(format!("{bucket}/{path}"), file.size());
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        if *self.failing.lock() {
            bail!("Object not found");
        }
        let mut objects = self.objects.lock();
        for path in paths {
            let key = format!("{bucket}/{path}");
            objects.remove(&key);
            self.removed.lock().push(key);
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://demo.supabase.co/storage/v1/object/public/{bucket}/{path}")
    }
}

/// Realtime fake whose streams are fed by `emit`.
#[derive(Default)]
pub struct ChannelRealtime {
    subscribers: Mutex<Vec<(ChangeFilter, mpsc::UnboundedSender<ChangeEvent>)>>,
}

impl ChannelRealtime {
    pub fn emit(&self, event: ChangeEvent) {
        for (filter, tx) in self.subscribers.lock().iter() {
            if filter.table == event.table {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub fn open_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }
}

#[async_trait]
impl RealtimeClient for ChannelRealtime {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((filter, tx));
        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })))
    }
}

/// A signed-in context wired to the fakes above.
pub struct Harness {
    pub user: AuthUser,
    pub tables: Arc<MemoryTables>,
    pub auth: Arc<FakeAuth>,
    pub storage: Arc<MemoryStorage>,
    pub extractor: Arc<ScriptedExtractor>,
    pub realtime: Arc<ChannelRealtime>,
    pub toasts: Arc<ToastLog>,
    pub ctx: StudioContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(ServiceSettings::default())
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("owner@example.com".to_owned()),
        };
        Self::build(Arc::new(FakeAuth::signed_in(user.clone())), user, settings)
    }

    pub fn signed_out() -> Self {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
        };
        Self::build(Arc::new(FakeAuth::default()), user, ServiceSettings::default())
    }

    fn build(auth: Arc<FakeAuth>, user: AuthUser, settings: ServiceSettings) -> Self {
        let tables = Arc::new(MemoryTables::default());
        let storage = Arc::new(MemoryStorage::default());
        let extractor = Arc::new(ScriptedExtractor::default());
        let realtime = Arc::new(ChannelRealtime::default());
        let toasts = Arc::new(ToastLog::default());
        let clients = StudioClients {
            tables: tables.clone(),
            auth: auth.clone(),
            storage: storage.clone(),
            realtime: Some(realtime.clone()),
            extractor: extractor.clone(),
        };
        let toaster = Toaster::new(toasts.clone(), Arc::new(I18n::default()));
        let ctx = StudioContext::new(clients, toaster, settings);
        Self {
            user,
            tables,
            auth,
            storage,
            extractor,
            realtime,
            toasts,
            ctx,
        }
    }

    /// Same collaborators, but rows go through `tables`.
    pub fn context_with_tables(&self, tables: Arc<dyn TableClient>) -> StudioContext {
        let clients = StudioClients {
            tables,
            auth: self.auth.clone(),
            storage: self.storage.clone(),
            realtime: Some(self.realtime.clone()),
            extractor: self.extractor.clone(),
        };
        let toaster = Toaster::new(self.toasts.clone(), Arc::new(I18n::default()));
        StudioContext::new(clients, toaster, self.ctx.settings().clone())
    }

    pub fn toast_titles(&self) -> Vec<String> {
        self.toasts.titles()
    }

    pub fn toast_descriptions(&self) -> Vec<String> {
        self.toasts
            .snapshot()
            .into_iter()
            .map(|toast| toast.description)
            .collect()
    }
}
