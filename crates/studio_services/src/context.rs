use std::sync::Arc;

use anyhow::{Context, Result};
use config::AppConfig;
use core_types::{
    AuthClient, AuthUser, ContentExtractor, ObjectStorage, RealtimeClient, TableClient,
    ToastVariant, UserId,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::cache::QueryCache;
use crate::error::{ServiceError, ServiceResult};
use crate::toast::Toaster;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub avatar_bucket: String,
    pub mark_failed_items: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            avatar_bucket: config::DEFAULT_AVATAR_BUCKET.to_owned(),
            mark_failed_items: false,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            avatar_bucket: config.platform.avatar_bucket.clone(),
            mark_failed_items: config.ingestion.mark_failed_items,
        }
    }
}

/// Client handles for every external collaborator.
#[derive(Clone)]
pub struct StudioClients {
    pub tables: Arc<dyn TableClient>,
    pub auth: Arc<dyn AuthClient>,
    pub storage: Arc<dyn ObjectStorage>,
    pub realtime: Option<Arc<dyn RealtimeClient>>,
    pub extractor: Arc<dyn ContentExtractor>,
}

/// Shared state handed to every service: clients, cache, toasts, settings.
#[derive(Clone)]
pub struct StudioContext {
    pub(crate) clients: StudioClients,
    pub(crate) toaster: Toaster,
    pub(crate) cache: QueryCache,
    pub(crate) settings: ServiceSettings,
}

impl StudioContext {
    pub fn new(clients: StudioClients, toaster: Toaster, settings: ServiceSettings) -> Self {
        Self {
            clients,
            toaster,
            cache: QueryCache::new(),
            settings,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn toaster(&self) -> &Toaster {
        &self.toaster
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub(crate) fn tables(&self) -> &dyn TableClient {
        self.clients.tables.as_ref()
    }

    pub(crate) fn extractor(&self) -> &dyn ContentExtractor {
        self.clients.extractor.as_ref()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.clients
            .auth
            .current_session()
            .map(|session| session.user)
    }

    /// Signed-in user id, or an "Error / User not authenticated" toast.
    pub(crate) fn require_user(&self) -> ServiceResult<UserId> {
        match self.current_user() {
            Some(user) => Ok(user.id),
            None => {
                warn!("operation attempted without a session");
                self.toaster
                    .show(ToastVariant::Destructive, "toast.error", "auth.required");
                Err(ServiceError::NotAuthenticated)
            }
        }
    }

    /// Destructive toast with the error text, then hands the error back.
    pub(crate) fn report(&self, title_key: &str, err: ServiceError) -> ServiceError {
        self.toaster
            .emit(ToastVariant::Destructive, title_key, err.user_message());
        err
    }

    /// "Error" toast with a fixed catalogue description, then hands the error back.
    pub(crate) fn fail(&self, description_key: &str, err: ServiceError) -> ServiceError {
        self.toaster.failure(description_key);
        err
    }
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).context("unexpected row shape"))
        .collect()
}

pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    serde_json::from_value(row).context("unexpected row shape")
}

pub(crate) fn encode_row<T: serde::Serialize>(row: &T) -> Result<Value> {
    serde_json::to_value(row).context("failed to encode row")
}
