//! Client for the hosted data/auth platform: PostgREST tables, password auth,
//! object storage and the realtime change feed.
//!
//! All four APIs share one [`SessionStore`], so a sign-in immediately scopes
//! every later table request to the signed-in user.

mod auth;
mod error;
mod realtime;
mod rest;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use core_types::Session;
use parking_lot::RwLock;
use reqwest::RequestBuilder;
use url::Url;

pub use auth::AuthApi;
pub use realtime::RealtimeApi;
pub use rest::RestApi;
pub use storage::StorageApi;

/// The signed-in session, shared by every API handle.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn get(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    pub fn set(&self, session: Option<Session>) {
        *self.inner.write() = session;
    }

    fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Platform {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    session: SessionStore,
}

impl Platform {
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid platform path `{path}`"))
    }

    /// Attaches the api key plus the user's bearer token, falling back to the
    /// anon key before sign-in.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    platform: Platform,
    heartbeat: Duration,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();
        if base_url.trim().is_empty() || anon_key.trim().is_empty() {
            bail!("platform url and anon key are required");
        }
        let mut base_url =
            Url::parse(base_url.trim()).with_context(|| format!("invalid platform url `{base_url}`"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            platform: Platform {
                http: reqwest::Client::new(),
                base_url,
                anon_key,
                session: SessionStore::default(),
            },
            heartbeat: Duration::from_secs(30),
        })
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat.max(Duration::from_secs(1));
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.platform.session
    }

    pub fn rest(&self) -> RestApi {
        RestApi::new(self.platform.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.platform.clone())
    }

    pub fn storage(&self) -> StorageApi {
        StorageApi::new(self.platform.clone())
    }

    pub fn realtime(&self) -> RealtimeApi {
        RealtimeApi::new(self.platform.clone(), self.heartbeat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_url_and_joins_paths() {
        let client = SupabaseClient::new("https://demo.supabase.co", "anon").expect("client");
        let url = client.platform.url("/rest/v1/agents").expect("url");
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/agents");

        let nested = SupabaseClient::new("http://localhost:54321/proxy", "anon").expect("client");
        let url = nested.platform.url("auth/v1/token").expect("url");
        assert_eq!(url.as_str(), "http://localhost:54321/proxy/auth/v1/token");
    }

    #[test]
    fn requires_url_and_key() {
        assert!(SupabaseClient::new("", "anon").is_err());
        assert!(SupabaseClient::new("https://demo.supabase.co", " ").is_err());
        assert!(SupabaseClient::new("not a url", "anon").is_err());
    }
}
