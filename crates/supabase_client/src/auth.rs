use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use core_types::{AuthClient, AuthUser, Credentials, Session};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::Platform;
use crate::error::ensure_success;

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for PasswordGrant<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            email: credentials.email.trim(),
            password: &credentials.password,
        }
    }
}

/// Password auth over `/auth/v1`.
#[derive(Debug, Clone)]
pub struct AuthApi {
    platform: Platform,
}

impl AuthApi {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

/// Signup answers with a full session when confirmation is disabled and with a
/// bare user otherwise.
pub(crate) fn session_from_signup(body: Value) -> Result<Option<Session>> {
    if body.get("access_token").is_none() {
        return Ok(None);
    }
    let session = serde_json::from_value(body).context("invalid session json")?;
    Ok(Some(session))
}

#[async_trait]
impl AuthClient for AuthApi {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>> {
        let url = self.platform.url("auth/v1/signup")?;
        let response = self
            .platform
            .authorize(self.platform.http.post(url))
            .json(&PasswordGrant::from(credentials))
            .send()
            .await
            .context("failed to reach auth service")?;
        let response = ensure_success(response, "sign_up").await?;
        let body = response.json::<Value>().await.context("invalid signup json")?;
        let session = session_from_signup(body)?;
        if let Some(session) = &session {
            info!(user_id = %session.user.id, "signed up with immediate session");
            self.platform.session.set(Some(session.clone()));
        }
        Ok(session)
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let mut url = self.platform.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self
            .platform
            .authorize(self.platform.http.post(url))
            .json(&PasswordGrant::from(credentials))
            .send()
            .await
            .context("failed to reach auth service")?;
        let response = ensure_success(response, "sign_in").await?;
        let session: Session = response.json().await.context("invalid session json")?;
        info!(user_id = %session.user.id, "signed in");
        self.platform.session.set(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.platform.session.get().is_none() {
            return Ok(());
        }
        let url = self.platform.url("auth/v1/logout")?;
        let result = self
            .platform
            .authorize(self.platform.http.post(url))
            .send()
            .await
            .context("failed to reach auth service");
        self.platform.session.set(None);
        match result {
            Ok(response) => {
                ensure_success(response, "sign_out").await?;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign out request failed; local session cleared");
                Err(err)
            }
        }
    }

    async fn update_password(&self, password: &str) -> Result<AuthUser> {
        if self.platform.session.get().is_none() {
            bail!("Auth session missing!");
        }
        let url = self.platform.url("auth/v1/user")?;
        let response = self
            .platform
            .authorize(self.platform.http.put(url))
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await
            .context("failed to reach auth service")?;
        let response = ensure_success(response, "update_user").await?;
        response.json::<AuthUser>().await.context("invalid user json")
    }

    fn current_session(&self) -> Option<Session> {
        self.platform.session.get()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SupabaseClient;

    #[test]
    fn signup_without_token_means_confirmation_pending() {
        let body = json!({
            "id": "0b7f3a51-95a4-4c1b-8ad9-9e1b1c7a3f20",
            "email": "ana@example.com",
            "confirmation_sent_at": "2025-03-01T10:00:00Z"
        });
        assert!(session_from_signup(body).expect("parse").is_none());
    }

    #[test]
    fn signup_with_token_yields_session() {
        let body = json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1740826800,
            "refresh_token": "refresh",
            "user": {"id": "0b7f3a51-95a4-4c1b-8ad9-9e1b1c7a3f20", "email": "ana@example.com"}
        });
        let session = session_from_signup(body).expect("parse").expect("session");
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn password_update_needs_a_session() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon").expect("client");
        let err = client
            .auth()
            .update_password("hunter22")
            .await
            .expect_err("no session");
        assert_eq!(err.to_string(), "Auth session missing!");
        assert!(client.auth().sign_out().await.is_ok());
    }
}
