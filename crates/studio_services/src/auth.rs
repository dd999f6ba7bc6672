use core_types::{AuthUser, Credentials, Session, ToastVariant};
use tracing::{info, warn};

use crate::context::StudioContext;
use crate::error::{ServiceError, ServiceResult, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AuthService {
    ctx: StudioContext,
}

impl AuthService {
    pub fn new(ctx: StudioContext) -> Self {
        Self { ctx }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.ctx.current_user()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user().is_some()
    }

    /// `Ok(None)` means the account waits for email confirmation.
    pub async fn sign_up(&self, email: &str, password: &str) -> ServiceResult<Option<Session>> {
        let credentials = self.credentials(email, password)?;
        match self.ctx.clients.auth.sign_up(&credentials).await {
            Ok(session) => {
                info!(email = %credentials.email, confirmed = session.is_some(), "signed up");
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    "auth.signup_ok.title",
                    "auth.signup_ok.desc",
                );
                self.ctx.cache.clear();
                Ok(session)
            }
            Err(err) => {
                warn!(error = %err, "sign up failed");
                Err(self
                    .ctx
                    .report("auth.error", ServiceError::remote("sign up")(err)))
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let credentials = self.credentials(email, password)?;
        match self.ctx.clients.auth.sign_in_with_password(&credentials).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "signed in");
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    "auth.signin_ok.title",
                    "auth.signin_ok.desc",
                );
                self.ctx.cache.clear();
                Ok(session)
            }
            Err(err) => {
                warn!(error = %err, "sign in failed");
                Err(self
                    .ctx
                    .report("auth.error", ServiceError::remote("sign in")(err)))
            }
        }
    }

    /// The local session is gone afterwards even when the platform call fails.
    pub async fn sign_out(&self) -> ServiceResult<()> {
        let result = self.ctx.clients.auth.sign_out().await;
        self.ctx.cache.clear();
        match result {
            Ok(()) => {
                info!("signed out");
                self.ctx
                    .toaster
                    .emit(ToastVariant::Default, "auth.signed_out", "");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign out failed");
                Err(self
                    .ctx
                    .report("toast.error", ServiceError::remote("sign out")(err)))
            }
        }
    }

    pub async fn update_password(&self, password: &str, confirm: &str) -> ServiceResult<AuthUser> {
        if password != confirm {
            self.ctx.toaster.show(
                ToastVariant::Destructive,
                "profile.mismatch.title",
                "profile.mismatch.desc",
            );
            return Err(ValidationError::PasswordMismatch.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            self.ctx.toaster.show(
                ToastVariant::Destructive,
                "profile.short.title",
                "profile.short.desc",
            );
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN).into());
        }

        match self.ctx.clients.auth.update_password(password).await {
            Ok(user) => {
                info!(user_id = %user.id, "password updated");
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    "profile.updated.title",
                    "profile.updated.desc",
                );
                Ok(user)
            }
            Err(err) => {
                warn!(error = %err, "password update failed");
                Err(self.ctx.report(
                    "profile.update_failed",
                    ServiceError::remote("update password")(err),
                ))
            }
        }
    }

    fn credentials(&self, email: &str, password: &str) -> ServiceResult<Credentials> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self
                .ctx
                .report("auth.error", ValidationError::MissingCredentials.into()));
        }
        Ok(Credentials::new(email, password))
    }
}

#[cfg(test)]
mod tests {
    use core_types::Toast;

    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn sign_in_and_out_track_the_session() {
        let harness = Harness::signed_out();
        let service = AuthService::new(harness.ctx.clone());
        assert!(!service.is_signed_in());

        let session = service
            .sign_in(" ada@example.com ", "hunter22")
            .await
            .expect("sign in");
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
        assert!(service.is_signed_in());

        service.sign_out().await.expect("sign out");
        assert!(service.current_user().is_none());
        assert_eq!(
            harness.toast_titles(),
            vec!["Welcome back!", "Signed out"]
        );
    }

    #[tokio::test]
    async fn sign_up_waiting_for_confirmation() {
        let harness = Harness::signed_out();
        harness.auth.require_email_confirmation();
        let service = AuthService::new(harness.ctx.clone());

        let session = service.sign_up("new@example.com", "secret1").await.expect("sign up");
        assert!(session.is_none());
        assert_eq!(
            harness.toasts.snapshot(),
            vec![Toast::info(
                "Sign up successful",
                "Please check your email to confirm your account."
            )]
        );
    }

    #[tokio::test]
    async fn provider_errors_surface_their_message() {
        let harness = Harness::signed_out();
        harness.auth.fail_with("Invalid login credentials");
        let service = AuthService::new(harness.ctx.clone());

        service.sign_in("ada@example.com", "wrong").await.expect_err("rejected");
        assert_eq!(
            harness.toasts.last(),
            Some(Toast::error("Authentication Error", "Invalid login credentials"))
        );
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_provider() {
        let harness = Harness::signed_out();
        let service = AuthService::new(harness.ctx.clone());
        let err = service.sign_in("  ", "pw").await.expect_err("blank");
        assert!(err.is_validation());
        assert!(!service.is_signed_in());
    }

    #[tokio::test]
    async fn password_rules_are_checked_locally() {
        let harness = Harness::new();
        let service = AuthService::new(harness.ctx.clone());

        let err = service
            .update_password("abcdef", "abcdeg")
            .await
            .expect_err("mismatch");
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::PasswordMismatch)
        ));
        let err = service.update_password("abc", "abc").await.expect_err("short");
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::PasswordTooShort(6))
        ));
        assert!(harness.auth.passwords().is_empty());

        service
            .update_password("abcdef", "abcdef")
            .await
            .expect("updated");
        assert_eq!(harness.auth.passwords(), vec!["abcdef"]);
        assert_eq!(
            harness.toast_titles(),
            vec!["Password mismatch", "Password too short", "Password updated"]
        );
    }

    #[tokio::test]
    async fn password_update_failure_is_reported() {
        let harness = Harness::new();
        harness.auth.fail_with("New password should be different from the old password.");
        let service = AuthService::new(harness.ctx.clone());

        service
            .update_password("abcdef", "abcdef")
            .await
            .expect_err("fails");
        let last = harness.toasts.last().expect("toast");
        assert_eq!(last.title, "Update failed");
        assert_eq!(
            last.description,
            "New password should be different from the old password."
        );
    }
}
