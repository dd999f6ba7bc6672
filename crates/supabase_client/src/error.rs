use anyhow::{Result, anyhow};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Passes 2xx responses through and turns anything else into an error carrying
/// the platform's own message.
pub(crate) async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, operation, body = %body, "platform request failed");
    Err(anyhow!(error_message(status, &body)))
}

pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
    });
    match message {
        Some(message) if !message.trim().is_empty() => message,
        _ if !body.trim().is_empty() => format!("{status}: {}", body.trim()),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_structured_messages() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"code":"23505","message":"duplicate key value"}"#
            ),
            "duplicate key value"
        );
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, r#"{"msg":"Password should be at least 6 characters"}"#),
            "Password should be at least 6 characters"
        );
    }

    #[test]
    fn falls_back_to_status_and_body() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "502 Bad Gateway: upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "404 Not Found");
    }
}
