//! Session resolution for cookie and bearer auth, plus logout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use crate::api::GatewayState;
use crate::session::{SessionStoreError, UserSession};

/// Resolve the request's session token and record.
///
/// A missing or unknown token yields the anonymous session so that every
/// downstream failure path looks identical to a caller probing for valid
/// identifiers.
pub(crate) fn resolve_session(
    headers: &HeaderMap,
    state: &GatewayState,
) -> Result<(Option<String>, UserSession), SessionStoreError> {
    let Some(token) = extract_session_token(headers, state.config().session_cookie_name()) else {
        return Ok((None, UserSession::anonymous()));
    };
    let session = state
        .sessions()
        .load(&token)?
        .unwrap_or_else(UserSession::anonymous);
    Ok((Some(token), session))
}

pub(crate) fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == cookie_name {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> impl IntoResponse {
    match resolve_session(&headers, &state) {
        Ok((Some(token), mut session)) => {
            session.reset();
            if let Err(err) = state.sessions().save(&token, session) {
                error!("Failed to clear session: {err}");
            }
        }
        Ok((None, _)) => {}
        Err(err) => {
            error!("Failed to load session on logout: {err}");
        }
    }

    // Logout always succeeds from the caller's point of view.
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::extract_session_token;
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION, header::COOKIE};

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            COOKIE,
            HeaderValue::from_static("pordisto_session=from-cookie"),
        );
        assert_eq!(
            extract_session_token(&headers, "pordisto_session").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn cookie_token_is_extracted_from_a_cookie_list() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; pordisto_session=xyz; lang=eo"),
        );
        assert_eq!(
            extract_session_token(&headers, "pordisto_session").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn missing_and_empty_tokens_resolve_to_none() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers, "pordisto_session").is_none());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(extract_session_token(&headers, "pordisto_session").is_none());
    }
}
