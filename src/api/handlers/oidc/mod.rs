//! Consent endpoints for the OIDC authorization workflow.
//!
//! Unlike the challenge endpoints, workflow errors are surfaced distinctly:
//! a stale consent form is a legitimate client-side mistake, not something
//! an attacker can use to enumerate identities.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::auth::session::resolve_session;
use super::auth::types::{ConsentPostRequest, ConsentPostResponse, ErrorResponse};
use crate::api::GatewayState;
use crate::oidc::{ConsentRequestBody, WorkflowError, consent_request_body, grant_consent};
use crate::session::unix_now;

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Returns the consent payload for the session's in-flight authorization
/// request.
#[utoipa::path(
    get,
    path = "/v1/oidc/consent",
    responses(
        (status = 200, description = "Consent payload", body = ConsentRequestBody),
        (status = 400, description = "No authorization workflow in progress", body = ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "oidc"
)]
pub async fn consent_get(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> Response {
    let session = match resolve_session(&headers, &state) {
        Ok((Some(_), session)) if !session.is_anonymous() => session,
        Ok(_) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to load session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(workflow) = session.oidc_workflow.as_ref() else {
        return error_body(
            StatusCode::BAD_REQUEST,
            "no authorization workflow in progress",
        );
    };

    let Some(client) = state.clients().get(&workflow.client_id) else {
        // The workflow references a client that has since left the registry.
        error!(
            "Workflow references unknown client {}",
            workflow.client_id
        );
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    (
        StatusCode::OK,
        Json(consent_request_body(&client, Some(workflow))),
    )
        .into_response()
}

/// Records the user's consent and hands back the authorization URI to
/// resume the request.
#[utoipa::path(
    post,
    path = "/v1/oidc/consent",
    request_body = ConsentPostRequest,
    responses(
        (status = 200, description = "Consent recorded", body = ConsentPostResponse),
        (status = 400, description = "Grant outside the requested sets", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Authentication level insufficient", body = ErrorResponse)
    ),
    tag = "oidc"
)]
pub async fn consent_post(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<ConsentPostRequest>>,
) -> Response {
    let (token, mut session) = match resolve_session(&headers, &state) {
        Ok((Some(token), session)) if !session.is_anonymous() => (token, session),
        Ok(_) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to load session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(Json(request)) = payload else {
        return error_body(StatusCode::BAD_REQUEST, "missing consent payload");
    };

    match session.oidc_workflow.as_ref() {
        Some(workflow) if workflow.client_id == request.client_id => {}
        Some(_) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "consent does not match the in-flight authorization request",
            );
        }
        None => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "no authorization workflow in progress",
            );
        }
    }

    match grant_consent(&mut session, &request.scopes, &request.audience) {
        Ok(()) => {
            let redirect_uri = session
                .oidc_workflow
                .as_ref()
                .map(|workflow| workflow.auth_uri.clone())
                .unwrap_or_default();

            session.touch(unix_now());
            if let Err(err) = state.sessions().save(&token, session) {
                error!("Failed to save consent grants: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }

            (StatusCode::OK, Json(ConsentPostResponse { redirect_uri })).into_response()
        }
        Err(err @ WorkflowError::InsufficientAuthenticationLevel) => {
            error_body(StatusCode::FORBIDDEN, &err.to_string())
        }
        Err(err) => error_body(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}
