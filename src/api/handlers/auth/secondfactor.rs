//! Hardware-key challenge endpoints.
//!
//! Every failure path through these two handlers answers with one fixed
//! message and an unauthorized status: a caller must not be able to tell a
//! missing proxy header from an unknown user or a rejected signature. The
//! distinguishing detail is logged server-side only.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::session::resolve_session;
use super::types::{ErrorResponse, SignFinishRequest};
use crate::api::GatewayState;
use crate::mfa::{AssertionOptions, AssertionResponse};
use crate::session::unix_now;

/// The single outward message for every challenge failure.
pub const MFA_VALIDATION_FAILED_MESSAGE: &str = "Authentication failed, please retry later.";

fn validation_failed() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            message: MFA_VALIDATION_FAILED_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// Issues a signing challenge for the user's registered security key.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/key/sign/start",
    responses(
        (status = 200, description = "Challenge generated", body = AssertionOptions),
        (status = 401, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_start(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> Response {
    let (token, mut session) = match resolve_session(&headers, &state) {
        Ok(resolved) => resolved,
        Err(err) => {
            error!("Failed to load session: {err}");
            return validation_failed();
        }
    };

    let forwarded_proto = header_value(&headers, state.config().forwarded_proto_header());
    let forwarded_host = header_value(&headers, state.config().forwarded_host_header());

    let options = match state
        .challenges()
        .begin_challenge(&mut session, forwarded_proto, forwarded_host)
    {
        Ok(options) => options,
        Err(err) => {
            error!("Failed to begin security key challenge: {err}");
            return validation_failed();
        }
    };

    let Some(token) = token else {
        error!("Challenge issued without a session identifier to persist it under");
        return validation_failed();
    };

    session.touch(unix_now());
    if let Err(err) = state.sessions().save(&token, session) {
        error!("Failed to save challenge in session: {err}");
        return validation_failed();
    }

    (StatusCode::OK, Json(options)).into_response()
}

/// Verifies the signed assertion and raises the session to two-factor.
#[utoipa::path(
    post,
    path = "/v1/auth/mfa/key/sign/finish",
    request_body = SignFinishRequest,
    responses(
        (status = 204, description = "Assertion verified, session elevated"),
        (status = 401, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_finish(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<SignFinishRequest>>,
) -> Response {
    let (token, mut session) = match resolve_session(&headers, &state) {
        Ok(resolved) => resolved,
        Err(err) => {
            error!("Failed to load session: {err}");
            return validation_failed();
        }
    };

    let Some(Json(request)) = payload else {
        error!("Missing or malformed assertion payload");
        return validation_failed();
    };

    let assertion = AssertionResponse(request.response);
    let outcome = state.challenges().finish_challenge(&mut session, &assertion);

    // The challenge is consumed either way; persist the session before
    // reporting so a failed attempt cannot be replayed.
    if let Some(token) = token.as_deref() {
        session.touch(unix_now());
        if let Err(err) = state.sessions().save(token, session.clone()) {
            error!("Failed to save session after assertion: {err}");
            return validation_failed();
        }
    }

    match outcome {
        Ok(()) => {
            debug!(
                "User {} elevated to {}",
                session.username,
                session.authentication_level.as_str()
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!("Failed to finish security key challenge: {err}");
            validation_failed()
        }
    }
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
