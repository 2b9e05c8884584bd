//! Workflow coordination between an authorization request and a session.
//!
//! A session carries at most one in-flight workflow. The required level is
//! re-checked at grant time, not only at start, because the session may have
//! been stepped up or reset between the two requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

use super::client::{ClientCapabilities, RegisteredClient};
use super::{audience_description, scope_description};
use crate::authorization::is_level_sufficient;
use crate::session::{OidcWorkflowSession, UserSession};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no authorization workflow in progress for this session")]
    NoWorkflowInProgress,
    #[error("authentication level is insufficient for the client policy")]
    InsufficientAuthenticationLevel,
    #[error("scope {0:?} was not requested")]
    ScopeNotRequested(String),
    #[error("audience {0:?} was not requested")]
    AudienceNotRequested(String),
}

/// A scope or audience identifier paired with its consent-prompt
/// description.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct DescribedValue {
    pub name: String,
    pub description: String,
}

/// Payload rendered by the consent prompt.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConsentRequestBody {
    pub client_id: String,
    pub client_description: String,
    pub scopes: Vec<DescribedValue>,
    pub audience: Vec<DescribedValue>,
}

/// Create or replace the session's workflow for an authorization request.
/// Replacing an in-flight workflow discards any prior unconsented grants.
pub fn start_workflow(
    session: &mut UserSession,
    client: &RegisteredClient,
    requested_scopes: Vec<String>,
    requested_audience: Vec<String>,
    target_uri: String,
    auth_uri: String,
) {
    if let Some(previous) = &session.oidc_workflow {
        debug!(
            "Replacing in-flight authorization workflow for client {}",
            previous.client_id
        );
    }

    session.oidc_workflow = Some(OidcWorkflowSession {
        client_id: client.client_id().to_string(),
        requested_scopes,
        granted_scopes: Vec::new(),
        requested_audience,
        granted_audience: Vec::new(),
        target_uri,
        auth_uri,
        required_authorization_level: client.required_level(),
    });
}

/// Project the consent payload for a client and its workflow, if any.
/// Unknown scope and audience names keep their raw identifier as the
/// description.
#[must_use]
pub fn consent_request_body(
    client: &RegisteredClient,
    workflow: Option<&OidcWorkflowSession>,
) -> ConsentRequestBody {
    let mut body = ConsentRequestBody {
        client_id: client.client_id().to_string(),
        client_description: client.description().to_string(),
        scopes: Vec::new(),
        audience: Vec::new(),
    };

    if let Some(workflow) = workflow {
        body.scopes = describe(&workflow.requested_scopes, scope_description);
        body.audience = describe(&workflow.requested_audience, audience_description);
    }

    body
}

fn describe(names: &[String], lookup: fn(&str) -> Option<&'static str>) -> Vec<DescribedValue> {
    names
        .iter()
        .map(|name| DescribedValue {
            name: name.clone(),
            description: lookup(name).map_or_else(|| name.clone(), str::to_string),
        })
        .collect()
}

/// Record the user's consent on the session's workflow.
///
/// # Errors
/// `NoWorkflowInProgress` without a workflow;
/// `InsufficientAuthenticationLevel` when the session no longer satisfies
/// the client policy; `ScopeNotRequested`/`AudienceNotRequested` for grants
/// outside the requested sets. Re-granting the same sets is a no-op.
pub fn grant_consent(
    session: &mut UserSession,
    granted_scopes: &[String],
    granted_audience: &[String],
) -> Result<(), WorkflowError> {
    let level = session.authentication_level;
    let Some(workflow) = session.oidc_workflow.as_mut() else {
        return Err(WorkflowError::NoWorkflowInProgress);
    };

    if !is_level_sufficient(level, workflow.required_authorization_level) {
        return Err(WorkflowError::InsufficientAuthenticationLevel);
    }

    if let Some(scope) = first_not_in(granted_scopes, &workflow.requested_scopes) {
        return Err(WorkflowError::ScopeNotRequested(scope));
    }
    if let Some(audience) = first_not_in(granted_audience, &workflow.requested_audience) {
        return Err(WorkflowError::AudienceNotRequested(audience));
    }

    workflow.granted_scopes = granted_scopes.to_vec();
    workflow.granted_audience = granted_audience.to_vec();
    Ok(())
}

fn first_not_in(granted: &[String], requested: &[String]) -> Option<String> {
    granted
        .iter()
        .find(|name| !requested.contains(name))
        .cloned()
}
