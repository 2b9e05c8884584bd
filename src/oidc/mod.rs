//! OpenID Connect relying-party model.
//!
//! Clients are loaded once at startup into an immutable registry; the
//! workflow coordinator ties an in-flight authorization request to the
//! user's session and negotiates requested versus granted scope and
//! audience.

mod client;
mod workflow;

pub use client::{
    ClientCapabilities, ClientConfigError, ClientConfiguration, ClientRegistry, RegisteredClient,
};
pub use workflow::{
    ConsentRequestBody, DescribedValue, WorkflowError, consent_request_body, grant_consent,
    start_workflow,
};

/// Human-readable description for a scope shown on the consent prompt.
/// Unknown scopes fall back to their raw identifier.
#[must_use]
pub fn scope_description(scope: &str) -> Option<&'static str> {
    match scope {
        "openid" => Some("Use OpenID to verify your identity"),
        "email" => Some("Access your email addresses"),
        "profile" => Some("Access your username"),
        "groups" => Some("Access your group membership"),
        _ => None,
    }
}

/// Human-readable description for an audience value. No audience currently
/// carries one; the raw identifier is shown instead.
#[must_use]
pub fn audience_description(_audience: &str) -> Option<&'static str> {
    None
}
