//! Request/response types for the auth and consent endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fixed-shape error body. The challenge endpoints always return the same
/// message regardless of the internal failure.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignFinishRequest {
    /// Signed assertion produced by the authenticator, forwarded opaquely to
    /// the verification primitive.
    #[schema(value_type = Object)]
    pub response: serde_json::Value,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConsentPostRequest {
    pub client_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub audience: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConsentPostResponse {
    /// Where the consent UI should send the browser to resume the
    /// authorization request.
    pub redirect_uri: String,
}
