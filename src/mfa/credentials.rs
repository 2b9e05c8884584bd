//! Collaborator boundaries for credential storage and assertion
//! verification.
//!
//! The gateway stores and forwards credential material but never inspects
//! it: credential ids and public keys are opaque byte sequences with one
//! canonical encoding, and the verification primitive owns their internal
//! structure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::PendingChallenge;

/// A registered hardware-key credential as held by the durable store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// The signed response produced by an authenticator, passed through to the
/// verification primitive untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssertionResponse(pub serde_json::Value);

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The user exists but has no device registered, or the user is unknown.
    /// Callers must not let the distinction reach a client.
    #[error("no credential registered")]
    NotFound,
    #[error("credential store failure: {0}")]
    Backend(String),
}

/// Durable lookup of device credentials by username.
pub trait CredentialStore: Send + Sync {
    /// Load the registered credential for a user.
    ///
    /// # Errors
    /// `CredentialStoreError::NotFound` when no device is registered;
    /// `CredentialStoreError::Backend` for any other store failure.
    fn load_credential(&self, username: &str) -> Result<StoredCredential, CredentialStoreError>;
}

/// Opaque verification failure; detail is for operator logs only.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AssertionError(String);

impl AssertionError {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Cryptographic verification of a signed assertion against the stored
/// challenge and credential. Treated as a trusted black box.
pub trait AssertionVerifier: Send + Sync {
    /// Verify that `assertion` is a valid signature over `challenge` by the
    /// authenticator holding `credential`.
    ///
    /// # Errors
    /// Returns `AssertionError` on any verification failure: bad signature,
    /// counter regression, origin mismatch.
    fn verify_assertion(
        &self,
        challenge: &PendingChallenge,
        credential: &StoredCredential,
        assertion: &AssertionResponse,
    ) -> Result<(), AssertionError>;
}
