//! Hardware-key step-up authentication.
//!
//! Flow Overview:
//! 1) `ChallengeService::begin_challenge` loads the user's registered
//!    credential, generates a challenge scoped to the forwarded origin, and
//!    parks both on the session.
//! 2) The browser signs the challenge with the authenticator.
//! 3) `ChallengeService::finish_challenge` consumes the parked challenge,
//!    delegates verification, and raises the session to two-factor.
//!
//! Security boundaries:
//! - A challenge is consumed at most once, on success or failure.
//! - Credential lookup and verification failures collapse to one outward
//!   message at the HTTP surface so callers cannot probe which identities
//!   have a device registered.

mod challenge;
mod credentials;

pub use challenge::{AllowedCredential, AssertionOptions, ChallengeService};
pub use credentials::{
    AssertionError, AssertionResponse, AssertionVerifier, CredentialStore, CredentialStoreError,
    StoredCredential,
};

use thiserror::Error;

/// Failures raised by the challenge manager.
///
/// The first two variants are precondition errors (proxy or client
/// misbehavior); the rest are enumeration-sensitive and must never reach a
/// response body with their detail intact.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("missing forwarded protocol or host")]
    MissingForwardingContext,
    #[error("no challenge in progress for this session")]
    NoChallengeInProgress,
    #[error("no credential registered for user {0:?}")]
    NoCredentialRegistered(String),
    #[error("unable to load credential: {0}")]
    CredentialLookupFailed(String),
    #[error("assertion verification failed: {0}")]
    AssertionVerificationFailed(String),
}
