//! # Pordisto (Session & Step-Up Authorization Engine)
//!
//! `pordisto` is the authentication and authorization core of a
//! reverse-proxy-fronted identity gateway. It tracks a user's current
//! authentication strength across requests, elevates it through
//! hardware-key challenge/response, decides whether that strength satisfies
//! a resource's policy, and brokers OpenID Connect authorization requests
//! for registered relying parties.
//!
//! ## Sessions & Authentication Levels
//!
//! Each browsing context owns one [`session::UserSession`], stored by an
//! external session store under an opaque identifier. A session's
//! [`authorization::AuthenticationLevel`] only ever rises within a login
//! (`Unauthenticated < OneFactor < TwoFactor`); logout resets the record.
//! Resource and client policies are parsed once at startup into
//! [`authorization::RequiredLevel`] values.
//!
//! ## Step-Up (Hardware Keys)
//!
//! [`mfa::ChallengeService`] issues a challenge scoped to the forwarded
//! origin, parks it on the session (at most one outstanding challenge), and
//! consumes it exactly once on verification. Credential lookup and
//! verification are external collaborators behind
//! [`mfa::CredentialStore`] and [`mfa::AssertionVerifier`].
//!
//! **Security boundary:** the challenge endpoints answer every failure with
//! the same message and status, so callers cannot tell an unknown user from
//! a missing device or a rejected signature.
//!
//! ## OpenID Connect
//!
//! Relying parties are validated at load time into an immutable
//! [`oidc::ClientRegistry`]. An in-flight authorization request is linked to
//! the session as a workflow; consent grants are always subsets of the
//! requested scope/audience sets and require the client's policy level at
//! grant time.

pub mod api;
pub mod authorization;
pub mod mfa;
pub mod oidc;
pub mod session;
pub mod telemetry;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
