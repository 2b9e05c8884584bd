//! Session record types.
//!
//! Flow Overview:
//! 1) The portal marks a session one-factor after primary authentication.
//! 2) The challenge manager stores at most one pending hardware-key
//!    challenge on the session and consumes it on the next request.
//! 3) A successful assertion raises the level to two-factor; levels never
//!    go down within a login, only `reset` (logout) clears them.
//!
//! Security boundaries: the record itself enforces the single-challenge and
//! consume-once invariants; callers never touch `pending_challenge` and
//! `registered_credential` except through the methods below.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::authorization::{AuthenticationLevel, RequiredLevel};
use crate::mfa::StoredCredential;

/// Current unix time in seconds, saturating at zero before the epoch.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

/// An outstanding hardware-key challenge, bound to the credential it targets
/// and the relying-party origin it was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChallenge {
    pub challenge: Vec<u8>,
    pub relying_party_id: String,
    pub credential_id: Vec<u8>,
}

/// Subject of an identity-verification step (password reset, device
/// registration).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
}

/// An OIDC authorization request in flight for a session.
///
/// Lives no longer than the session that embeds it. Granted sets are always
/// subsets of the requested sets and are only written once the session level
/// satisfies `required_authorization_level`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcWorkflowSession {
    pub client_id: String,
    pub requested_scopes: Vec<String>,
    pub granted_scopes: Vec<String>,
    pub requested_audience: Vec<String>,
    pub granted_audience: Vec<String>,
    pub target_uri: String,
    pub auth_uri: String,
    pub required_authorization_level: RequiredLevel,
}

/// The session of a user, keyed by an opaque identifier owned by the
/// external session store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    pub display_name: String,
    pub groups: Vec<String>,
    pub emails: Vec<String>,

    pub keep_me_logged_in: bool,
    pub authentication_level: AuthenticationLevel,
    pub last_activity: i64,

    /// At most one outstanding challenge; issuing a new one discards it.
    pub pending_challenge: Option<PendingChallenge>,
    /// The credential loaded for the current exchange; present only while a
    /// challenge is in flight.
    pub registered_credential: Option<StoredCredential>,

    pub oidc_workflow: Option<OidcWorkflowSession>,

    /// Set after identity verification, consumed by exactly one password
    /// change.
    pub password_reset_username: Option<String>,
}

impl UserSession {
    /// A session that has proven nothing yet.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// Record a completed primary authentication: identity claims are set and
    /// the level is raised to at least one-factor.
    pub fn mark_one_factor(
        &mut self,
        username: &str,
        display_name: &str,
        groups: Vec<String>,
        emails: Vec<String>,
    ) {
        self.username = username.to_string();
        self.display_name = display_name.to_string();
        self.groups = groups;
        self.emails = emails;
        self.raise_level(AuthenticationLevel::OneFactor);
    }

    /// Raise the authentication level, never lowering it.
    pub fn raise_level(&mut self, level: AuthenticationLevel) {
        self.authentication_level = self.authentication_level.max(level);
    }

    /// Update the activity timestamp used for idle-timeout eviction.
    pub fn touch(&mut self, now: i64) {
        self.last_activity = now;
    }

    /// Store a freshly issued challenge and the credential it targets,
    /// discarding any prior unconsumed challenge.
    pub fn set_pending_challenge(
        &mut self,
        challenge: PendingChallenge,
        credential: StoredCredential,
    ) {
        self.pending_challenge = Some(challenge);
        self.registered_credential = Some(credential);
    }

    /// Consume the pending challenge. A challenge can be taken at most once;
    /// both it and the loaded credential are cleared regardless of what the
    /// caller does with them.
    pub fn take_pending_challenge(&mut self) -> Option<(PendingChallenge, StoredCredential)> {
        let challenge = self.pending_challenge.take();
        let credential = self.registered_credential.take();
        match (challenge, credential) {
            (Some(challenge), Some(credential)) => Some((challenge, credential)),
            _ => None,
        }
    }

    /// Mark the identity as verified for a subsequent password change.
    pub fn set_password_reset(&mut self, identity: &Identity) {
        self.password_reset_username = Some(identity.username.clone());
    }

    /// Consume the password-reset marker; yields the username exactly once.
    pub fn take_password_reset(&mut self) -> Option<String> {
        self.password_reset_username.take()
    }

    /// Logout: drop every claim, challenge, and workflow.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{Identity, PendingChallenge, UserSession};
    use crate::authorization::AuthenticationLevel;
    use crate::mfa::StoredCredential;

    fn challenge() -> PendingChallenge {
        PendingChallenge {
            challenge: vec![1u8; 32],
            relying_party_id: "https://auth.example.com".to_string(),
            credential_id: vec![2u8; 16],
        }
    }

    fn credential() -> StoredCredential {
        StoredCredential {
            credential_id: vec![2u8; 16],
            public_key: vec![3u8; 65],
        }
    }

    #[test]
    fn one_factor_sets_claims_and_level() {
        let mut session = UserSession::anonymous();
        assert!(session.is_anonymous());

        session.mark_one_factor(
            "alice",
            "Alice",
            vec!["admins".to_string()],
            vec!["alice@example.com".to_string()],
        );

        assert!(!session.is_anonymous());
        assert_eq!(session.authentication_level, AuthenticationLevel::OneFactor);
        assert_eq!(session.groups, vec!["admins".to_string()]);
    }

    #[test]
    fn level_is_monotonic_within_a_login() {
        let mut session = UserSession::anonymous();
        session.raise_level(AuthenticationLevel::TwoFactor);
        session.raise_level(AuthenticationLevel::OneFactor);
        assert_eq!(session.authentication_level, AuthenticationLevel::TwoFactor);
    }

    #[test]
    fn pending_challenge_is_consumed_exactly_once() {
        let mut session = UserSession::anonymous();
        session.set_pending_challenge(challenge(), credential());

        let taken = session.take_pending_challenge();
        assert!(taken.is_some());
        assert!(session.pending_challenge.is_none());
        assert!(session.registered_credential.is_none());
        assert!(session.take_pending_challenge().is_none());
    }

    #[test]
    fn new_challenge_overwrites_prior_one() {
        let mut session = UserSession::anonymous();
        session.set_pending_challenge(challenge(), credential());

        let mut replacement = challenge();
        replacement.challenge = vec![9u8; 32];
        session.set_pending_challenge(replacement.clone(), credential());

        let (taken, _) = session.take_pending_challenge().unwrap();
        assert_eq!(taken, replacement);
    }

    #[test]
    fn password_reset_marker_is_single_use() {
        let mut session = UserSession::anonymous();
        session.set_password_reset(&Identity {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        });

        assert_eq!(session.take_password_reset().as_deref(), Some("alice"));
        assert_eq!(session.take_password_reset(), None);
    }

    #[test]
    fn reset_returns_to_the_anonymous_record() {
        let mut session = UserSession::anonymous();
        session.mark_one_factor("alice", "Alice", Vec::new(), Vec::new());
        session.set_pending_challenge(challenge(), credential());
        session.touch(1_700_000_000);

        session.reset();
        assert_eq!(session, UserSession::anonymous());
    }

    #[test]
    fn session_record_round_trips_through_json() {
        let mut session = UserSession::anonymous();
        session.mark_one_factor("alice", "Alice", Vec::new(), Vec::new());
        session.set_pending_challenge(challenge(), credential());

        let value = serde_json::to_value(&session).unwrap();
        let decoded: UserSession = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, session);
    }
}
