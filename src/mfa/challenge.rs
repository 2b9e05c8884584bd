//! Challenge issuance and verification against a session.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::{
    AssertionResponse, AssertionVerifier, ChallengeError, CredentialStore, CredentialStoreError,
};
use crate::authorization::AuthenticationLevel;
use crate::session::{PendingChallenge, UserSession};

const CHALLENGE_SIZE: usize = 32;
const CREDENTIAL_TYPE_PUBLIC_KEY: &str = "public-key";

/// Assertion options returned to the browser: the challenge to sign, the
/// relying-party identifier it is scoped to, and the credentials allowed to
/// answer it. Byte fields are base64url without padding.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssertionOptions {
    pub challenge: String,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowedCredential>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AllowedCredential {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// Issues hardware-key challenges bound to a session and verifies the
/// returned assertions.
pub struct ChallengeService {
    credentials: Arc<dyn CredentialStore>,
    verifier: Arc<dyn AssertionVerifier>,
}

impl ChallengeService {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, verifier: Arc<dyn AssertionVerifier>) -> Self {
        Self {
            credentials,
            verifier,
        }
    }

    /// Issue a fresh challenge for the session's user, scoped to the
    /// forwarded origin. Any prior unconsumed challenge is discarded.
    ///
    /// # Errors
    /// `MissingForwardingContext` when either trusted proxy value is absent;
    /// `NoCredentialRegistered`/`CredentialLookupFailed` from the store.
    /// Callers surface every variant as the same generic message.
    pub fn begin_challenge(
        &self,
        session: &mut UserSession,
        forwarded_proto: Option<&str>,
        forwarded_host: Option<&str>,
    ) -> Result<AssertionOptions, ChallengeError> {
        let (proto, host) = match (forwarded_proto, forwarded_host) {
            (Some(proto), Some(host)) if !proto.is_empty() && !host.is_empty() => (proto, host),
            _ => return Err(ChallengeError::MissingForwardingContext),
        };

        let credential = self
            .credentials
            .load_credential(&session.username)
            .map_err(|err| match err {
                CredentialStoreError::NotFound => {
                    ChallengeError::NoCredentialRegistered(session.username.clone())
                }
                CredentialStoreError::Backend(detail) => {
                    ChallengeError::CredentialLookupFailed(detail)
                }
            })?;

        let relying_party_id = format!("{proto}://{host}");
        debug!("Issuing challenge for relying party {relying_party_id}");

        let mut challenge = vec![0u8; CHALLENGE_SIZE];
        rand::thread_rng().fill_bytes(&mut challenge);

        let options = AssertionOptions {
            challenge: Base64UrlUnpadded::encode_string(&challenge),
            rp_id: relying_party_id.clone(),
            allow_credentials: vec![AllowedCredential {
                kind: CREDENTIAL_TYPE_PUBLIC_KEY.to_string(),
                id: Base64UrlUnpadded::encode_string(&credential.credential_id),
            }],
        };

        session.set_pending_challenge(
            PendingChallenge {
                challenge,
                relying_party_id,
                credential_id: credential.credential_id.clone(),
            },
            credential,
        );

        Ok(options)
    }

    /// Verify a signed assertion against the session's pending challenge.
    ///
    /// The challenge is consumed before verification runs, so it can be
    /// answered at most once whether verification succeeds or fails. On
    /// success the session is raised to at least two-factor.
    ///
    /// # Errors
    /// `NoChallengeInProgress` without a pending challenge;
    /// `AssertionVerificationFailed` on any verifier failure.
    pub fn finish_challenge(
        &self,
        session: &mut UserSession,
        assertion: &AssertionResponse,
    ) -> Result<(), ChallengeError> {
        let Some((challenge, credential)) = session.take_pending_challenge() else {
            return Err(ChallengeError::NoChallengeInProgress);
        };

        self.verifier
            .verify_assertion(&challenge, &credential, assertion)
            .map_err(|err| ChallengeError::AssertionVerificationFailed(err.to_string()))?;

        session.raise_level(AuthenticationLevel::TwoFactor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AssertionOptions, ChallengeService};
    use crate::authorization::AuthenticationLevel;
    use crate::mfa::{
        AssertionError, AssertionResponse, AssertionVerifier, ChallengeError, CredentialStore,
        CredentialStoreError, StoredCredential,
    };
    use crate::session::{PendingChallenge, UserSession};
    use base64ct::{Base64UrlUnpadded, Encoding};
    use std::sync::Arc;

    struct FixedCredentialStore {
        result: fn() -> Result<StoredCredential, CredentialStoreError>,
    }

    impl CredentialStore for FixedCredentialStore {
        fn load_credential(
            &self,
            _username: &str,
        ) -> Result<StoredCredential, CredentialStoreError> {
            (self.result)()
        }
    }

    struct FixedVerifier {
        accept: bool,
    }

    impl AssertionVerifier for FixedVerifier {
        fn verify_assertion(
            &self,
            _challenge: &PendingChallenge,
            _credential: &StoredCredential,
            _assertion: &AssertionResponse,
        ) -> Result<(), AssertionError> {
            if self.accept {
                Ok(())
            } else {
                Err(AssertionError::new("signature mismatch"))
            }
        }
    }

    fn credential() -> StoredCredential {
        StoredCredential {
            credential_id: vec![7u8; 16],
            public_key: vec![8u8; 65],
        }
    }

    fn service(
        store: fn() -> Result<StoredCredential, CredentialStoreError>,
        accept: bool,
    ) -> ChallengeService {
        ChallengeService::new(
            Arc::new(FixedCredentialStore { result: store }),
            Arc::new(FixedVerifier { accept }),
        )
    }

    fn assertion() -> AssertionResponse {
        AssertionResponse(serde_json::json!({"signature": "AA"}))
    }

    fn one_factor_session() -> UserSession {
        let mut session = UserSession::anonymous();
        session.mark_one_factor("alice", "Alice", Vec::new(), Vec::new());
        session
    }

    fn begin(service: &ChallengeService, session: &mut UserSession) -> AssertionOptions {
        service
            .begin_challenge(session, Some("https"), Some("auth.example.com"))
            .unwrap()
    }

    #[test]
    fn begin_parks_challenge_and_credential_on_the_session() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();

        let options = begin(&service, &mut session);

        let pending = session.pending_challenge.as_ref().unwrap();
        assert_eq!(pending.relying_party_id, "https://auth.example.com");
        assert_eq!(
            options.challenge,
            Base64UrlUnpadded::encode_string(&pending.challenge)
        );
        assert_eq!(session.registered_credential, Some(credential()));
        assert_eq!(options.allow_credentials.len(), 1);
        assert_eq!(options.allow_credentials[0].kind, "public-key");
        assert_eq!(
            options.allow_credentials[0].id,
            Base64UrlUnpadded::encode_string(&credential().credential_id)
        );
    }

    #[test]
    fn begin_requires_both_forwarded_values() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();

        for (proto, host) in [
            (None, Some("auth.example.com")),
            (Some("https"), None),
            (Some(""), Some("auth.example.com")),
            (Some("https"), Some("")),
        ] {
            let result = service.begin_challenge(&mut session, proto, host);
            assert!(matches!(
                result,
                Err(ChallengeError::MissingForwardingContext)
            ));
            assert!(session.pending_challenge.is_none());
        }
    }

    #[test]
    fn begin_distinguishes_missing_credential_internally() {
        let service = service(|| Err(CredentialStoreError::NotFound), true);
        let mut session = one_factor_session();

        let result = service.begin_challenge(&mut session, Some("https"), Some("auth.example.com"));
        assert!(matches!(
            result,
            Err(ChallengeError::NoCredentialRegistered(username)) if username == "alice"
        ));
    }

    #[test]
    fn begin_maps_backend_failures_to_lookup_failed() {
        let service = service(
            || Err(CredentialStoreError::Backend("connection refused".to_string())),
            true,
        );
        let mut session = one_factor_session();

        let result = service.begin_challenge(&mut session, Some("https"), Some("auth.example.com"));
        assert!(matches!(
            result,
            Err(ChallengeError::CredentialLookupFailed(_))
        ));
    }

    #[test]
    fn reissue_discards_the_prior_challenge() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();

        let first = begin(&service, &mut session);
        let second = begin(&service, &mut session);
        assert_ne!(first.challenge, second.challenge);

        let pending = session.pending_challenge.as_ref().unwrap();
        assert_eq!(
            second.challenge,
            Base64UrlUnpadded::encode_string(&pending.challenge)
        );
    }

    #[test]
    fn finish_without_begin_fails_and_leaves_level_alone() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();

        let result = service.finish_challenge(&mut session, &assertion());
        assert!(matches!(result, Err(ChallengeError::NoChallengeInProgress)));
        assert_eq!(session.authentication_level, AuthenticationLevel::OneFactor);
    }

    #[test]
    fn finish_raises_to_two_factor_and_clears_the_challenge() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();
        begin(&service, &mut session);

        service.finish_challenge(&mut session, &assertion()).unwrap();
        assert_eq!(session.authentication_level, AuthenticationLevel::TwoFactor);
        assert!(session.pending_challenge.is_none());
        assert!(session.registered_credential.is_none());
    }

    #[test]
    fn a_challenge_is_single_use() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();
        begin(&service, &mut session);

        service.finish_challenge(&mut session, &assertion()).unwrap();
        let result = service.finish_challenge(&mut session, &assertion());
        assert!(matches!(result, Err(ChallengeError::NoChallengeInProgress)));
    }

    #[test]
    fn failed_verification_still_consumes_the_challenge() {
        let service = service(|| Ok(credential()), false);
        let mut session = one_factor_session();
        begin(&service, &mut session);

        let result = service.finish_challenge(&mut session, &assertion());
        assert!(matches!(
            result,
            Err(ChallengeError::AssertionVerificationFailed(_))
        ));
        assert_eq!(session.authentication_level, AuthenticationLevel::OneFactor);
        assert!(session.pending_challenge.is_none());

        let retry = service.finish_challenge(&mut session, &assertion());
        assert!(matches!(retry, Err(ChallengeError::NoChallengeInProgress)));
    }

    #[test]
    fn two_factor_level_is_idempotent_across_finishes() {
        let service = service(|| Ok(credential()), true);
        let mut session = one_factor_session();
        session.raise_level(AuthenticationLevel::TwoFactor);

        begin(&service, &mut session);
        service.finish_challenge(&mut session, &assertion()).unwrap();
        assert_eq!(session.authentication_level, AuthenticationLevel::TwoFactor);
    }
}
