//! Authentication-level and access-policy model.
//!
//! Two level spaces are kept apart on purpose: `AuthenticationLevel` is the
//! proof strength a session has accumulated, `RequiredLevel` is what a
//! resource or relying-party policy demands. Policies are parsed once at
//! startup; an unknown policy name is a configuration error, never a runtime
//! fault. Everything here is pure and `Copy`, safe for unsynchronized
//! concurrent reads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const POLICY_BYPASS: &str = "bypass";
pub const POLICY_ONE_FACTOR: &str = "one_factor";
pub const POLICY_TWO_FACTOR: &str = "two_factor";
pub const POLICY_DENY: &str = "deny";

/// Proof strength accumulated by a session, ordered weakest to strongest.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationLevel {
    #[default]
    Unauthenticated,
    OneFactor,
    TwoFactor,
}

impl AuthenticationLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::OneFactor => "one_factor",
            Self::TwoFactor => "two_factor",
        }
    }
}

/// Minimum level a policy demands before access is authorized.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequiredLevel {
    /// No proof required.
    Bypass,
    OneFactor,
    TwoFactor,
    /// Never satisfiable, regardless of proof strength.
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown policy: {0}")]
    InvalidPolicy(String),
}

/// Map a named policy to the level it requires.
///
/// # Errors
/// Returns `PolicyError::InvalidPolicy` for names outside
/// `bypass`/`one_factor`/`two_factor`/`deny`; callers treat this as a fatal
/// configuration error at load time.
pub fn policy_to_level(policy: &str) -> Result<RequiredLevel, PolicyError> {
    match policy {
        POLICY_BYPASS => Ok(RequiredLevel::Bypass),
        POLICY_ONE_FACTOR => Ok(RequiredLevel::OneFactor),
        POLICY_TWO_FACTOR => Ok(RequiredLevel::TwoFactor),
        POLICY_DENY => Ok(RequiredLevel::Denied),
        other => Err(PolicyError::InvalidPolicy(other.to_string())),
    }
}

/// Whether the session's current level satisfies the required level.
#[must_use]
pub fn is_level_sufficient(current: AuthenticationLevel, required: RequiredLevel) -> bool {
    match required {
        RequiredLevel::Bypass => true,
        RequiredLevel::OneFactor => current >= AuthenticationLevel::OneFactor,
        RequiredLevel::TwoFactor => current >= AuthenticationLevel::TwoFactor,
        RequiredLevel::Denied => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AuthenticationLevel, PolicyError, RequiredLevel, is_level_sufficient, policy_to_level,
    };

    const ALL_LEVELS: [AuthenticationLevel; 3] = [
        AuthenticationLevel::Unauthenticated,
        AuthenticationLevel::OneFactor,
        AuthenticationLevel::TwoFactor,
    ];

    #[test]
    fn levels_are_totally_ordered() {
        assert!(AuthenticationLevel::Unauthenticated < AuthenticationLevel::OneFactor);
        assert!(AuthenticationLevel::OneFactor < AuthenticationLevel::TwoFactor);
    }

    #[test]
    fn policy_names_map_to_levels() {
        assert_eq!(policy_to_level("bypass"), Ok(RequiredLevel::Bypass));
        assert_eq!(policy_to_level("one_factor"), Ok(RequiredLevel::OneFactor));
        assert_eq!(policy_to_level("two_factor"), Ok(RequiredLevel::TwoFactor));
        assert_eq!(policy_to_level("deny"), Ok(RequiredLevel::Denied));
    }

    #[test]
    fn unknown_policy_is_a_configuration_error() {
        assert_eq!(
            policy_to_level("three_factor"),
            Err(PolicyError::InvalidPolicy("three_factor".to_string()))
        );
    }

    #[test]
    fn two_factor_policy_requires_exactly_two_factor() {
        let required = policy_to_level("two_factor").unwrap();
        for level in ALL_LEVELS {
            assert_eq!(
                is_level_sufficient(level, required),
                level == AuthenticationLevel::TwoFactor,
                "level {level:?}"
            );
        }
    }

    #[test]
    fn bypass_is_always_sufficient_and_deny_never_is() {
        for level in ALL_LEVELS {
            assert!(is_level_sufficient(level, RequiredLevel::Bypass));
            assert!(!is_level_sufficient(level, RequiredLevel::Denied));
        }
    }

    #[test]
    fn one_factor_policy_admits_one_and_two_factor() {
        assert!(!is_level_sufficient(
            AuthenticationLevel::Unauthenticated,
            RequiredLevel::OneFactor
        ));
        assert!(is_level_sufficient(
            AuthenticationLevel::OneFactor,
            RequiredLevel::OneFactor
        ));
        assert!(is_level_sufficient(
            AuthenticationLevel::TwoFactor,
            RequiredLevel::OneFactor
        ));
    }
}
