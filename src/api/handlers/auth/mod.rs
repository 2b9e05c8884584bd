//! Session and step-up endpoints.

pub(crate) mod secondfactor;
pub(crate) mod session;
pub(crate) mod types;

pub use secondfactor::MFA_VALIDATION_FAILED_MESSAGE;
