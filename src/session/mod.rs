//! Per-user session state and the session-store boundary.
//!
//! The session record is the only state shared across requests; an external
//! store owns it and provides load-then-save semantics around each request.
//! Everything security-relevant the gateway knows about a browsing context
//! lives here: identity claims, accumulated authentication level, the single
//! pending hardware-key challenge, and the in-flight OIDC workflow.

mod store;
mod types;

pub use store::{InMemorySessionStore, SessionStore, SessionStoreError};
pub use types::{Identity, OidcWorkflowSession, PendingChallenge, UserSession, unix_now};
