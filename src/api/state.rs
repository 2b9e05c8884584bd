//! Gateway configuration and shared request state.

use std::sync::Arc;

use crate::mfa::ChallengeService;
use crate::oidc::ClientRegistry;
use crate::session::SessionStore;

const DEFAULT_SESSION_COOKIE_NAME: &str = "pordisto_session";
const DEFAULT_FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";
const DEFAULT_FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

const ENV_SESSION_COOKIE_NAME: &str = "PORDISTO_SESSION_COOKIE_NAME";
const ENV_FORWARDED_PROTO_HEADER: &str = "PORDISTO_FORWARDED_PROTO_HEADER";
const ENV_FORWARDED_HOST_HEADER: &str = "PORDISTO_FORWARDED_HOST_HEADER";

/// Gateway configuration loaded at startup.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    session_cookie_name: String,
    forwarded_proto_header: String,
    forwarded_host_header: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            forwarded_proto_header: DEFAULT_FORWARDED_PROTO_HEADER.to_string(),
            forwarded_host_header: DEFAULT_FORWARDED_HOST_HEADER.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: String) -> Self {
        self.session_cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_forwarded_proto_header(mut self, header: String) -> Self {
        self.forwarded_proto_header = header.to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_forwarded_host_header(mut self, header: String) -> Self {
        self.forwarded_host_header = header.to_ascii_lowercase();
        self
    }

    /// Load configuration overrides from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(name) = std::env::var(ENV_SESSION_COOKIE_NAME) {
            if !name.trim().is_empty() {
                config = config.with_session_cookie_name(name.trim().to_string());
            }
        }
        if let Ok(header) = std::env::var(ENV_FORWARDED_PROTO_HEADER) {
            if !header.trim().is_empty() {
                config = config.with_forwarded_proto_header(header.trim().to_string());
            }
        }
        if let Ok(header) = std::env::var(ENV_FORWARDED_HOST_HEADER) {
            if !header.trim().is_empty() {
                config = config.with_forwarded_host_header(header.trim().to_string());
            }
        }
        config
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.session_cookie_name
    }

    #[must_use]
    pub fn forwarded_proto_header(&self) -> &str {
        &self.forwarded_proto_header
    }

    #[must_use]
    pub fn forwarded_host_header(&self) -> &str {
        &self.forwarded_host_header
    }
}

/// Shared state injected into every handler.
pub struct GatewayState {
    config: GatewayConfig,
    clients: ClientRegistry,
    challenges: ChallengeService,
    sessions: Arc<dyn SessionStore>,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        clients: ClientRegistry,
        challenges: ChallengeService,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            clients,
            challenges,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    #[must_use]
    pub fn challenges(&self) -> &ChallengeService {
        &self.challenges
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayConfig;

    #[test]
    fn config_defaults_and_overrides() {
        let config = GatewayConfig::new();
        assert_eq!(config.session_cookie_name(), "pordisto_session");
        assert_eq!(config.forwarded_proto_header(), "x-forwarded-proto");
        assert_eq!(config.forwarded_host_header(), "x-forwarded-host");

        let config = config
            .with_session_cookie_name("gateway_session".to_string())
            .with_forwarded_proto_header("X-Proxy-Proto".to_string())
            .with_forwarded_host_header("X-Proxy-Host".to_string());
        assert_eq!(config.session_cookie_name(), "gateway_session");
        // Header names are normalized to lowercase for HeaderMap lookups.
        assert_eq!(config.forwarded_proto_header(), "x-proxy-proto");
        assert_eq!(config.forwarded_host_header(), "x-proxy-host");
    }

    #[test]
    fn config_from_env_honors_overrides() {
        temp_env::with_vars(
            [
                ("PORDISTO_SESSION_COOKIE_NAME", Some("edge_session")),
                ("PORDISTO_FORWARDED_PROTO_HEADER", Some("X-Edge-Proto")),
                ("PORDISTO_FORWARDED_HOST_HEADER", None),
            ],
            || {
                let config = GatewayConfig::from_env();
                assert_eq!(config.session_cookie_name(), "edge_session");
                assert_eq!(config.forwarded_proto_header(), "x-edge-proto");
                assert_eq!(config.forwarded_host_header(), "x-forwarded-host");
            },
        );
    }

    #[test]
    fn config_from_env_ignores_blank_values() {
        temp_env::with_vars([("PORDISTO_SESSION_COOKIE_NAME", Some("  "))], || {
            let config = GatewayConfig::from_env();
            assert_eq!(config.session_cookie_name(), "pordisto_session");
        });
    }
}
