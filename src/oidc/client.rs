//! Registered relying-party clients.
//!
//! Raw configurations are validated into `RegisteredClient` at load time;
//! anything malformed fails startup rather than a request. The
//! `ClientCapabilities` trait is the exact accessor surface an OAuth2
//! framework substitute is wired through.

use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::authorization::{
    AuthenticationLevel, PolicyError, RequiredLevel, is_level_sufficient, policy_to_level,
};

const DEFAULT_GRANT_TYPE: &str = "authorization_code";
const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_TOKEN_ENDPOINT_AUTH_METHOD: &str = "client_secret_basic";
const DEFAULT_TOKEN_ENDPOINT_AUTH_SIGNING_ALGORITHM: &str = "RS256";

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("client configuration is missing an id")]
    MissingId,
    #[error("client {0:?} is confidential but has no secret")]
    MissingSecret(String),
    #[error("client {client:?} has an invalid redirect URI {uri:?}: {reason}")]
    InvalidRedirectUri {
        client: String,
        uri: String,
        reason: String,
    },
    #[error("client {0:?}: {1}")]
    InvalidPolicy(String, #[source] PolicyError),
    #[error("duplicate client id {0:?}")]
    DuplicateClient(String),
}

/// Raw relying-party configuration as deserialized from the gateway's
/// configuration source. Every field is defaulted so partial configurations
/// parse; validation happens in `RegisteredClient::new`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfiguration {
    pub id: String,
    pub description: String,
    pub secret: String,
    pub policy: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub response_modes: Vec<String>,
    pub scopes: Vec<String>,
    pub audience: Vec<String>,
    pub public: bool,
    pub jwks: Option<serde_json::Value>,
    pub jwks_uri: Option<String>,
    pub request_uris: Vec<String>,
    pub request_object_signing_algorithm: Option<String>,
    pub token_endpoint_auth_method: Option<String>,
    pub token_endpoint_auth_signing_algorithm: Option<String>,
}

/// Accessor surface a relying-party client must provide to the OAuth2
/// machinery. Defaulting rules live in the effective accessors, never at the
/// call sites.
pub trait ClientCapabilities {
    fn client_id(&self) -> &str;
    fn description(&self) -> &str;
    fn hashed_secret(&self) -> &SecretString;
    fn redirect_uris(&self) -> &[String];
    /// Effective grant types; empty configuration defaults to
    /// `authorization_code`.
    fn grant_types(&self) -> Vec<String>;
    /// Effective response types; empty configuration defaults to `code`.
    fn response_types(&self) -> Vec<String>;
    fn response_modes(&self) -> &[String];
    fn scopes(&self) -> &[String];
    fn audience(&self) -> &[String];
    fn is_public(&self) -> bool;
    fn json_web_keys(&self) -> Option<&serde_json::Value>;
    fn json_web_keys_uri(&self) -> Option<&str>;
    fn request_uris(&self) -> &[String];
    fn request_object_signing_algorithm(&self) -> Option<&str>;
    /// Effective token-endpoint auth method; empty configuration defaults to
    /// `client_secret_basic`.
    fn token_endpoint_auth_method(&self) -> &str;
    /// Effective token-endpoint signing algorithm; empty configuration
    /// defaults to `RS256`.
    fn token_endpoint_auth_signing_algorithm(&self) -> &str;
}

/// A validated relying-party client, immutable after load.
#[derive(Clone, Debug)]
pub struct RegisteredClient {
    id: String,
    description: String,
    secret: SecretString,
    policy: RequiredLevel,
    redirect_uris: Vec<String>,
    grant_types: Vec<String>,
    response_types: Vec<String>,
    response_modes: Vec<String>,
    scopes: Vec<String>,
    audience: Vec<String>,
    public: bool,
    jwks: Option<serde_json::Value>,
    jwks_uri: Option<String>,
    request_uris: Vec<String>,
    request_object_signing_algorithm: Option<String>,
    token_endpoint_auth_method: Option<String>,
    token_endpoint_auth_signing_algorithm: Option<String>,
}

impl RegisteredClient {
    /// Validate a raw configuration into a registered client.
    ///
    /// # Errors
    /// Returns `ClientConfigError` when identity fields are missing, a
    /// redirect URI is not an absolute URL, or the policy name is unknown.
    /// All of these are fatal at startup.
    pub fn new(config: ClientConfiguration) -> Result<Self, ClientConfigError> {
        if config.id.is_empty() {
            return Err(ClientConfigError::MissingId);
        }
        if !config.public && config.secret.is_empty() {
            return Err(ClientConfigError::MissingSecret(config.id));
        }

        for uri in &config.redirect_uris {
            if let Err(err) = Url::parse(uri) {
                return Err(ClientConfigError::InvalidRedirectUri {
                    client: config.id,
                    uri: uri.clone(),
                    reason: err.to_string(),
                });
            }
        }

        let policy = policy_to_level(&config.policy)
            .map_err(|err| ClientConfigError::InvalidPolicy(config.id.clone(), err))?;

        let response_modes = if config.response_modes.is_empty() {
            vec![
                "form_post".to_string(),
                "query".to_string(),
                "fragment".to_string(),
            ]
        } else {
            config.response_modes
        };

        Ok(Self {
            id: config.id,
            description: config.description,
            secret: SecretString::from(config.secret),
            policy,
            redirect_uris: config.redirect_uris,
            grant_types: config.grant_types,
            response_types: config.response_types,
            response_modes,
            scopes: config.scopes,
            audience: config.audience,
            public: config.public,
            jwks: config.jwks,
            jwks_uri: config.jwks_uri,
            request_uris: config.request_uris,
            request_object_signing_algorithm: config.request_object_signing_algorithm,
            token_endpoint_auth_method: config.token_endpoint_auth_method,
            token_endpoint_auth_signing_algorithm: config.token_endpoint_auth_signing_algorithm,
        })
    }

    /// Minimum level this client's policy requires to authorize it.
    #[must_use]
    pub fn required_level(&self) -> RequiredLevel {
        self.policy
    }

    /// Whether the session's level satisfies this client's policy.
    #[must_use]
    pub fn is_authentication_level_sufficient(&self, level: AuthenticationLevel) -> bool {
        is_level_sufficient(level, self.policy)
    }
}

impl ClientCapabilities for RegisteredClient {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn hashed_secret(&self) -> &SecretString {
        &self.secret
    }

    fn redirect_uris(&self) -> &[String] {
        &self.redirect_uris
    }

    fn grant_types(&self) -> Vec<String> {
        if self.grant_types.is_empty() {
            return vec![DEFAULT_GRANT_TYPE.to_string()];
        }
        self.grant_types.clone()
    }

    fn response_types(&self) -> Vec<String> {
        if self.response_types.is_empty() {
            return vec![DEFAULT_RESPONSE_TYPE.to_string()];
        }
        self.response_types.clone()
    }

    fn response_modes(&self) -> &[String] {
        &self.response_modes
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn audience(&self) -> &[String] {
        &self.audience
    }

    fn is_public(&self) -> bool {
        self.public
    }

    fn json_web_keys(&self) -> Option<&serde_json::Value> {
        self.jwks.as_ref()
    }

    fn json_web_keys_uri(&self) -> Option<&str> {
        self.jwks_uri.as_deref()
    }

    fn request_uris(&self) -> &[String] {
        &self.request_uris
    }

    fn request_object_signing_algorithm(&self) -> Option<&str> {
        self.request_object_signing_algorithm.as_deref()
    }

    fn token_endpoint_auth_method(&self) -> &str {
        match self.token_endpoint_auth_method.as_deref() {
            Some(method) if !method.is_empty() => method,
            _ => DEFAULT_TOKEN_ENDPOINT_AUTH_METHOD,
        }
    }

    fn token_endpoint_auth_signing_algorithm(&self) -> &str {
        match self.token_endpoint_auth_signing_algorithm.as_deref() {
            Some(algorithm) if !algorithm.is_empty() => algorithm,
            _ => DEFAULT_TOKEN_ENDPOINT_AUTH_SIGNING_ALGORITHM,
        }
    }
}

/// All registered clients, built once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Arc<RegisteredClient>>,
}

impl ClientRegistry {
    /// Validate every configuration and index the clients by id.
    ///
    /// # Errors
    /// Propagates the first invalid configuration, or rejects a duplicated
    /// client id.
    pub fn from_configurations(
        configurations: Vec<ClientConfiguration>,
    ) -> Result<Self, ClientConfigError> {
        let mut clients = HashMap::with_capacity(configurations.len());
        for configuration in configurations {
            let client = RegisteredClient::new(configuration)?;
            let id = client.client_id().to_string();
            if clients.contains_key(&id) {
                return Err(ClientConfigError::DuplicateClient(id));
            }
            clients.insert(id, Arc::new(client));
        }
        Ok(Self { clients })
    }

    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<Arc<RegisteredClient>> {
        self.clients.get(client_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
