//! Configuration for the grant negotiation server.

use std::str::FromStr;
use std::time::Duration;

/// Protocol constants.
pub mod protocol {
    use std::time::Duration;

    /// Header carrying the detached JWS over the request body.
    pub const SIGNATURE_HEADER: &str = "JWS-Signature";

    /// Token type reported for handles and access tokens.
    pub const BEARER_TOKEN_TYPE: &str = "Bearer";

    /// Path segment reserved for the device (user code) interaction.
    pub const USER_CODE_INTERACTION_PATH: &str = "device";

    /// Random bytes in a continuation handle.
    pub const HANDLE_LEN: usize = 15;

    /// Random bytes in a redirect interaction key.
    pub const INTERACTION_KEY_LEN: usize = 15;

    /// Random bytes in an interaction reference.
    pub const INTERACTION_REF_LEN: usize = 15;

    /// Random bytes in a server nonce.
    pub const NONCE_LEN: usize = 20;

    /// Random bytes in an access token.
    pub const ACCESS_TOKEN_LEN: usize = 25;

    /// Random bytes in a user code (8 base32 characters).
    pub const USER_CODE_LEN: usize = 5;

    /// Polling interval handed to clients still waiting for authorization.
    pub const WAIT_INTERVAL_SECS: u64 = 30;

    /// Transaction lifetime: 30 days.
    pub const TRANSACTION_TIMEOUT_DAYS: i64 = 30;

    /// Request timeout applied by the HTTP layer.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Bounded drain after a termination signal.
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Default host used to build interaction URLs.
    pub const DEFAULT_INTERACTION_HOST: &str = "localhost:3000";
}

/// How a transaction's age is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Deadline counted from creation; continuations never extend it.
    #[default]
    Absolute,
    /// Deadline counted from the last committed call.
    Sliding,
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" => Ok(Self::Absolute),
            "sliding" => Ok(Self::Sliding),
            other => Err(format!("unknown expiry policy '{other}'")),
        }
    }
}

/// Query parameter that carries the interaction reference on a callback redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackRefParam {
    /// `interact=<ref>`
    #[default]
    Interact,
    /// `interaction_handle=<ref>`
    InteractionHandle,
}

impl CallbackRefParam {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interact => "interact",
            Self::InteractionHandle => "interaction_handle",
        }
    }
}

impl FromStr for CallbackRefParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interact" => Ok(Self::Interact),
            "interaction_handle" => Ok(Self::InteractionHandle),
            other => Err(format!("unknown callback parameter '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host (with optional port) used to build interaction URLs.
    pub interaction_host: String,

    /// Age after which a transaction is dropped.
    pub transaction_timeout: chrono::Duration,

    /// Whether continuations refresh the expiry clock.
    pub expiry_policy: ExpiryPolicy,

    /// Seconds a polling client is told to wait.
    pub wait_interval: u64,

    /// Parameter name for the interaction reference on callbacks.
    pub callback_ref_param: CallbackRefParam,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Drain timeout on shutdown.
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Create a configuration for the given interaction host.
    #[must_use]
    pub fn new(interaction_host: impl Into<String>) -> Self {
        Self {
            interaction_host: interaction_host.into(),
            transaction_timeout: chrono::Duration::days(protocol::TRANSACTION_TIMEOUT_DAYS),
            expiry_policy: ExpiryPolicy::default(),
            wait_interval: protocol::WAIT_INTERVAL_SECS,
            callback_ref_param: CallbackRefParam::default(),
            request_timeout: protocol::REQUEST_TIMEOUT,
            shutdown_timeout: protocol::SHUTDOWN_TIMEOUT,
        }
    }

    /// Create a test configuration.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_millis(100),
            ..Self::new("as.example.com")
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("INTERACTION_HOST")
            .unwrap_or_else(|_| protocol::DEFAULT_INTERACTION_HOST.to_string());
        let mut config = Self::new(host);

        if let Ok(policy) = std::env::var("EXPIRY_POLICY") {
            config.expiry_policy = policy.parse().map_err(anyhow::Error::msg)?;
        }
        if let Ok(param) = std::env::var("CALLBACK_REF_PARAM") {
            config.callback_ref_param = param.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(config)
    }

    /// Interaction URL for a redirect interaction key.
    #[must_use]
    pub fn interaction_url(&self, interaction_key: &str) -> String {
        format!("https://{}/interact/{}", self.interaction_host, interaction_key)
    }

    /// URL where an end user enters a user code.
    #[must_use]
    pub fn user_code_url(&self) -> String {
        self.interaction_url(protocol::USER_CODE_INTERACTION_PATH)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(protocol::DEFAULT_INTERACTION_HOST)
    }
}
