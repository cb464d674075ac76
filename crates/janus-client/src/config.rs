//! Client configuration.
//!
//! [`ClientConfig`] is a plain struct with a [`Default`]; the embedding
//! application decides where the values come from (flags, files, env).
//! There is no global state and nothing here reads the environment.

use std::time::Duration;

/// All runtime configuration for one gateway connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Shared API secret merged into every request as `apisecret`.
    ///
    /// Takes precedence over [`token`](Self::token); the two are never sent
    /// together.
    pub api_secret: Option<String>,

    /// Stored auth token merged into every request as `token`, used only
    /// when no API secret is configured.
    pub token: Option<String>,

    /// How often the liveness prober pings the gateway.
    pub ping_interval: Duration,

    /// Deadline for one liveness probe write.  On expiry the prober reports
    /// the failure and stops; it does not retry.
    pub ping_timeout: Duration,
}

impl ClientConfig {
    /// Defaults: no authentication, probe every 30 s with a 20 s deadline.
    pub fn new() -> Self {
        Self {
            api_secret: None,
            token: None,
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(20),
        }
    }

    /// Sets the API secret.
    pub fn with_api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Sets the auth token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// `Default` must agree with `new`; a derived impl would zero the durations.
impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
