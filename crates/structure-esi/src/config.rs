//! Client configuration: hosts, Neucore credentials and retry policy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::error::{EsiError, Result};

/// Default public ESI host.
pub const DEFAULT_ESI_HOST: &str = "https://esi.evetech.net";
/// Default ESI route version.
pub const DEFAULT_ESI_VERSION: &str = "/latest";
/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "https://github.com/eve-n0rman/structurebot";

/// Character (and optional login) whose token Neucore uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datasource {
    /// EVE character id.
    pub character_id: i64,
    /// Neucore login name, if not the default one.
    pub login: Option<String>,
}

impl FromStr for Datasource {
    type Err = EsiError;

    /// Parses `id` or `id:login`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, login) = match s.split_once(':') {
            Some((id, login)) => (id, Some(login.trim())),
            None => (s, None),
        };
        let character_id = id.trim().parse::<i64>().map_err(|_| EsiError::InvalidConfig {
            reason: format!("datasource must be `id[:login]`, got {s:?}"),
        })?;
        Ok(Self {
            character_id,
            login: login.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.login {
            Some(login) => write!(f, "{}:{login}", self.character_id),
            None => write!(f, "{}", self.character_id),
        }
    }
}

/// Neucore application credentials.
#[derive(Clone)]
pub struct NeucoreConfig {
    /// Neucore ESI proxy endpoint.
    pub host: Url,
    /// Application id.
    pub app_id: String,
    /// Application secret.
    app_secret: String,
    /// Character used for authenticated calls.
    pub datasource: Datasource,
}

impl fmt::Debug for NeucoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeucoreConfig")
            .field("host", &self.host.as_str())
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("datasource", &self.datasource)
            .finish()
    }
}

impl NeucoreConfig {
    /// Creates Neucore credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a URL or the id or secret is empty.
    pub fn new(
        host: &str,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        datasource: Datasource,
    ) -> Result<Self> {
        let app_id = app_id.into();
        let app_secret = app_secret.into();
        if app_id.is_empty() || app_secret.is_empty() {
            return Err(EsiError::InvalidConfig {
                reason: "neucore app id and secret are required".to_string(),
            });
        }
        Ok(Self {
            host: Url::parse(host)?,
            app_id,
            app_secret,
            datasource,
        })
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.app_id, self.app_secret));
        format!("Bearer {token}")
    }
}

/// Retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between attempts.
    pub backoff_multiplier: f64,
    /// Total attempts including the first.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_attempts: 4,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_attempts: 1,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Whether another attempt follows failed attempt number `attempt`.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Everything needed to build an [`EsiClient`](crate::EsiClient).
#[derive(Debug, Clone)]
pub struct EsiConfig {
    /// Public ESI host.
    pub esi_host: Url,
    /// Route version prefix such as `/latest`.
    pub esi_version: String,
    /// Neucore proxy for authenticated routes.
    pub neucore: Option<NeucoreConfig>,
    /// User agent header.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Maximum concurrent requests for fan-out lookups.
    pub concurrency: usize,
}

impl EsiConfig {
    /// Creates a configuration for the given ESI host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a URL.
    pub fn new(esi_host: &str) -> Result<Self> {
        Ok(Self {
            esi_host: Url::parse(esi_host)?,
            esi_version: DEFAULT_ESI_VERSION.to_string(),
            neucore: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            concurrency: 8,
        })
    }

    /// Routes authenticated calls through Neucore.
    #[must_use]
    pub fn with_neucore(mut self, neucore: NeucoreConfig) -> Self {
        self.neucore = Some(neucore);
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the fan-out concurrency, at least 1.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}
