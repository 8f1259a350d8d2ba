//! Application configuration
//!
//! Loaded from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    /// Absent means the in-memory store is used
    pub database: Option<DatabaseConfig>,
    pub session: SessionConfig,
    pub presence: PresenceConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Resume-token settings
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    /// Token lifetime in seconds
    pub token_expiry: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

/// Presence sweep settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Online/away users not seen for this long are taken offline
    pub inactivity_timeout: Duration,
    /// How often the sweep runs
    pub sweep_interval: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(default_inactivity_timeout()),
            sweep_interval: Duration::from_secs(default_sweep_interval()),
        }
    }
}

/// Connection-upgrade throttling for the gateway endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub upgrades_per_second: u32,
    pub upgrade_burst: u32,
}

// Default value functions
fn default_app_name() -> String {
    "lobby".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ten years
const MAX_TOKEN_EXPIRY: i64 = 315_360_000;

fn default_token_expiry() -> i64 {
    2_592_000 // 30 days
}

fn default_inactivity_timeout() -> u64 {
    300 // 5 minutes
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_upgrades_per_second() -> u32 {
    10
}

fn default_upgrade_burst() -> u32 {
    50
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database = match vars.get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: vars
                    .parse("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: vars
                    .parse("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            }),
            None => None,
        };

        let env = match vars.get("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => Environment::default(),
        };

        let presence = PresenceConfig {
            inactivity_timeout: Duration::from_secs(
                vars.parse("PRESENCE_INACTIVITY_TIMEOUT")?
                    .unwrap_or_else(default_inactivity_timeout),
            ),
            sweep_interval: Duration::from_secs(
                vars.parse("PRESENCE_SWEEP_INTERVAL")?
                    .unwrap_or_else(default_sweep_interval),
            ),
        };
        let token_expiry = vars
            .parse("SESSION_TOKEN_EXPIRY")?
            .unwrap_or_else(default_token_expiry);
        if !(1..=MAX_TOKEN_EXPIRY).contains(&token_expiry) {
            return Err(ConfigError::InvalidValue(
                "SESSION_TOKEN_EXPIRY",
                token_expiry.to_string(),
            ));
        }

        if presence.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "PRESENCE_SWEEP_INTERVAL",
                "0".to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: vars.get("GATEWAY_HOST").unwrap_or_else(default_host),
                port: vars
                    .parse("GATEWAY_PORT")?
                    .ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            database,
            session: SessionConfig {
                secret: vars
                    .get("SESSION_SECRET")
                    .ok_or(ConfigError::MissingVar("SESSION_SECRET"))?,
                token_expiry,
            },
            presence,
            rate_limit: RateLimitConfig {
                upgrades_per_second: vars
                    .parse("RATE_LIMIT_UPGRADES_PER_SECOND")?
                    .unwrap_or_else(default_upgrades_per_second),
                upgrade_burst: vars
                    .parse("RATE_LIMIT_UPGRADE_BURST")?
                    .unwrap_or_else(default_upgrade_burst),
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&'static str) -> Option<String>,
{
    /// Present and non-blank
    fn get(&self, key: &'static str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// A set-but-unparseable value is an error, not a silent default
    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
