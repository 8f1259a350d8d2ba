//! # lobby-common
//!
//! Shared utilities including configuration, error handling, credential hashing,
//! session tokens, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    hash_password, verify_password, IssuedToken, PasswordService, SessionClaims,
    SessionTokenService,
};
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, PresenceConfig,
    RateLimitConfig, ServerConfig, SessionConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
