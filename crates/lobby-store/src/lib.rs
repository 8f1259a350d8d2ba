//! # lobby-store
//!
//! Implementations of the `AccountStore` port.
//!
//! - [`PgAccountStore`]: PostgreSQL via SQLx, used when `DATABASE_URL` is set
//! - [`MemoryAccountStore`]: process-local, used for development and tests
//!
//! Both adapters own credential hashing; plaintext passwords never leave the
//! adapter call that received them.
//!
//! ```rust,ignore
//! use lobby_store::{create_pool, ensure_schema, PgAccountStore};
//!
//! let pool = create_pool(&config.database).await?;
//! ensure_schema(&pool).await?;
//! let store = PgAccountStore::new(pool);
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, ensure_schema, PgPool};
pub use repositories::{MemoryAccountStore, PgAccountStore, SentVerification};
