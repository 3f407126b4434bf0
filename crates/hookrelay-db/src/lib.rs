//! Database layer for the hookrelay event delivery engine.
//!
//! Provides the connection pool, embedded SQL migrations, and the sqlx
//! models for applications (target registry), webhook events, and the
//! durable delivery task queue.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
