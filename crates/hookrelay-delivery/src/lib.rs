//! Event delivery engine for tenant-configured webhook relaying.
//!
//! Provides the ingestion path (receive → persist → enqueue), the durable
//! at-least-once delivery queue, the retrying delivery worker, and the
//! status/replay API.

pub mod error;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod router;
pub mod services;
pub mod tenant;
pub mod validation;
pub mod worker;

pub use error::RelayError;
pub use queue::{DeliveryQueue, PgDeliveryQueue, RetryPolicy};
pub use router::{relay_router, RelayState};
pub use tenant::TenantContext;
pub use worker::DeliveryWorker;
