//! Business logic services for the delivery engine.

pub mod delivery_service;
pub mod ingest_service;

pub use delivery_service::{DeliveryService, TaskDisposition};
pub use ingest_service::IngestService;
