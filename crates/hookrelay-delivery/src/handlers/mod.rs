//! HTTP handlers for the relay API.

pub mod applications;
pub mod events;
pub mod ingest;
