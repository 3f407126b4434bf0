//! Database models.

pub mod application;
pub mod delivery_task;
pub mod webhook_event;

pub use application::{Application, UpsertApplication};
pub use delivery_task::{DeliveryTask, EnqueueDeliveryTask, TaskStatus};
pub use webhook_event::{AttemptRecord, CreateWebhookEvent, EventStatus, WebhookEvent};
