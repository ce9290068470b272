//! CDC webhook trigger engine
//!
//! The host calls [`TriggerExecutor::on_row_change`] (or
//! [`TriggerExecutor::fire`] for a single trigger) once per row mutation.
//! A returned error whose `aborts_transaction()` is true must roll back the
//! host's current transaction.

pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod sync_bridge;

pub use coordinator::{FiringOutcome, TriggerExecutor};
pub use dispatch::{DeliveryOutcome, HttpTransport, WebhookDispatcher, WebhookTransport};
pub use error::DeliveryError;
pub use registry::TriggerRegistry;
pub use sync_bridge::BlockingExecutor;
