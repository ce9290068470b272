//! Webhook delivery
//!
//! Handles POSTing trigger envelopes to webhook endpoints with a
//! per-attempt deadline and retry/backoff.

mod dispatcher;
mod transport;

pub use dispatcher::{DeliveryOutcome, WebhookDispatcher};
pub use transport::{HttpTransport, WebhookTransport};

#[cfg(test)]
pub(crate) use dispatcher::tests::{RecordingTransport, Step};
