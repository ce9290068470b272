//! Metric names
//!
//! Counters are recorded through the `metrics` facade. No exporter is
//! installed here; hosts install their own recorder.

pub mod names {
    pub const DELIVERY_ATTEMPTS_TOTAL: &str = "cdc_webhook_delivery_attempts_total";
    pub const DELIVERIES_TOTAL: &str = "cdc_webhook_deliveries_total";
    pub const FIRINGS_TOTAL: &str = "cdc_webhook_firings_total";
}
