//! Core types for the CDC webhook engine

mod credential;
mod event;
mod registration;
mod trigger;

pub use credential::*;
pub use event::*;
pub use registration::*;
pub use trigger::*;
