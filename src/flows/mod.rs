//! Flows sequence page-object calls into named business operations.
//!
//! Each flow logs a human-readable step description before every
//! sub-action, so the log and the trace read as the business operation
//! rather than a stream of selector pokes.

pub mod login;

pub use login::LoginFlow;

use tracing::info;

use crate::browser::Tracer;

/// Log and trace one business step.
pub(crate) fn step(tracer: &Tracer, description: &str) {
    info!("[step] {description}");
    tracer.record_plain("step", description);
}
