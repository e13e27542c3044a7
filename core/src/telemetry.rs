//! Best-effort analytics events.
//!
//! Telemetry is fire-and-forget: `record` is synchronous, must not block,
//! and its failures never reach the state machine. The controller calls it
//! through [`record_guarded`], which swallows both `Err` and panics.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TelemetryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A submission was admitted and the controller entered `Loading`.
    ConversionStarted { request_id: Uuid, text_chars: usize },
}

pub trait Telemetry: Send + Sync {
    fn record(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Emits each event as a `tracing` info event on the `fala::telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        match event {
            TelemetryEvent::ConversionStarted {
                request_id,
                text_chars,
            } => info!(target: "fala::telemetry", %request_id, text_chars, "conversion started"),
        }
        Ok(())
    }
}

/// Record `event`, logging and discarding any failure or panic.
pub(crate) fn record_guarded(sink: &dyn Telemetry, event: &TelemetryEvent) {
    match catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "dropping telemetry event"),
        Err(_) => warn!("telemetry sink panicked; event dropped"),
    }
}
