//! Client core for the Portuguese natural-speech conversion service.
//!
//! # Overview
//! Sends Portuguese text to a remote conversion service, reconciles the
//! several response schemas its deployments have used into one canonical
//! result, and drives the `Idle → Loading → Success | Failure` state machine
//! a presentation layer renders.
//!
//! # Design
//! - `normalize` is a pure function and holds all schema-compatibility logic.
//! - `ConversionClient` keeps the host-does-IO split (`build_convert` /
//!   `parse_convert`) and adds a bounded, single-shot `send` over a
//!   `Transport`.
//! - `SubmissionController` is the only writer of the `SubmissionState`;
//!   presenters observe it through a read-only `StateView`.
//! - Telemetry is a guarded side effect that can never change an outcome.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod normalize;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use client::ConversionClient;
pub use config::{load_settings, ExecutionContext, Settings};
pub use controller::{IgnoreReason, StateView, SubmissionController, SubmitOutcome};
pub use error::{ConfigError, ConversionError, ErrorKind, TelemetryError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use normalize::normalize;
pub use telemetry::{NoopTelemetry, Telemetry, TelemetryEvent, TracingTelemetry};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ConversionRequest, ConversionResult, SubmissionState, NO_COMBINATIONS_MESSAGE};
