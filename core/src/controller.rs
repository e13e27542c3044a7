//! The submission state machine.
//!
//! # Design
//! `SubmissionController` is the only writer of the `SubmissionState` cell,
//! held as a `tokio::sync::watch` sender. Presenters get a [`StateView`] and
//! can read or await changes but never write.
//!
//! ```text
//! Idle ──submit(non-empty)──▶ Loading ──ok──▶ Success ─┐
//!  ▲  └─submit(empty): no-op     │                     │ submit(non-empty)
//!  │                             └──err──▶ Failure ────┤
//!  └────────────── (never returns to Idle) ◀───────────┘──▶ Loading
//! ```
//!
//! The admission gate is a single check-and-set on the cell: a submission
//! that finds the state `Loading` is dropped, not queued. Once admitted the
//! state always leaves `Loading`, even if the submit future is dropped
//! mid-flight.

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::ConversionClient;
use crate::config::Settings;
use crate::error::ConversionError;
use crate::telemetry::{record_guarded, NoopTelemetry, Telemetry, TelemetryEvent};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{ConversionRequest, SubmissionState};

/// Why a submission was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty or whitespace-only.
    Empty,
    /// Another submission is still in flight.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored(IgnoreReason),
    /// The request resolved and the state is now `Success` or `Failure`.
    Settled,
}

/// Read-only handle on the controller's state.
#[derive(Debug, Clone)]
pub struct StateView {
    rx: watch::Receiver<SubmissionState>,
}

impl StateView {
    pub fn current(&self) -> SubmissionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition. Returns `false` once the controller is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

pub struct SubmissionController<T> {
    client: ConversionClient,
    transport: T,
    telemetry: Box<dyn Telemetry>,
    spell_check: bool,
    state: watch::Sender<SubmissionState>,
}

impl SubmissionController<ReqwestTransport> {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(ConversionClient::from_settings(settings), ReqwestTransport::new())
    }
}

impl<T: Transport> SubmissionController<T> {
    pub fn new(client: ConversionClient, transport: T) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            client,
            transport,
            telemetry: Box::new(NoopTelemetry),
            spell_check: false,
            state,
        }
    }

    pub fn with_telemetry(mut self, telemetry: impl Telemetry + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    /// Ask the service to spell-correct input before converting it.
    pub fn with_spell_check(mut self, enabled: bool) -> Self {
        self.spell_check = enabled;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> StateView {
        StateView {
            rx: self.state.subscribe(),
        }
    }

    /// Submit `text` for conversion and wait for it to resolve.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let request = match ConversionRequest::new(text) {
            Ok(request) => request.with_spell_check(self.spell_check),
            Err(_) => {
                debug!("ignoring empty submission");
                return SubmitOutcome::Ignored(IgnoreReason::Empty);
            }
        };

        let admitted = self.state.send_if_modified(|state| {
            if state.is_loading() {
                return false;
            }
            *state = SubmissionState::Loading;
            true
        });
        if !admitted {
            debug!("submission dropped while a request is in flight");
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        }

        let request_id = Uuid::new_v4();
        info!(%request_id, chars = request.text.chars().count(), "conversion submitted");
        record_guarded(
            self.telemetry.as_ref(),
            &TelemetryEvent::ConversionStarted {
                request_id,
                text_chars: request.text.chars().count(),
            },
        );

        let guard = LoadingGuard::new(&self.state);
        let next = match self.client.send(&self.transport, &request).await {
            Ok(result) => {
                info!(%request_id, "conversion succeeded");
                SubmissionState::Success(result)
            }
            Err(err) => {
                info!(%request_id, kind = %err.kind, error = %err, "conversion failed");
                SubmissionState::Failure(err)
            }
        };
        guard.settle(next);
        SubmitOutcome::Settled
    }
}

/// Moves the state out of `Loading` when dropped without being settled.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SubmissionState>,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a watch::Sender<SubmissionState>) -> Self {
        Self { state, armed: true }
    }

    fn settle(mut self, next: SubmissionState) {
        self.armed = false;
        self.state.send_replace(next);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("in-flight conversion dropped");
            self.state.send_replace(SubmissionState::Failure(ConversionError::transport(
                "Request was cancelled",
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::{ErrorKind, TelemetryError, TransportError};
    use crate::http::{HttpRequest, HttpResponse};

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Replays queued replies in order, optionally holding each one until released.
    struct FakeService {
        replies: Mutex<Vec<Result<HttpResponse, TransportError>>>,
        bodies: Mutex<Vec<String>>,
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl FakeService {
        fn new(replies: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                bodies: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: None,
            })
        }

        fn gated(replies: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                bodies: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: Some(Notify::new()),
            })
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeService {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .lock()
                .unwrap()
                .push(request.body.unwrap_or_default());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(TransportError("no scripted reply".to_string())))
        }
    }

    #[derive(Default)]
    struct CountingTelemetry {
        events: AtomicUsize,
    }

    impl Telemetry for Arc<CountingTelemetry> {
        fn record(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            self.events.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenTelemetry;

    impl Telemetry for BrokenTelemetry {
        fn record(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError("blocked by extension".to_string()))
        }
    }

    struct PanickingTelemetry;

    impl Telemetry for PanickingTelemetry {
        fn record(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            panic!("analytics script crashed");
        }
    }

    fn controller(service: &Arc<FakeService>) -> SubmissionController<Arc<FakeService>> {
        SubmissionController::new(
            ConversionClient::new("http://localhost:5000/convert"),
            Arc::clone(service),
        )
    }

    #[tokio::test]
    async fn starts_idle() {
        let service = FakeService::new(Vec::new());
        assert_eq!(controller(&service).state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn empty_submission_is_a_silent_no_op() {
        let service = FakeService::new(Vec::new());
        let ctrl = controller(&service);
        for text in ["", "   ", "\t\n"] {
            assert_eq!(ctrl.submit(text).await, SubmitOutcome::Ignored(IgnoreReason::Empty));
        }
        assert_eq!(ctrl.state(), SubmissionState::Idle);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn success_lands_in_success_state() {
        let service = FakeService::new(vec![Ok(response(
            200,
            r#"{"before":"da Ana","after":"dAna","combinations":["da + Ana"]}"#,
        ))]);
        let ctrl = controller(&service);

        assert_eq!(ctrl.submit("da Ana").await, SubmitOutcome::Settled);
        let state = ctrl.state();
        let result = state.result().unwrap();
        assert_eq!(result.converted_text, "dAna");
        assert_eq!(result.combinations, vec!["da + Ana"]);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn every_error_kind_lands_in_failure_state() {
        let service = FakeService::new(vec![
            Err(TransportError("connection reset".to_string())),
            Ok(response(400, r#"{"error":"bad input"}"#)),
            Ok(response(200, "{}")),
        ]);
        let ctrl = controller(&service);

        let mut kinds = Vec::new();
        for _ in 0..3 {
            assert_eq!(ctrl.submit("casa").await, SubmitOutcome::Settled);
            kinds.push(ctrl.state().error().unwrap().kind);
        }
        assert_eq!(
            kinds,
            vec![
                ErrorKind::Transport,
                ErrorKind::ServerReported,
                ErrorKind::MalformedResponse
            ]
        );
    }

    #[tokio::test]
    async fn controller_is_reusable_after_failure() {
        let service = FakeService::new(vec![
            Ok(response(500, r#"{"error":"boom"}"#)),
            Ok(response(200, r#"{"result":"kaza"}"#)),
        ]);
        let ctrl = controller(&service);

        ctrl.submit("casa").await;
        assert_eq!(ctrl.state().error().unwrap().message, "boom");

        ctrl.submit("casa").await;
        assert_eq!(ctrl.state().result().unwrap().converted_text, "kaza");
    }

    #[tokio::test]
    async fn new_result_supersedes_previous_one() {
        let service = FakeService::new(vec![
            Ok(response(200, r#"{"result":"um"}"#)),
            Ok(response(200, r#"{"result":"dois"}"#)),
        ]);
        let ctrl = controller(&service);

        ctrl.submit("1").await;
        ctrl.submit("2").await;
        assert_eq!(ctrl.state().result().unwrap().converted_text, "dois");
    }

    #[tokio::test]
    async fn view_observes_loading_then_resolution() {
        let service = FakeService::gated(vec![Ok(response(200, r#"{"result":"b"}"#))]);
        let ctrl = controller(&service);
        let mut view = ctrl.view();

        let observer = async {
            let mut seen = Vec::new();
            while view.changed().await {
                let state = view.current();
                let done = !state.is_loading();
                seen.push(state);
                if done {
                    break;
                }
                service.release();
            }
            seen
        };

        let (outcome, seen) = tokio::join!(ctrl.submit("a"), observer);
        assert_eq!(outcome, SubmitOutcome::Settled);
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_loading());
        assert!(seen[1].result().is_some());
    }

    #[tokio::test]
    async fn submission_while_loading_is_dropped() {
        let service = FakeService::gated(vec![Ok(response(200, r#"{"result":"first"}"#))]);
        let ctrl = controller(&service);
        let mut view = ctrl.view();

        let second = async {
            while !view.current().is_loading() {
                assert!(view.changed().await);
            }
            let outcome = ctrl.submit("second").await;
            assert!(ctrl.state().is_loading());
            service.release();
            outcome
        };

        let (first, second) = tokio::join!(ctrl.submit("first"), second);
        assert_eq!(first, SubmitOutcome::Settled);
        assert_eq!(second, SubmitOutcome::Ignored(IgnoreReason::Busy));
        assert_eq!(service.calls(), 1);
        assert_eq!(ctrl.state().result().unwrap().converted_text, "first");
    }

    #[tokio::test]
    async fn telemetry_fires_once_per_admitted_submission() {
        let service = FakeService::new(vec![
            Ok(response(200, r#"{"result":"b"}"#)),
            Ok(response(200, r#"{"result":"c"}"#)),
        ]);
        let telemetry = Arc::new(CountingTelemetry::default());
        let ctrl = controller(&service).with_telemetry(Arc::clone(&telemetry));

        ctrl.submit("a").await;
        ctrl.submit("  ").await;
        ctrl.submit("b").await;
        assert_eq!(telemetry.events.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn telemetry_failure_does_not_affect_outcome() {
        let service = FakeService::new(vec![
            Ok(response(200, r#"{"result":"b"}"#)),
            Ok(response(200, r#"{"result":"c"}"#)),
        ]);
        let ctrl = controller(&service).with_telemetry(BrokenTelemetry);
        ctrl.submit("a").await;
        assert_eq!(ctrl.state().result().unwrap().converted_text, "b");

        let ctrl = controller(&service).with_telemetry(PanickingTelemetry);
        ctrl.submit("a").await;
        assert_eq!(ctrl.state().result().unwrap().converted_text, "c");
    }

    #[tokio::test]
    async fn spell_check_flag_is_forwarded() {
        let service = FakeService::new(vec![Ok(response(200, r#"{"result":"b"}"#))]);
        let ctrl = controller(&service).with_spell_check(true);
        ctrl.submit("qeria").await;

        let body: serde_json::Value =
            serde_json::from_str(&service.bodies.lock().unwrap()[0]).unwrap();
        assert_eq!(body, serde_json::json!({ "text": "qeria", "use_spell_check": true }));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_submission_clears_loading() {
        let service = FakeService::gated(Vec::new());
        let ctrl = controller(&service);

        let abandoned = tokio::time::timeout(Duration::from_millis(10), ctrl.submit("casa")).await;
        assert!(abandoned.is_err());

        let state = ctrl.state();
        let err = state.error().unwrap();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(err.message, "Request was cancelled");
    }
}
