// Proximity session controller.
// Owns the connection lifecycle, the distance polling loop, and the unlock
// and removal actions for the currently paired verifier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use prover::{UnlockOutcome, Verifier, VerifierHandle, VerifierProvider};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{KeyError, Result};
use crate::render::RenderContext;
use crate::types::{format_distance, proximity_progress, DistanceReading, GateState};

/// Default distance sampling period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Tunables for the session controller.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Distance sampling period.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Connection status of the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Constructed, nothing loaded yet.
    Idle,
    Connecting,
    /// Connected with the distance loop running.
    Connected,
    ConnectionFailed,
    Unlocking,
    Removing,
    /// Terminal. The pairing flow takes over.
    Removed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Connecting => write!(f, "Connecting"),
            SessionStatus::Connected => write!(f, "Connected, polling"),
            SessionStatus::ConnectionFailed => write!(f, "Connection failed"),
            SessionStatus::Unlocking => write!(f, "Unlocking"),
            SessionStatus::Removing => write!(f, "Removing"),
            SessionStatus::Removed => write!(f, "Removed"),
        }
    }
}

/// Presentation snapshot of the proximity readout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateView {
    pub gate: GateState,
    pub distance_m: Option<f64>,
    pub distance_label: String,
    pub progress: u8,
    pub unlock_enabled: bool,
}

impl GateView {
    /// Readout shown before the first sample has been applied.
    pub fn initial() -> Self {
        Self::without_sample(GateState::Degraded)
    }

    fn for_sample(distance: f64) -> Self {
        let gate = GateState::for_distance(distance);
        Self {
            gate,
            distance_m: Some(distance),
            distance_label: format_distance(Some(distance)),
            progress: proximity_progress(distance),
            unlock_enabled: gate.unlock_enabled(),
        }
    }

    fn without_sample(gate: GateState) -> Self {
        Self {
            gate,
            distance_m: None,
            distance_label: format_distance(None),
            progress: 0,
            unlock_enabled: false,
        }
    }
}

/// Events surfaced to the session screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(SessionStatus),
    Gate(GateView),
    UnlockFinished(UnlockOutcome),
    /// Removal failed; the removable state was restored for a retry.
    RemoveFailed,
    /// Removal succeeded; navigate back to the pairing flow.
    Removed,
}

pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

struct SessionShared {
    provider: Arc<dyn VerifierProvider>,
    observer: Arc<dyn SessionObserver>,
    render: RenderContext,
    config: SessionConfig,
    session_id: Uuid,
    verifier: RwLock<Option<Arc<dyn Verifier>>>,
    status: RwLock<SessionStatus>,
    view: RwLock<GateView>,
    connected_at: RwLock<Option<DateTime<Utc>>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    active: AtomicBool,
}

/// Drives one live session against the paired verifier. Cheap to clone;
/// clones share one session state.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<SessionShared>,
}

impl SessionController {
    pub fn new(
        provider: Arc<dyn VerifierProvider>,
        observer: Arc<dyn SessionObserver>,
        render: RenderContext,
    ) -> Self {
        Self::with_config(provider, observer, render, SessionConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn VerifierProvider>,
        observer: Arc<dyn SessionObserver>,
        render: RenderContext,
        config: SessionConfig,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                provider,
                observer,
                render,
                config,
                session_id: Uuid::new_v4(),
                verifier: RwLock::new(None),
                status: RwLock::new(SessionStatus::Idle),
                view: RwLock::new(GateView::initial()),
                connected_at: RwLock::new(None),
                poll_task: Mutex::new(None),
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub async fn status(&self) -> SessionStatus {
        *self.shared.status.read().await
    }

    /// Last applied proximity readout.
    pub async fn view(&self) -> GateView {
        self.shared.view.read().await.clone()
    }

    /// Identity of the paired verifier, once loaded.
    pub async fn details(&self) -> Option<VerifierHandle> {
        self.shared
            .verifier
            .read()
            .await
            .as_ref()
            .map(|v| v.handle().clone())
    }

    pub async fn connected_at(&self) -> Option<DateTime<Utc>> {
        *self.shared.connected_at.read().await
    }

    /// Load the persisted pairing and connect to it.
    ///
    /// Fails fast with [`KeyError::NotPaired`] when nothing is persisted;
    /// the hosting flow returns to pairing instead of entering an error
    /// state.
    pub async fn start(&self) -> Result<()> {
        let Some(handle) = self.shared.provider.load_persisted_handle().await else {
            info!(
                session_id = %self.shared.session_id,
                "No persisted verifier, returning control to the pairing flow"
            );
            return Err(KeyError::NotPaired);
        };
        let verifier = self
            .shared
            .provider
            .open(&handle)
            .await
            .map_err(|e| KeyError::Internal(e.to_string()))?;
        *self.shared.verifier.write().await = Some(verifier);

        // Degraded placeholder readout until the first sample lands.
        let initial = GateView::initial();
        *self.shared.view.write().await = initial.clone();
        self.shared.emit(SessionEvent::Gate(initial));

        self.connect().await
    }

    /// Connect to the loaded verifier and start the distance loop.
    ///
    /// A failed connection is never retried here; re-entering the flow is
    /// the only way to try again.
    pub async fn connect(&self) -> Result<()> {
        let verifier = self.shared.require_verifier().await?;
        self.shared.set_status(SessionStatus::Connecting).await;

        if verifier.connect().await {
            *self.shared.connected_at.write().await = Some(Utc::now());
            self.shared.set_status(SessionStatus::Connected).await;
            info!(
                session_id = %self.shared.session_id,
                device_id = %verifier.handle().device_id,
                "Verifier connected, polling distance"
            );
            self.shared.start_polling();
            Ok(())
        } else {
            self.shared.set_status(SessionStatus::ConnectionFailed).await;
            warn!(
                session_id = %self.shared.session_id,
                device_id = %verifier.handle().device_id,
                "Verifier connection failed"
            );
            Err(KeyError::ConnectionFailed(
                "verifier unreachable".to_string(),
            ))
        }
    }

    /// Run one unlock attempt.
    ///
    /// Sampling pauses for the duration of the call and resumes after the
    /// outcome has been applied; gating is re-evaluated from the next
    /// sample, whatever the outcome was.
    pub async fn unlock(&self) -> Result<UnlockOutcome> {
        let verifier = self.shared.require_verifier().await?;

        self.shared.stop_polling();
        self.shared.set_status(SessionStatus::Unlocking).await;
        let disabled = {
            let mut view = self.shared.view.write().await;
            view.unlock_enabled = false;
            view.clone()
        };
        self.shared.emit(SessionEvent::Gate(disabled));
        info!(session_id = %self.shared.session_id, "Unlock attempt started");

        let outcome = verifier.unlock().await;

        if !self.shared.active.load(Ordering::Acquire) {
            debug!(
                session_id = %self.shared.session_id,
                "Session torn down during unlock, discarding outcome"
            );
            return Ok(outcome);
        }

        info!(session_id = %self.shared.session_id, %outcome, "Unlock attempt finished");
        self.shared.set_status(SessionStatus::Connected).await;
        self.shared.emit(SessionEvent::UnlockFinished(outcome));
        self.shared.start_polling();
        Ok(outcome)
    }

    /// Remove the paired verifier.
    ///
    /// Requires a loaded verifier; without one this is a precondition
    /// failure and the delete primitive is never invoked. On failure the
    /// prior removable state is restored so the action can be retried.
    pub async fn remove(&self) -> Result<()> {
        let verifier = {
            let guard = self.shared.verifier.read().await;
            guard.as_ref().cloned()
        };
        let Some(verifier) = verifier else {
            warn!(
                session_id = %self.shared.session_id,
                "Removal requested without a loaded verifier"
            );
            return Err(KeyError::Precondition(
                "no verifier loaded for removal".to_string(),
            ));
        };

        self.shared.stop_polling();
        self.shared.set_status(SessionStatus::Removing).await;
        info!(
            session_id = %self.shared.session_id,
            device_id = %verifier.handle().device_id,
            "Removing paired verifier"
        );

        let removed = verifier.remove().await;

        if !self.shared.active.load(Ordering::Acquire) {
            debug!(
                session_id = %self.shared.session_id,
                "Session torn down during removal, discarding result"
            );
            return Ok(());
        }

        if removed {
            verifier.disconnect();
            *self.shared.verifier.write().await = None;
            self.shared.set_status(SessionStatus::Removed).await;
            self.shared.emit(SessionEvent::Removed);
            info!(session_id = %self.shared.session_id, "Verifier removed");
            Ok(())
        } else {
            warn!(session_id = %self.shared.session_id, "Verifier removal failed");
            self.shared.set_status(SessionStatus::Connected).await;
            self.shared.emit(SessionEvent::RemoveFailed);
            let prior = self.shared.view.read().await.clone();
            self.shared.emit(SessionEvent::Gate(prior));
            self.shared.start_polling();
            Err(KeyError::RemovalFailed(
                "verifier storage removal failed".to_string(),
            ))
        }
    }

    /// Release the connection without touching the persisted pairing.
    /// Idempotent; safe before ever connecting.
    pub async fn disconnect(&self) {
        self.shared.stop_polling();
        if let Some(verifier) = self.shared.verifier.read().await.as_ref() {
            verifier.disconnect();
        }
    }

    /// Lifecycle hook: the session screen left the foreground.
    pub fn pause(&self) {
        self.shared.stop_polling();
    }

    /// Lifecycle hook: the session screen returned to the foreground.
    pub async fn resume(&self) {
        if *self.shared.status.read().await == SessionStatus::Connected {
            self.shared.start_polling();
        }
    }

    /// Tear the session down: stop future sampling ticks, request
    /// disconnection, and discard results of operations still in flight.
    pub async fn deactivate(&self) {
        self.shared.active.store(false, Ordering::Release);
        self.shared.stop_polling();
        if let Some(verifier) = self.shared.verifier.read().await.as_ref() {
            verifier.disconnect();
        }
        debug!(session_id = %self.shared.session_id, "Session deactivated");
    }
}

impl SessionShared {
    fn emit(&self, event: SessionEvent) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let observer = Arc::clone(&self.observer);
        self.render.post(move || observer.on_event(event));
    }

    async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
        debug!(session_id = %self.session_id, %status, "Session status changed");
        self.emit(SessionEvent::Status(status));
    }

    async fn require_verifier(&self) -> Result<Arc<dyn Verifier>> {
        self.verifier
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(KeyError::NotPaired)
    }

    /// Start the distance loop, replacing any previous one.
    ///
    /// One task issues one query, applies its result, then sleeps for the
    /// period: at most one query is outstanding and samples are applied in
    /// issue order.
    fn start_polling(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let verifier = { shared.verifier.read().await.as_ref().cloned() };
                let Some(verifier) = verifier else { break };
                if *shared.status.read().await != SessionStatus::Connected {
                    break;
                }
                let raw = verifier.query_distance().await;
                shared.apply_raw_distance(raw).await;
                tokio::time::sleep(shared.config.poll_interval).await;
            }
        });
        let mut guard = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = guard.replace(handle) {
            prev.abort();
        }
        debug!(session_id = %self.session_id, "Distance polling started");
    }

    fn stop_polling(&self) {
        let handle = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!(session_id = %self.session_id, "Distance polling stopped");
        }
    }

    async fn apply_raw_distance(&self, raw: f64) {
        match DistanceReading::classify(raw) {
            DistanceReading::Skip => {
                debug!(session_id = %self.session_id, "Ignorable sample, keeping prior readout");
            }
            DistanceReading::Meters(distance) => {
                let unlocking = *self.status.read().await == SessionStatus::Unlocking;
                let next = {
                    let mut view = self.view.write().await;
                    let next = if unlocking {
                        // The readout may move while unlocking; the gate and
                        // the action-enabled flag may not.
                        GateView {
                            gate: view.gate,
                            distance_m: Some(distance),
                            distance_label: format_distance(Some(distance)),
                            progress: proximity_progress(distance),
                            unlock_enabled: view.unlock_enabled,
                        }
                    } else {
                        GateView::for_sample(distance)
                    };
                    *view = next.clone();
                    next
                };
                self.emit(SessionEvent::Gate(next));
            }
            DistanceReading::Unknown => self.apply_no_sample(GateState::Unknown).await,
            DistanceReading::Transient => self.apply_no_sample(GateState::Degraded).await,
        }
    }

    async fn apply_no_sample(&self, gate: GateState) {
        let view = GateView::without_sample(gate);
        *self.view.write().await = view.clone();
        self.emit(SessionEvent::Gate(view));
    }
}
