// Pairing coordinator.
// Turns one validated scan payload into a persisted verifier handle, but
// only after a live connection attempt has succeeded.

use std::sync::Arc;

use prover::{ScanPayload, Verifier, VerifierProvider};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::render::RenderContext;
use crate::scanner::{ScannerCallback, ScannerController};

/// Flow-level events surfaced to the pairing screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A payload was accepted and a connection attempt is running.
    Connecting,
    /// Connection succeeded and the handle was persisted. Advance to the
    /// session flow.
    SetupComplete,
    /// The scanned verifier could not be reached. A fresh scan is required.
    SendFailed,
    /// The scanned code was not a valid payload. Scanning resumes.
    InvalidPayload(String),
    /// The capture device reported an error. Scanning resumes.
    ScanError(String),
}

pub trait PairingObserver: Send + Sync {
    fn on_event(&self, event: PairingEvent);
}

struct PairingShared {
    provider: Arc<dyn VerifierProvider>,
    scanner: Arc<ScannerController>,
    observer: Arc<dyn PairingObserver>,
    render: RenderContext,
    verifier: RwLock<Option<Arc<dyn Verifier>>>,
}

/// Consumes validated payloads from the scanner and runs the pairing
/// handshake. Cheap to clone; clones share one flow state.
#[derive(Clone)]
pub struct PairingCoordinator {
    shared: Arc<PairingShared>,
}

impl PairingCoordinator {
    pub fn new(
        provider: Arc<dyn VerifierProvider>,
        scanner: Arc<ScannerController>,
        observer: Arc<dyn PairingObserver>,
        render: RenderContext,
    ) -> Self {
        Self {
            shared: Arc::new(PairingShared {
                provider,
                scanner,
                observer,
                render,
                verifier: RwLock::new(None),
            }),
        }
    }

    /// Register as the scanner's subscriber and start scanning.
    pub fn activate(&self) {
        self.shared
            .scanner
            .set_callback(Some(Arc::new(self.clone())));
        self.shared.scanner.start();
    }

    /// Re-enable scanning after a failed attempt.
    pub fn rescan(&self) {
        self.shared.scanner.resume();
    }

    /// Leave the pairing flow: detach from the scanner, release the capture
    /// resource, and drop any connection made before handoff.
    pub async fn deactivate(&self) {
        self.shared.scanner.set_callback(None);
        self.shared.scanner.pause();
        if let Some(verifier) = self.shared.verifier.write().await.take() {
            verifier.disconnect();
        }
    }
}

impl PairingShared {
    fn emit(&self, event: PairingEvent) {
        let observer = Arc::clone(&self.observer);
        self.render.post(move || observer.on_event(event));
    }

    async fn pair(self: Arc<Self>, payload: ScanPayload) {
        let verifier = match self.provider.create_from_scan_payload(&payload) {
            Ok(verifier) => verifier,
            Err(e) => {
                warn!(error = %e, "Scanned payload rejected by the verifier provider");
                self.emit(PairingEvent::InvalidPayload(e.to_string()));
                self.scanner.resume();
                return;
            }
        };
        info!(device_id = %verifier.handle().device_id, "Connecting to scanned verifier");
        *self.verifier.write().await = Some(Arc::clone(&verifier));

        if !verifier.connect().await {
            warn!(device_id = %verifier.handle().device_id, "Pairing connection failed");
            self.emit(PairingEvent::SendFailed);
            self.scanner.resume();
            return;
        }

        // The connection succeeded; only now may the pairing become durable.
        match self.provider.persist_handle(verifier.handle()).await {
            Ok(()) => {
                info!(device_id = %verifier.handle().device_id, "Pairing complete");
                self.emit(PairingEvent::SetupComplete);
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist the paired handle");
                verifier.disconnect();
                self.emit(PairingEvent::SendFailed);
                self.scanner.resume();
            }
        }
    }
}

impl ScannerCallback for PairingCoordinator {
    fn on_payload_detected(&self, payload: ScanPayload) {
        self.shared.emit(PairingEvent::Connecting);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.pair(payload).await;
        });
    }

    fn on_invalid_payload(&self, reason: String) {
        self.shared.emit(PairingEvent::InvalidPayload(reason));
        self.shared.scanner.resume();
    }

    fn on_scan_error(&self, reason: String) {
        self.shared.emit(PairingEvent::ScanError(reason));
        self.shared.scanner.resume();
    }
}
