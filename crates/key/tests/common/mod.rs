// Scripted capability doubles shared by the flow test suites.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use key::{
    CaptureDevice, DecodeHooks, KeyError, PairingEvent, PairingObserver, RenderTarget,
    ScanSettings, ScannerCallback, SessionEvent, SessionObserver,
};
use prover::{ProverError, ScanPayload, UnlockOutcome, Verifier, VerifierHandle, VerifierProvider};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub fn test_handle() -> VerifierHandle {
    VerifierHandle {
        device_id: "dev1".to_string(),
        public_key: "pk".to_string(),
        service_id: "s1".to_string(),
        characteristic_id: "c1".to_string(),
    }
}

pub fn spawn_render(target: RenderTarget) {
    tokio::spawn(target.run());
}

pub async fn next_event<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

pub async fn expect_no_event<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>, wait: Duration) {
    if let Ok(event) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("expected silence, got {:?}", event);
    }
}

// ---------------------------------------------------------------------------
// Verifier capability doubles
// ---------------------------------------------------------------------------

pub struct MockVerifier {
    handle: VerifierHandle,
    pub connect_result: AtomicBool,
    pub remove_result: AtomicBool,
    pub unlock_outcome: Mutex<UnlockOutcome>,
    pub unlock_delay: Mutex<Duration>,
    distances: Mutex<VecDeque<f64>>,
    pub connect_calls: AtomicU32,
    pub disconnect_calls: AtomicU32,
    pub unlock_calls: AtomicU32,
    pub remove_calls: AtomicU32,
}

impl MockVerifier {
    pub fn new(handle: VerifierHandle) -> Arc<Self> {
        Arc::new(Self {
            handle,
            connect_result: AtomicBool::new(true),
            remove_result: AtomicBool::new(true),
            unlock_outcome: Mutex::new(UnlockOutcome::Success),
            unlock_delay: Mutex::new(Duration::ZERO),
            distances: Mutex::new(VecDeque::new()),
            connect_calls: AtomicU32::new(0),
            disconnect_calls: AtomicU32::new(0),
            unlock_calls: AtomicU32::new(0),
            remove_calls: AtomicU32::new(0),
        })
    }

    /// Queue raw distance values; once drained, the link reports -2
    /// (ignorable sample) so the readout freezes.
    pub fn push_distances(&self, raw: &[f64]) {
        let mut queue = self.distances.lock().unwrap();
        queue.extend(raw.iter().copied());
    }

    pub fn set_unlock_outcome(&self, outcome: UnlockOutcome) {
        *self.unlock_outcome.lock().unwrap() = outcome;
    }

    pub fn set_unlock_delay(&self, delay: Duration) {
        *self.unlock_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    fn handle(&self) -> &VerifierHandle {
        &self.handle
    }

    async fn connect(&self) -> bool {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.connect_result.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn query_distance(&self) -> f64 {
        self.distances.lock().unwrap().pop_front().unwrap_or(-2.0)
    }

    async fn unlock(&self) -> UnlockOutcome {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.unlock_delay.lock().unwrap();
        let outcome = *self.unlock_outcome.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn remove(&self) -> bool {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.remove_result.load(Ordering::SeqCst)
    }
}

pub struct MockProvider {
    persisted: Mutex<Option<VerifierHandle>>,
    verifier: Mutex<Option<Arc<MockVerifier>>>,
    pub persist_calls: AtomicU32,
    pub persist_result: AtomicBool,
}

impl MockProvider {
    pub fn unpaired() -> Arc<Self> {
        Arc::new(Self {
            persisted: Mutex::new(None),
            verifier: Mutex::new(None),
            persist_calls: AtomicU32::new(0),
            persist_result: AtomicBool::new(true),
        })
    }

    /// A provider that already holds a pairing for `verifier`'s handle.
    pub fn paired(verifier: Arc<MockVerifier>) -> Arc<Self> {
        let provider = Self::unpaired();
        *provider.persisted.lock().unwrap() = Some(verifier.handle().clone());
        *provider.verifier.lock().unwrap() = Some(verifier);
        provider
    }

    /// Script the verifier instance handed out for the next open/create.
    pub fn script_verifier(&self, verifier: Arc<MockVerifier>) {
        *self.verifier.lock().unwrap() = Some(verifier);
    }

    pub fn persisted_handle(&self) -> Option<VerifierHandle> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerifierProvider for MockProvider {
    async fn has_persisted_handle(&self) -> bool {
        self.persisted.lock().unwrap().is_some()
    }

    async fn load_persisted_handle(&self) -> Option<VerifierHandle> {
        self.persisted.lock().unwrap().clone()
    }

    async fn open(&self, handle: &VerifierHandle) -> prover::Result<Arc<dyn Verifier>> {
        let scripted = self.verifier.lock().unwrap().clone();
        match scripted {
            Some(verifier) => Ok(verifier),
            None => Ok(MockVerifier::new(handle.clone())),
        }
    }

    fn create_from_scan_payload(&self, payload: &ScanPayload) -> prover::Result<Arc<dyn Verifier>> {
        let handle = VerifierHandle::from_payload(payload)?;
        let scripted = self.verifier.lock().unwrap().clone();
        match scripted {
            Some(verifier) => Ok(verifier),
            None => Ok(MockVerifier::new(handle)),
        }
    }

    async fn persist_handle(&self, handle: &VerifierHandle) -> prover::Result<()> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if !self.persist_result.load(Ordering::SeqCst) {
            return Err(ProverError::Storage("persist failed".to_string()));
        }
        *self.persisted.lock().unwrap() = Some(handle.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capture capability double
// ---------------------------------------------------------------------------

pub struct MockCapture {
    hooks: Mutex<Option<DecodeHooks>>,
    pub settings: Mutex<Option<ScanSettings>>,
    pub preview_starts: AtomicU32,
    pub releases: AtomicU32,
    pub fail_preview: AtomicBool,
}

impl MockCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hooks: Mutex::new(None),
            settings: Mutex::new(None),
            preview_starts: AtomicU32::new(0),
            releases: AtomicU32::new(0),
            fail_preview: AtomicBool::new(false),
        })
    }

    /// Drive the decode hook as the capture backend would.
    pub fn emit_decode(&self, text: &str) {
        let guard = self.hooks.lock().unwrap();
        let hooks = guard.as_ref().expect("capture device not configured");
        (hooks.on_decode)(text.to_string());
    }

    pub fn emit_error(&self, reason: &str) {
        let guard = self.hooks.lock().unwrap();
        let hooks = guard.as_ref().expect("capture device not configured");
        (hooks.on_error)(reason.to_string());
    }
}

impl CaptureDevice for MockCapture {
    fn configure(&self, settings: ScanSettings, hooks: DecodeHooks) -> key::Result<()> {
        *self.settings.lock().unwrap() = Some(settings);
        *self.hooks.lock().unwrap() = Some(hooks);
        Ok(())
    }

    fn start_preview(&self) -> key::Result<()> {
        if self.fail_preview.load(Ordering::SeqCst) {
            return Err(KeyError::ScannerError("capture backend failed".to_string()));
        }
        self.preview_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_resources(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

pub struct ChannelPairingObserver {
    tx: UnboundedSender<PairingEvent>,
}

impl PairingObserver for ChannelPairingObserver {
    fn on_event(&self, event: PairingEvent) {
        let _ = self.tx.send(event);
    }
}

pub fn pairing_observer() -> (Arc<ChannelPairingObserver>, UnboundedReceiver<PairingEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(ChannelPairingObserver { tx }), rx)
}

pub struct ChannelSessionObserver {
    tx: UnboundedSender<SessionEvent>,
}

impl SessionObserver for ChannelSessionObserver {
    fn on_event(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

pub fn session_observer() -> (Arc<ChannelSessionObserver>, UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(ChannelSessionObserver { tx }), rx)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanCallbackEvent {
    Payload(ScanPayload),
    Invalid(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingScannerCallback {
    pub events: Mutex<Vec<ScanCallbackEvent>>,
}

impl RecordingScannerCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<ScanCallbackEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ScannerCallback for RecordingScannerCallback {
    fn on_payload_detected(&self, payload: ScanPayload) {
        self.events
            .lock()
            .unwrap()
            .push(ScanCallbackEvent::Payload(payload));
    }

    fn on_invalid_payload(&self, reason: String) {
        self.events
            .lock()
            .unwrap()
            .push(ScanCallbackEvent::Invalid(reason));
    }

    fn on_scan_error(&self, reason: String) {
        self.events
            .lock()
            .unwrap()
            .push(ScanCallbackEvent::Error(reason));
    }
}
