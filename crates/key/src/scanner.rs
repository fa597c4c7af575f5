// Scanner lifecycle manager.
// Owns the capture resource for whichever flow is scanning and turns decoded
// frames into validated payloads for a single subscriber.

use std::sync::{Arc, PoisonError, RwLock};

use prover::ScanPayload;
use tracing::{debug, warn};

use crate::error::Result;
use crate::render::RenderContext;

/// Decode behavior requested from the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// One decoded frame per preview start.
    Single,
    /// Decode continuously while the preview runs.
    Continuous,
}

/// Capture settings applied when the controller takes a device.
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    pub mode: ScanMode,
    pub auto_focus: bool,
    pub flash: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: ScanMode::Single,
            auto_focus: true,
            flash: false,
        }
    }
}

/// Hooks a capture device invokes from its decode thread.
pub struct DecodeHooks {
    pub on_decode: Box<dyn Fn(String) + Send + Sync>,
    pub on_error: Box<dyn Fn(String) + Send + Sync>,
}

/// External capture/decoder capability.
///
/// Implementations own the camera and the symbol decoder and emit decoded
/// text frames through the hooks installed by [`CaptureDevice::configure`].
pub trait CaptureDevice: Send + Sync {
    fn configure(&self, settings: ScanSettings, hooks: DecodeHooks) -> Result<()>;
    fn start_preview(&self) -> Result<()>;
    fn release_resources(&self);
}

/// Events a scanning flow subscribes to.
pub trait ScannerCallback: Send + Sync {
    fn on_payload_detected(&self, payload: ScanPayload);
    fn on_invalid_payload(&self, reason: String);
    fn on_scan_error(&self, reason: String);
}

type CallbackSlot = Arc<RwLock<Option<Arc<dyn ScannerCallback>>>>;

enum FrameOutcome {
    Payload(ScanPayload),
    Invalid(String),
}

/// Owns the capture resource and validates decoded payloads.
///
/// One subscriber is active at a time; callbacks are read at delivery time
/// on the render context, so replacing the subscriber takes effect for every
/// callback not yet delivered.
pub struct ScannerController {
    device: RwLock<Option<Arc<dyn CaptureDevice>>>,
    callback: CallbackSlot,
    render: RwLock<Option<RenderContext>>,
}

impl ScannerController {
    pub fn new() -> Self {
        Self {
            device: RwLock::new(None),
            callback: Arc::new(RwLock::new(None)),
            render: RwLock::new(None),
        }
    }

    /// Take a capture device and configure single-shot decoding on it.
    ///
    /// A device already held is released first, so re-initialization never
    /// leaks the prior capture resource.
    pub fn initialize(&self, device: Arc<dyn CaptureDevice>, render: RenderContext) -> Result<()> {
        if let Some(prev) = self
            .device
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            debug!("Releasing previously held capture device");
            prev.release_resources();
        }

        let hooks = {
            let decode_slot = Arc::clone(&self.callback);
            let decode_render = render.clone();
            let error_slot = Arc::clone(&self.callback);
            let error_render = render.clone();
            DecodeHooks {
                on_decode: Box::new(move |text| {
                    Self::process_frame(&decode_slot, &decode_render, text);
                }),
                on_error: Box::new(move |reason| {
                    Self::deliver_error(&error_slot, &error_render, reason);
                }),
            }
        };
        device.configure(ScanSettings::default(), hooks)?;

        *self.device.write().unwrap_or_else(PoisonError::into_inner) = Some(device);
        *self.render.write().unwrap_or_else(PoisonError::into_inner) = Some(render);
        debug!("Scanner initialized");
        Ok(())
    }

    /// Replace the active subscriber. `None` detaches without a replacement.
    pub fn set_callback(&self, callback: Option<Arc<dyn ScannerCallback>>) {
        *self
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Start the capture preview. No-op when uninitialized.
    pub fn start(&self) {
        self.start_preview();
    }

    /// Re-acquire the capture resource after a pause.
    pub fn resume(&self) {
        self.start_preview();
    }

    /// Release the capture resource. Idempotent.
    pub fn pause(&self) {
        self.release();
    }

    /// Release the capture resource. Idempotent.
    pub fn stop(&self) {
        self.release();
    }

    fn start_preview(&self) {
        let device = self
            .device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match device {
            Some(device) => {
                if let Err(e) = device.start_preview() {
                    warn!(error = %e, "Capture preview failed to start");
                    let render = self
                        .render
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    if let Some(render) = render {
                        Self::deliver_error(&self.callback, &render, e.user_message());
                    }
                }
            }
            None => debug!("Scanner not initialized, ignoring preview request"),
        }
    }

    fn release(&self) {
        if let Some(device) = self
            .device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            device.release_resources();
        }
    }

    /// Parse and validate one decoded frame, then hand the outcome to the
    /// current subscriber on the render context.
    ///
    /// A frame that does not parse is treated exactly like one with missing
    /// fields: it prompts a re-scan, it is never fatal.
    fn process_frame(slot: &CallbackSlot, render: &RenderContext, text: String) {
        let outcome = match ScanPayload::parse(&text) {
            Ok(payload) if payload.is_complete() => FrameOutcome::Payload(payload),
            Ok(_) => FrameOutcome::Invalid("scan payload missing required fields".to_string()),
            Err(e) => FrameOutcome::Invalid(e.to_string()),
        };

        let slot = Arc::clone(slot);
        render.post(move || {
            let subscriber = slot
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            let Some(subscriber) = subscriber else {
                debug!("No scanner subscriber, dropping frame outcome");
                return;
            };
            match outcome {
                FrameOutcome::Payload(payload) => subscriber.on_payload_detected(payload),
                FrameOutcome::Invalid(reason) => {
                    debug!(%reason, "Rejected scanned frame");
                    subscriber.on_invalid_payload(reason);
                }
            }
        });
    }

    fn deliver_error(slot: &CallbackSlot, render: &RenderContext, reason: String) {
        warn!(%reason, "Capture device reported an error");
        let slot = Arc::clone(slot);
        render.post(move || {
            let subscriber = slot
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(subscriber) = subscriber {
                subscriber.on_scan_error(reason);
            }
        });
    }
}

impl Default for ScannerController {
    fn default() -> Self {
        Self::new()
    }
}
