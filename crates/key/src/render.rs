// UI-bound callback marshaling.
// Flow callbacks are posted here so they run on the single presentation
// context that owns the screens, no matter which task produced them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the currently active rendering context.
///
/// Cloneable. Jobs posted after [`RenderContext::close`] are dropped
/// silently, so a late callback never reaches a torn-down surface.
#[derive(Clone)]
pub struct RenderContext {
    jobs: UnboundedSender<UiJob>,
    open: Arc<AtomicBool>,
}

/// Consuming end of the render queue, driven by the presentation context.
pub struct RenderTarget {
    jobs: UnboundedReceiver<UiJob>,
}

impl RenderContext {
    /// Create a context together with the target that drains it.
    pub fn new() -> (RenderContext, RenderTarget) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            RenderContext {
                jobs: tx,
                open: Arc::new(AtomicBool::new(true)),
            },
            RenderTarget { jobs: rx },
        )
    }

    /// Post a job to run on the presentation context.
    ///
    /// Returns false when the context is closed; the job is dropped.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if !self.open.load(Ordering::Acquire) {
            debug!("Render context closed, dropping posted job");
            return false;
        }
        self.jobs.send(Box::new(job)).is_ok()
    }

    /// Mark the surface as gone. Jobs posted afterwards are dropped.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl RenderTarget {
    /// Drive posted jobs until every context clone has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            job();
        }
    }

    /// Run every job already queued, then return.
    pub fn run_until_idle(&mut self) {
        while let Ok(job) = self.jobs.try_recv() {
            job();
        }
    }
}
