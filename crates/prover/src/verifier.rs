// Verifier capability boundary.
// The cryptographic proximity proof, link encryption, and secure storage of
// the pairing all live behind these traits; the key flows only drive them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ScanPayload, UnlockOutcome, VerifierHandle};

/// One live link to a paired verifier device.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Identity this verifier was opened for.
    fn handle(&self) -> &VerifierHandle;

    /// Establish the link. Returns false when the device is unreachable.
    async fn connect(&self) -> bool;

    /// Release the link. Safe at any time, any number of times.
    fn disconnect(&self);

    /// One distance estimate in meters.
    ///
    /// Negative values are status codes, not distances: -1 transient
    /// communication failure, -2 ignorable sample, -3 distance unknown.
    async fn query_distance(&self) -> f64;

    /// Run one unlock attempt against the lock.
    async fn unlock(&self) -> UnlockOutcome;

    /// Delete the persisted pairing. Returns false when deletion failed.
    async fn remove(&self) -> bool;
}

/// Access to verifier construction and the persisted pairing record.
///
/// At most one handle is persisted at a time, keyed by device identifier;
/// absence means unpaired.
#[async_trait]
pub trait VerifierProvider: Send + Sync {
    async fn has_persisted_handle(&self) -> bool;

    async fn load_persisted_handle(&self) -> Option<VerifierHandle>;

    /// Open a verifier for a previously persisted handle.
    async fn open(&self, handle: &VerifierHandle) -> Result<Arc<dyn Verifier>>;

    /// Construct a verifier from a freshly scanned payload. Nothing is
    /// persisted until [`VerifierProvider::persist_handle`] is called.
    fn create_from_scan_payload(&self, payload: &ScanPayload) -> Result<Arc<dyn Verifier>>;

    /// Store the handle as the current pairing.
    async fn persist_handle(&self, handle: &VerifierHandle) -> Result<()>;
}
