// Permission handling for the key flows.
// Camera is always required; the short-range-radio set varies by platform
// capability tier.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{KeyError, Result};

/// Platform capability tier deciding which radio permissions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioTier {
    /// Platforms with dedicated short-range-radio permissions.
    Modern,
    /// Platforms where radio access rides on location permissions.
    Legacy,
}

/// A platform capability the flows need authorized before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    RadioScan,
    RadioConnect,
    RadioAdvertise,
    LegacyRadio,
    LegacyRadioAdmin,
    FineLocation,
    CoarseLocation,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Camera => write!(f, "camera"),
            Capability::RadioScan => write!(f, "radio-scan"),
            Capability::RadioConnect => write!(f, "radio-connect"),
            Capability::RadioAdvertise => write!(f, "radio-advertise"),
            Capability::LegacyRadio => write!(f, "legacy-radio"),
            Capability::LegacyRadioAdmin => write!(f, "legacy-radio-admin"),
            Capability::FineLocation => write!(f, "fine-location"),
            Capability::CoarseLocation => write!(f, "coarse-location"),
        }
    }
}

/// Authorization status of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Permission has been granted
    Granted,
    /// Permission has been denied by the user
    Denied,
    /// Permission has not been requested yet
    NotRequested,
    /// Permission is not applicable on this platform
    NotApplicable,
}

/// Capability set required on a tier. Camera is always present.
pub fn required_capabilities(tier: RadioTier) -> Vec<Capability> {
    match tier {
        RadioTier::Modern => vec![
            Capability::Camera,
            Capability::RadioScan,
            Capability::RadioConnect,
            Capability::RadioAdvertise,
        ],
        RadioTier::Legacy => vec![
            Capability::Camera,
            Capability::FineLocation,
            Capability::CoarseLocation,
            Capability::LegacyRadio,
            Capability::LegacyRadioAdmin,
        ],
    }
}

/// Tracks and requests platform capability authorizations.
pub struct PermissionManager {
    statuses: Arc<RwLock<HashMap<Capability, PermissionStatus>>>,
}

impl PermissionManager {
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Current status of a capability without requesting it.
    pub async fn check_permission(&self, capability: Capability) -> PermissionStatus {
        self.statuses
            .read()
            .await
            .get(&capability)
            .copied()
            .unwrap_or(PermissionStatus::NotRequested)
    }

    /// Request a capability from the platform.
    ///
    /// Idempotent: a status other than NotRequested is returned from the
    /// cache without prompting again.
    pub async fn request_permission(&self, capability: Capability) -> Result<PermissionStatus> {
        let current = self.check_permission(capability).await;
        if current != PermissionStatus::NotRequested {
            debug!(%capability, ?current, "Permission already requested");
            return Ok(current);
        }

        let status = self.platform_request(capability).await?;
        self.statuses.write().await.insert(capability, status);
        info!(%capability, ?status, "Permission requested");
        Ok(status)
    }

    /// Verify that a capability is granted before a flow relies on it.
    pub async fn verify_permission(&self, capability: Capability) -> Result<()> {
        match self.check_permission(capability).await {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Denied => Err(KeyError::PermissionDenied(format!(
                "{} permission was denied",
                capability
            ))),
            PermissionStatus::NotRequested => Err(KeyError::PermissionDenied(format!(
                "{} permission has not been requested",
                capability
            ))),
            PermissionStatus::NotApplicable => Err(KeyError::PermissionDenied(format!(
                "{} is not available on this platform",
                capability
            ))),
        }
    }

    /// Manually set permission status (for testing and for shells that run
    /// their own grant dialogs)
    pub async fn set_permission(&self, capability: Capability, status: PermissionStatus) {
        self.statuses.write().await.insert(capability, status);
    }

    /// Platform-specific permission request
    #[cfg(any(target_os = "android", target_os = "ios"))]
    async fn platform_request(&self, capability: Capability) -> Result<PermissionStatus> {
        // Mobile shells surface the grant dialog themselves and report the
        // result through set_permission; requesting here only records intent.
        debug!(%capability, "Mobile platform: deferring to the shell's grant dialog");
        Ok(PermissionStatus::Granted)
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    async fn platform_request(&self, capability: Capability) -> Result<PermissionStatus> {
        debug!(%capability, "Desktop platform: no explicit grant required");
        Ok(PermissionStatus::Granted)
    }
}

impl Default for PermissionManager {
    fn default() -> Self {
        Self::new()
    }
}
