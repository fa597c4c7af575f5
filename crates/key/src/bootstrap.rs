// Process bootstrap: capability gate and initial flow selection.

use std::sync::Arc;

use prover::VerifierProvider;
use tracing::{info, warn};

use crate::error::{KeyError, Result};
use crate::permissions::{required_capabilities, PermissionManager, PermissionStatus, RadioTier};

/// Which flow the shell presents first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialFlow {
    /// No pairing exists yet; scan a verifier code.
    Pairing,
    /// A pairing exists; open the proximity session.
    Session,
}

/// Gates the flows behind platform capability grants and picks the
/// starting flow from the persisted pairing state.
pub struct Bootstrap {
    permissions: Arc<PermissionManager>,
    provider: Arc<dyn VerifierProvider>,
}

impl Bootstrap {
    pub fn new(permissions: Arc<PermissionManager>, provider: Arc<dyn VerifierProvider>) -> Self {
        Self {
            permissions,
            provider,
        }
    }

    /// Authorize every required capability, then pick the starting flow.
    ///
    /// Any refusal is terminal: the caller surfaces the notice and ends the
    /// process instead of entering a half-initialized flow.
    pub async fn run(&self, tier: RadioTier) -> Result<InitialFlow> {
        for capability in required_capabilities(tier) {
            let status = self.permissions.request_permission(capability).await?;
            if status != PermissionStatus::Granted {
                warn!(%capability, ?status, "Required capability refused");
                return Err(KeyError::PermissionDenied(format!(
                    "{} permission is required to run",
                    capability
                )));
            }
        }

        let flow = if self.provider.has_persisted_handle().await {
            InitialFlow::Session
        } else {
            InitialFlow::Pairing
        };
        info!(?flow, "Bootstrap complete");
        Ok(flow)
    }
}
