use serde::{Deserialize, Serialize};

use crate::error::{ProverError, Result};

/// Decoded content of one optical scan.
///
/// Field names match the record the verifier's setup code embeds in the
/// symbol. Absent fields deserialize as empty strings, so a partial record
/// parses but fails [`ScanPayload::is_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub characteristic: String,
}

impl ScanPayload {
    /// Parse one decoded text frame into a payload record.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProverError::MalformedPayload(e.to_string()))
    }

    /// True when all four required fields are present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.public_key.is_empty()
            && !self.name.is_empty()
            && !self.service.is_empty()
            && !self.characteristic.is_empty()
    }
}

/// Durable identity of a paired verifier device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierHandle {
    pub device_id: String,
    pub public_key: String,
    pub service_id: String,
    pub characteristic_id: String,
}

impl VerifierHandle {
    /// Build a handle from a scanned payload.
    ///
    /// A handle only exists for a payload carrying all four fields.
    pub fn from_payload(payload: &ScanPayload) -> Result<Self> {
        if !payload.is_complete() {
            return Err(ProverError::IncompletePayload(
                "scan payload missing required fields".to_string(),
            ));
        }
        Ok(Self {
            device_id: payload.name.clone(),
            public_key: payload.public_key.clone(),
            service_id: payload.service.clone(),
            characteristic_id: payload.characteristic.clone(),
        })
    }
}

/// Outcome of one unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Success,
    ProximityTooFar,
    Failed,
}

impl std::fmt::Display for UnlockOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnlockOutcome::Success => write!(f, "Success"),
            UnlockOutcome::ProximityTooFar => write!(f, "ProximityTooFar"),
            UnlockOutcome::Failed => write!(f, "Failed"),
        }
    }
}
