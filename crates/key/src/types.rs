use serde::{Deserialize, Serialize};

/// Distance at or below which the unlock action becomes available, in meters.
pub const UNLOCK_THRESHOLD_M: f64 = 0.5;

/// Distance at or below which the holder counts as approaching, in meters.
pub const APPROACH_THRESHOLD_M: f64 = 2.0;

/// Upper end of the progress indicator's distance range, in meters.
pub const PROGRESS_RANGE_M: f64 = 5.0;

/// One classified distance sample from the verifier link.
///
/// The link reports raw doubles where negative values carry status codes.
/// The code is recovered by narrowing toward zero before matching, so a
/// fractional code still lands on its integer bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceReading {
    /// A valid distance estimate in meters.
    Meters(f64),
    /// Transient communication failure. Keep polling, degrade the readout.
    Transient,
    /// Ignorable sample. Leave the previous readout untouched.
    Skip,
    /// Distance genuinely unknown. Neutral readout, not an error.
    Unknown,
}

impl DistanceReading {
    pub fn classify(raw: f64) -> Self {
        if raw >= 0.0 {
            return DistanceReading::Meters(raw);
        }
        match raw.trunc() as i64 {
            -2 => DistanceReading::Skip,
            -3 => DistanceReading::Unknown,
            _ => DistanceReading::Transient,
        }
    }
}

/// Threshold-gated state of the proximity readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    /// Close enough to unlock.
    Unlockable,
    /// In range but not close enough.
    GettingCloser,
    /// Out of range.
    TooFar,
    /// Distance currently unknown.
    Unknown,
    /// Link degraded; the last query failed.
    Degraded,
}

impl GateState {
    /// Gate for a valid distance. Pure in `distance`.
    pub fn for_distance(distance: f64) -> Self {
        if distance <= UNLOCK_THRESHOLD_M {
            GateState::Unlockable
        } else if distance <= APPROACH_THRESHOLD_M {
            GateState::GettingCloser
        } else {
            GateState::TooFar
        }
    }

    /// Whether the unlock action is available in this state.
    pub fn unlock_enabled(self) -> bool {
        self == GateState::Unlockable
    }

    /// Presentation tone used to color the status line.
    pub fn tone(self) -> StatusTone {
        match self {
            GateState::Unlockable => StatusTone::Positive,
            GateState::GettingCloser => StatusTone::Caution,
            GateState::TooFar => StatusTone::Negative,
            GateState::Unknown => StatusTone::Neutral,
            GateState::Degraded => StatusTone::Muted,
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::Unlockable => write!(f, "Unlockable"),
            GateState::GettingCloser => write!(f, "Getting closer"),
            GateState::TooFar => write!(f, "Too far"),
            GateState::Unknown => write!(f, "Proximity unknown"),
            GateState::Degraded => write!(f, "Communication error"),
        }
    }
}

/// Presentation tone of the proximity status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTone {
    Positive,
    Caution,
    Negative,
    Muted,
    Neutral,
}

/// Linear mapping of a distance onto the 0-5 m range, clamped to [0, 100].
pub fn proximity_progress(distance: f64) -> u8 {
    let pct = (PROGRESS_RANGE_M - distance) / PROGRESS_RANGE_M * 100.0;
    pct.clamp(0.0, 100.0).round() as u8
}

/// Distance label for the readout, or the placeholder when no sample applies.
pub fn format_distance(distance: Option<f64>) -> String {
    match distance {
        Some(d) => format!("{:.1} m", d),
        None => "-- m".to_string(),
    }
}
