pub mod bootstrap;
pub mod error;
pub mod pairing;
pub mod permissions;
pub mod render;
pub mod scanner;
pub mod session;
pub mod types;

pub use bootstrap::{Bootstrap, InitialFlow};
pub use error::{ErrorCategory, KeyError, Result};
pub use pairing::{PairingCoordinator, PairingEvent, PairingObserver};
pub use permissions::{
    required_capabilities, Capability, PermissionManager, PermissionStatus, RadioTier,
};
pub use render::{RenderContext, RenderTarget};
pub use scanner::{
    CaptureDevice, DecodeHooks, ScanMode, ScanSettings, ScannerCallback, ScannerController,
};
pub use session::{
    GateView, SessionConfig, SessionController, SessionEvent, SessionObserver, SessionStatus,
};
pub use types::{format_distance, proximity_progress, DistanceReading, GateState, StatusTone};
