pub mod error;
pub mod types;
pub mod verifier;

pub use error::{ProverError, Result};
pub use types::{ScanPayload, UnlockOutcome, VerifierHandle};
pub use verifier::{Verifier, VerifierProvider};
