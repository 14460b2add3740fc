//! Fairround - provably-fair round client core
//!
//! Tracks a single betting round per game through submit, lock, progress, resolution
//! and seed reveal, and verifies revealed rounds against the server's commitment.
//! Supported games: coinflip, crash, dice, mines and plinko.

pub mod config;
pub mod driver;
pub mod errors;
pub mod events;
pub mod fairness;
pub mod games;
pub mod metrics;
pub mod session;

pub use config::{ConfigLoader, FairroundConfig, GameParams};
pub use driver::{DriverHandle, SessionDriver, SessionUpdate};
pub use errors::{FairroundError, FairroundResult, RoundError};
pub use events::{decode_frame, dispatch, InboundEvent};
pub use fairness::{FairnessVerifier, VerificationFailure, VerificationReport};
pub use games::{BetParameters, BetRequest, GameKind, GameSpec, Outcome, OutcomeEngine, SeedInput};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use session::{EventOutcome, Round, RoundSession, RoundState, VerificationDisplay};
