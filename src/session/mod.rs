//! Round lifecycle: the per-game state machine and the records it keeps

pub mod client_seed;
pub mod machine;
pub mod round;

pub use client_seed::{ClientSeed, ClientSeedGenerator, SeedEntropy};
pub use machine::{EventOutcome, RoundSession, SeedReveal};
pub use round::{HistoryEntry, Progress, Round, RoundResult, RoundState, VerificationDisplay};
