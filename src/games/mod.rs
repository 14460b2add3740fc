pub mod engine;
pub mod stream;
pub mod types;

pub use engine::{DerivationError, OutcomeEngine, SeedInput};
pub use stream::KeyedStream;
pub use types::*;
