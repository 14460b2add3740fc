//! Client seed generation.
//!
//! Seeds are 16 bytes from the OS CSPRNG, hex-encoded. When the OS source fails the
//! generator may fall back to a time-seeded `StdRng`; such seeds are tagged
//! `SeedEntropy::Fallback` so callers can surface the reduced guarantee.

use crate::errors::RoundError;
use rand::{rngs::StdRng, SeedableRng};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const CLIENT_SEED_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeedEntropy {
    Os,
    /// Non-cryptographic fallback; predictable to anyone who can guess the clock
    Fallback,
    /// Chosen by the player, e.g. when replaying a recorded round
    Provided,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSeed {
    pub value: String,
    pub entropy: SeedEntropy,
}

impl ClientSeed {
    pub fn is_secure(&self) -> bool {
        self.entropy != SeedEntropy::Fallback
    }
}

pub struct ClientSeedGenerator {
    source: Box<dyn RngCore + Send>,
    allow_fallback: bool,
    fallback_draws: u64,
    fixed: Option<String>,
}

impl ClientSeedGenerator {
    /// Generator backed by the operating system CSPRNG
    pub fn os(allow_fallback: bool) -> Self {
        Self::with_source(Box::new(OsRng), allow_fallback)
    }

    pub fn with_source(source: Box<dyn RngCore + Send>, allow_fallback: bool) -> Self {
        Self {
            source,
            allow_fallback,
            fallback_draws: 0,
            fixed: None,
        }
    }

    /// Always hands out `seed`
    pub fn fixed(seed: impl Into<String>) -> Self {
        Self {
            fixed: Some(seed.into()),
            ..Self::os(false)
        }
    }

    pub fn generate(&mut self) -> Result<ClientSeed, RoundError> {
        if let Some(seed) = &self.fixed {
            return Ok(ClientSeed {
                value: seed.clone(),
                entropy: SeedEntropy::Provided,
            });
        }

        let mut bytes = [0u8; CLIENT_SEED_BYTES];
        match self.source.try_fill_bytes(&mut bytes) {
            Ok(()) => Ok(ClientSeed {
                value: hex::encode(bytes),
                entropy: SeedEntropy::Os,
            }),
            Err(e) if self.allow_fallback => {
                warn!("CSPRNG unavailable ({}); client seed falls back to a non-crypto PRNG", e);
                self.fill_fallback(&mut bytes);
                Ok(ClientSeed {
                    value: hex::encode(bytes),
                    entropy: SeedEntropy::Fallback,
                })
            }
            Err(e) => {
                warn!("CSPRNG unavailable ({}); fallback disabled", e);
                Err(RoundError::EntropyUnavailable)
            }
        }
    }

    fn fill_fallback(&mut self, bytes: &mut [u8]) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        self.fallback_draws = self.fallback_draws.wrapping_add(1);

        let mut rng = StdRng::seed_from_u64(nanos ^ self.fallback_draws.rotate_left(32));
        rng.fill_bytes(bytes);
    }
}

impl Default for ClientSeedGenerator {
    fn default() -> Self {
        Self::os(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::num::NonZeroU32;

    /// Entropy source that always fails
    pub(crate) struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            Err(rand_core::Error::from(NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap()))
        }
    }

    #[test]
    fn test_os_seed_shape() {
        let mut generator = ClientSeedGenerator::os(false);
        let seed = generator.generate().unwrap();

        assert_eq!(seed.value.len(), CLIENT_SEED_BYTES * 2);
        assert!(seed.value.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(seed.is_secure());

        let other = generator.generate().unwrap();
        assert_ne!(seed.value, other.value);
    }

    #[test]
    fn test_fallback_is_flagged() {
        let mut generator = ClientSeedGenerator::with_source(Box::new(BrokenRng), true);
        let seed = generator.generate().unwrap();

        assert_eq!(seed.entropy, SeedEntropy::Fallback);
        assert!(!seed.is_secure());
        assert_eq!(seed.value.len(), CLIENT_SEED_BYTES * 2);
    }

    #[test]
    fn test_fixed_seed() {
        let mut generator = ClientSeedGenerator::fixed("abc123");
        let seed = generator.generate().unwrap();

        assert_eq!(seed.value, "abc123");
        assert_eq!(seed.entropy, SeedEntropy::Provided);
        assert!(seed.is_secure());
        assert_eq!(generator.generate().unwrap().value, "abc123");
    }

    #[test]
    fn test_fallback_disabled() {
        let mut generator = ClientSeedGenerator::with_source(Box::new(BrokenRng), false);
        assert_eq!(generator.generate(), Err(RoundError::EntropyUnavailable));
    }
}
