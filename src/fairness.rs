//! Provably-fair verification: commitment checks and outcome recomputation.
//!
//! Everything here is a pure function of its inputs. Discrepancies are reported as
//! `VerificationFailure` entries inside a `VerificationReport`; nothing in this module
//! returns an error or panics on bad data.

use crate::config::GameParams;
use crate::games::engine::{DerivationError, OutcomeEngine, SeedInput};
use crate::games::types::{GameSpec, Outcome};
use crate::session::round::Round;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A discrepancy found while verifying a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationFailure {
    #[error("Server seed has not been revealed")]
    SeedNotRevealed,

    #[error("No commitment was received at lock time")]
    CommitmentMissing,

    #[error("Revealed seed hashes to {computed}, commitment was {commitment}")]
    CommitmentMismatch { commitment: String, computed: String },

    #[error("Round has no reported result")]
    ResultMissing,

    #[error("Missing verification input: {input}")]
    MissingInput { input: String },

    #[error("Server used client seed {echoed}, round submitted {submitted}")]
    ClientSeedMismatch { submitted: String, echoed: String },

    #[error("Outcome could not be recomputed: {reason}")]
    Underivable { reason: String },

    #[error("Reported outcome {reported:?} differs from recomputed {recomputed:?}")]
    OutcomeMismatch { reported: Outcome, recomputed: Outcome },
}

impl From<DerivationError> for VerificationFailure {
    fn from(e: DerivationError) -> Self {
        match e {
            DerivationError::MissingInput(input) => VerificationFailure::MissingInput {
                input: input.to_string(),
            },
            other => VerificationFailure::Underivable {
                reason: other.to_string(),
            },
        }
    }
}

/// Result of verifying one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub commitment_valid: bool,
    pub outcome_matches: bool,
    pub recomputed: Option<Outcome>,
    pub reported: Option<Outcome>,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn is_verified(&self) -> bool {
        self.commitment_valid && self.outcome_matches && self.failures.is_empty()
    }
}

/// Stateless verifier for revealed rounds
pub struct FairnessVerifier;

impl FairnessVerifier {
    /// Lowercase hex SHA-256 of the seed's UTF-8 bytes
    pub fn hash_seed(seed: &str) -> String {
        hex::encode(Sha256::digest(seed.as_bytes()))
    }

    /// True only when `commitment` decodes to exactly the 32-byte SHA-256 of `revealed`
    pub fn verify_commitment(revealed: &str, commitment: &str) -> bool {
        let Ok(expected) = hex::decode(commitment) else {
            return false;
        };
        let computed = Sha256::digest(revealed.as_bytes());

        expected.len() == computed.len() && expected.as_slice() == computed.as_slice()
    }

    /// Recompute the outcome for `spec` from revealed seeds
    pub fn derive_outcome(spec: &GameSpec, input: &SeedInput<'_>) -> Result<Outcome, VerificationFailure> {
        OutcomeEngine::derive(spec, input).map_err(VerificationFailure::from)
    }

    /// Check the commitment and recompute the outcome for a round record.
    ///
    /// Rounds that are not yet revealed or resolved yield a report listing what is
    /// missing rather than an error.
    pub fn verify_round(round: &Round, params: &GameParams) -> VerificationReport {
        let mut failures = Vec::new();
        let reported = round.result.as_ref().map(|r| r.outcome.clone());

        let commitment_valid = match (&round.server_seed_revealed, &round.server_seed_commitment) {
            (Some(revealed), Some(commitment)) => {
                let valid = Self::verify_commitment(revealed, commitment);
                if !valid {
                    failures.push(VerificationFailure::CommitmentMismatch {
                        commitment: commitment.clone(),
                        computed: Self::hash_seed(revealed),
                    });
                }
                valid
            }
            (None, _) => {
                failures.push(VerificationFailure::SeedNotRevealed);
                false
            }
            (Some(_), None) => {
                failures.push(VerificationFailure::CommitmentMissing);
                false
            }
        };

        if reported.is_none() {
            failures.push(VerificationFailure::ResultMissing);
        }

        if let (Some(seed), Some(echo)) = (&round.client_seed, &round.client_seed_echo) {
            if &seed.value != echo {
                failures.push(VerificationFailure::ClientSeedMismatch {
                    submitted: seed.value.clone(),
                    echoed: echo.clone(),
                });
            }
        }

        let recomputed = match Self::recompute(round, params) {
            Ok(outcome) => outcome,
            Err(failure) => {
                failures.push(failure);
                None
            }
        };

        let outcome_matches = match (&reported, &recomputed) {
            (Some(reported), Some(recomputed)) if reported == recomputed => true,
            (Some(reported), Some(recomputed)) => {
                failures.push(VerificationFailure::OutcomeMismatch {
                    reported: reported.clone(),
                    recomputed: recomputed.clone(),
                });
                false
            }
            _ => false,
        };

        VerificationReport {
            commitment_valid,
            outcome_matches,
            recomputed,
            reported,
            failures,
        }
    }

    /// `Ok(None)` when the seed is not revealed yet; that gap is already reported
    fn recompute(round: &Round, params: &GameParams) -> Result<Option<Outcome>, VerificationFailure> {
        let Some(server_seed) = round.server_seed_revealed.as_deref() else {
            return Ok(None);
        };
        let bet = round.bet.as_ref().ok_or_else(|| missing("bet parameters"))?;
        let client_seed = round.client_seed.as_ref().ok_or_else(|| missing("client seed"))?;
        let nonce = round.nonce.as_deref().ok_or_else(|| missing("nonce"))?;

        let mut input = SeedInput::new(server_seed, &client_seed.value, nonce);
        input.seat = round.seat;
        input.opponent_seed = round.opponent_seed.as_deref();
        input.player = round.player.as_deref();

        Self::derive_outcome(&bet.game_spec(params), &input).map(Some)
    }
}

fn missing(input: &str) -> VerificationFailure {
    VerificationFailure::MissingInput {
        input: input.to_string(),
    }
}
