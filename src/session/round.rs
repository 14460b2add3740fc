//! The round record and the shapes derived from it for display.

use crate::games::types::{hundredths, BetParameters, GameOutcome, Outcome, Seat};
use crate::session::client_seed::ClientSeed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    #[default]
    Idle,
    Locked,
    Active,
    Resolved,
    Errored,
}

impl RoundState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundState::Resolved | RoundState::Errored)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Idle => write!(f, "idle"),
            RoundState::Locked => write!(f, "locked"),
            RoundState::Active => write!(f, "active"),
            RoundState::Resolved => write!(f, "resolved"),
            RoundState::Errored => write!(f, "errored"),
        }
    }
}

/// In-round progress carried by tick events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    /// Crash multiplier stream
    Multiplier {
        #[serde(rename = "multiplier", with = "hundredths")]
        multiplier_x100: u64,
    },
    /// Plinko ball position
    BallDrop {
        ball: u8,
        row: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<u8>,
    },
    /// Mines tile opened by the player
    TileRevealed { tile: u8, safe: bool },
}

/// Final result reported by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResult {
    pub outcome: Outcome,
    pub won: bool,
    pub payout: u64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

impl RoundResult {
    pub fn game_outcome(&self) -> GameOutcome {
        if self.won {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        }
    }
}

/// A single betting round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Round {
    pub nonce: Option<String>,
    pub player: Option<String>,
    pub bet: Option<BetParameters>,
    pub client_seed: Option<ClientSeed>,
    pub server_seed_commitment: Option<String>,
    pub server_seed_revealed: Option<String>,
    pub formula: Option<String>,
    /// Client seed the server says it used; must equal `client_seed`
    pub client_seed_echo: Option<String>,
    pub opponent_seed: Option<String>,
    #[serde(default)]
    pub seat: Seat,
    #[serde(default)]
    pub state: RoundState,
    pub progress: Option<Progress>,
    pub result: Option<RoundResult>,
}

impl Round {
    /// Read-only verification panel payload; `None` until the round has locked
    pub fn verification_display(&self, verified: Option<bool>) -> Option<VerificationDisplay> {
        Some(VerificationDisplay {
            nonce: self.nonce.clone()?,
            client_seed: self.client_seed.as_ref()?.value.clone(),
            server_seed_commitment: self.server_seed_commitment.clone()?,
            server_seed_revealed: self.server_seed_revealed.clone(),
            formula: self.formula.clone(),
            verified,
        })
    }
}

/// Normalized payload for the view layer's verification panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationDisplay {
    pub nonce: String,
    pub client_seed: String,
    pub server_seed_commitment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed_revealed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// Completed round kept after the live record moves on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub display: VerificationDisplay,
    pub outcome: Outcome,
    pub won: bool,
    pub payout: u64,
    pub recorded_at: DateTime<Utc>,
}
