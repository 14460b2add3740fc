//! Inbound server events
//!
//! Frames are JSON objects tagged by `type`. Decoding is strict about shape but lenient
//! about nonces, which some servers send as numbers.

use crate::errors::CodecError;
use crate::games::types::{Outcome, Seat};
use crate::session::machine::{EventOutcome, RoundSession, SeedReveal};
use crate::session::round::{Progress, RoundResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-to-client event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// Bet accepted and server seed committed
    #[serde(rename = "locked")]
    Locked {
        #[serde(deserialize_with = "nonce_string")]
        nonce: String,
        server_seed_hash: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seat: Option<Seat>,
    },

    /// In-round progress
    #[serde(rename = "tick")]
    Tick {
        #[serde(deserialize_with = "nonce_string")]
        nonce: String,
        progress: Progress,
    },

    /// Final outcome
    #[serde(rename = "resolved")]
    Resolved {
        #[serde(deserialize_with = "nonce_string")]
        nonce: String,
        outcome: Outcome,
        won: bool,
        payout: u64,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        extra: serde_json::Value,
    },

    /// Server seed disclosure
    #[serde(rename = "reveal_seed")]
    RevealSeed {
        #[serde(deserialize_with = "nonce_string")]
        nonce: String,
        server_seed_hex: String,
        formula: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_seed: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opponent_client_seed: Option<String>,
    },

    /// Server or transport failure
    #[serde(rename = "error")]
    Error {
        #[serde(default, deserialize_with = "optional_nonce_string", skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl InboundEvent {
    pub fn nonce(&self) -> Option<&str> {
        match self {
            InboundEvent::Locked { nonce, .. }
            | InboundEvent::Tick { nonce, .. }
            | InboundEvent::Resolved { nonce, .. }
            | InboundEvent::RevealSeed { nonce, .. } => Some(nonce),
            InboundEvent::Error { nonce, .. } => nonce.as_deref(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            InboundEvent::Locked { .. } => "locked",
            InboundEvent::Tick { .. } => "tick",
            InboundEvent::Resolved { .. } => "resolved",
            InboundEvent::RevealSeed { .. } => "reveal_seed",
            InboundEvent::Error { .. } => "error",
        }
    }
}

/// Decode one text frame
pub fn decode_frame(text: &str) -> Result<InboundEvent, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

/// Route an event to the matching session operation
pub fn dispatch(session: &mut RoundSession, event: InboundEvent) -> EventOutcome {
    match event {
        InboundEvent::Locked {
            nonce,
            server_seed_hash,
            seat,
        } => session.on_locked(&nonce, &server_seed_hash, seat),
        InboundEvent::Tick { nonce, progress } => session.on_tick(&nonce, progress),
        InboundEvent::Resolved {
            nonce,
            outcome,
            won,
            payout,
            extra,
        } => session.on_resolved(
            &nonce,
            RoundResult {
                outcome,
                won,
                payout,
                extra,
            },
        ),
        InboundEvent::RevealSeed {
            nonce,
            server_seed_hex,
            formula,
            client_seed,
            opponent_client_seed,
        } => session.on_reveal_seed(
            &nonce,
            SeedReveal {
                server_seed: server_seed_hex,
                formula,
                client_seed,
                opponent_seed: opponent_client_seed,
            },
        ),
        InboundEvent::Error {
            nonce,
            message,
            code,
        } => session.on_error(nonce.as_deref(), &message, code.as_deref()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNonce {
    Text(String),
    Number(u64),
}

impl From<RawNonce> for String {
    fn from(raw: RawNonce) -> Self {
        match raw {
            RawNonce::Text(text) => text,
            RawNonce::Number(n) => n.to_string(),
        }
    }
}

fn nonce_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawNonce::deserialize(deserializer).map(String::from)
}

fn optional_nonce_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawNonce>::deserialize(deserializer)?.map(String::from))
}
