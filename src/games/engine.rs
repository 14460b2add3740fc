use crate::games::stream::{hmac_digest, KeyedStream};
use crate::games::types::{CoinSide, GameSpec, Outcome, Seat};

/// 2^53, the mantissa range used to turn 53 digest bits into a float in [0, 1)
const TWO_POW_53: f64 = 9_007_199_254_740_992.0;

/// Seeds and identifiers an outcome is derived from
#[derive(Debug, Clone, Copy)]
pub struct SeedInput<'a> {
    pub server_seed: &'a str,
    pub client_seed: &'a str,
    pub nonce: &'a str,
    /// The other coinflip player's client seed
    pub opponent_seed: Option<&'a str>,
    pub seat: Seat,
    /// Player public key, required by mines
    pub player: Option<&'a str>,
}

impl<'a> SeedInput<'a> {
    pub fn new(server_seed: &'a str, client_seed: &'a str, nonce: &'a str) -> Self {
        Self {
            server_seed,
            client_seed,
            nonce,
            opponent_seed: None,
            seat: Seat::Creator,
            player: None,
        }
    }

    pub fn with_opponent(mut self, opponent_seed: &'a str, seat: Seat) -> Self {
        self.opponent_seed = Some(opponent_seed);
        self.seat = seat;
        self
    }

    pub fn with_player(mut self, player: &'a str) -> Self {
        self.player = Some(player);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("Missing derivation input: {0}")]
    MissingInput(&'static str),

    #[error("Invalid game parameters: {0}")]
    InvalidSpec(String),

    #[error("Server seed cannot be used as an HMAC key")]
    InvalidKey,
}

/// Recomputes game outcomes from revealed seeds. Stateless.
pub struct OutcomeEngine;

impl OutcomeEngine {
    /// Derive the outcome for `spec` from the revealed seeds
    pub fn derive(spec: &GameSpec, input: &SeedInput<'_>) -> Result<Outcome, DerivationError> {
        let key = input.server_seed.as_bytes();

        match *spec {
            GameSpec::Coinflip => {
                let opponent = input
                    .opponent_seed
                    .ok_or(DerivationError::MissingInput("opponent client seed"))?;
                let (first, second) = match input.seat {
                    Seat::Creator => (input.client_seed, opponent),
                    Seat::Joiner => (opponent, input.client_seed),
                };
                let message = format!("{}|{}|{}", first, second, input.nonce);
                let digest = digest(key, &message)?;
                Ok(Outcome::Coinflip {
                    side: Self::compute_coinflip(&digest),
                })
            }
            GameSpec::Dice => {
                let digest = digest(key, &format!("{}{}", input.client_seed, input.nonce))?;
                Ok(Outcome::Dice {
                    roll: Self::compute_dice(&digest),
                })
            }
            GameSpec::Crash { house_edge_bps } => {
                if house_edge_bps >= 10_000 {
                    return Err(DerivationError::InvalidSpec(format!(
                        "house edge {} bps must be below 10000",
                        house_edge_bps
                    )));
                }
                let digest = digest(key, &format!("{}{}", input.client_seed, input.nonce))?;
                Ok(Outcome::Crash {
                    multiplier_x100: Self::compute_crash(&digest, house_edge_bps),
                })
            }
            GameSpec::Mines { grid_size, mines } => {
                if mines == 0 || mines >= grid_size {
                    return Err(DerivationError::InvalidSpec(format!(
                        "{} mines on a {} cell grid",
                        mines, grid_size
                    )));
                }
                let player = input
                    .player
                    .ok_or(DerivationError::MissingInput("player public key"))?;
                let message = format!("{}{}{}", player, input.nonce, input.client_seed);
                let mut stream = KeyedStream::new(key, message.as_bytes())
                    .map_err(|_| DerivationError::InvalidKey)?;
                Ok(Outcome::Mines {
                    mines: Self::compute_mines(&mut stream, grid_size, mines),
                })
            }
            GameSpec::Plinko { rows, balls } => {
                if rows == 0 || balls == 0 {
                    return Err(DerivationError::InvalidSpec(format!(
                        "{} rows, {} balls",
                        rows, balls
                    )));
                }
                let message = format!("{}{}", input.client_seed, input.nonce);
                let mut stream = KeyedStream::new(key, message.as_bytes())
                    .map_err(|_| DerivationError::InvalidKey)?;
                Ok(Outcome::Plinko {
                    slots: Self::compute_plinko(&mut stream, rows, balls),
                })
            }
        }
    }

    /// Lowest bit of the first digest byte: 0 heads, 1 tails
    pub fn compute_coinflip(digest: &[u8; 32]) -> CoinSide {
        if digest[0] & 1 == 0 {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        }
    }

    /// First four bytes as a big-endian u32, modulo 100
    pub fn compute_dice(digest: &[u8; 32]) -> u32 {
        let head = [digest[0], digest[1], digest[2], digest[3]];
        u32::from_be_bytes(head) % 100
    }

    /// Crash point in hundredths, never below 1.00x.
    ///
    /// `r = (u64_be(digest[0..8]) >> 11) / 2^53`, then
    /// `floor(100 * (1 - edge) / (1 - r))` in f64, evaluated in exactly that order.
    pub fn compute_crash(digest: &[u8; 32], house_edge_bps: u32) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let r = (u64::from_be_bytes(head) >> 11) as f64 / TWO_POW_53;
        let edge = house_edge_bps as f64 / 10_000.0;

        let point = (100.0 * (1.0 - edge) / (1.0 - r)).floor();
        (point as u64).max(100)
    }

    /// Partial Fisher-Yates over `0..grid_size`; the first `mines` cells, sorted
    pub fn compute_mines(stream: &mut KeyedStream, grid_size: u8, mines: u8) -> Vec<u8> {
        let mut cells: Vec<u8> = (0..grid_size).collect();
        let grid = grid_size as u32;

        for i in 0..mines as u32 {
            let j = i + stream.next_u32() % (grid - i);
            cells.swap(i as usize, j as usize);
        }

        let mut picked = cells[..mines as usize].to_vec();
        picked.sort_unstable();
        picked
    }

    /// One stream byte per row; an odd byte bounces right. Slot = right bounces.
    pub fn compute_plinko(stream: &mut KeyedStream, rows: u8, balls: u8) -> Vec<u8> {
        (0..balls)
            .map(|_| (0..rows).map(|_| stream.next_u8() & 1).sum())
            .collect()
    }
}

fn digest(key: &[u8], message: &str) -> Result<[u8; 32], DerivationError> {
    hmac_digest(key, message.as_bytes()).map_err(|_| DerivationError::InvalidKey)
}
