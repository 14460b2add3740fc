use crate::config::GameParams;
use crate::errors::RoundError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Coinflip,
    Crash,
    Dice,
    Mines,
    Plinko,
}

impl GameKind {
    pub fn all() -> [GameKind; 5] {
        [
            GameKind::Coinflip,
            GameKind::Crash,
            GameKind::Dice,
            GameKind::Mines,
            GameKind::Plinko,
        ]
    }

    /// Games that stream progress between lock and resolution
    pub fn has_ticks(&self) -> bool {
        matches!(self, GameKind::Crash | GameKind::Mines | GameKind::Plinko)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Coinflip => write!(f, "coinflip"),
            GameKind::Crash => write!(f, "crash"),
            GameKind::Dice => write!(f, "dice"),
            GameKind::Mines => write!(f, "mines"),
            GameKind::Plinko => write!(f, "plinko"),
        }
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coinflip" => Ok(GameKind::Coinflip),
            "crash" => Ok(GameKind::Crash),
            "dice" => Ok(GameKind::Dice),
            "mines" => Ok(GameKind::Mines),
            "plinko" => Ok(GameKind::Plinko),
            other => Err(format!("unknown game '{}'", other)),
        }
    }
}

/// Solana token with mint address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_address: Option<String>,
}

impl Token {
    /// Native SOL token
    pub fn sol() -> Self {
        Self {
            symbol: "SOL".to_string(),
            mint_address: None,
        }
    }

    /// USDC SPL token
    pub fn usdc() -> Self {
        Self {
            symbol: "USDC".to_string(),
            mint_address: Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string()),
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::sol()
    }
}

/// Coin side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Which side of a coinflip the player sits on. The creator's seed comes first
/// in the HMAC message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    #[default]
    Creator,
    Joiner,
}

/// Multipliers travel as decimals (`1.52`) and are held as integer hundredths (`152`).
pub mod hundredths {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn from_decimal(value: f64) -> Option<u64> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some((value * 100.0).round() as u64)
    }

    pub fn to_decimal(value: u64) -> f64 {
        value as f64 / 100.0
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_decimal(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        from_decimal(raw).ok_or_else(|| D::Error::custom(format!("invalid multiplier {}", raw)))
    }

    pub mod option {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&super::to_decimal(*v)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                Some(raw) => super::from_decimal(raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid multiplier {}", raw))),
                None => Ok(None),
            }
        }
    }
}

/// Game-specific outcome, as reported by the server or recomputed from seeds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Outcome {
    Coinflip {
        side: CoinSide,
    },
    /// Roll in `[0, 100)`
    Dice {
        roll: u32,
    },
    Crash {
        #[serde(rename = "multiplier", with = "hundredths")]
        multiplier_x100: u64,
    },
    /// Mine cell indexes, ascending
    Mines {
        mines: Vec<u8>,
    },
    /// Final slot per ball, in drop order
    Plinko {
        slots: Vec<u8>,
    },
}

impl Outcome {
    pub fn kind(&self) -> GameKind {
        match self {
            Outcome::Coinflip { .. } => GameKind::Coinflip,
            Outcome::Dice { .. } => GameKind::Dice,
            Outcome::Crash { .. } => GameKind::Crash,
            Outcome::Mines { .. } => GameKind::Mines,
            Outcome::Plinko { .. } => GameKind::Plinko,
        }
    }
}

/// Bet parameters chosen by the player, per game. Amounts are in token base units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum BetParameters {
    Coinflip {
        amount: u64,
        side: CoinSide,
    },
    /// Wins when the roll is strictly below `roll_under`
    Dice {
        amount: u64,
        roll_under: u32,
    },
    Crash {
        amount: u64,
        #[serde(
            default,
            rename = "auto_cashout",
            with = "hundredths::option",
            skip_serializing_if = "Option::is_none"
        )]
        auto_cashout_x100: Option<u64>,
    },
    Mines {
        amount: u64,
        mines: u8,
    },
    Plinko {
        amount: u64,
        rows: u8,
        balls: u8,
    },
}

impl BetParameters {
    pub fn kind(&self) -> GameKind {
        match self {
            BetParameters::Coinflip { .. } => GameKind::Coinflip,
            BetParameters::Dice { .. } => GameKind::Dice,
            BetParameters::Crash { .. } => GameKind::Crash,
            BetParameters::Mines { .. } => GameKind::Mines,
            BetParameters::Plinko { .. } => GameKind::Plinko,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            BetParameters::Coinflip { amount, .. }
            | BetParameters::Dice { amount, .. }
            | BetParameters::Crash { amount, .. }
            | BetParameters::Mines { amount, .. }
            | BetParameters::Plinko { amount, .. } => *amount,
        }
    }

    /// Local precondition checks run before a round is submitted
    pub fn validate(&self, params: &GameParams) -> Result<(), RoundError> {
        if self.amount() == 0 {
            return Err(invalid("bet amount must be positive"));
        }

        match self {
            BetParameters::Coinflip { .. } => Ok(()),
            BetParameters::Dice { roll_under, .. } => {
                if !(1..=99).contains(roll_under) {
                    return Err(invalid(format!("dice target {} outside 1..=99", roll_under)));
                }
                Ok(())
            }
            BetParameters::Crash { auto_cashout_x100, .. } => match auto_cashout_x100 {
                Some(x) if *x <= 100 => Err(invalid(format!(
                    "auto cashout {:.2}x must exceed 1.00x",
                    hundredths::to_decimal(*x)
                ))),
                _ => Ok(()),
            },
            BetParameters::Mines { mines, .. } => {
                if *mines == 0 || *mines >= params.mines_grid_size {
                    return Err(invalid(format!(
                        "mine count {} outside 1..{}",
                        mines, params.mines_grid_size
                    )));
                }
                Ok(())
            }
            BetParameters::Plinko { rows, balls, .. } => {
                if *rows < params.plinko_min_rows || *rows > params.plinko_max_rows {
                    return Err(invalid(format!(
                        "plinko rows {} outside {}..={}",
                        rows, params.plinko_min_rows, params.plinko_max_rows
                    )));
                }
                if *balls == 0 || *balls > params.plinko_max_balls {
                    return Err(invalid(format!(
                        "plinko balls {} outside 1..={}",
                        balls, params.plinko_max_balls
                    )));
                }
                Ok(())
            }
        }
    }

    /// Derivation strategy for this bet
    pub fn game_spec(&self, params: &GameParams) -> GameSpec {
        match self {
            BetParameters::Coinflip { .. } => GameSpec::Coinflip,
            BetParameters::Dice { .. } => GameSpec::Dice,
            BetParameters::Crash { .. } => GameSpec::Crash {
                house_edge_bps: params.crash_house_edge_bps,
            },
            BetParameters::Mines { mines, .. } => GameSpec::Mines {
                grid_size: params.mines_grid_size,
                mines: *mines,
            },
            BetParameters::Plinko { rows, balls, .. } => GameSpec::Plinko {
                rows: *rows,
                balls: *balls,
            },
        }
    }
}

fn invalid(message: impl Into<String>) -> RoundError {
    RoundError::InvalidParameters(message.into())
}

/// Per-game derivation strategy with the parameters the recomputation needs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameSpec {
    Coinflip,
    Dice,
    Crash { house_edge_bps: u32 },
    Mines { grid_size: u8, mines: u8 },
    Plinko { rows: u8, balls: u8 },
}

impl GameSpec {
    pub fn kind(&self) -> GameKind {
        match self {
            GameSpec::Coinflip => GameKind::Coinflip,
            GameSpec::Dice => GameKind::Dice,
            GameSpec::Crash { .. } => GameKind::Crash,
            GameSpec::Mines { .. } => GameKind::Mines,
            GameSpec::Plinko { .. } => GameKind::Plinko,
        }
    }
}

/// Outbound request produced by `RoundSession::submit`. The transport collaborator
/// owns signing and delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BetRequest {
    pub player: String,
    pub game: GameKind,
    pub bet: BetParameters,
    pub token: Token,
    pub client_seed: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_kind_parse_and_display() {
        for kind in GameKind::all() {
            assert_eq!(kind.to_string().parse::<GameKind>().unwrap(), kind);
        }
        assert!("roulette".parse::<GameKind>().is_err());
        assert_eq!("DICE".parse::<GameKind>().unwrap(), GameKind::Dice);
    }

    #[test]
    fn test_crash_outcome_wire_format() {
        let outcome: Outcome =
            serde_json::from_str(r#"{"game":"crash","multiplier":24.73}"#).unwrap();
        assert_eq!(outcome, Outcome::Crash { multiplier_x100: 2473 });

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["multiplier"], 24.73);
        assert!(serde_json::from_str::<Outcome>(r#"{"game":"crash","multiplier":-1.0}"#).is_err());
    }

    #[test]
    fn test_bet_validation() {
        let params = GameParams::default();

        let zero = BetParameters::Coinflip { amount: 0, side: CoinSide::Heads };
        assert!(matches!(zero.validate(&params), Err(RoundError::InvalidParameters(_))));

        let too_many_mines = BetParameters::Mines { amount: 10, mines: params.mines_grid_size };
        assert!(too_many_mines.validate(&params).is_err());

        let ok_mines = BetParameters::Mines { amount: 10, mines: 3 };
        assert!(ok_mines.validate(&params).is_ok());

        let dice = BetParameters::Dice { amount: 10, roll_under: 100 };
        assert!(dice.validate(&params).is_err());

        let low_cashout = BetParameters::Crash { amount: 5, auto_cashout_x100: Some(100) };
        assert!(low_cashout.validate(&params).is_err());

        let plinko = BetParameters::Plinko { amount: 5, rows: 16, balls: 0 };
        assert!(plinko.validate(&params).is_err());
    }

    #[test]
    fn test_game_spec_uses_config() {
        let mut params = GameParams::default();
        params.crash_house_edge_bps = 250;

        let crash = BetParameters::Crash { amount: 1, auto_cashout_x100: None };
        assert_eq!(crash.game_spec(&params), GameSpec::Crash { house_edge_bps: 250 });

        let mines = BetParameters::Mines { amount: 1, mines: 4 };
        assert_eq!(
            mines.game_spec(&params),
            GameSpec::Mines { grid_size: params.mines_grid_size, mines: 4 }
        );
    }
}
