use crate::config::{FairroundConfig, GameParams, SessionConfig};
use crate::errors::RoundError;
use crate::fairness::{FairnessVerifier, VerificationReport};
use crate::games::types::{BetParameters, BetRequest, GameKind, Outcome, Seat, Token};
use crate::metrics::SessionMetrics;
use crate::session::client_seed::ClientSeedGenerator;
use crate::session::round::{
    HistoryEntry, Progress, Round, RoundResult, RoundState, VerificationDisplay,
};
use chrono::Utc;
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was accepted; carries the state after applying it
    Applied(RoundState),
    /// The event was discarded and the round left untouched
    Dropped(RoundError),
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied(_))
    }
}

/// Seed disclosure delivered after (or before) resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReveal {
    pub server_seed: String,
    pub formula: String,
    /// Client seed the server says it used
    pub client_seed: Option<String>,
    /// Other coinflip player's client seed
    pub opponent_seed: Option<String>,
}

impl SeedReveal {
    pub fn new(server_seed: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            server_seed: server_seed.into(),
            formula: formula.into(),
            client_seed: None,
            opponent_seed: None,
        }
    }
}

/// Owns the lifecycle of one game's current round.
///
/// At most one round is in flight (submitted, locked or active). Events are matched
/// to the round by nonce; anything else is dropped without touching the record.
/// The one exception is `on_error`, which always unblocks the session.
pub struct RoundSession {
    id: Uuid,
    game: GameKind,
    player: String,
    token: Token,
    params: GameParams,
    config: SessionConfig,
    seeds: ClientSeedGenerator,
    round: Round,
    in_flight: bool,
    last_error: Option<RoundError>,
    history: VecDeque<HistoryEntry>,
    metrics: SessionMetrics,
}

impl RoundSession {
    pub fn new(game: GameKind, player: impl Into<String>, config: &FairroundConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            game,
            player: player.into(),
            token: Token::default(),
            params: config.games.clone(),
            config: config.session.clone(),
            seeds: ClientSeedGenerator::os(config.session.allow_insecure_seed_fallback),
            round: Round::default(),
            in_flight: false,
            last_error: None,
            history: VecDeque::new(),
            metrics: SessionMetrics::new(),
        }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = token;
        self
    }

    pub fn with_seed_generator(mut self, seeds: ClientSeedGenerator) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_metrics(mut self, metrics: SessionMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start a round: validate the bet, generate the client seed and build the
    /// outbound request. Refused while another round is in flight.
    pub fn submit(&mut self, bet: BetParameters) -> Result<BetRequest, RoundError> {
        if self.in_flight {
            return Err(RoundError::InvalidParameters(format!(
                "round already in flight ({})",
                self.round.state
            )));
        }
        if bet.kind() != self.game {
            return Err(RoundError::InvalidParameters(format!(
                "{} bet submitted to a {} session",
                bet.kind(),
                self.game
            )));
        }
        bet.validate(&self.params)?;

        let client_seed = self.seeds.generate()?;
        if !client_seed.is_secure() {
            warn!(session = %self.id, "Round submitted with a fallback client seed");
        }

        let request = BetRequest {
            player: self.player.clone(),
            game: self.game,
            bet: bet.clone(),
            token: self.token.clone(),
            client_seed: client_seed.value.clone(),
        };

        self.round = Round {
            player: Some(self.player.clone()),
            bet: Some(bet),
            client_seed: Some(client_seed),
            ..Round::default()
        };
        self.in_flight = true;
        self.last_error = None;
        self.metrics.record_submitted();

        info!(session = %self.id, game = %self.game, amount = request.bet.amount(), "Round submitted");
        Ok(request)
    }

    /// Server acknowledged the bet and committed to a seed
    pub fn on_locked(&mut self, nonce: &str, commitment: &str, seat: Option<Seat>) -> EventOutcome {
        let tracked = self.round.nonce.clone();
        match tracked.as_deref() {
            Some(tracked) if tracked == nonce => {
                if self.round.server_seed_commitment.as_deref() != Some(commitment) {
                    warn!(session = %self.id, nonce, "Repeated lock carried a different commitment; keeping the first");
                }
                EventOutcome::Applied(self.round.state)
            }
            Some(tracked) if self.in_flight => {
                warn!(session = %self.id, tracked, nonce, "Lock for a foreign nonce while a round is tracked");
                self.drop_event(RoundError::ProtocolMismatch {
                    tracked: Some(tracked.to_string()),
                    received: nonce.to_string(),
                })
            }
            None if self.in_flight && self.round.state == RoundState::Idle => {
                self.round.nonce = Some(nonce.to_string());
                self.round.server_seed_commitment = Some(commitment.to_string());
                self.round.seat = seat.unwrap_or_default();
                self.round.state = RoundState::Locked;

                info!(session = %self.id, nonce, "Round locked");
                EventOutcome::Applied(RoundState::Locked)
            }
            _ => {
                debug!(session = %self.id, nonce, "Lock without a submitted round");
                self.drop_event(RoundError::NoRoundInFlight)
            }
        }
    }

    /// In-round progress; moves a locked round to active
    pub fn on_tick(&mut self, nonce: &str, progress: Progress) -> EventOutcome {
        if let Err(e) = self.gate(nonce) {
            return self.drop_event(e);
        }
        if !matches!(self.round.state, RoundState::Locked | RoundState::Active) {
            return self.drop_event(RoundError::RoundClosed {
                nonce: nonce.to_string(),
            });
        }

        if self.config.trace_ticks {
            debug!(session = %self.id, nonce, ?progress, "Tick");
        }
        self.round.progress = Some(progress);
        self.round.state = RoundState::Active;
        EventOutcome::Applied(RoundState::Active)
    }

    /// Final outcome; frees the session for the next submit
    pub fn on_resolved(&mut self, nonce: &str, result: RoundResult) -> EventOutcome {
        if let Err(e) = self.gate(nonce) {
            return self.drop_event(e);
        }
        if !matches!(self.round.state, RoundState::Locked | RoundState::Active) {
            return self.drop_event(RoundError::RoundClosed {
                nonce: nonce.to_string(),
            });
        }

        if result.outcome.kind() != self.game {
            warn!(session = %self.id, nonce, reported = %result.outcome.kind(), "Resolved outcome is for another game");
        }

        self.round.result = Some(result);
        self.round.state = RoundState::Resolved;
        self.in_flight = false;
        self.metrics.record_resolved();
        self.archive();

        info!(session = %self.id, nonce, "Round resolved");
        EventOutcome::Applied(RoundState::Resolved)
    }

    /// Seed disclosure, accepted before or after resolution
    pub fn on_reveal_seed(&mut self, nonce: &str, reveal: SeedReveal) -> EventOutcome {
        if let Err(e) = self.gate(nonce) {
            return self.drop_event(e);
        }
        if self.round.state == RoundState::Errored {
            return self.drop_event(RoundError::RoundClosed {
                nonce: nonce.to_string(),
            });
        }

        if let Some(existing) = self.round.server_seed_revealed.as_deref() {
            if existing == reveal.server_seed {
                return EventOutcome::Applied(self.round.state);
            }
            warn!(session = %self.id, nonce, "Second reveal with a different server seed ignored");
            return self.drop_event(RoundError::SeedAlreadyRevealed {
                nonce: nonce.to_string(),
            });
        }

        self.round.server_seed_revealed = Some(reveal.server_seed);
        self.round.formula = Some(reveal.formula);
        self.round.client_seed_echo = reveal.client_seed;
        if self.round.opponent_seed.is_none() {
            self.round.opponent_seed = reveal.opponent_seed;
        }

        if self.round.state == RoundState::Resolved {
            self.archive();
        }

        debug!(session = %self.id, nonce, "Server seed revealed");
        EventOutcome::Applied(self.round.state)
    }

    /// Server or transport failure. Never nonce-gated: the session is always unblocked.
    /// A resolved round stays resolved so a late reveal can still complete it.
    pub fn on_error(&mut self, nonce: Option<&str>, message: &str, code: Option<&str>) -> EventOutcome {
        if let Some(nonce) = nonce {
            if self.round.nonce.as_deref() != Some(nonce) {
                debug!(session = %self.id, nonce, "Error for a foreign nonce; applying anyway");
            }
        }

        if self.round.state == RoundState::Resolved {
            warn!(session = %self.id, error = message, "Error after resolution; round kept");
        } else {
            warn!(session = %self.id, error = message, "Round errored");
            self.round.state = RoundState::Errored;
        }
        self.in_flight = false;
        self.last_error = Some(RoundError::ServerReported {
            nonce: nonce.map(str::to_string),
            message: message.to_string(),
            code: code.map(str::to_string),
        });
        self.metrics.record_errored();

        EventOutcome::Applied(self.round.state)
    }

    /// Local cancel: forget the current round without notifying the server
    pub fn reset(&mut self) {
        self.round = Round::default();
        self.in_flight = false;
        self.last_error = None;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn state(&self) -> RoundState {
        self.round.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True between lock and resolution
    pub fn is_playing(&self) -> bool {
        matches!(self.round.state, RoundState::Locked | RoundState::Active)
    }

    /// Live crash multiplier while playing, the crash point once resolved
    pub fn current_multiplier(&self) -> Option<u64> {
        match (&self.round.result, &self.round.progress) {
            (Some(RoundResult { outcome: Outcome::Crash { multiplier_x100 }, .. }), _) => Some(*multiplier_x100),
            (None, Some(Progress::Multiplier { multiplier_x100 })) => Some(*multiplier_x100),
            _ => None,
        }
    }

    pub fn last_outcome(&self) -> Option<&RoundResult> {
        self.round.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&RoundError> {
        self.last_error.as_ref()
    }

    pub fn verify(&self) -> VerificationReport {
        FairnessVerifier::verify_round(&self.round, &self.params)
    }

    /// `verified` is filled in once both the reveal and the result are present
    pub fn verification_display(&self) -> Option<VerificationDisplay> {
        self.round.verification_display(self.verified_flag())
    }

    /// Completed rounds, oldest first
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    fn verified_flag(&self) -> Option<bool> {
        if self.round.server_seed_revealed.is_some() && self.round.result.is_some() {
            Some(self.verify().is_verified())
        } else {
            None
        }
    }

    fn gate(&self, nonce: &str) -> Result<(), RoundError> {
        match self.round.nonce.as_deref() {
            Some(tracked) if tracked == nonce => Ok(()),
            tracked => Err(RoundError::ProtocolMismatch {
                tracked: tracked.map(str::to_string),
                received: nonce.to_string(),
            }),
        }
    }

    fn drop_event(&self, reason: RoundError) -> EventOutcome {
        debug!(session = %self.id, %reason, "Event dropped");
        self.metrics.record_dropped();
        EventOutcome::Dropped(reason)
    }

    /// Upsert the resolved round into history, keyed by nonce
    fn archive(&mut self) {
        let verified = self.verified_flag();
        let (Some(panel), Some(result)) = (
            self.round.verification_display(verified),
            self.round.result.as_ref(),
        ) else {
            return;
        };

        if verified == Some(false) {
            warn!(session = %self.id, nonce = %panel.nonce, "Round failed verification");
            self.metrics.record_verification_failure();
        }

        let entry = HistoryEntry {
            display: panel,
            outcome: result.outcome.clone(),
            won: result.won,
            payout: result.payout,
            recorded_at: Utc::now(),
        };

        match self.history.back_mut() {
            Some(last) if last.display.nonce == entry.display.nonce => *last = entry,
            _ => {
                self.history.push_back(entry);
                while self.history.len() > self.config.history_limit {
                    self.history.pop_front();
                }
            }
        }
    }
}
