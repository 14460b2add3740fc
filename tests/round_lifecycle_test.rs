//! End-to-end round lifecycles through the public session API
//!
//! Client seeds are pinned so the server side of each round can be replayed with
//! known outcomes.

use fairround::{
    config::FairroundConfig,
    fairness::{FairnessVerifier, VerificationFailure},
    games::{BetParameters, CoinSide, GameKind, GameSpec, Outcome, Seat, SeedInput},
    session::{ClientSeedGenerator, EventOutcome, Progress, Round, RoundResult, RoundSession, RoundState, SeedReveal},
    RoundError,
};

const SERVER_SEED: &str = "deadbeefcafebabe0011223344556677";
const COMMITMENT: &str = "bf5fac072847a476eaef2f033e43dc34fdb1cc0b2c64432ee0cd124985924016";
const PLAYER: &str = "PlayerPubkey111";

fn pinned_session(game: GameKind, client_seed: &str) -> RoundSession {
    RoundSession::new(game, PLAYER, &FairroundConfig::default())
        .with_seed_generator(ClientSeedGenerator::fixed(client_seed))
}

fn resolved(outcome: Outcome, won: bool) -> RoundResult {
    RoundResult {
        outcome,
        won,
        payout: if won { 200 } else { 0 },
        extra: serde_json::Value::Null,
    }
}

#[test]
fn test_dice_round_verifies_against_known_vector() {
    let mut session = pinned_session(GameKind::Dice, "abc123");
    let request = session
        .submit(BetParameters::Dice { amount: 100, roll_under: 50 })
        .unwrap();
    assert_eq!(request.client_seed, "abc123");

    session.on_locked("42", COMMITMENT, None);
    session.on_resolved("42", resolved(Outcome::Dice { roll: 62 }, false));
    session.on_reveal_seed(
        "42",
        SeedReveal {
            server_seed: SERVER_SEED.to_string(),
            formula: "HMAC_SHA256(serverSeed, clientSeed + nonce)".to_string(),
            client_seed: Some("abc123".to_string()),
            opponent_seed: None,
        },
    );

    let report = session.verify();
    assert!(report.commitment_valid);
    assert!(report.outcome_matches);
    assert!(report.is_verified());
    assert_eq!(session.verification_display().unwrap().verified, Some(true));
}

#[test]
fn test_dice_tampered_seed_fails() {
    let mut session = pinned_session(GameKind::Dice, "abc123");
    session.submit(BetParameters::Dice { amount: 100, roll_under: 50 }).unwrap();
    session.on_locked("42", COMMITMENT, None);
    session.on_resolved("42", resolved(Outcome::Dice { roll: 62 }, false));
    session.on_reveal_seed("42", SeedReveal::new(format!("{}00", SERVER_SEED), "f"));

    let report = session.verify();
    assert!(!report.commitment_valid);
    assert!(!report.outcome_matches);
    assert_eq!(report.recomputed, Some(Outcome::Dice { roll: 20 }));
    assert_eq!(session.verification_display().unwrap().verified, Some(false));
    assert_eq!(session.metrics().snapshot().verification_failures, 1);
}

#[test]
fn test_coinflip_submit_while_locked() {
    let mut session = pinned_session(GameKind::Coinflip, "alpha");
    session
        .submit(BetParameters::Coinflip { amount: 10, side: CoinSide::Heads })
        .unwrap();
    session.on_locked("1", COMMITMENT, Some(Seat::Creator));

    let err = session
        .submit(BetParameters::Coinflip { amount: 10, side: CoinSide::Tails })
        .unwrap_err();
    assert!(matches!(err, RoundError::InvalidParameters(_)));
    assert_eq!(session.round().nonce.as_deref(), Some("1"));
    assert_eq!(session.round().client_seed.as_ref().unwrap().value, "alpha");
    assert_eq!(session.state(), RoundState::Locked);

    // Opponent's seed arrives with the reveal; creator seed goes first
    session.on_resolved("1", resolved(Outcome::Coinflip { side: CoinSide::Heads }, true));
    let mut reveal = SeedReveal::new(SERVER_SEED, "HMAC_SHA256(serverSeed, seedA|seedB|nonce)");
    reveal.opponent_seed = Some("beta".to_string());
    session.on_reveal_seed("1", reveal);

    assert!(session.verify().is_verified());
}

#[test]
fn test_mines_reveal_before_resolved() {
    let mut session = pinned_session(GameKind::Mines, "abc123");
    session.submit(BetParameters::Mines { amount: 10, mines: 3 }).unwrap();
    session.on_locked("42", COMMITMENT, None);
    session.on_tick("42", Progress::TileRevealed { tile: 0, safe: true });

    session.on_reveal_seed(
        "42",
        SeedReveal::new(SERVER_SEED, "HMAC_SHA256(serverSeed, player + nonce + clientSeed)"),
    );
    assert!(session.is_playing());

    session.on_resolved("42", resolved(Outcome::Mines { mines: vec![6, 9, 22] }, true));

    let display = session.verification_display().unwrap();
    assert_eq!(display.nonce, "42");
    assert_eq!(display.client_seed, "abc123");
    assert_eq!(display.server_seed_commitment, COMMITMENT);
    assert_eq!(display.server_seed_revealed.as_deref(), Some(SERVER_SEED));
    assert_eq!(display.verified, Some(true));

    let history: Vec<_> = session.history().collect();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].display.verified, Some(true));
}

#[test]
fn test_crash_and_plinko_vectors() {
    let mut crash = pinned_session(GameKind::Crash, "abc123");
    crash
        .submit(BetParameters::Crash { amount: 5, auto_cashout_x100: Some(200) })
        .unwrap();
    crash.on_locked("1", COMMITMENT, None);
    crash.on_tick("1", Progress::Multiplier { multiplier_x100: 120 });
    assert_eq!(crash.current_multiplier(), Some(120));
    crash.on_resolved("1", resolved(Outcome::Crash { multiplier_x100: 342 }, true));
    crash.on_reveal_seed("1", SeedReveal::new(SERVER_SEED, "crash"));
    assert_eq!(crash.current_multiplier(), Some(342));
    assert!(crash.verify().is_verified());

    let mut plinko = pinned_session(GameKind::Plinko, "abc123");
    plinko
        .submit(BetParameters::Plinko { amount: 5, rows: 16, balls: 3 })
        .unwrap();
    plinko.on_locked("42", COMMITMENT, None);
    plinko.on_resolved("42", resolved(Outcome::Plinko { slots: vec![6, 8, 9] }, true));
    plinko.on_reveal_seed("42", SeedReveal::new(SERVER_SEED, "plinko"));
    assert!(plinko.verify().is_verified());
}

#[test]
fn test_mismatched_nonce_sequence_is_ignored() {
    let mut session = pinned_session(GameKind::Crash, "abc123");
    session
        .submit(BetParameters::Crash { amount: 5, auto_cashout_x100: None })
        .unwrap();
    session.on_locked("10", COMMITMENT, None);

    let before = session.round().clone();
    for nonce in ["9", "11", "", "010"] {
        let outcomes = [
            session.on_tick(nonce, Progress::Multiplier { multiplier_x100: 500 }),
            session.on_resolved(nonce, resolved(Outcome::Crash { multiplier_x100: 500 }, true)),
            session.on_reveal_seed(nonce, SeedReveal::new(SERVER_SEED, "f")),
        ];
        assert!(outcomes.iter().all(|o| matches!(o, EventOutcome::Dropped(_))));
        assert_eq!(session.state(), before.state);
        assert_eq!(session.round().result, before.result);
    }
    assert_eq!(session.round(), &before);
}

#[test]
fn test_reset_after_full_round_equals_fresh() {
    let mut session = pinned_session(GameKind::Dice, "abc123");
    session.submit(BetParameters::Dice { amount: 1, roll_under: 50 }).unwrap();
    session.on_locked("42", COMMITMENT, None);
    session.on_resolved("42", resolved(Outcome::Dice { roll: 62 }, false));
    session.reset();

    let fresh = pinned_session(GameKind::Dice, "abc123");
    assert_eq!(session.round(), fresh.round());
    assert_eq!(session.round(), &Round::default());
    assert_eq!(session.is_in_flight(), fresh.is_in_flight());
    assert_eq!(session.is_playing(), fresh.is_playing());
    assert_eq!(session.last_outcome(), fresh.last_outcome());
    assert_eq!(session.verification_display(), fresh.verification_display());

    // History is kept out-of-band
    assert_eq!(session.history().count(), 1);
}

#[test]
fn test_derivation_is_deterministic_and_sensitive() {
    let spec = GameSpec::Crash { house_edge_bps: 100 };
    let base = SeedInput::new(SERVER_SEED, "abc123", "1");

    let first = FairnessVerifier::derive_outcome(&spec, &base).unwrap();
    let again = FairnessVerifier::derive_outcome(&spec, &base).unwrap();
    assert_eq!(first, again);
    assert_eq!(first, Outcome::Crash { multiplier_x100: 342 });

    let other_nonce = FairnessVerifier::derive_outcome(&spec, &SeedInput::new(SERVER_SEED, "abc123", "2")).unwrap();
    assert_ne!(first, other_nonce);

    let mines = GameSpec::Mines { grid_size: 25, mines: 5 };
    let input = SeedInput::new(SERVER_SEED, "abc123", "42").with_player(PLAYER);
    assert_eq!(
        FairnessVerifier::derive_outcome(&mines, &input).unwrap(),
        Outcome::Mines { mines: vec![6, 9, 15, 18, 22] }
    );
    let other_seed = SeedInput::new(SERVER_SEED, "abc124", "42").with_player(PLAYER);
    assert_ne!(
        FairnessVerifier::derive_outcome(&mines, &other_seed).unwrap(),
        Outcome::Mines { mines: vec![6, 9, 15, 18, 22] }
    );
}

#[test]
fn test_missing_player_for_mines_is_reported() {
    let spec = GameSpec::Mines { grid_size: 25, mines: 3 };
    let input = SeedInput::new(SERVER_SEED, "abc123", "42");

    assert!(matches!(
        FairnessVerifier::derive_outcome(&spec, &input),
        Err(VerificationFailure::MissingInput { .. })
    ));
}
