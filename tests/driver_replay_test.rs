//! Driver tests: recorded frame logs replayed through a spawned session

use fairround::{
    config::FairroundConfig,
    driver::SessionDriver,
    games::{BetParameters, GameKind, Outcome},
    session::{ClientSeedGenerator, RoundSession, RoundState},
};
use tokio::sync::mpsc;

const DICE_LOG: &str = include_str!("../demos/dice_round.jsonl");

fn dice_driver() -> SessionDriver {
    let config = FairroundConfig::default();
    let session = RoundSession::new(GameKind::Dice, "PlayerPubkey111", &config)
        .with_seed_generator(ClientSeedGenerator::fixed("abc123"));
    SessionDriver::new(session, config.session.update_channel_capacity)
}

#[tokio::test]
async fn test_replay_recorded_dice_round() {
    let mut driver = dice_driver();
    let mut updates = driver.subscribe();
    driver
        .session_mut()
        .submit(BetParameters::Dice { amount: 100, roll_under: 50 })
        .unwrap();

    let frames: Vec<String> = DICE_LOG.lines().map(str::to_string).collect();
    let (_commands, receiver) = mpsc::channel(1);
    let session = driver.run(futures::stream::iter(frames), receiver).await;

    assert_eq!(session.state(), RoundState::Resolved);
    assert_eq!(session.last_outcome().unwrap().outcome, Outcome::Dice { roll: 62 });
    assert!(session.verify().is_verified());

    let states: Vec<RoundState> = std::iter::from_fn(|| updates.try_recv().ok())
        .map(|update| update.state)
        .collect();
    assert_eq!(
        states,
        vec![RoundState::Locked, RoundState::Resolved, RoundState::Resolved]
    );
}

#[tokio::test]
async fn test_replay_survives_noise() {
    let mut driver = dice_driver();
    driver
        .session_mut()
        .submit(BetParameters::Dice { amount: 100, roll_under: 50 })
        .unwrap();

    let mut frames = vec![
        "".to_string(),
        "{\"type\":\"heartbeat\"}".to_string(),
        "not json".to_string(),
    ];
    frames.extend(DICE_LOG.lines().map(str::to_string));
    // Stale frame for an old round after everything else
    frames.push(r#"{"type":"tick","nonce":"41","progress":{"kind":"multiplier","multiplier":1.0}}"#.to_string());

    let (_commands, receiver) = mpsc::channel(1);
    let session = driver.run(futures::stream::iter(frames), receiver).await;

    let metrics = session.metrics().snapshot();
    assert_eq!(metrics.frames_rejected, 3);
    assert_eq!(metrics.events_dropped, 1);
    assert_eq!(metrics.rounds_resolved, 1);
    assert!(session.verify().is_verified());
}

#[tokio::test]
async fn test_handle_reset_and_resubmit() {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel::<String>();
    let frames = futures::stream::unfold(frames_rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    });

    let (handle, task) = dice_driver().spawn(frames);
    let mut updates = handle.subscribe();

    handle
        .submit(BetParameters::Dice { amount: 1, roll_under: 10 })
        .await
        .unwrap();
    assert!(updates.recv().await.unwrap().in_flight);

    handle.reset().await.unwrap();
    let update = updates.recv().await.unwrap();
    assert!(!update.in_flight);
    assert_eq!(update.state, RoundState::Idle);

    let request = handle
        .submit(BetParameters::Dice { amount: 2, roll_under: 90 })
        .await
        .unwrap();
    assert_eq!(request.bet.amount(), 2);

    drop(frames_tx);
    let session = task.await.unwrap();
    assert!(session.is_in_flight());
    assert_eq!(session.metrics().snapshot().rounds_submitted, 2);
}
