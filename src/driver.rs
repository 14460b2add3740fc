//! Async session driver
//!
//! Owns one `RoundSession`, feeds it decoded frames from any `Stream` of text, accepts
//! submit/reset commands over an mpsc channel, and broadcasts a `SessionUpdate` after
//! every change so UI layers can observe the round without touching the session.

use crate::errors::{FairroundError, FairroundResult, RoundError};
use crate::events::{decode_frame, dispatch};
use crate::games::types::{BetParameters, BetRequest};
use crate::session::machine::{EventOutcome, RoundSession};
use crate::session::round::{RoundResult, RoundState, VerificationDisplay};
use futures::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable snapshot of a session, published after each accepted change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub state: RoundState,
    pub in_flight: bool,
    pub playing: bool,
    pub current_multiplier: Option<u64>,
    pub last_outcome: Option<RoundResult>,
    pub verification: Option<VerificationDisplay>,
    pub last_error: Option<String>,
}

impl SessionUpdate {
    pub fn capture(session: &RoundSession) -> Self {
        Self {
            state: session.state(),
            in_flight: session.is_in_flight(),
            playing: session.is_playing(),
            current_multiplier: session.current_multiplier(),
            last_outcome: session.last_outcome().cloned(),
            verification: session.verification_display(),
            last_error: session.last_error().map(|e| e.to_string()),
        }
    }
}

/// Requests from the UI side
#[derive(Debug)]
pub enum DriverCommand {
    Submit {
        bet: BetParameters,
        reply: oneshot::Sender<Result<BetRequest, RoundError>>,
    },
    Reset,
}

/// Cloneable handle for talking to a spawned driver
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<DriverCommand>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl DriverHandle {
    /// Submit a bet; the returned request is what goes to the server
    pub async fn submit(&self, bet: BetParameters) -> FairroundResult<BetRequest> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(DriverCommand::Submit { bet, reply })
            .await
            .map_err(|_| FairroundError::DriverStopped)?;

        Ok(response.await.map_err(|_| FairroundError::DriverStopped)??)
    }

    pub async fn reset(&self) -> FairroundResult<()> {
        self.commands
            .send(DriverCommand::Reset)
            .await
            .map_err(|_| FairroundError::DriverStopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }
}

pub struct SessionDriver {
    session: RoundSession,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionDriver {
    pub fn new(session: RoundSession, capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self { session, updates }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn session(&self) -> &RoundSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RoundSession {
        &mut self.session
    }

    /// Decode and apply one frame. Malformed frames are logged, counted and skipped.
    pub fn handle_frame(&mut self, text: &str) -> Option<EventOutcome> {
        let event = match decode_frame(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(session = %self.session.id(), error = %e, "Skipping undecodable frame");
                self.session.metrics().record_rejected_frame();
                return None;
            }
        };

        let kind = event.type_name();
        let outcome = dispatch(&mut self.session, event);
        if let EventOutcome::Applied(state) = &outcome {
            debug!(session = %self.session.id(), event = kind, %state, "Event applied");
            self.publish();
        }
        Some(outcome)
    }

    pub fn handle_command(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::Submit { bet, reply } => {
                let result = self.session.submit(bet);
                if result.is_ok() {
                    self.publish();
                }
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
            DriverCommand::Reset => {
                self.session.reset();
                self.publish();
            }
        }
    }

    /// Consume frames until the stream ends; returns the session for inspection
    pub async fn run<S>(mut self, frames: S, mut commands: mpsc::Receiver<DriverCommand>) -> RoundSession
    where
        S: Stream<Item = String>,
    {
        futures::pin_mut!(frames);
        let mut commands_open = true;

        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(text) => {
                        self.handle_frame(&text);
                    }
                    None => break,
                },
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => commands_open = false,
                },
            }
        }

        info!(session = %self.session.id(), "Frame stream ended");
        self.session
    }

    /// Run on a tokio task, returning a handle for commands and updates
    pub fn spawn<S>(self, frames: S) -> (DriverHandle, JoinHandle<RoundSession>)
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let (commands, receiver) = mpsc::channel(32);
        let handle = DriverHandle {
            commands,
            updates: self.updates.clone(),
        };
        (handle, tokio::spawn(self.run(frames, receiver)))
    }

    fn publish(&self) {
        // No subscribers is not an error
        let _ = self.updates.send(SessionUpdate::capture(&self.session));
    }
}
