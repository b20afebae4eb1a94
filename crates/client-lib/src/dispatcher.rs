// ============================
// gameofthree-client/src/dispatcher.rs
// ============================
//! Session actor: the game state machine of one connection.
//!
//! Every inbound game message, player action and elapsed pacing delay
//! arrives as a [`SessionCommand`] on a single queue and is handled to
//! completion before the next one is looked at. Nothing else touches
//! [`SessionState`].
//!
//! Delayed actions (the automatic opening number and automatic moves) run
//! as spawned timers that post [`SessionCommand::DelayElapsed`] back into the
//! queue. Each timer carries a generation number; cancelling bumps the
//! generation and aborts the timer, so a late wake-up is dropped instead of
//! sending a stale message.
use std::ops::ControlFlow;
use std::time::Duration;

use gameofthree_common::{GameMessage, OutboundMessage};
use metrics::counter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::display::{DisplayEmitter, DisplayIntent, NewRoundLabel, TransportFailure};
use crate::error::ClientError;
use crate::metrics::{
    SESSION_DELAYED_CANCELLED, SESSION_INBOUND, SESSION_MOVES_SENT, SESSION_NUMBERS_SENT,
    SESSION_REJECTED_INPUT, SESSION_ROUNDS_FINISHED,
};
use crate::producer::{parse_starting_number, produce_move, random_starting_number, MoveSource};
use crate::session::{Mode, SessionState};

type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

/// Message sent *into* the actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Game message pushed by the server
    Inbound(GameMessage),
    /// Failure reported by the connection layer
    TransportError(TransportFailure),
    /// Ask the server for a (new) round
    Start,
    SetMode(Mode),
    SubmitStartingNumber {
        input: String,
        resp_tx: Option<Reply<()>>,
    },
    SubmitManualMove {
        adjustment: i64,
        resp_tx: Option<Reply<()>>,
    },
    /// Copy of the current state
    Snapshot { resp_tx: oneshot::Sender<SessionState> },
    /// Local teardown; the actor stops afterwards
    Disconnect,
    /// A pacing delay elapsed
    DelayElapsed { generation: u64, action: DelayedAction },
}

/// Work deferred by the pacing delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedAction {
    /// Draw and send the opening number
    ProposeNumber,
    /// Compute and send the move for `value`
    AutoMove { value: i64 },
}

/// Settings of one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: Mode,
    /// Pause before automatic actions; zero runs them inline
    pub move_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Manual,
            move_delay: Duration::from_secs(1),
        }
    }
}

/// Handle that other components keep
#[derive(Clone, Debug)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Feed a game message to the session
    pub fn deliver(&self, message: GameMessage) -> Result<(), ClientError> {
        self.cmd_tx.send(SessionCommand::Inbound(message))?;
        Ok(())
    }

    pub fn report_transport_error(&self, failure: TransportFailure) -> Result<(), ClientError> {
        self.cmd_tx.send(SessionCommand::TransportError(failure))?;
        Ok(())
    }

    pub fn start(&self) -> Result<(), ClientError> {
        self.cmd_tx.send(SessionCommand::Start)?;
        Ok(())
    }

    pub fn set_mode(&self, mode: Mode) -> Result<(), ClientError> {
        self.cmd_tx.send(SessionCommand::SetMode(mode))?;
        Ok(())
    }

    /// Supply the opening number requested in manual mode
    pub async fn submit_starting_number(&self, input: impl Into<String>) -> Result<(), ClientError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx.send(SessionCommand::SubmitStartingNumber {
            input: input.into(),
            resp_tx: Some(resp_tx),
        })?;
        resp_rx.await.map_err(|_| ClientError::SessionClosed)?
    }

    /// Supply the adjustment requested in manual mode
    pub async fn submit_manual_move(&self, adjustment: i64) -> Result<(), ClientError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx.send(SessionCommand::SubmitManualMove {
            adjustment,
            resp_tx: Some(resp_tx),
        })?;
        resp_rx.await.map_err(|_| ClientError::SessionClosed)?
    }

    pub async fn snapshot(&self) -> Result<SessionState, ClientError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx.send(SessionCommand::Snapshot { resp_tx })?;
        resp_rx.await.map_err(|_| ClientError::SessionClosed)
    }

    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.cmd_tx.send(SessionCommand::Disconnect)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

struct Scheduled {
    generation: u64,
    action: DelayedAction,
    timer: Option<JoinHandle<()>>,
}

pub struct SessionActor {
    state: SessionState,
    move_delay: Duration,
    display: DisplayEmitter,
    outbound: Option<mpsc::UnboundedSender<OutboundMessage>>,
    /// Weak so that the actor stops once every handle is gone
    self_tx: Option<mpsc::WeakUnboundedSender<SessionCommand>>,
    scheduled: Option<Scheduled>,
    generation: u64,
    rng: StdRng,
}

impl SessionActor {
    pub fn new(
        config: SessionConfig,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
        display: mpsc::UnboundedSender<DisplayIntent>,
    ) -> Self {
        SessionActor {
            state: SessionState::new(config.mode),
            move_delay: config.move_delay,
            display: DisplayEmitter::new(display),
            outbound: Some(outbound),
            self_tx: None,
            scheduled: None,
            generation: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed random source for the opening numbers
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one command; `Break` once the session is torn down
    pub fn handle(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::Inbound(message) => self.on_message(message),
            SessionCommand::TransportError(failure) => {
                warn!(detail = %failure.detail, header = ?failure.message_header, "transport error");
                self.display.transport_error(&failure);
            },
            SessionCommand::Start => self.start(),
            SessionCommand::SetMode(mode) => self.set_mode(mode),
            SessionCommand::SubmitStartingNumber { input, resp_tx } => {
                let result = self.submit_starting_number(&input);
                reply(resp_tx, result);
            },
            SessionCommand::SubmitManualMove {
                adjustment,
                resp_tx,
            } => {
                let result = self.submit_manual_move(adjustment);
                reply(resp_tx, result);
            },
            SessionCommand::Snapshot { resp_tx } => {
                let _ = resp_tx.send(self.state.clone());
            },
            SessionCommand::Disconnect => {
                self.teardown();
                return ControlFlow::Break(());
            },
            SessionCommand::DelayElapsed { generation, action } => {
                self.on_delay_elapsed(generation, action);
            },
        }
        ControlFlow::Continue(())
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(cmd) = rx.recv().await {
            if self.handle(cmd).is_break() {
                break;
            }
        }
        self.cancel_scheduled();
        debug!("session actor stopped");
    }

    fn on_message(&mut self, message: GameMessage) {
        counter!(SESSION_INBOUND, "status" => message.status().to_string()).increment(1);

        if let GameMessage::Unknown(status) = &message {
            debug!(%status, "ignoring message with unknown status");
            return;
        }
        debug!(status = message.status(), "processing game message");

        // a newer message supersedes whatever was waiting
        self.cancel_scheduled();
        self.state.pending = Some(message.clone());
        self.display.clear_error();
        self.display.emit(DisplayIntent::HideControls);

        match message {
            GameMessage::Waiting { content } => {
                self.display.message(content);
                self.state.pending = None;
            },
            GameMessage::Start {
                opponent,
                primary_player,
            } => {
                info!(%opponent, primary_player, "round started");
                self.display.emit(DisplayIntent::ClearBoard);
                self.display
                    .emit(DisplayIntent::OpponentLabel(Some(opponent.clone())));
                self.state.begin_round(opponent, primary_player);
                self.start_session();
            },
            GameMessage::Play { value } => {
                self.state.current_value = value;
                self.display
                    .message(format!("{} sent value {value}", self.state.opponent_name()));
                self.play_turn(value);
            },
            GameMessage::GameOver { winner } => {
                info!(winner, "round over");
                counter!(SESSION_ROUNDS_FINISHED).increment(1);
                self.display.emit(DisplayIntent::RoundOutcome { won: winner });
                if self.state.is_primary {
                    self.display
                        .emit(DisplayIntent::ReadyForNewRound(NewRoundLabel::Rematch));
                }
                self.state.pending = None;
            },
            GameMessage::Disconnect { content } => {
                info!("opponent disconnected");
                self.display.message(content);
                self.state.opponent_left();
                self.display.emit(DisplayIntent::OpponentLabel(None));
                self.display
                    .emit(DisplayIntent::ReadyForNewRound(NewRoundLabel::NewGame));
                self.state.pending = None;
            },
            GameMessage::Unknown(_) => {},
        }
    }

    /// Opening of a round, right after START
    fn start_session(&mut self) {
        if !self.state.is_primary {
            // wait for the first PLAY
            self.state.pending = None;
            return;
        }
        match self.state.mode {
            Mode::Automatic => self.schedule(DelayedAction::ProposeNumber),
            Mode::Manual => self.display.emit(DisplayIntent::RequestStartingNumber),
        }
    }

    fn play_turn(&mut self, value: i64) {
        match self.state.mode {
            Mode::Automatic => self.schedule(DelayedAction::AutoMove { value }),
            Mode::Manual => self.display.emit(DisplayIntent::RequestMoveAdjustment),
        }
    }

    fn start(&mut self) {
        debug!("requesting a round");
        self.display.emit(DisplayIntent::ClearBoard);
        self.send(OutboundMessage::StartRequest);
    }

    /// Switch mode and carry on with whatever is waiting
    fn set_mode(&mut self, mode: Mode) {
        if mode == self.state.mode {
            return;
        }
        info!(%mode, "mode changed");
        self.cancel_scheduled();
        self.state.mode = mode;
        self.display.emit(DisplayIntent::HideControls);

        match self.state.pending {
            Some(GameMessage::Start { .. }) => self.start_session(),
            Some(GameMessage::Play { value }) => self.play_turn(value),
            _ => {},
        }
    }

    fn submit_starting_number(&mut self, input: &str) -> Result<(), ClientError> {
        let result = if self.state.awaiting_starting_number() {
            parse_starting_number(input)
        } else {
            Err(ClientError::NotAwaitingInput("starting number"))
        };
        match result {
            Ok(number) => {
                self.cancel_scheduled();
                self.send_number(number);
                self.display.emit(DisplayIntent::HideControls);
                Ok(())
            },
            Err(e) => Err(self.reject(e)),
        }
    }

    fn submit_manual_move(&mut self, adjustment: i64) -> Result<(), ClientError> {
        if !self.state.awaiting_move() {
            return Err(self.reject(ClientError::NotAwaitingInput("move")));
        }
        match self.submit_move(self.state.current_value, MoveSource::Manual(adjustment)) {
            Ok(()) => {
                self.display.emit(DisplayIntent::HideControls);
                Ok(())
            },
            Err(e) => Err(self.reject(e)),
        }
    }

    fn reject(&mut self, err: ClientError) -> ClientError {
        debug!(code = err.error_code(), "rejected input: {err}");
        counter!(SESSION_REJECTED_INPUT).increment(1);
        self.display.input_error(&err);
        err
    }

    fn send_number(&mut self, number: i64) {
        self.state.current_value = number;
        self.send(OutboundMessage::NumberProposal { value: number });
        counter!(SESSION_NUMBERS_SENT).increment(1);
        self.state.pending = None;
    }

    fn submit_move(&mut self, value: i64, source: MoveSource) -> Result<(), ClientError> {
        let mv = produce_move(value, source)?;
        self.cancel_scheduled();
        mv.announce(&self.display);
        self.send(mv.message());
        counter!(SESSION_MOVES_SENT).increment(1);
        self.state.pending = None;
        Ok(())
    }

    fn send(&mut self, message: OutboundMessage) {
        match &self.outbound {
            Some(tx) => {
                if tx.send(message).is_err() {
                    warn!(?message, "transport closed, message dropped");
                }
            },
            None => warn!(?message, "session torn down, message dropped"),
        }
    }

    fn run_action(&mut self, action: DelayedAction) {
        match action {
            DelayedAction::ProposeNumber => {
                let number = random_starting_number(&mut self.rng);
                self.display
                    .message(format!("You generated the random number: {number}"));
                self.send_number(number);
            },
            DelayedAction::AutoMove { value } => {
                if let Err(e) = self.submit_move(value, MoveSource::Automatic) {
                    warn!("automatic move failed: {e}");
                    self.display.input_error(&e);
                }
            },
        }
    }

    fn schedule(&mut self, action: DelayedAction) {
        self.cancel_scheduled();
        if self.move_delay.is_zero() {
            self.run_action(action);
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let timer = self.self_tx.as_ref().map(|weak| {
            let weak = weak.clone();
            let delay = self.move_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(tx) = weak.upgrade() {
                    let _ = tx.send(SessionCommand::DelayElapsed { generation, action });
                }
            })
        });
        debug!(?action, generation, "scheduled delayed action");
        self.scheduled = Some(Scheduled {
            generation,
            action,
            timer,
        });
    }

    fn on_delay_elapsed(&mut self, generation: u64, action: DelayedAction) {
        match &self.scheduled {
            Some(s) if s.generation == generation && s.action == action => {
                self.scheduled = None;
                self.run_action(action);
            },
            _ => debug!(generation, "dropping stale delayed action"),
        }
    }

    fn cancel_scheduled(&mut self) {
        if let Some(scheduled) = self.scheduled.take() {
            if let Some(timer) = scheduled.timer {
                timer.abort();
            }
            self.generation += 1;
            counter!(SESSION_DELAYED_CANCELLED).increment(1);
            debug!(action = ?scheduled.action, "cancelled delayed action");
        }
    }

    fn teardown(&mut self) {
        info!("disconnecting");
        self.cancel_scheduled();
        self.state.teardown();
        self.display.emit(DisplayIntent::HideControls);
        self.display.emit(DisplayIntent::OpponentLabel(None));
        self.display.emit(DisplayIntent::Connected(false));
        // dropping the sender closes the transport writer
        self.outbound = None;
    }
}

fn reply(resp_tx: Option<Reply<()>>, result: Result<(), ClientError>) {
    if let Some(tx) = resp_tx {
        let _ = tx.send(result);
    }
}

/// Spawn a session actor and return its handle
pub fn spawn_session(actor: SessionActor) -> (SessionHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let mut actor = actor;
    actor.self_tx = Some(cmd_tx.downgrade());

    let task = tokio::spawn(async move {
        actor.run(cmd_rx).await;
    });

    (SessionHandle { cmd_tx }, task)
}
