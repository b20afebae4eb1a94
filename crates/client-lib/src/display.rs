// ============================
// gameofthree-client/src/display.rs
// ============================
//! Display intents emitted by the session for whatever front end renders it.
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::ClientError;

/// Label of the "play again" affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewRoundLabel {
    /// Same opponent, after a finished round
    Rematch,
    /// The opponent left
    NewGame,
}

/// Something the front end should show or stop showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayIntent {
    /// Connection state changed
    Connected(bool),
    /// Line of game history
    Message(String),
    /// Drop the game history
    ClearBoard,
    /// Show (or hide, with `None`) who we are playing against
    OpponentLabel(Option<String>),
    /// Ask the player for the opening number
    RequestStartingNumber,
    /// Ask the player for an adjustment to the current value
    RequestMoveAdjustment,
    /// Hide the number and adjustment inputs
    HideControls,
    RoundOutcome { won: bool },
    /// Offer to start another round
    ReadyForNewRound(NewRoundLabel),
    Error(String),
    ClearError,
}

/// A failure reported by the connection layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// `message` header of a STOMP ERROR frame, when there was one
    pub message_header: Option<String>,
    /// Whatever else is known about the failure
    pub detail: String,
}

impl TransportFailure {
    pub fn new(message_header: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            message_header,
            detail: detail.into(),
        }
    }
}

/// Sends display intents to the front end
///
/// The broker may report one failure several times, first with a specific
/// `message` header and then with a generic description. The specific text
/// is remembered until the error is cleared so later duplicates do not
/// replace it.
#[derive(Debug)]
pub struct DisplayEmitter {
    tx: mpsc::UnboundedSender<DisplayIntent>,
    header_error: Option<String>,
}

impl DisplayEmitter {
    pub fn new(tx: mpsc::UnboundedSender<DisplayIntent>) -> Self {
        Self {
            tx,
            header_error: None,
        }
    }

    pub fn emit(&self, intent: DisplayIntent) {
        if let Err(e) = self.tx.send(intent) {
            trace!("display closed, dropping {:?}", e.0);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(DisplayIntent::Message(text.into()));
    }

    pub fn clear_error(&mut self) {
        self.header_error = None;
        self.emit(DisplayIntent::ClearError);
    }

    /// Show a rejected local input
    pub fn input_error(&self, err: &ClientError) {
        self.emit(DisplayIntent::Error(err.user_message()));
    }

    /// Show a connection failure, keeping the most specific text seen
    pub fn transport_error(&mut self, failure: &TransportFailure) {
        if let Some(header) = &failure.message_header {
            self.header_error = Some(header.clone());
        }
        let text = self
            .header_error
            .clone()
            .unwrap_or_else(|| failure.detail.clone());
        self.emit(DisplayIntent::Error(text));
    }
}
