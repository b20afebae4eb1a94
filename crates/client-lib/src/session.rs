// ============================
// gameofthree-client/src/session.rs
// ============================
//! Per-connection game session state.
use std::fmt;
use std::str::FromStr;

use gameofthree_common::GameMessage;
use serde::{Deserialize, Serialize};

/// How moves are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The player types the opening number and every adjustment
    #[default]
    Manual,
    /// The client computes everything itself
    #[serde(alias = "auto")]
    Automatic,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Manual => f.write_str("MANUAL"),
            Mode::Automatic => f.write_str("AUTOMATIC"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(Mode::Manual),
            "auto" | "automatic" => Ok(Mode::Automatic),
            other => Err(format!("unknown mode `{other}`, expected manual or automatic")),
        }
    }
}

/// State of one game session
///
/// Owned by the session actor; nothing else holds a reference to it.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Name of the paired player
    pub opponent: Option<String>,
    /// Whether this client proposes the opening number of a round
    pub is_primary: bool,
    pub mode: Mode,
    /// Shared running value of the round
    pub current_value: i64,
    /// Inbound message whose handling has not completed yet
    pub pending: Option<GameMessage>,
}

impl SessionState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Pairing complete
    pub fn begin_round(&mut self, opponent: String, is_primary: bool) {
        self.opponent = Some(opponent);
        self.is_primary = is_primary;
    }

    /// The opponent left; the remaining player initiates the next round
    pub fn opponent_left(&mut self) {
        self.opponent = None;
        self.is_primary = true;
    }

    /// Local teardown of the connection
    pub fn teardown(&mut self) {
        self.opponent = None;
        self.is_primary = false;
        self.pending = None;
    }

    /// Name used when reporting the opponent's moves
    pub fn opponent_name(&self) -> &str {
        self.opponent.as_deref().unwrap_or("Opponent")
    }

    /// Whether a PLAY is waiting for a move
    pub fn awaiting_move(&self) -> bool {
        matches!(self.pending, Some(GameMessage::Play { .. }))
    }

    /// Whether a START is waiting for this client's opening number
    pub fn awaiting_starting_number(&self) -> bool {
        self.is_primary && matches!(self.pending, Some(GameMessage::Start { .. }))
    }
}
