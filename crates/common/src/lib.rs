// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the Game of Three client and server.
//! This module defines the game messages pushed by the server, the
//! instructions the client sends back, and the STOMP destinations they travel on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination for a start-round request (no body)
pub const START_DESTINATION: &str = "/app/game.start";
/// Destination for the opening number of a round
pub const NUMBER_DESTINATION: &str = "/app/game.number";
/// Destination for a move
pub const PLAY_DESTINATION: &str = "/app/game.play";
/// Per-user queue carrying game messages
pub const UPDATES_QUEUE: &str = "/user/queue/updates";
/// Per-user queue carrying server-side exception text
pub const ERRORS_QUEUE: &str = "/user/queue/errors";

/// Errors raised while turning wire payloads into typed messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{status} message is missing field `{field}`")]
    MissingField {
        status: &'static str,
        field: &'static str,
    },
}

/// Messages pushed from the server to a player
///
/// On the wire this is a flat JSON object discriminated by `gameStatus`;
/// payload fields are only required for the status that uses them. Statuses
/// this client does not know decode to [`GameMessage::Unknown`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "WireGameMessage", into = "WireGameMessage")]
pub enum GameMessage {
    /// Session created, no opponent yet
    Waiting { content: String },
    /// Pairing complete, a round begins
    /// # Fields
    /// * `opponent` - Name of the paired player
    /// * `primary_player` - Whether this player proposes the opening number
    Start {
        opponent: String,
        primary_player: bool,
    },
    /// The opponent advanced the shared value
    Play { value: i64 },
    /// Round concluded
    GameOver { winner: bool },
    /// The opponent left
    Disconnect { content: String },
    /// Any status this client does not understand
    Unknown(String),
}

impl GameMessage {
    /// Decode a message body as delivered on [`UPDATES_QUEUE`]
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The `gameStatus` tag of this message
    pub fn status(&self) -> &str {
        match self {
            GameMessage::Waiting { .. } => "WAITING",
            GameMessage::Start { .. } => "START",
            GameMessage::Play { .. } => "PLAY",
            GameMessage::GameOver { .. } => "GAMEOVER",
            GameMessage::Disconnect { .. } => "DISCONNECT",
            GameMessage::Unknown(status) => status,
        }
    }
}

/// Flat wire shape of a [`GameMessage`]
///
/// The server serializes every field of its message object, so absent
/// payloads arrive either missing or as `null`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireGameMessage {
    pub game_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_player: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<bool>,
}

fn required<T>(
    field: Option<T>,
    status: &'static str,
    name: &'static str,
) -> Result<T, DecodeError> {
    field.ok_or(DecodeError::MissingField {
        status,
        field: name,
    })
}

impl TryFrom<WireGameMessage> for GameMessage {
    type Error = DecodeError;

    fn try_from(wire: WireGameMessage) -> Result<Self, Self::Error> {
        let message = match wire.game_status.as_str() {
            "WAITING" => GameMessage::Waiting {
                content: required(wire.content, "WAITING", "content")?,
            },
            "START" => GameMessage::Start {
                opponent: required(wire.opponent, "START", "opponent")?,
                primary_player: required(wire.primary_player, "START", "primaryPlayer")?,
            },
            "PLAY" => GameMessage::Play {
                value: required(wire.value, "PLAY", "value")?,
            },
            "GAMEOVER" => GameMessage::GameOver {
                winner: required(wire.winner, "GAMEOVER", "winner")?,
            },
            "DISCONNECT" => GameMessage::Disconnect {
                content: required(wire.content, "DISCONNECT", "content")?,
            },
            _ => GameMessage::Unknown(wire.game_status),
        };
        Ok(message)
    }
}

impl From<GameMessage> for WireGameMessage {
    fn from(message: GameMessage) -> Self {
        let game_status = message.status().to_string();
        match message {
            GameMessage::Waiting { content } | GameMessage::Disconnect { content } => Self {
                game_status,
                content: Some(content),
                ..Self::default()
            },
            GameMessage::Start {
                opponent,
                primary_player,
            } => Self {
                game_status,
                opponent: Some(opponent),
                primary_player: Some(primary_player),
                ..Self::default()
            },
            GameMessage::Play { value } => Self {
                game_status,
                value: Some(value),
                ..Self::default()
            },
            GameMessage::GameOver { winner } => Self {
                game_status,
                winner: Some(winner),
                ..Self::default()
            },
            GameMessage::Unknown(_) => Self {
                game_status,
                ..Self::default()
            },
        }
    }
}

/// Body of the number and move instructions
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameInstruction {
    /// Value the instruction refers to
    pub value: i64,
    /// Adjustment applied to `value`; absent for the opening number
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<i64>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Ask to be paired (or re-paired) for a round
    StartRequest,
    /// Propose the opening number of a round
    NumberProposal { value: i64 },
    /// Submit a move for the current value
    MoveSubmission { value: i64, adjustment: i64 },
}

impl OutboundMessage {
    /// STOMP destination this message is sent to
    pub fn destination(&self) -> &'static str {
        match self {
            OutboundMessage::StartRequest => START_DESTINATION,
            OutboundMessage::NumberProposal { .. } => NUMBER_DESTINATION,
            OutboundMessage::MoveSubmission { .. } => PLAY_DESTINATION,
        }
    }

    /// JSON body, `None` for bodiless messages
    pub fn body(&self) -> Result<Option<String>, serde_json::Error> {
        let instruction = match *self {
            OutboundMessage::StartRequest => return Ok(None),
            OutboundMessage::NumberProposal { value } => GameInstruction {
                value,
                adjustment: None,
            },
            OutboundMessage::MoveSubmission { value, adjustment } => GameInstruction {
                value,
                adjustment: Some(adjustment),
            },
        };
        serde_json::to_string(&instruction).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_server_messages() {
        // Shape produced by the server: every field present, unused ones null or zero
        let start = r#"{"gameStatus":"START","content":"bob requested a game session",
            "opponent":"bob","primaryPlayer":true,"value":0,"play":0,"winner":false}"#;
        assert_eq!(
            GameMessage::decode(start).unwrap(),
            GameMessage::Start {
                opponent: "bob".to_string(),
                primary_player: true,
            }
        );

        let play = r#"{"gameStatus":"PLAY","content":null,"opponent":null,"primaryPlayer":false,"value":56}"#;
        assert_eq!(GameMessage::decode(play).unwrap(), GameMessage::Play { value: 56 });

        let waiting = r#"{"gameStatus":"WAITING","content":"Waiting for available player","primaryPlayer":true}"#;
        assert_eq!(
            GameMessage::decode(waiting).unwrap(),
            GameMessage::Waiting {
                content: "Waiting for available player".to_string(),
            }
        );

        let over = r#"{"gameStatus":"GAMEOVER","winner":true}"#;
        assert_eq!(GameMessage::decode(over).unwrap(), GameMessage::GameOver { winner: true });
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let msg = GameMessage::decode(r#"{"gameStatus":"PAUSED","value":3}"#).unwrap();
        assert_eq!(msg, GameMessage::Unknown("PAUSED".to_string()));
        assert_eq!(msg.status(), "PAUSED");
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let err = GameMessage::decode(r#"{"gameStatus":"PLAY","value":null}"#).unwrap_err();
        assert!(err.to_string().contains("PLAY message is missing field `value`"));

        let err = GameMessage::decode(r#"{"gameStatus":"DISCONNECT"}"#).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn test_game_message_serialization() {
        let msg = GameMessage::Start {
            opponent: "alice".to_string(),
            primary_player: false,
        };
        let json = serde_json::to_string(&msg).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["gameStatus"], "START");
        assert_eq!(parsed["opponent"], "alice");
        assert_eq!(parsed["primaryPlayer"], false);
        assert!(parsed.get("value").is_none());
    }

    #[test]
    fn test_outbound_bodies() {
        assert_eq!(OutboundMessage::StartRequest.body().unwrap(), None);
        assert_eq!(OutboundMessage::StartRequest.destination(), "/app/game.start");

        let proposal = OutboundMessage::NumberProposal { value: 42 };
        assert_eq!(proposal.destination(), "/app/game.number");
        assert_eq!(proposal.body().unwrap().as_deref(), Some(r#"{"value":42}"#));
        let instruction: GameInstruction =
            serde_json::from_str(&proposal.body().unwrap().unwrap()).unwrap();
        assert_eq!(
            instruction,
            GameInstruction {
                value: 42,
                adjustment: None
            }
        );

        let submission = OutboundMessage::MoveSubmission {
            value: 10,
            adjustment: -1,
        };
        assert_eq!(submission.destination(), "/app/game.play");
        let parsed: serde_json::Value =
            serde_json::from_str(&submission.body().unwrap().unwrap()).unwrap();
        assert_eq!(parsed["value"], 10);
        assert_eq!(parsed["move"], -1);
    }
}
