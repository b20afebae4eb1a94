// crates/client-lib/src/error.rs

//! Central error type for the game client.
use thiserror::Error;

use crate::stomp::StompError;

/// Client error types with error codes and context
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Starting number must be a positive integer, got `{0}`")]
    InvalidStartingNumber(String),

    #[error("Adjustment {adjustment} does not make {value} divisible by three")]
    InvalidMove { value: i64, adjustment: i64 },

    #[error("No {0} was requested")]
    NotAwaitingInput(&'static str),

    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Connection timed out")]
    ConnectTimeout,

    #[error("Session closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("STOMP error: {0}")]
    Stomp(#[from] StompError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::InvalidStartingNumber(_) => "INPUT_001",
            ClientError::InvalidMove { .. } => "INPUT_002",
            ClientError::NotAwaitingInput(_) => "INPUT_003",
            ClientError::Rejected(_) => "CONN_001",
            ClientError::ConnectTimeout => "CONN_002",
            ClientError::SessionClosed => "CONN_003",
            ClientError::Config(_) => "CFG_001",
            ClientError::WebSocket(_) => "WS_001",
            ClientError::Stomp(_) => "STOMP_001",
            ClientError::Json(_) => "JSON_001",
            ClientError::Internal(_) => "INT_001",
        }
    }

    /// Whether this error came from local input rather than the connection
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidStartingNumber(_)
                | ClientError::InvalidMove { .. }
                | ClientError::NotAwaitingInput(_)
        )
    }

    /// Text shown to the player
    pub fn user_message(&self) -> String {
        match self {
            ClientError::InvalidStartingNumber(_) => {
                "Starting number should be a positive number".to_string()
            },
            ClientError::InvalidMove { .. } => {
                "Addition should return a number divisible by 3".to_string()
            },
            ClientError::Rejected(reason) => reason.clone(),
            ClientError::ConnectTimeout => "Could not reach the game server".to_string(),
            ClientError::SessionClosed => "Not connected".to_string(),
            other => other.to_string(),
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ClientError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ClientError::SessionClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::InvalidMove {
            value: 9,
            adjustment: 1,
        };
        assert_eq!(err.to_string(), "Adjustment 1 does not make 9 divisible by three");

        let err = ClientError::InvalidStartingNumber("abc".to_string());
        assert_eq!(
            err.to_string(),
            "Starting number must be a positive integer, got `abc`"
        );

        assert_eq!(
            ClientError::NotAwaitingInput("move").to_string(),
            "No move was requested"
        );
    }

    #[test]
    fn test_client_error_codes() {
        assert_eq!(
            ClientError::InvalidStartingNumber("0".to_string()).error_code(),
            "INPUT_001"
        );
        assert_eq!(ClientError::SessionClosed.error_code(), "CONN_003");

        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        assert_eq!(ClientError::Json(json_err).error_code(), "JSON_001");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ClientError::Rejected("Player with username already connected!!".to_string())
                .user_message(),
            "Player with username already connected!!"
        );
        assert!(ClientError::InvalidMove {
            value: 1,
            adjustment: 1
        }
        .is_invalid_input());
        assert!(!ClientError::ConnectTimeout.is_invalid_input());
    }

    #[test]
    fn test_closed_channel_maps_to_session_closed() {
        let (tx, rx) = mpsc::unbounded_channel::<u8>();
        drop(rx);
        let err: ClientError = tx.send(1).unwrap_err().into();
        assert!(matches!(err, ClientError::SessionClosed));
    }
}
