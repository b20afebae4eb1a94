//! Plain-text rendering of display intents.
use gameofthree_client::display::{DisplayIntent, NewRoundLabel};

/// Line to print for an intent, if any
pub fn render(intent: &DisplayIntent) -> Option<String> {
    let line = match intent {
        DisplayIntent::Connected(true) => "* connected".to_string(),
        DisplayIntent::Connected(false) => "* disconnected".to_string(),
        DisplayIntent::Message(text) => text.clone(),
        DisplayIntent::ClearBoard => "----------------------------------------".to_string(),
        DisplayIntent::OpponentLabel(Some(name)) => format!("* playing against {name}"),
        DisplayIntent::OpponentLabel(None) => "* no opponent".to_string(),
        DisplayIntent::RequestStartingNumber => {
            "> your turn to open: `number <n>` with a positive number".to_string()
        },
        DisplayIntent::RequestMoveAdjustment => "> your move: `move -1`, `move 0` or `move 1`".to_string(),
        DisplayIntent::RoundOutcome { won: true } => "You won the game :)".to_string(),
        DisplayIntent::RoundOutcome { won: false } => "You lost the game :(".to_string(),
        DisplayIntent::ReadyForNewRound(NewRoundLabel::Rematch) => {
            "> `start` for a rematch".to_string()
        },
        DisplayIntent::ReadyForNewRound(NewRoundLabel::NewGame) => {
            "> `start` for a new game".to_string()
        },
        DisplayIntent::Error(text) => format!("! {text}"),
        DisplayIntent::HideControls | DisplayIntent::ClearError => return None,
    };
    Some(line)
}
