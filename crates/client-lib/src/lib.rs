// ============================
// gameofthree-client/src/lib.rs
// ============================
//! Client for the Game of Three.
//!
//! Two players alternately adjust a shared number by -1, 0 or +1 so that it
//! becomes divisible by three, and the server divides it. Whoever reaches 1
//! wins. This crate holds the client's session state machine
//! ([`dispatcher`]) and the STOMP-over-WebSocket plumbing that feeds it.

pub mod config;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod producer;
pub mod session;
pub mod stomp;
pub mod transport;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Settings;
use crate::dispatcher::{spawn_session, SessionActor, SessionHandle};
use crate::display::DisplayIntent;
use crate::error::ClientError;

pub use gameofthree_common::{GameMessage, OutboundMessage};

/// A connected game session
pub struct GameClient {
    session: SessionHandle,
    actor: JoinHandle<()>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl GameClient {
    /// Connect, start the session and request a first round
    pub async fn connect(
        settings: &Settings,
        display: mpsc::UnboundedSender<DisplayIntent>,
    ) -> Result<Self, ClientError> {
        settings.validate()?;
        let ws = transport::connect(settings).await?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let _ = display.send(DisplayIntent::Connected(true));
        let actor = SessionActor::new(settings.session_config(), outbound_tx, display);
        let (session, actor) = spawn_session(actor);
        let (reader, writer) = transport::spawn_io(ws, session.clone(), outbound_rx);

        session.start()?;

        Ok(Self {
            session,
            actor,
            reader,
            writer,
        })
    }

    /// Handle for player actions
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Tear the session down and wait for the connection to close
    pub async fn disconnect(self) {
        let _ = self.session.disconnect();
        self.closed().await;
    }

    /// Wait until the session ends, locally or because the server went away
    pub async fn closed(self) {
        let _ = self.actor.await;
        let _ = self.writer.await;
        self.reader.abort();
        debug!("game client closed");
    }
}
