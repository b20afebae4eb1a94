// ==================
// crates/client-lib/src/transport.rs
// ==================
//! WebSocket transport speaking STOMP to the game server.
//!
//! [`connect`] opens the socket, performs the STOMP handshake and subscribes
//! to the player's queues. [`spawn_io`] then runs two tasks for the lifetime
//! of the connection:
//! - a reader turning MESSAGE and ERROR frames into session commands
//! - a writer turning [`OutboundMessage`]s into SEND frames
//!
//! The writer stops when the session drops its outbound sender and says
//! goodbye with a DISCONNECT frame. The reader stops when the socket closes and
//! tears the session down.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gameofthree_common::{GameMessage, OutboundMessage, ERRORS_QUEUE, UPDATES_QUEUE};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Settings;
use crate::display::TransportFailure;
use crate::dispatcher::SessionHandle;
use crate::error::ClientError;
use crate::stomp::{Command, Frame};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Header carrying the player name on CONNECT
pub const USERNAME_HEADER: &str = "username";
/// Subscription id of [`UPDATES_QUEUE`]
pub const UPDATES_SUBSCRIPTION: &str = "sub-0";
/// Subscription id of [`ERRORS_QUEUE`]
pub const ERRORS_SUBSCRIPTION: &str = "sub-1";

const CONNECTION_LOST: &str = "Connection to the game server was lost";

/// Host part of a `ws://` / `wss://` URL
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?']).next().unwrap_or(rest)
}

pub fn connect_frame(username: &str, host: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", "1.2,1.1,1.0")
        .header("host", host)
        .header("heart-beat", "0,0")
        .header(USERNAME_HEADER, username)
}

pub fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
}

/// SEND frame for an outbound game message
pub fn send_frame(message: &OutboundMessage) -> Result<Frame, ClientError> {
    let frame = Frame::new(Command::Send).header("destination", message.destination());
    Ok(match message.body()? {
        Some(body) => frame
            .header("content-type", "application/json")
            .with_body(body),
        None => frame,
    })
}

/// Next frame from the socket, skipping heart-beats and control messages
async fn next_frame(ws: &mut WsStream) -> Result<Frame, ClientError> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => {
                if let Some(frame) = Frame::decode(text.as_str())? {
                    return Ok(frame);
                }
            },
            Message::Close(_) => break,
            _ => {},
        }
    }
    Err(ClientError::Rejected("connection closed by server".to_string()))
}

/// Open the socket, log in and subscribe to the player's queues
#[instrument(skip(settings), fields(url = %settings.server_url))]
pub async fn connect(settings: &Settings) -> Result<WsStream, ClientError> {
    let username = settings
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ClientError::Config("username is required".to_string()))?;
    let timeout = settings.connect_timeout();

    let (mut ws, _response) = tokio::time::timeout(timeout, connect_async(settings.server_url.as_str()))
        .await
        .map_err(|_| ClientError::ConnectTimeout)??;
    debug!("websocket open");

    let hello = connect_frame(username, host_of(&settings.server_url));
    ws.send(Message::Text(hello.encode().into())).await?;

    let reply = tokio::time::timeout(timeout, next_frame(&mut ws))
        .await
        .map_err(|_| ClientError::ConnectTimeout)??;
    match reply.command {
        Command::Connected => {},
        Command::Error => {
            let reason = reply
                .get("message")
                .map(str::to_string)
                .unwrap_or_else(|| reply.body.clone());
            warn!(%reason, "server refused connection");
            return Err(ClientError::Rejected(reason));
        },
        other => {
            return Err(ClientError::Internal(format!(
                "unexpected {other} frame during handshake"
            )));
        },
    }

    for (id, destination) in [(UPDATES_SUBSCRIPTION, UPDATES_QUEUE), (ERRORS_SUBSCRIPTION, ERRORS_QUEUE)] {
        let frame = subscribe_frame(id, destination);
        ws.send(Message::Text(frame.encode().into())).await?;
    }

    info!(%username, "connected");
    Ok(ws)
}

/// Route one inbound frame to the session
pub fn route_frame(frame: Frame, session: &SessionHandle) -> Result<(), ClientError> {
    match frame.command {
        Command::Message => match frame.get("subscription") {
            Some(UPDATES_SUBSCRIPTION) => match GameMessage::decode(&frame.body) {
                Ok(message) => session.deliver(message),
                Err(e) => {
                    warn!("dropping malformed game message: {e}");
                    Ok(())
                },
            },
            Some(ERRORS_SUBSCRIPTION) => {
                warn!(body = %frame.body, "server reported an error");
                session.report_transport_error(TransportFailure::new(None, frame.body))
            },
            other => {
                debug!(subscription = ?other, "message for unknown subscription");
                Ok(())
            },
        },
        Command::Error => {
            let header = frame.get("message").map(str::to_string);
            error!(message = ?header, "ERROR frame from server");
            session.report_transport_error(TransportFailure::new(header, frame.body))
        },
        other => {
            debug!(command = %other, "ignoring frame");
            Ok(())
        },
    }
}

async fn read_loop(mut rx: SplitStream<WsStream>, session: SessionHandle) {
    while let Some(message) = rx.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("websocket read failed: {e}");
                let _ = session.report_transport_error(TransportFailure::new(None, e.to_string()));
                break;
            },
        };

        let frame = match Frame::decode(text.as_str()) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                warn!("dropping undecodable frame: {e}");
                continue;
            },
        };

        if route_frame(frame, &session).is_err() {
            // session already gone
            return;
        }
    }

    if !session.is_closed() {
        let _ = session.report_transport_error(TransportFailure::new(None, CONNECTION_LOST));
        let _ = session.disconnect();
    }
    debug!("reader stopped");
}

async fn write_loop(
    mut tx: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let frame = match send_frame(&message) {
            Ok(frame) => frame,
            Err(e) => {
                error!(?message, "failed to encode: {e}");
                continue;
            },
        };
        debug!(destination = message.destination(), "sending");
        if let Err(e) = tx.send(Message::Text(frame.encode().into())).await {
            warn!("websocket write failed: {e}");
            return;
        }
    }

    let goodbye = Frame::new(Command::Disconnect);
    let _ = tx.send(Message::Text(goodbye.encode().into())).await;
    let _ = tx.close().await;
    debug!("writer stopped");
}

/// Run the reader and writer tasks of a connected socket
pub fn spawn_io(
    ws: WsStream,
    session: SessionHandle,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, rx) = ws.split();
    let reader = tokio::spawn(read_loop(rx, session));
    let writer = tokio::spawn(write_loop(tx, outbound));
    (reader, writer)
}
