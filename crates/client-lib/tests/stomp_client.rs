// ================================
// tests/stomp_client.rs
// ================================
//! End-to-end client tests against a scripted STOMP broker served by axum.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use gameofthree_client::config::Settings;
use gameofthree_client::display::DisplayIntent;
use gameofthree_client::error::ClientError;
use gameofthree_client::session::Mode;
use gameofthree_client::stomp::{Command, Frame};
use gameofthree_client::transport::UPDATES_SUBSCRIPTION;
use gameofthree_client::GameClient;
use gameofthree_common::{
    GameInstruction, GameMessage, ERRORS_QUEUE, NUMBER_DESTINATION, PLAY_DESTINATION,
    START_DESTINATION, UPDATES_QUEUE,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);
const ENDPOINT: &str = "/game-of-three/websocket";

/// What the test asks the broker to do next
enum Push {
    Frame(Frame),
    Close,
}

#[derive(Clone)]
struct FakeBroker {
    seen: mpsc::UnboundedSender<Frame>,
    script: Arc<Mutex<Option<mpsc::UnboundedReceiver<Push>>>>,
    reject_with: Option<&'static str>,
}

struct BrokerHandle {
    url: String,
    seen: mpsc::UnboundedReceiver<Frame>,
    push: mpsc::UnboundedSender<Push>,
}

impl BrokerHandle {
    async fn next_frame(&mut self) -> Frame {
        timeout(WAIT, self.seen.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("broker stopped")
    }

    fn send_update(&self, message: &GameMessage) {
        let body = serde_json::to_string(message).unwrap();
        let frame = Frame::new(Command::Message)
            .header("destination", UPDATES_QUEUE)
            .header("subscription", UPDATES_SUBSCRIPTION)
            .header("message-id", "1")
            .header("content-type", "application/json")
            .with_body(body);
        self.push.send(Push::Frame(frame)).unwrap();
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(broker): State<FakeBroker>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_broker(socket, broker))
}

async fn run_broker(mut socket: WebSocket, broker: FakeBroker) {
    let Some(mut script) = broker.script.lock().await.take() else {
        return;
    };

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(Message::Text(text))) = incoming else { break };
                let Ok(Some(frame)) = Frame::decode(text.as_str()) else { continue };

                if frame.command == Command::Connect {
                    let reply = match broker.reject_with {
                        Some(reason) => Frame::new(Command::Error).header("message", reason),
                        None => Frame::new(Command::Connected).header("version", "1.2"),
                    };
                    if socket.send(Message::Text(reply.encode().into())).await.is_err() {
                        break;
                    }
                }
                let _ = broker.seen.send(frame);
            }
            push = script.recv() => match push {
                Some(Push::Frame(frame)) => {
                    if socket.send(Message::Text(frame.encode().into())).await.is_err() {
                        break;
                    }
                }
                Some(Push::Close) | None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}

async fn start_broker(reject_with: Option<&'static str>) -> BrokerHandle {
    let (seen_tx, seen) = mpsc::unbounded_channel();
    let (push, script) = mpsc::unbounded_channel();
    let broker = FakeBroker {
        seen: seen_tx,
        script: Arc::new(Mutex::new(Some(script))),
        reject_with,
    };

    let app = Router::new()
        .route(ENDPOINT, get(ws_handler))
        .with_state(broker);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    BrokerHandle {
        url: format!("ws://{addr}{ENDPOINT}"),
        seen,
        push,
    }
}

fn instruction(value: i64, adjustment: Option<i64>) -> GameInstruction {
    GameInstruction { value, adjustment }
}

/// Destination and decoded body of a SEND frame, as the server reads it
fn sent_instruction(frame: &Frame) -> (String, Option<GameInstruction>) {
    assert_eq!(frame.command, Command::Send);
    let destination = frame.get("destination").unwrap_or_default().to_string();
    let body = (!frame.body.is_empty()).then(|| serde_json::from_str(&frame.body).unwrap());
    (destination, body)
}

fn settings(url: &str, mode: Mode) -> Settings {
    Settings {
        server_url: url.to_string(),
        username: Some("alice".to_string()),
        mode,
        move_delay_ms: 0,
        connect_timeout_secs: 5,
        ..Settings::default()
    }
}

/// Wait for a display intent matching `pred`, returning everything seen up to it
async fn wait_for(
    display: &mut mpsc::UnboundedReceiver<DisplayIntent>,
    pred: impl Fn(&DisplayIntent) -> bool,
) -> Vec<DisplayIntent> {
    let mut seen = Vec::new();
    loop {
        let intent = timeout(WAIT, display.recv())
            .await
            .expect("timed out waiting for display intent")
            .expect("display channel closed");
        let done = pred(&intent);
        seen.push(intent);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn test_handshake_and_automatic_round() {
    let mut broker = start_broker(None).await;
    let (display_tx, mut display) = mpsc::unbounded_channel();
    let client = GameClient::connect(&settings(&broker.url, Mode::Automatic), display_tx)
        .await
        .unwrap();

    let connect = broker.next_frame().await;
    assert_eq!(connect.command, Command::Connect);
    assert_eq!(connect.get("username"), Some("alice"));

    let mut subscriptions = Vec::new();
    for _ in 0..2 {
        let frame = broker.next_frame().await;
        assert_eq!(frame.command, Command::Subscribe);
        subscriptions.push(frame.get("destination").unwrap().to_string());
    }
    assert_eq!(subscriptions, vec![UPDATES_QUEUE, ERRORS_QUEUE]);

    let start = broker.next_frame().await;
    assert_eq!(start.command, Command::Send);
    assert_eq!(
        sent_instruction(&start),
        (START_DESTINATION.to_string(), None)
    );

    broker.send_update(&GameMessage::Start {
        opponent: "bob".to_string(),
        primary_player: false,
    });
    broker.send_update(&GameMessage::Play { value: 10 });

    let play = broker.next_frame().await;
    assert_eq!(play.get("destination"), Some("/app/game.play"));
    assert_eq!(play.get("content-type"), Some("application/json"));
    assert_eq!(
        sent_instruction(&play),
        (PLAY_DESTINATION.to_string(), Some(instruction(10, Some(-1))))
    );

    broker.send_update(&GameMessage::GameOver { winner: true });
    let shown = wait_for(&mut display, |i| matches!(i, DisplayIntent::RoundOutcome { .. })).await;
    assert_eq!(shown.first(), Some(&DisplayIntent::Connected(true)));
    assert!(shown.contains(&DisplayIntent::OpponentLabel(Some("bob".to_string()))));
    assert_eq!(shown.last(), Some(&DisplayIntent::RoundOutcome { won: true }));

    timeout(WAIT, client.disconnect()).await.unwrap();
    assert_eq!(broker.next_frame().await.command, Command::Disconnect);
    wait_for(&mut display, |i| *i == DisplayIntent::Connected(false)).await;
}

#[tokio::test]
async fn test_manual_round_through_the_broker() {
    let mut broker = start_broker(None).await;
    let (display_tx, mut display) = mpsc::unbounded_channel();
    let client = GameClient::connect(&settings(&broker.url, Mode::Manual), display_tx)
        .await
        .unwrap();
    // CONNECT, two SUBSCRIBEs, start request
    for _ in 0..4 {
        broker.next_frame().await;
    }

    broker.send_update(&GameMessage::Start {
        opponent: "bob".to_string(),
        primary_player: true,
    });
    wait_for(&mut display, |i| *i == DisplayIntent::RequestStartingNumber).await;

    client.session().submit_starting_number("42").await.unwrap();
    let number = broker.next_frame().await;
    assert_eq!(
        sent_instruction(&number),
        (NUMBER_DESTINATION.to_string(), Some(instruction(42, None)))
    );

    broker.send_update(&GameMessage::Play { value: 14 });
    wait_for(&mut display, |i| *i == DisplayIntent::RequestMoveAdjustment).await;

    assert!(client.session().submit_manual_move(0).await.is_err());
    client.session().submit_manual_move(1).await.unwrap();
    let play = broker.next_frame().await;
    assert_eq!(
        sent_instruction(&play),
        (PLAY_DESTINATION.to_string(), Some(instruction(14, Some(1))))
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_rejected_username() {
    let broker = start_broker(Some("Player with username already connected!!")).await;
    let (display_tx, _display) = mpsc::unbounded_channel();

    let result = GameClient::connect(&settings(&broker.url, Mode::Manual), display_tx).await;
    match result {
        Err(ClientError::Rejected(reason)) => {
            assert_eq!(reason, "Player with username already connected!!");
        },
        Err(other) => panic!("expected a rejection, got {other:?}"),
        Ok(_) => panic!("expected a rejection"),
    }
}

#[tokio::test]
async fn test_server_error_then_connection_loss() {
    let mut broker = start_broker(None).await;
    let (display_tx, mut display) = mpsc::unbounded_channel();
    let client = GameClient::connect(&settings(&broker.url, Mode::Manual), display_tx)
        .await
        .unwrap();
    for _ in 0..4 {
        broker.next_frame().await;
    }

    let error = Frame::new(Command::Error)
        .header("message", "Game session expired")
        .with_body("details");
    broker.push.send(Push::Frame(error)).unwrap();
    broker.push.send(Push::Close).unwrap();

    let shown = wait_for(&mut display, |i| *i == DisplayIntent::Connected(false)).await;
    let errors: Vec<_> = shown
        .iter()
        .filter_map(|i| match i {
            DisplayIntent::Error(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    // the generic connection-lost report keeps the specific header
    assert_eq!(errors, vec!["Game session expired", "Game session expired"]);

    timeout(WAIT, client.closed()).await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (display_tx, mut display) = mpsc::unbounded_channel();
    let url = format!("ws://{addr}{ENDPOINT}");
    let err = GameClient::connect(&settings(&url, Mode::Manual), display_tx)
        .await
        .err()
        .expect("connection should fail");
    assert!(matches!(
        err,
        ClientError::WebSocket(_) | ClientError::ConnectTimeout
    ));
    assert!(display.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_connecting() {
    let mut broker = start_broker(None).await;
    let (display_tx, mut display) = mpsc::unbounded_channel();
    let mut settings = settings(&broker.url, Mode::Manual);
    settings.username = None;

    let err = GameClient::connect(&settings, display_tx)
        .await
        .err()
        .expect("settings without a username are rejected");
    assert!(matches!(err, ClientError::Config(_)));
    assert_eq!(err.error_code(), "CFG_001");

    // the broker never saw a CONNECT frame
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(broker.seen.try_recv().is_err());
    assert!(display.try_recv().is_err());
}
