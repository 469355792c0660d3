//! Editor WebSocket (`GET /composer`)

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response as HttpResponse;
use futures::{SinkExt, StreamExt};
use serde::de::IgnoredAny;
use synesthesia_common::protocol::{EditorNotification, EditorRequest, Envelope, Response};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connections::EditorConnection;
use crate::AppState;

/// Frames an editor sends; editors do not answer server requests
type Inbound = Envelope<EditorRequest, IgnoredAny, EditorNotification>;
/// Frames sent to an editor
type Outbound = Envelope<EditorRequest, Response, EditorNotification>;

/// GET /composer
pub async fn composer_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> HttpResponse {
    ws.on_upgrade(move |socket| async move {
        let connection = state.orchestrator.connect_editor();
        run_editor(socket, connection).await;
    })
}

enum Step {
    Frame(Option<Result<Message, axum::Error>>),
    Push(Option<EditorNotification>),
    Answer(Option<(u64, Response)>),
}

async fn run_editor(socket: WebSocket, mut connection: EditorConnection) {
    let id = connection.id();
    info!(editor = %id, "Composer socket opened");

    let (mut write, mut read) = socket.split();
    // Answers complete out of order (control requests wait on a producer)
    let (answers_tx, mut answers_rx) = mpsc::unbounded_channel::<(u64, Response)>();

    loop {
        let step = tokio::select! {
            frame = read.next() => Step::Frame(frame),
            push = connection.next_push() => Step::Push(push),
            answer = answers_rx.recv() => Step::Answer(answer),
        };

        let outbound: Outbound = match step {
            Step::Frame(Some(Ok(Message::Text(text)))) => {
                handle_frame(&connection, &answers_tx, &text);
                continue;
            }
            Step::Frame(Some(Ok(Message::Close(_)))) | Step::Frame(None) => break,
            Step::Frame(Some(Err(e))) => {
                warn!(editor = %id, "WebSocket error: {}", e);
                break;
            }
            Step::Frame(Some(Ok(_))) => continue,
            Step::Push(None) | Step::Answer(None) => break,
            Step::Push(Some(notification)) => Envelope::Notification { notification },
            Step::Answer(Some((request_id, response))) => Envelope::Response {
                request_id,
                response,
            },
        };

        match serde_json::to_string(&outbound) {
            Ok(json) => {
                if write.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(editor = %id, "Failed to encode frame: {}", e),
        }
    }

    info!(editor = %id, "Composer socket closed");
}

fn handle_frame(
    connection: &EditorConnection,
    answers: &mpsc::UnboundedSender<(u64, Response)>,
    text: &str,
) {
    let frame: Inbound = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(editor = %connection.id(), "Ignoring malformed frame: {}", e);
            return;
        }
    };
    match frame {
        Envelope::Notification { notification } => connection.notify(notification),
        Envelope::Request {
            request_id,
            request,
        } => {
            debug!(editor = %connection.id(), request_id, ?request, "Editor request");
            let answer = connection.request(request);
            let answers = answers.clone();
            tokio::spawn(async move {
                let response = answer.await;
                let _ = answers.send((request_id, response));
            });
        }
        Envelope::Response { request_id, .. } => {
            debug!(editor = %connection.id(), request_id, "Ignoring unsolicited response");
        }
    }
}
