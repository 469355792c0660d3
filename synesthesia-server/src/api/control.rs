//! Producer WebSocket (`GET /control`)
//!
//! Producers push `state` notifications; the server sends them playback-control requests and
//! relays each response to the editor that asked. A producer that does not answer within
//! [`PRODUCER_REPLY_TIMEOUT`] is treated as having failed the request.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response as HttpResponse;
use futures::{SinkExt, StreamExt};
use serde::de::IgnoredAny;
use std::collections::HashMap;
use std::time::Duration;
use synesthesia_common::protocol::{ControlNotification, ControlRequest, Envelope, Response};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::connections::{ProducerCommand, ProducerConnection};
use crate::AppState;

/// Frames a producer sends; producers never issue requests of their own
type Inbound = Envelope<IgnoredAny, Response, ControlNotification>;
/// Frames sent to a producer
type Outbound = Envelope<ControlRequest, Response, ControlNotification>;

/// How long an editor waits for the producer's answer
pub const PRODUCER_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// GET /control
pub async fn control_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> HttpResponse {
    ws.on_upgrade(move |socket| async move {
        let connection = state.orchestrator.connect_producer();
        run_producer(socket, connection).await;
    })
}

enum Step {
    Frame(Option<Result<Message, axum::Error>>),
    Command(Option<ProducerCommand>),
}

async fn run_producer(socket: WebSocket, mut connection: ProducerConnection) {
    let id = connection.id();
    info!(producer = %id, "Control socket opened");

    let (mut write, mut read) = socket.split();
    let mut pending: HashMap<u64, oneshot::Sender<Response>> = HashMap::new();
    let mut next_request_id: u64 = 1;

    loop {
        let step = tokio::select! {
            frame = read.next() => Step::Frame(frame),
            command = connection.next_command() => Step::Command(command),
        };

        match step {
            Step::Frame(Some(Ok(Message::Text(text)))) => {
                handle_frame(&connection, &mut pending, &text);
            }
            Step::Frame(Some(Ok(Message::Close(_)))) | Step::Frame(None) => break,
            Step::Frame(Some(Err(e))) => {
                warn!(producer = %id, "WebSocket error: {}", e);
                break;
            }
            Step::Frame(Some(Ok(_))) => {} // ping/pong/binary
            Step::Command(None) => break,
            Step::Command(Some(command)) => {
                // Slots whose timeout already fired
                pending.retain(|_, reply| !reply.is_closed());

                let (request, reply) = command.with_timeout(PRODUCER_REPLY_TIMEOUT);
                let request_id = next_request_id;
                next_request_id += 1;
                let frame: Outbound = Envelope::Request { request_id, request };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(producer = %id, "Failed to encode request: {}", e);
                        let _ = reply.send(Response::failure());
                        continue;
                    }
                };
                if write.send(Message::Text(json)).await.is_err() {
                    let _ = reply.send(Response::failure());
                    break;
                }
                debug!(producer = %id, request_id, "Request sent to producer");
                pending.insert(request_id, reply);
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Response::failure());
    }
    info!(producer = %id, "Control socket closed");
}

fn handle_frame(
    connection: &ProducerConnection,
    pending: &mut HashMap<u64, oneshot::Sender<Response>>,
    text: &str,
) {
    let frame: Inbound = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(producer = %connection.id(), "Ignoring malformed frame: {}", e);
            return;
        }
    };
    match frame {
        Envelope::Notification {
            notification: ControlNotification::State { data },
        } => connection.play_state_updated(data),
        Envelope::Response {
            request_id,
            response,
        } => match pending.remove(&request_id) {
            Some(reply) => {
                let _ = reply.send(response);
            }
            None => warn!(producer = %connection.id(), request_id, "Response to unknown request"),
        },
        Envelope::Request { request_id, .. } => {
            warn!(producer = %connection.id(), request_id, "Producers cannot issue requests");
        }
    }
}
