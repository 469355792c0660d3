//! Subscriber stream (`GET /broadcast`)
//!
//! Each simplified play state is sent as an SSE event named `play-state`. The subscriber stays
//! registered for as long as the client holds the stream open.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::AppState;

/// SSE event name for broadcast play states
pub const PLAY_STATE_EVENT: &str = "play-state";

/// GET /broadcast
pub async fn broadcast_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut connection = state.orchestrator.connect_subscriber();
    info!(subscriber = %connection.id(), "Broadcast stream opened");

    let stream = async_stream::stream! {
        while let Some(play_state) = connection.next_state().await {
            match Event::default().event(PLAY_STATE_EVENT).json_data(&play_state) {
                Ok(event) => {
                    debug!(subscriber = %connection.id(), layers = play_state.layers.len(), "Sending play state");
                    yield Ok(event);
                }
                Err(e) => warn!(subscriber = %connection.id(), "Failed to encode play state: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
