//! Producer (playback controller) connection

use synesthesia_common::protocol::ProducerPlayState;
use tokio::sync::mpsc;

use super::{send_event, ConnectionEvent, ConnectionId, ProducerCommand};

/// One connected producer
///
/// Dropping the connection reports it closed.
#[derive(Debug)]
pub struct ProducerConnection {
    id: ConnectionId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    commands: mpsc::UnboundedReceiver<ProducerCommand>,
}

impl ProducerConnection {
    pub(super) fn new(
        id: ConnectionId,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        commands: mpsc::UnboundedReceiver<ProducerCommand>,
    ) -> Self {
        Self { id, events, commands }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The producer reported a new play state (replaces the previous one wholesale)
    pub fn play_state_updated(&self, state: ProducerPlayState) {
        send_event(&self.events, ConnectionEvent::ProducerUpdate { id: self.id, state });
    }

    /// Next playback-control request to deliver to the producer
    ///
    /// The adapter must answer `command.reply` once the producer responds; dropping it
    /// reports failure to the requesting editor.
    pub async fn next_command(&mut self) -> Option<ProducerCommand> {
        self.commands.recv().await
    }
}

impl Drop for ProducerConnection {
    fn drop(&mut self) {
        send_event(&self.events, ConnectionEvent::ProducerClosed { id: self.id });
    }
}
