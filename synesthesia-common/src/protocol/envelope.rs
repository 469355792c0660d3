//! Request/response/notification framing used on WebSocket connections

use serde::{Deserialize, Serialize};

/// One framed message
///
/// Requests carry an id chosen by the sender; the peer echoes it in the matching response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope<Req, Res, Notif> {
    #[serde(rename_all = "camelCase")]
    Request { request_id: u64, request: Req },
    #[serde(rename_all = "camelCase")]
    Response { request_id: u64, response: Res },
    Notification { notification: Notif },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ControlNotification, ControlRequest, Response};
    use serde_json::json;

    type ControlEnvelope = Envelope<ControlRequest, Response, ControlNotification>;

    #[test]
    fn test_request_framing() {
        let envelope: ControlEnvelope = Envelope::Request {
            request_id: 7,
            request: ControlRequest::Pause,
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"type": "request", "requestId": 7, "request": {"request": "pause"}})
        );
    }

    #[test]
    fn test_response_parsing() {
        let envelope: ControlEnvelope = serde_json::from_value(json!({
            "type": "response",
            "requestId": 3,
            "response": {"success": true}
        }))
        .unwrap();
        assert_eq!(
            envelope,
            Envelope::Response { request_id: 3, response: Response::success() }
        );
    }
}
