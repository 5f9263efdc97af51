//! WebSocket wire protocol definitions
//!
//! All frames are JSON objects carrying a `type` discriminator and, in
//! most cases, a `channel` name.
//!
//! ## Client → Server Frames
//!
//! ```json
//! // Invoke an action and await one response
//! {"type": "action", "channel": "add", "data": {"a": 5, "b": 3}}
//!
//! // Subscribe to a channel, binding its required-on-subscribe params
//! {"type": "subscribe", "channel": "chat", "data": {"token": "..."}}
//!
//! // Unsubscribe
//! {"type": "unsubscribe", "channel": "chat"}
//! ```
//!
//! ## Server → Client Frames
//!
//! ```json
//! // Action response (data omitted when the handler returned nothing)
//! {"type": "action", "channel": "add", "status": "completed", "data": 8}
//!
//! // Subscription confirmed
//! {"type": "subscribed", "channel": "chat"}
//!
//! // Unsubscription confirmed
//! {"type": "unsubscribed", "channel": "chat"}
//!
//! // Broadcast delivery
//! {"type": "data", "channel": "chat", "data": {"message": "hi"}}
//!
//! // Error
//! {"type": "error", "message": "Action 'add' not found."}
//! ```
//!
//! Inbound frames are classified field by field rather than through a
//! tagged deserialize, because each missing piece has its own exact error
//! message and an unknown `type` must still report the channel check
//! first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frames sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Response to an action invocation
    Action {
        channel: String,
        status: ActionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Subscription confirmed
    Subscribed { channel: String },
    /// Unsubscription confirmed
    Unsubscribed { channel: String },
    /// Broadcast delivery to one subscriber
    Data { channel: String, data: Value },
    /// Any failure against the offending frame
    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

/// Outcome discriminator on action responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
}

/// A classified client frame
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Action {
        channel: String,
        data: Map<String, Value>,
    },
    Subscribe {
        channel: String,
        data: Map<String, Value>,
    },
    Unsubscribe {
        channel: String,
    },
}

impl ClientFrame {
    /// Classify a decoded JSON value as a client frame
    ///
    /// The error string is the exact `message` of the resulting `error`
    /// frame.
    pub fn classify(raw: &Value) -> Result<Self, String> {
        let Some(frame) = raw.as_object() else {
            return Err("Message must be a JSON object.".to_string());
        };

        let Some(frame_type) = frame.get("type").and_then(Value::as_str) else {
            return Err("Message type is required.".to_string());
        };
        let Some(channel) = frame.get("channel").and_then(Value::as_str) else {
            return Err("Channel is required.".to_string());
        };

        let data = match frame.get("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err("Message data must be an object.".to_string()),
        };

        match frame_type {
            "action" => Ok(ClientFrame::Action {
                channel: channel.to_string(),
                data,
            }),
            "subscribe" => Ok(ClientFrame::Subscribe {
                channel: channel.to_string(),
                data,
            }),
            "unsubscribe" => Ok(ClientFrame::Unsubscribe {
                channel: channel.to_string(),
            }),
            other => Err(format!("Unknown message type: {}.", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Serialization tests ===

    #[test]
    fn test_action_frame_with_data() {
        let frame = ServerFrame::Action {
            channel: "add".to_string(),
            status: ActionStatus::Completed,
            data: Some(json!(8)),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({"type": "action", "channel": "add", "status": "completed", "data": 8})
        );
    }

    #[test]
    fn test_action_frame_omits_absent_data() {
        let frame = ServerFrame::Action {
            channel: "test_action".to_string(),
            status: ActionStatus::Completed,
            data: None,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({"type": "action", "channel": "test_action", "status": "completed"})
        );
    }

    #[test]
    fn test_subscribed_frame() {
        let frame = ServerFrame::Subscribed {
            channel: "chat".to_string(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, json!({"type": "subscribed", "channel": "chat"}));
    }

    #[test]
    fn test_data_frame() {
        let frame = ServerFrame::Data {
            channel: "chat".to_string(),
            data: json!({"message": "hi"}),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({"type": "data", "channel": "chat", "data": {"message": "hi"}})
        );
    }

    #[test]
    fn test_error_frame() {
        let frame = ServerFrame::error("Channel 'nope' not found.");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({"type": "error", "message": "Channel 'nope' not found."})
        );
    }

    // === Classification tests ===

    #[test]
    fn test_classify_action() {
        let frame = ClientFrame::classify(
            &json!({"type": "action", "channel": "add", "data": {"a": 5}}),
        )
        .expect("should classify");
        match frame {
            ClientFrame::Action { channel, data } => {
                assert_eq!(channel, "add");
                assert_eq!(data.get("a"), Some(&json!(5)));
            }
            other => panic!("expected Action, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_defaults_missing_data_to_empty() {
        let frame = ClientFrame::classify(&json!({"type": "subscribe", "channel": "chat"}))
            .expect("should classify");
        match frame {
            ClientFrame::Subscribe { data, .. } => assert!(data.is_empty()),
            other => panic!("expected Subscribe, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_missing_type() {
        let err = ClientFrame::classify(&json!({"channel": "chat"})).unwrap_err();
        assert_eq!(err, "Message type is required.");
    }

    #[test]
    fn test_classify_missing_channel() {
        let err = ClientFrame::classify(&json!({"type": "subscribe"})).unwrap_err();
        assert_eq!(err, "Channel is required.");
    }

    #[test]
    fn test_classify_unknown_type() {
        let err =
            ClientFrame::classify(&json!({"type": "unknown", "channel": "chat"})).unwrap_err();
        assert_eq!(err, "Unknown message type: unknown.");
    }

    #[test]
    fn test_classify_channel_checked_before_unknown_type() {
        let err = ClientFrame::classify(&json!({"type": "unknown"})).unwrap_err();
        assert_eq!(err, "Channel is required.");
    }

    #[test]
    fn test_classify_non_object_message() {
        let err = ClientFrame::classify(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err, "Message must be a JSON object.");
    }

    #[test]
    fn test_classify_non_object_data() {
        let err = ClientFrame::classify(
            &json!({"type": "action", "channel": "add", "data": [1]}),
        )
        .unwrap_err();
        assert_eq!(err, "Message data must be an object.");
    }

    #[test]
    fn test_server_frame_roundtrip() {
        let frame = ServerFrame::Data {
            channel: "chat".to_string(),
            data: json!({"message": "hi"}),
        };
        let text = serde_json::to_string(&frame).unwrap();
        let back: ServerFrame = serde_json::from_str(&text).unwrap();
        assert!(matches!(back, ServerFrame::Data { .. }));
    }
}
