//! Realtime push event definitions.

use serde::de::Error as _;
use serde_json::Value;

use crate::domain::entities::Topic;

/// Event republished by the realtime channel to in-process listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// Connection established; attempt counter was reset.
    Connected,
    /// Connection closed or failed.
    Disconnected { reason: String },
    /// A reconnect has been scheduled.
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// Attempts exhausted; the channel stays down until `connect` is called.
    GaveUp { attempts: u32 },
    /// Parsed inbound message.
    Message(InboundMessage),
}

/// Inbound push message, shaped `{topic?, payload?}`.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Topic named by the sender, when present.
    pub topic: Option<Topic>,
    /// The full message as received.
    pub payload: Value,
}

impl InboundMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    /// Returns an error when the frame is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_str(text)?;

        let Some(object) = payload.as_object() else {
            return Err(serde_json::Error::custom("expected a JSON object"));
        };

        let topic = object
            .get("topic")
            .and_then(Value::as_str)
            .filter(|topic| !topic.trim().is_empty())
            .map(Topic::from);

        Ok(Self { topic, payload })
    }
}
