use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events pushed over the WebSocket channel.
/// Wire format: `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Someone cheered. Broadcast to every connected client.
    Cheers(String),

    /// Rate-limit notice, delivered only to the connection that
    /// cheered too early. Not persisted, not broadcast.
    #[serde(rename = "cheers-quarantine")]
    CheersQuarantine(String),

    /// A chat message or status update landed. Broadcast to every
    /// connected client.
    NewMessage(MessagePayload),
}

/// The `new_message` event carries either the full message tuple
/// (chat) or just the new text (status).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    Chat(DateTime<Utc>, String, String),
    Status(String),
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Skål! No payload; identity comes from the connection.
    Cheers,
}
