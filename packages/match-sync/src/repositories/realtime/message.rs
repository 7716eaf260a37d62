use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::presence::PresenceRecord;
use crate::repositories::realtime_repository::RecordChange;

pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";
pub const POSTGRES_CHANGES: &str = "postgres_changes";
pub const PRESENCE: &str = "presence";
pub const PRESENCE_STATE: &str = "presence_state";
pub const PRESENCE_DIFF: &str = "presence_diff";

/// Frame of the Phoenix channel protocol spoken by the realtime service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    pub fn join(topic: &str, config: Value, access_token: &str, reference: &str) -> Self {
        PhoenixMessage {
            topic: topic.to_string(),
            event: PHX_JOIN.to_string(),
            payload: json!({ "config": config, "access_token": access_token }),
            reference: Some(reference.to_string()),
            join_ref: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: &str, join_ref: &str) -> Self {
        PhoenixMessage {
            topic: topic.to_string(),
            event: PHX_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: Some(join_ref.to_string()),
        }
    }

    pub fn heartbeat(reference: &str) -> Self {
        PhoenixMessage {
            topic: "phoenix".to_string(),
            event: HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }

    pub fn track(topic: &str, me: &PresenceRecord, reference: &str, join_ref: &str) -> Self {
        PhoenixMessage {
            topic: topic.to_string(),
            event: PRESENCE.to_string(),
            payload: json!({ "type": "presence", "event": "track", "payload": me }),
            reference: Some(reference.to_string()),
            join_ref: Some(join_ref.to_string()),
        }
    }

    /// `Some(status)` for a reply to the frame sent with `reference`.
    pub fn reply_status(&self, reference: &str) -> Option<&str> {
        if self.event != PHX_REPLY || self.reference.as_deref() != Some(reference) {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }

    pub fn reply_reason(&self) -> String {
        self.payload
            .get("response")
            .and_then(|r| r.get("reason"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string()
    }

    /// Channel-level failure: the server dropped the channel.
    pub fn is_channel_failure(&self) -> bool {
        self.event == PHX_ERROR || self.event == PHX_CLOSE
    }

    pub fn postgres_change(&self) -> Option<RecordChange> {
        if self.event != POSTGRES_CHANGES {
            return None;
        }
        let data = self.payload.get("data")?;
        let image = |primary: &str, legacy: &str| {
            data.get(primary)
                .or_else(|| data.get(legacy))
                .cloned()
                .unwrap_or(Value::Null)
        };

        Some(RecordChange {
            event: data
                .get("type")
                .or_else(|| data.get("eventType"))
                .and_then(Value::as_str)
                .unwrap_or("UPDATE")
                .to_string(),
            old: image("old_record", "old"),
            new: image("record", "new"),
        })
    }
}

/// Join config for row changes on the match table, optionally filtered.
pub fn postgres_changes_config(event: &str, filter: Option<String>) -> Value {
    let mut binding = json!({ "event": event, "schema": "public", "table": "matches" });
    if let Some(filter) = filter {
        binding["filter"] = Value::String(filter);
    }
    json!({
        "broadcast": { "ack": false, "self": false },
        "presence": { "key": "" },
        "postgres_changes": [binding],
        "private": false
    })
}

/// Join config for a presence channel keyed by the player's identity.
pub fn presence_config(key: &str) -> Value {
    json!({
        "broadcast": { "ack": false, "self": false },
        "presence": { "key": key },
        "postgres_changes": [],
        "private": false
    })
}
