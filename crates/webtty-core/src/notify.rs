#![forbid(unsafe_code)]

//! Mapping of server notification events to `(title, body, severity)`.
//!
//! The server pushes events over an out-of-band stream; each carries a JSON
//! document `{ "Type": ..., "Data": ... }`. Delivery (permission prompts,
//! sounds, the stream itself) belongs to the host behind
//! [`NotificationSink`].

use serde::Deserialize;
use serde_json::Value;

/// Event types the server emits on the notification stream.
pub const NOTIFICATION_EVENT_TYPES: [&str; 4] =
    ["task_completed", "error", "progress", "system_status"];

const DEFAULT_TITLE: &str = "Notification";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Severity {
    #[default]
    Info,
    Success,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Receiver of mapped notifications.
pub trait NotificationSink {
    fn notify(&mut self, notification: &Notification);
}

#[derive(Debug, Deserialize)]
struct NotificationEnvelope {
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(rename = "Data", default)]
    data: Value,
}

fn data_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Notification {
    /// Map a raw stream payload into a notification.
    pub fn from_event_json(payload: &str) -> Result<Self, serde_json::Error> {
        let envelope: NotificationEnvelope = serde_json::from_str(payload)?;
        Ok(Self::from_envelope(&envelope))
    }

    fn from_envelope(envelope: &NotificationEnvelope) -> Self {
        let kind = envelope.kind.as_deref().filter(|k| !k.is_empty());
        let data = &envelope.data;

        let title = data_str(data, "title")
            .or(kind)
            .unwrap_or(DEFAULT_TITLE)
            .to_owned();
        let body = match data.get("message").filter(|m| !m.is_null()) {
            Some(message) => value_as_text(message),
            None => value_as_text(data),
        };
        let level = data_str(data, "level")
            .or_else(|| data_str(data, "type"))
            .unwrap_or("info");

        let severity = if kind == Some("error") || level == "error" {
            Severity::Error
        } else if kind == Some("task_completed") || level == "success" {
            Severity::Success
        } else {
            Severity::Info
        };

        Self {
            title,
            body,
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_payload_maps_fields() {
        let n = Notification::from_event_json(
            r#"{"Type":"progress","Data":{"title":"Build","message":"50%","level":"info"}}"#,
        )
        .expect("payload");
        assert_eq!(
            n,
            Notification {
                title: "Build".into(),
                body: "50%".into(),
                severity: Severity::Info,
            }
        );
    }

    #[test]
    fn task_completed_is_success_and_title_falls_back_to_type() {
        let n = Notification::from_event_json(r#"{"Type":"task_completed","Data":{"message":"done"}}"#)
            .expect("payload");
        assert_eq!(n.title, "task_completed");
        assert_eq!(n.severity, Severity::Success);
    }

    #[test]
    fn error_level_wins_and_string_data_is_body() {
        let n = Notification::from_event_json(r#"{"Type":"system_status","Data":"disk full"}"#)
            .expect("payload");
        assert_eq!(n.body, "disk full");
        assert_eq!(n.severity, Severity::Info);

        let n = Notification::from_event_json(
            r#"{"Type":"system_status","Data":{"message":"oops","type":"error"}}"#,
        )
        .expect("payload");
        assert_eq!(n.severity, Severity::Error);
    }

    #[test]
    fn empty_envelope_uses_defaults() {
        let n = Notification::from_event_json("{}").expect("payload");
        assert_eq!(n.title, "Notification");
        assert_eq!(n.body, "");
        assert_eq!(n.severity.as_str(), "info");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(Notification::from_event_json("{not json").is_err());
    }
}
