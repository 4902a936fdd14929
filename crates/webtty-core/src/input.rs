#![forbid(unsafe_code)]

//! Normalized input event model.
//!
//! The web host (JS/TS or the wasm frontend) translates raw DOM signals into
//! [`InputEvent`] values. Several DOM channels can report the same keystroke;
//! this module only describes them. Deciding which one wins is the job of
//! [`crate::reconcile`].
//!
//! A JSON encoding ([`InputEventJson`]) is provided for record/replay and for
//! hosts that prefer to pass plain objects.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EncodeError;

/// DOM channel an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputChannel {
    /// Committed keystroke from the terminal surface (`onData`).
    Keyboard,
    /// `beforeinput` with `inputType == "insertText"`.
    BeforeInput,
    /// Legacy `textInput` event from virtual keyboards.
    TextInput,
    CompositionStart,
    CompositionUpdate,
    CompositionEnd,
    CompositionCancel,
    /// Fallback DOM `input` event.
    NativeInput,
    Focus,
}

impl InputChannel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::BeforeInput => "before_input",
            Self::TextInput => "text_input",
            Self::CompositionStart => "composition_start",
            Self::CompositionUpdate => "composition_update",
            Self::CompositionEnd => "composition_end",
            Self::CompositionCancel => "composition_cancel",
            Self::NativeInput => "native_input",
            Self::Focus => "focus",
        }
    }

    /// Channels owned by the IME composition flow.
    #[must_use]
    pub const fn is_composition(self) -> bool {
        matches!(
            self,
            Self::CompositionStart
                | Self::CompositionUpdate
                | Self::CompositionEnd
                | Self::CompositionCancel
        )
    }

    /// Channels fed by mobile virtual keyboards.
    #[must_use]
    pub const fn is_virtual_keyboard(self) -> bool {
        matches!(self, Self::BeforeInput | Self::TextInput)
    }
}

/// Virtual-keyboard insertion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawTextChannel {
    BeforeInput,
    TextInput,
}

impl From<RawTextChannel> for InputChannel {
    fn from(value: RawTextChannel) -> Self {
        match value {
            RawTextChannel::BeforeInput => Self::BeforeInput,
            RawTextChannel::TextInput => Self::TextInput,
        }
    }
}

/// One raw input signal, transient within a single reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Physical keyboard commit delivered by the terminal surface.
    KeyCommit { text: Box<str> },
    CompositionStart,
    CompositionUpdate { text: Box<str> },
    CompositionEnd { text: Box<str> },
    CompositionCancel,
    /// Text inserted by a virtual keyboard before the browser applies it.
    RawInsertedText {
        channel: RawTextChannel,
        text: Box<str>,
    },
    /// Fallback `input` event; `composing` mirrors the event's `isComposing`.
    NativeInput { text: Box<str>, composing: bool },
    Focus { focused: bool },
}

impl InputEvent {
    #[must_use]
    pub fn key(text: &str) -> Self {
        Self::KeyCommit { text: text.into() }
    }

    #[must_use]
    pub fn composition_update(text: &str) -> Self {
        Self::CompositionUpdate { text: text.into() }
    }

    #[must_use]
    pub fn composition_end(text: &str) -> Self {
        Self::CompositionEnd { text: text.into() }
    }

    #[must_use]
    pub fn before_input(text: &str) -> Self {
        Self::RawInsertedText {
            channel: RawTextChannel::BeforeInput,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn text_input(text: &str) -> Self {
        Self::RawInsertedText {
            channel: RawTextChannel::TextInput,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn native(text: &str, composing: bool) -> Self {
        Self::NativeInput {
            text: text.into(),
            composing,
        }
    }

    #[must_use]
    pub const fn channel(&self) -> InputChannel {
        match self {
            Self::KeyCommit { .. } => InputChannel::Keyboard,
            Self::CompositionStart => InputChannel::CompositionStart,
            Self::CompositionUpdate { .. } => InputChannel::CompositionUpdate,
            Self::CompositionEnd { .. } => InputChannel::CompositionEnd,
            Self::CompositionCancel => InputChannel::CompositionCancel,
            Self::RawInsertedText { channel, .. } => match channel {
                RawTextChannel::BeforeInput => InputChannel::BeforeInput,
                RawTextChannel::TextInput => InputChannel::TextInput,
            },
            Self::NativeInput { .. } => InputChannel::NativeInput,
            Self::Focus { .. } => InputChannel::Focus,
        }
    }

    /// Text payload; empty for payload-less events.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::KeyCommit { text }
            | Self::CompositionUpdate { text }
            | Self::CompositionEnd { text }
            | Self::RawInsertedText { text, .. }
            | Self::NativeInput { text, .. } => text,
            Self::CompositionStart | Self::CompositionCancel | Self::Focus { .. } => "",
        }
    }

    /// The event's own composing flag (only native `input` events carry one).
    #[must_use]
    pub const fn composing(&self) -> bool {
        matches!(
            self,
            Self::NativeInput {
                composing: true,
                ..
            }
        )
    }
}

/// Phase for composition events in the JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPhase {
    Start,
    Update,
    End,
    Cancel,
}

/// JSON encoding used by hosts and replay traces.
///
/// A `kind` tag plus the minimum fields needed for replay. Missing `data`
/// decodes as an empty payload, which reconciliation drops.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEventJson {
    Key {
        #[serde(default)]
        data: String,
    },
    Composition {
        phase: CompositionPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    BeforeInput {
        #[serde(default)]
        data: String,
        #[serde(default = "insert_text", rename = "inputType")]
        input_type: String,
    },
    TextInput {
        #[serde(default)]
        data: String,
    },
    Input {
        #[serde(default)]
        data: String,
        #[serde(default, rename = "isComposing")]
        is_composing: bool,
    },
    Focus {
        focused: bool,
    },
}

fn insert_text() -> String {
    "insertText".to_owned()
}

impl InputEventJson {
    /// Convert into a reconcilable event.
    ///
    /// Returns `None` for signals the engine has no use for, such as
    /// `beforeinput` events that are not plain text insertions.
    #[must_use]
    pub fn into_event(self) -> Option<InputEvent> {
        Some(match self {
            Self::Key { data } => InputEvent::KeyCommit { text: data.into() },
            Self::Composition { phase, data } => {
                let text: Box<str> = data.unwrap_or_default().into();
                match phase {
                    CompositionPhase::Start => InputEvent::CompositionStart,
                    CompositionPhase::Update => InputEvent::CompositionUpdate { text },
                    CompositionPhase::End => InputEvent::CompositionEnd { text },
                    CompositionPhase::Cancel => InputEvent::CompositionCancel,
                }
            }
            Self::BeforeInput { data, input_type } => {
                if input_type != "insertText" {
                    return None;
                }
                InputEvent::RawInsertedText {
                    channel: RawTextChannel::BeforeInput,
                    text: data.into(),
                }
            }
            Self::TextInput { data } => InputEvent::RawInsertedText {
                channel: RawTextChannel::TextInput,
                text: data.into(),
            },
            Self::Input { data, is_composing } => InputEvent::NativeInput {
                text: data.into(),
                composing: is_composing,
            },
            Self::Focus { focused } => InputEvent::Focus { focused },
        })
    }
}

impl From<&InputEvent> for InputEventJson {
    fn from(value: &InputEvent) -> Self {
        match value {
            InputEvent::KeyCommit { text } => Self::Key {
                data: text.to_string(),
            },
            InputEvent::CompositionStart => Self::Composition {
                phase: CompositionPhase::Start,
                data: None,
            },
            InputEvent::CompositionUpdate { text } => Self::Composition {
                phase: CompositionPhase::Update,
                data: Some(text.to_string()),
            },
            InputEvent::CompositionEnd { text } => Self::Composition {
                phase: CompositionPhase::End,
                data: Some(text.to_string()),
            },
            InputEvent::CompositionCancel => Self::Composition {
                phase: CompositionPhase::Cancel,
                data: None,
            },
            InputEvent::RawInsertedText {
                channel: RawTextChannel::BeforeInput,
                text,
            } => Self::BeforeInput {
                data: text.to_string(),
                input_type: insert_text(),
            },
            InputEvent::RawInsertedText {
                channel: RawTextChannel::TextInput,
                text,
            } => Self::TextInput {
                data: text.to_string(),
            },
            InputEvent::NativeInput { text, composing } => Self::Input {
                data: text.to_string(),
                is_composing: *composing,
            },
            InputEvent::Focus { focused } => Self::Focus { focused: *focused },
        }
    }
}

impl InputEvent {
    /// Encode this event as a stable JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&InputEventJson::from(self))
    }

    /// Decode a host JSON event.
    ///
    /// `Ok(None)` means the event is well-formed but irrelevant to input.
    pub fn from_json_str(s: &str) -> Result<Option<Self>, serde_json::Error> {
        let json: InputEventJson = serde_json::from_str(s)?;
        Ok(json.into_event())
    }

    /// Decode a host JSON event together with its optional `timeStamp`.
    pub fn timed_from_json_str(
        s: &str,
    ) -> Result<(Option<Self>, Option<Duration>), serde_json::Error> {
        let value: Value = serde_json::from_str(s)?;
        let at = value
            .get("timeStamp")
            .and_then(Value::as_f64)
            .and_then(timestamp_from_millis);
        let json = InputEventJson::deserialize(value)?;
        Ok((json.into_event(), at))
    }
}

/// Convert a DOM high-resolution timestamp (milliseconds) into a duration.
///
/// `None` for negative or non-finite values.
#[must_use]
pub fn timestamp_from_millis(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(ms / 1000.0).ok()
}

/// Decode a UTF-16 payload (as handed over by JS strings) into text.
///
/// JS strings may carry unpaired surrogates, which have no UTF-8 encoding.
pub fn text_from_utf16(units: &[u16]) -> Result<String, EncodeError> {
    let mut out = String::with_capacity(units.len());
    let mut index = 0;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => {
                index += ch.len_utf16();
                out.push(ch);
            }
            Err(_) => return Err(EncodeError::InvalidUtf16 { index }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn channel_and_text_accessors() {
        let ev = InputEvent::text_input("h");
        assert_eq!(ev.channel(), InputChannel::TextInput);
        assert_eq!(ev.text(), "h");
        assert!(!ev.composing());
        assert!(InputEvent::native("x", true).composing());
        assert_eq!(InputEvent::CompositionStart.text(), "");
    }

    #[test]
    fn composition_json_without_data_decodes_as_empty() {
        let ev = InputEvent::from_json_str(r#"{"kind":"composition","phase":"update"}"#)
            .expect("json")
            .expect("relevant event");
        assert_eq!(ev, InputEvent::composition_update(""));
    }

    #[test]
    fn non_insert_before_input_is_irrelevant() {
        let ev = InputEvent::from_json_str(
            r#"{"kind":"before_input","data":"a","inputType":"deleteContentBackward"}"#,
        )
        .expect("json");
        assert_eq!(ev, None);
    }

    #[test]
    fn unknown_kind_is_a_decode_error() {
        assert!(InputEvent::from_json_str(r#"{"kind":"gamepad"}"#).is_err());
    }

    #[test]
    fn native_input_json_carries_composing_flag() {
        let ev = InputEvent::native("é", true);
        let json = ev.to_json_string().expect("serialize");
        assert_eq!(json, r#"{"kind":"input","data":"é","isComposing":true}"#);
        assert_eq!(InputEvent::from_json_str(&json).expect("json"), Some(ev));
    }

    #[test]
    fn timestamp_travels_beside_the_event() {
        let (event, at) =
            InputEvent::timed_from_json_str(r#"{"kind":"key","data":"x","timeStamp":1500}"#)
                .expect("json");
        assert_eq!(event, Some(InputEvent::key("x")));
        assert_eq!(at, Some(Duration::from_millis(1500)));

        let (_, missing) =
            InputEvent::timed_from_json_str(r#"{"kind":"key","data":"x"}"#).expect("json");
        assert_eq!(missing, None);
        assert_eq!(timestamp_from_millis(-1.0), None);
        assert_eq!(timestamp_from_millis(f64::NAN), None);
    }

    #[test]
    fn utf16_payload_decodes() {
        let units: Vec<u16> = "héllo 🦀".encode_utf16().collect();
        assert_eq!(text_from_utf16(&units).expect("valid"), "héllo 🦀");
    }

    #[test]
    fn lone_surrogate_is_rejected_with_position() {
        let units = [u16::from(b'a'), u16::from(b'b'), 0xD800];
        assert_eq!(
            text_from_utf16(&units),
            Err(EncodeError::InvalidUtf16 { index: 2 })
        );
    }
}
