#![forbid(unsafe_code)]

//! DOM event field extraction, kept free of JS types so it runs natively.

use webtty_core::input::{CompositionPhase, text_from_utf16};
use webtty_core::{EncodeError, InputEvent, InputEventJson, Listener};

/// Fields read off a DOM input-family event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomInputFields {
    /// `event.data`; `None` when null (deletions, history edits).
    pub data: Option<String>,
    /// `InputEvent.inputType`, when the event has one.
    pub input_type: Option<String>,
    /// `InputEvent.isComposing`.
    pub is_composing: bool,
}

impl DomInputFields {
    #[must_use]
    pub fn with_data(data: &str) -> Self {
        Self {
            data: Some(data.to_owned()),
            ..Self::default()
        }
    }
}

/// Decode `event.data` from raw UTF-16 code units.
///
/// JS strings may hold unpaired surrogates; such a payload is an error
/// rather than a silently substituted `U+FFFD`.
pub fn data_from_utf16(units: Option<&[u16]>) -> Result<Option<String>, EncodeError> {
    units.map(text_from_utf16).transpose()
}

/// Translate a DOM event delivered to `listener` into an input event.
///
/// `None` for listeners that do not carry input and for events without a
/// text payload.
#[must_use]
pub fn input_event_from_dom(listener: Listener, fields: DomInputFields) -> Option<InputEvent> {
    let DomInputFields {
        data,
        input_type,
        is_composing,
    } = fields;
    let json = match listener {
        Listener::WindowResize | Listener::TouchStart => return None,
        Listener::BeforeInput => InputEventJson::BeforeInput {
            data: data?,
            input_type: input_type.unwrap_or_else(|| "insertText".to_owned()),
        },
        Listener::TextInput => InputEventJson::TextInput { data: data? },
        Listener::CompositionStart => InputEventJson::Composition {
            phase: CompositionPhase::Start,
            data,
        },
        Listener::CompositionUpdate => InputEventJson::Composition {
            phase: CompositionPhase::Update,
            data,
        },
        Listener::CompositionEnd => InputEventJson::Composition {
            phase: CompositionPhase::End,
            data,
        },
        Listener::NativeInput => InputEventJson::Input {
            data: data?,
            is_composing,
        },
        Listener::FocusOut => InputEventJson::Focus { focused: false },
    };
    json.into_event()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn beforeinput_insert_text_maps_to_raw_text() {
        let fields = DomInputFields {
            data: Some("h".into()),
            input_type: Some("insertText".into()),
            is_composing: false,
        };
        assert_eq!(
            input_event_from_dom(Listener::BeforeInput, fields),
            Some(InputEvent::before_input("h"))
        );
    }

    #[test]
    fn beforeinput_deletion_is_ignored() {
        let fields = DomInputFields {
            data: None,
            input_type: Some("deleteContentBackward".into()),
            is_composing: false,
        };
        assert_eq!(input_event_from_dom(Listener::BeforeInput, fields), None);

        let fields = DomInputFields {
            data: Some(String::new()),
            input_type: Some("insertReplacementText".into()),
            is_composing: false,
        };
        assert_eq!(input_event_from_dom(Listener::BeforeInput, fields), None);
    }

    #[test]
    fn composition_events_keep_phase() {
        assert_eq!(
            input_event_from_dom(Listener::CompositionStart, DomInputFields::default()),
            Some(InputEvent::CompositionStart)
        );
        assert_eq!(
            input_event_from_dom(Listener::CompositionUpdate, DomInputFields::with_data("ka")),
            Some(InputEvent::composition_update("ka"))
        );
        assert_eq!(
            input_event_from_dom(Listener::CompositionEnd, DomInputFields::with_data("か")),
            Some(InputEvent::composition_end("か"))
        );
    }

    #[test]
    fn native_input_carries_composing_flag() {
        let fields = DomInputFields {
            data: Some("a".into()),
            input_type: Some("insertCompositionText".into()),
            is_composing: true,
        };
        assert_eq!(
            input_event_from_dom(Listener::NativeInput, fields),
            Some(InputEvent::native("a", true))
        );
        assert_eq!(
            input_event_from_dom(Listener::NativeInput, DomInputFields::default()),
            None
        );
    }

    #[test]
    fn focus_out_maps_to_focus_loss() {
        assert_eq!(
            input_event_from_dom(Listener::FocusOut, DomInputFields::default()),
            Some(InputEvent::Focus { focused: false })
        );
    }

    #[test]
    fn utf16_data_is_decoded_without_substitution() {
        let units: Vec<u16> = "ü🦀".encode_utf16().collect();
        assert_eq!(
            data_from_utf16(Some(units.as_slice())).expect("valid"),
            Some("ü🦀".to_owned())
        );
        assert_eq!(data_from_utf16(None).expect("absent"), None);
        assert_eq!(
            data_from_utf16(Some(&[0xDC00, u16::from(b'a')][..])),
            Err(EncodeError::InvalidUtf16 { index: 0 })
        );
    }

    #[test]
    fn non_input_listeners_yield_nothing() {
        for listener in [Listener::WindowResize, Listener::TouchStart] {
            assert_eq!(
                input_event_from_dom(listener, DomInputFields::with_data("x")),
                None
            );
        }
    }
}
