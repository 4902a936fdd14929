#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use webtty_core::reconcile::{ReconcileOutcome, SuppressReason};
use webtty_core::{
    InputChannel, InputEvent, PlatformProfile, RawTextChannel, ReconcileEngine, ReconcileState,
};

#[derive(Debug, Arbitrary)]
enum FuzzEvent {
    Key(String),
    CompositionStart,
    CompositionUpdate(String),
    CompositionEnd(String),
    CompositionCancel,
    BeforeInput(String),
    TextInput(String),
    Native { text: String, composing: bool },
    Focus(bool),
}

impl From<FuzzEvent> for InputEvent {
    fn from(event: FuzzEvent) -> Self {
        match event {
            FuzzEvent::Key(text) => Self::KeyCommit { text: text.into() },
            FuzzEvent::CompositionStart => Self::CompositionStart,
            FuzzEvent::CompositionUpdate(text) => Self::CompositionUpdate { text: text.into() },
            FuzzEvent::CompositionEnd(text) => Self::CompositionEnd { text: text.into() },
            FuzzEvent::CompositionCancel => Self::CompositionCancel,
            FuzzEvent::BeforeInput(text) => Self::RawInsertedText {
                channel: RawTextChannel::BeforeInput,
                text: text.into(),
            },
            FuzzEvent::TextInput(text) => Self::RawInsertedText {
                channel: RawTextChannel::TextInput,
                text: text.into(),
            },
            FuzzEvent::Native { text, composing } => Self::NativeInput {
                text: text.into(),
                composing,
            },
            FuzzEvent::Focus(focused) => Self::Focus { focused },
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    profile: u8,
    events: Vec<FuzzEvent>,
}

fuzz_target!(|scenario: Scenario| {
    let profile = match scenario.profile % 3 {
        0 => PlatformProfile::DESKTOP,
        1 => PlatformProfile::ANDROID,
        _ => PlatformProfile::IOS,
    };
    let mut engine = ReconcileEngine::new(profile);
    let mut last_sequence = 0;

    for event in scenario.events.into_iter().take(256) {
        let event = InputEvent::from(event);
        let dispatch = engine.dispatch(&event);

        assert!(dispatch.log.sequence > last_sequence, "sequence not monotonic");
        last_sequence = dispatch.log.sequence;
        assert_eq!(dispatch.log.state_after, engine.state());

        if let Some(bytes) = &dispatch.bytes {
            assert!(!bytes.is_empty(), "empty emission");
            assert!(std::str::from_utf8(bytes).is_ok(), "emission is not utf-8");
            assert_eq!(dispatch.log.bytes_len, bytes.len());
            if !profile.ios_like {
                assert_ne!(
                    event.channel(),
                    InputChannel::CompositionUpdate,
                    "composition update emitted on a non-iOS profile"
                );
            }
        }
        if dispatch.prevent_default {
            assert!(profile.ios_like, "prevent_default off iOS");
            assert!(
                matches!(
                    dispatch.log.outcome,
                    ReconcileOutcome::Emitted
                        | ReconcileOutcome::Suppressed(SuppressReason::ClaimedBy(_))
                ),
                "native edit cancelled for dropped text"
            );
        }

        match event {
            InputEvent::CompositionEnd { .. }
            | InputEvent::CompositionCancel
            | InputEvent::Focus { focused: false } => {
                assert_eq!(engine.state(), ReconcileState::Idle);
            }
            InputEvent::CompositionStart => {
                assert_eq!(engine.state(), ReconcileState::Composing);
            }
            _ => {}
        }
    }
});
