#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use wasm_bindgen_test::wasm_bindgen_test;
use webtty_core::{InputEvent, Listener, Notification, PlatformProfile, ReconcileEngine};
use webtty_web::dom::{DomInputFields, input_event_from_dom};

fn emitted(profile: PlatformProfile, events: &[InputEvent]) -> Vec<String> {
    let mut engine = ReconcileEngine::new(profile);
    events
        .iter()
        .filter_map(|event| engine.dispatch(event).bytes)
        .map(|bytes| String::from_utf8(bytes).expect("engine emits utf-8"))
        .collect()
}

#[wasm_bindgen_test]
fn dom_fields_reconcile_to_one_sequence_per_keystroke() {
    let mut events = Vec::new();
    for ch in ["h", "i"] {
        for listener in [
            Listener::BeforeInput,
            Listener::TextInput,
            Listener::NativeInput,
        ] {
            if let Some(event) = input_event_from_dom(listener, DomInputFields::with_data(ch)) {
                events.push(event);
            }
        }
    }
    assert_eq!(emitted(PlatformProfile::IOS, &events), vec!["h", "i"]);
}

#[wasm_bindgen_test]
fn android_composition_commits_on_end() {
    let events = [
        InputEvent::CompositionStart,
        InputEvent::composition_update("w"),
        InputEvent::composition_update("wo"),
        InputEvent::composition_end("word"),
        InputEvent::native("word", false),
    ];
    assert_eq!(emitted(PlatformProfile::ANDROID, &events), vec!["word"]);
}

#[wasm_bindgen_test]
fn notification_payload_maps_under_wasm() {
    let n = Notification::from_event_json(r#"{"Type":"error","Data":{"message":"boom"}}"#)
        .expect("payload");
    assert_eq!(n.title, "error");
    assert_eq!(n.body, "boom");
    assert_eq!(n.severity.as_str(), "error");
}
