#![no_main]

use libfuzzer_sys::fuzz_target;
use webtty_core::{InputEvent, PlatformProfile, ReconcileEngine};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Arbitrary host JSON must never panic, only parse or be rejected.
    let Ok(Some(event)) = InputEvent::from_json_str(text) else {
        return;
    };
    for profile in [
        PlatformProfile::DESKTOP,
        PlatformProfile::ANDROID,
        PlatformProfile::IOS,
    ] {
        let mut engine = ReconcileEngine::new(profile);
        let dispatch = engine.dispatch(&event);
        if let Some(bytes) = dispatch.bytes {
            assert!(!bytes.is_empty(), "empty emission");
            assert!(
                event.text().as_bytes().ends_with(&bytes),
                "emission is not a suffix of the payload"
            );
        }
    }
});
