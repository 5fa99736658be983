//! Integration tests for the keystroke pipeline, driven through fakes.

mod common;

use common::{ghost_selection, FixedInspector, Harness};
use std::collections::BTreeSet;
use std::sync::Arc;
use vitype_agent::config::Settings;
use vitype_agent::core::{
    key_code, ControlEvent, Decision, EditAction, GhostGuard, InputMethod, Injector, Interceptor,
    KeyEvent, KeyTransformer, Modifiers, NoFocusInspector, NullInputSink, SyntheticPayload,
    INJECTED_EVENT_TAG,
};
use vitype_agent::stats::SessionStats;

const KEY_A: u16 = 0x00;
const KEY_W: u16 = 0x0D;
const KEY_D: u16 = 0x02;

fn excluding(ids: &[&str]) -> Settings {
    Settings {
        excluded_apps: ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>(),
        ..Settings::default()
    }
}

#[test]
fn test_injected_event_is_always_forwarded() {
    let mut h = Harness::new(Settings::default(), &[("w", EditAction::new(1, "ư"))]);

    // Even one that looks like the toggle shortcut or a transformable key.
    let toggle = KeyEvent::new(key_code::SPACE, Modifiers::CONTROL, Some(" "))
        .with_user_data(INJECTED_EVENT_TAG);
    let letter = KeyEvent::char(KEY_W, "w").with_user_data(INJECTED_EVENT_TAG);

    assert_eq!(h.interceptor.handle(&toggle), Decision::Forward);
    assert_eq!(h.interceptor.handle(&letter), Decision::Forward);
    assert!(h.interceptor.settings().enabled);

    let journal = h.journal();
    assert!(journal.engine_calls.is_empty());
    assert!(journal.posted.is_empty());
    assert!(journal.toggles.is_empty());
}

#[test]
fn test_edit_replays_deletes_then_text() {
    let mut h = Harness::new(Settings::default(), &[("w", EditAction::new(2, "ư"))]);

    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_W, "w")), Decision::Suppress);

    let journal = h.journal();
    assert_eq!(journal.processed(), vec!["w"]);
    assert_eq!(journal.posted.len(), 6);
    assert!(journal.posted.iter().all(|e| e.tag == INJECTED_EVENT_TAG));
    assert!(journal.posted[..4].iter().all(|e| e.is_backspace()));
    assert_eq!(
        journal.posted[4].payload,
        SyntheticPayload::Text("ư".into())
    );
    assert!(journal.posted[4].key_down);
    assert!(!journal.posted[5].key_down);
}

#[test]
fn test_empty_replacement_sends_only_deletes() {
    let mut h = Harness::new(Settings::default(), &[("d", EditAction::new(1, ""))]);

    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_D, "d")), Decision::Suppress);
    let journal = h.journal();
    assert_eq!(journal.posted.len(), 2);
    assert!(journal.posted.iter().all(|e| e.is_backspace()));
}

#[test]
fn test_no_action_forwards_original_key() {
    let mut h = Harness::new(Settings::default(), &[]);
    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_A, "a")), Decision::Forward);
    assert_eq!(h.journal().processed(), vec!["a"]);
    assert!(h.journal().posted.is_empty());
}

#[test]
fn test_ghost_suggestion_adds_one_delete() {
    let mut h = Harness::with_inspector(
        Settings::default(),
        &[("w", EditAction::new(2, "ư"))],
        FixedInspector {
            trusted: true,
            selection: Some(ghost_selection()),
        },
    );

    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_W, "w")), Decision::Suppress);
    let backspaces = h.journal().posted.iter().filter(|e| e.is_backspace()).count();
    assert_eq!(backspaces, 6);
}

#[test]
fn test_ghost_guard_respects_setting_and_trust() {
    let disabled = Settings {
        ghost_guard_enabled: false,
        ..Settings::default()
    };
    let mut h = Harness::with_inspector(
        disabled,
        &[("w", EditAction::new(2, "ư"))],
        FixedInspector {
            trusted: true,
            selection: Some(ghost_selection()),
        },
    );
    h.interceptor.handle(&KeyEvent::char(KEY_W, "w"));
    assert_eq!(h.journal().posted.iter().filter(|e| e.is_backspace()).count(), 4);

    let mut untrusted = Harness::with_inspector(
        Settings::default(),
        &[("w", EditAction::new(2, "ư"))],
        FixedInspector {
            trusted: false,
            selection: Some(ghost_selection()),
        },
    );
    untrusted.interceptor.handle(&KeyEvent::char(KEY_W, "w"));
    assert_eq!(
        untrusted
            .journal()
            .posted
            .iter()
            .filter(|e| e.is_backspace())
            .count(),
        4
    );
}

#[test]
fn test_shortcut_toggles_and_suppresses() {
    let mut h = Harness::new(Settings::default(), &[]);
    let shortcut = KeyEvent::new(key_code::SPACE, Modifiers::CONTROL, Some(" "));

    assert_eq!(h.interceptor.handle(&shortcut), Decision::Suppress);
    assert!(!h.interceptor.settings().enabled);
    assert!(h.interceptor.is_bypassing());
    assert_eq!(h.journal().toggles, vec![(false, true)]);
    assert_eq!(h.journal().resets(), 1);

    // Disabled: keys pass through and never reach the engine.
    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_A, "a")), Decision::Forward);
    assert!(h.journal().processed().is_empty());

    assert_eq!(h.interceptor.handle(&shortcut), Decision::Suppress);
    assert!(h.interceptor.settings().enabled);
    assert_eq!(h.journal().toggles, vec![(false, true), (true, true)]);
}

#[test]
fn test_shortcut_ignores_caps_lock_but_not_extra_modifiers() {
    let mut h = Harness::new(Settings::default(), &[]);

    let with_caps = KeyEvent::new(
        key_code::SPACE,
        Modifiers::CONTROL | Modifiers::CAPS_LOCK,
        Some(" "),
    );
    assert_eq!(h.interceptor.handle(&with_caps), Decision::Suppress);

    let with_shift = KeyEvent::new(
        key_code::SPACE,
        Modifiers::CONTROL | Modifiers::SHIFT,
        Some(" "),
    );
    // Control is still an action modifier, so the key resets and forwards.
    assert_eq!(h.interceptor.handle(&with_shift), Decision::Forward);
    assert_eq!(h.journal().toggles.len(), 1);
}

#[test]
fn test_switch_from_excluded_app_resets_once() {
    let mut h = Harness::new(excluding(&["com.google.chrome"]), &[]);

    h.interceptor
        .apply_control(ControlEvent::AppActivated(Some("com.google.Chrome".into())));
    assert!(h.interceptor.is_bypassing());
    assert_eq!(h.interceptor.handle(&KeyEvent::char(KEY_A, "a")), Decision::Forward);
    assert!(h.journal().processed().is_empty());

    h.clear();
    h.interceptor
        .apply_control(ControlEvent::AppActivated(Some("com.apple.TextEdit".into())));
    assert_eq!(h.journal().resets(), 1);
    assert!(!h.interceptor.is_bypassing());

    h.interceptor.handle(&KeyEvent::char(KEY_A, "a"));
    let journal = h.journal();
    assert_eq!(journal.processed(), vec!["a"]);
    assert_eq!(journal.resets(), 1);
}

#[test]
fn test_quick_app_round_trip_resets_each_switch() {
    let mut h = Harness::new(Settings::default(), &[]);
    h.interceptor
        .apply_control(ControlEvent::AppActivated(Some("com.apple.TextEdit".into())));
    h.interceptor.handle(&KeyEvent::char(KEY_A, "a"));
    h.clear();

    for app in ["com.apple.Safari", "com.apple.TextEdit"] {
        h.interceptor
            .apply_control(ControlEvent::AppActivated(Some(app.into())));
    }
    assert_eq!(h.journal().resets(), 2);
    assert_eq!(h.interceptor.frontmost_app(), Some("com.apple.TextEdit"));
}

#[test]
fn test_self_app_is_bypassed() {
    let mut h = Harness::new(Settings::default(), &[]);
    h.interceptor
        .apply_control(ControlEvent::AppActivated(Some(" COM.ViType.Agent ".into())));
    assert!(h.interceptor.is_bypassing());

    // Exclusion off disables the self check as well.
    h.interceptor.apply_control(ControlEvent::SettingsChanged(Settings {
        app_exclusion_enabled: false,
        ..Settings::default()
    }));
    assert!(!h.interceptor.is_bypassing());
}

#[test]
fn test_backspace_drops_last_character() {
    let mut h = Harness::new(Settings::default(), &[]);

    let backspace = KeyEvent::new(key_code::BACKSPACE, Modifiers::empty(), None);
    assert_eq!(h.interceptor.handle(&backspace), Decision::Forward);
    assert_eq!(h.journal().engine_calls, vec!["delete_last_character"]);

    h.clear();
    let word_delete = KeyEvent::new(key_code::BACKSPACE, Modifiers::OPTION, None);
    assert_eq!(h.interceptor.handle(&word_delete), Decision::Forward);
    assert_eq!(h.journal().engine_calls, vec!["reset"]);
}

#[test]
fn test_continuity_breaks_reset() {
    let mut h = Harness::new(Settings::default(), &[]);

    let mut keys = vec![key_code::FORWARD_DELETE, key_code::ESCAPE];
    keys.extend(key_code::NAVIGATION);
    for &code in &keys {
        let event = KeyEvent::new(code, Modifiers::empty(), None);
        assert_eq!(h.interceptor.handle(&event), Decision::Forward);
    }
    assert_eq!(h.journal().resets(), keys.len());
    assert!(h.journal().processed().is_empty());

    h.clear();
    let copy = KeyEvent::new(0x08, Modifiers::COMMAND, Some("c"));
    assert_eq!(h.interceptor.handle(&copy), Decision::Forward);
    assert_eq!(h.journal().engine_calls, vec!["reset"]);
}

#[test]
fn test_double_reset_matches_single_reset() {
    let script = [("w", EditAction::new(1, "ư"))];

    let mut once = Harness::new(Settings::default(), &script);
    once.interceptor
        .handle(&KeyEvent::new(key_code::ESCAPE, Modifiers::empty(), None));
    let once_decision = once.interceptor.handle(&KeyEvent::char(KEY_W, "w"));

    let mut twice = Harness::new(Settings::default(), &script);
    for _ in 0..2 {
        twice
            .interceptor
            .handle(&KeyEvent::new(key_code::ESCAPE, Modifiers::empty(), None));
    }
    let twice_decision = twice.interceptor.handle(&KeyEvent::char(KEY_W, "w"));

    assert_eq!(once_decision, twice_decision);
    assert_eq!(once.journal().posted, twice.journal().posted);
}

#[test]
fn test_key_without_text_is_forwarded() {
    let mut h = Harness::new(Settings::default(), &[]);
    let f5 = KeyEvent::new(0x60, Modifiers::empty(), None);
    assert_eq!(h.interceptor.handle(&f5), Decision::Forward);
    assert!(h.journal().engine_calls.is_empty());
}

#[test]
fn test_settings_change_resets_only_on_bypass_flip() {
    let mut h = Harness::new(Settings::default(), &[]);

    let vni = Settings {
        engine: vitype_agent::core::EngineOptions {
            input_method: InputMethod::Vni,
            ..Default::default()
        },
        ..Settings::default()
    };
    h.interceptor
        .apply_control(ControlEvent::SettingsChanged(vni.clone()));
    assert_eq!(h.journal().resets(), 0);
    assert_eq!(h.journal().engine_calls, vec!["input_method:Vni"]);

    h.clear();
    h.interceptor.apply_control(ControlEvent::SettingsChanged(Settings {
        enabled: false,
        ..vni.clone()
    }));
    assert_eq!(h.journal().resets(), 1);

    h.clear();
    h.interceptor
        .apply_control(ControlEvent::SettingsChanged(Settings {
            enabled: false,
            play_sound_on_toggle: false,
            ..vni
        }));
    assert_eq!(h.journal().resets(), 0);
}

#[test]
fn test_new_shortcut_applies_to_next_event() {
    let mut h = Harness::new(Settings::default(), &[]);
    let mut settings = Settings::default();
    settings.shortcut = vitype_agent::core::Shortcut::new("z", Modifiers::COMMAND | Modifiers::SHIFT);
    h.interceptor
        .apply_control(ControlEvent::SettingsChanged(settings));

    let old = KeyEvent::new(key_code::SPACE, Modifiers::CONTROL, Some(" "));
    assert_eq!(h.interceptor.handle(&old), Decision::Forward);

    let new = KeyEvent::new(0x06, Modifiers::COMMAND | Modifiers::SHIFT, Some("z"));
    assert_eq!(h.interceptor.handle(&new), Decision::Suppress);
    assert!(!h.interceptor.settings().enabled);
}

#[test]
fn test_unavailable_engine_passes_everything_through() {
    let mut interceptor = Interceptor::new(
        Settings::default(),
        KeyTransformer::unavailable(),
        GhostGuard::new(Box::new(NoFocusInspector)),
        Injector::new(Box::new(NullInputSink)),
    );

    for event in [
        KeyEvent::char(KEY_A, "a"),
        KeyEvent::char(KEY_W, "w"),
        KeyEvent::new(key_code::BACKSPACE, Modifiers::empty(), None),
        KeyEvent::new(key_code::LEFT_ARROW, Modifiers::empty(), None),
    ] {
        assert_eq!(interceptor.handle(&event), Decision::Forward);
    }
}

#[test]
fn test_stats_count_decisions() {
    let stats = Arc::new(SessionStats::new());
    let mut interceptor = Interceptor::new(
        Settings::default(),
        KeyTransformer::unavailable(),
        GhostGuard::new(Box::new(NoFocusInspector)),
        Injector::new(Box::new(NullInputSink)),
    )
    .with_stats(stats.clone());

    interceptor.handle(&KeyEvent::char(KEY_A, "a").with_user_data(INJECTED_EVENT_TAG));
    interceptor.handle(&KeyEvent::char(KEY_A, "a"));
    interceptor.handle(&KeyEvent::new(key_code::SPACE, Modifiers::CONTROL, Some(" ")));
    interceptor.handle(&KeyEvent::char(KEY_A, "a"));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.keys_seen, 4);
    assert_eq!(snapshot.injected_skipped, 1);
    assert_eq!(snapshot.toggles, 1);
    assert_eq!(snapshot.bypassed, 1);
    assert_eq!(snapshot.edits_applied, 0);
}
