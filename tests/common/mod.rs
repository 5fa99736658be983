//! Fakes for driving the interceptor without an OS.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vitype_agent::config::Settings;
use vitype_agent::core::{
    EditAction, FocusInspector, GhostGuard, InputMethod, InputSink, Injector, Interceptor,
    KeyTransformer, OutputEncoding, SelectionContext, SyntheticEvent, ToggleListener,
    TransformEngine,
};

/// Everything the fakes saw, in order.
#[derive(Debug, Default)]
pub struct Journal {
    pub engine_calls: Vec<String>,
    pub posted: Vec<SyntheticEvent>,
    pub toggles: Vec<(bool, bool)>,
}

impl Journal {
    pub fn resets(&self) -> usize {
        self.engine_calls.iter().filter(|c| *c == "reset").count()
    }

    pub fn processed(&self) -> Vec<String> {
        self.engine_calls
            .iter()
            .filter_map(|c| c.strip_prefix("process:").map(str::to_owned))
            .collect()
    }
}

pub type SharedJournal = Arc<Mutex<Journal>>;

/// Engine that answers from a fixed script keyed by input.
pub struct ScriptedEngine {
    journal: SharedJournal,
    script: HashMap<String, EditAction>,
}

impl ScriptedEngine {
    fn log(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().engine_calls.push(entry.into());
    }
}

impl TransformEngine for ScriptedEngine {
    fn set_auto_fix_tone(&mut self, enabled: bool) {
        self.log(format!("auto_fix_tone:{enabled}"));
    }
    fn set_input_method(&mut self, method: InputMethod) {
        self.log(format!("input_method:{method:?}"));
    }
    fn set_output_encoding(&mut self, encoding: OutputEncoding) {
        self.log(format!("output_encoding:{encoding:?}"));
    }
    fn process(&mut self, input: &str) -> Option<EditAction> {
        self.log(format!("process:{input}"));
        self.script.get(input).cloned()
    }
    fn reset(&mut self) {
        self.log("reset");
    }
    fn delete_last_character(&mut self) {
        self.log("delete_last_character");
    }
}

pub struct RecordingSink(SharedJournal);

impl InputSink for RecordingSink {
    fn post(&mut self, event: SyntheticEvent) {
        self.0.lock().unwrap().posted.push(event);
    }
}

pub struct RecordingToggles(SharedJournal);

impl ToggleListener for RecordingToggles {
    fn on_toggle(&mut self, enabled: bool, play_sound: bool) {
        self.0.lock().unwrap().toggles.push((enabled, play_sound));
    }
}

pub struct FixedInspector {
    pub trusted: bool,
    pub selection: Option<SelectionContext>,
}

impl FocusInspector for FixedInspector {
    fn is_trusted(&self) -> bool {
        self.trusted
    }
    fn read_selection(&self, _timeout: Duration) -> Option<SelectionContext> {
        self.selection
    }
}

/// A ghost suggestion: "goo|gle.com" with the tail selected.
pub fn ghost_selection() -> SelectionContext {
    SelectionContext {
        location: 3,
        length: 7,
        value_length: Some(10),
        selected_text_length: Some(7),
    }
}

pub struct Harness {
    pub interceptor: Interceptor,
    pub journal: SharedJournal,
}

impl Harness {
    pub fn new(settings: Settings, script: &[(&str, EditAction)]) -> Self {
        Self::with_inspector(
            settings,
            script,
            FixedInspector {
                trusted: true,
                selection: None,
            },
        )
    }

    pub fn with_inspector(
        settings: Settings,
        script: &[(&str, EditAction)],
        inspector: FixedInspector,
    ) -> Self {
        let journal = SharedJournal::default();
        let engine = ScriptedEngine {
            journal: journal.clone(),
            script: script
                .iter()
                .map(|(input, action)| (input.to_string(), action.clone()))
                .collect(),
        };
        let interceptor = Interceptor::new(
            settings,
            KeyTransformer::new(Box::new(engine)),
            GhostGuard::new(Box::new(inspector)),
            Injector::new(Box::new(RecordingSink(journal.clone()))),
        )
        .with_self_app_id(Some("com.vitype.agent".into()))
        .with_toggle_listener(Box::new(RecordingToggles(journal.clone())));

        // Construction pushes options; start each test from a clean log.
        journal.lock().unwrap().engine_calls.clear();
        Self {
            interceptor,
            journal,
        }
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    pub fn clear(&self) {
        let mut journal = self.journal();
        journal.engine_calls.clear();
        journal.posted.clear();
        journal.toggles.clear();
    }
}
