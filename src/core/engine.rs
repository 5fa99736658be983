//! Adapter around the external text-transformation engine.
//!
//! The engine itself is opaque: it receives one input character at a time
//! and may answer with an [`EditAction`]. This module decides nothing about
//! *what* the engine returns, only *when* it is called and reset.

/// Replace the last `delete_count` UTF-16 units of committed text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditAction {
    pub delete_count: usize,
    pub text: String,
}

impl EditAction {
    pub fn new(delete_count: usize, text: impl Into<String>) -> Self {
        Self {
            delete_count,
            text: text.into(),
        }
    }
}

/// Output encoding used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// Precomposed characters
    #[default]
    Unicode,
    /// Decomposed characters (NFD)
    CompositeUnicode,
}

impl OutputEncoding {
    /// Decode a stored raw value; anything unknown is `Unicode`.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::CompositeUnicode,
            _ => Self::Unicode,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::Unicode => 0,
            Self::CompositeUnicode => 1,
        }
    }
}

/// Typing scheme used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMethod {
    /// Letters mark tones and vowels
    #[default]
    Telex,
    /// Digits mark tones and vowels
    Vni,
}

impl InputMethod {
    /// Decode a stored raw value; anything unknown is `Telex`.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Vni,
            _ => Self::Telex,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::Telex => 0,
            Self::Vni => 1,
        }
    }
}

/// Engine-wide options pushed into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub auto_fix_tone: bool,
    pub input_method: InputMethod,
    pub output_encoding: OutputEncoding,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_fix_tone: true,
            input_method: InputMethod::default(),
            output_encoding: OutputEncoding::default(),
        }
    }
}

/// The consumed engine boundary.
///
/// Implementations own exactly one engine instance.
pub trait TransformEngine: Send {
    fn set_auto_fix_tone(&mut self, enabled: bool);
    fn set_input_method(&mut self, method: InputMethod);
    fn set_output_encoding(&mut self, encoding: OutputEncoding);

    /// Feed one input string (normally a single character).
    fn process(&mut self, input: &str) -> Option<EditAction>;

    /// Drop the composition buffer.
    fn reset(&mut self);

    /// Drop the last buffered character after a user backspace.
    fn delete_last_character(&mut self);
}

/// Owns the engine for the process lifetime.
///
/// A missing engine turns every call into a no-op, so keystrokes pass
/// through untouched.
pub struct KeyTransformer {
    engine: Option<Box<dyn TransformEngine>>,
    options: EngineOptions,
}

impl KeyTransformer {
    pub fn new(engine: Box<dyn TransformEngine>) -> Self {
        Self::with_options(Some(engine), EngineOptions::default())
    }

    /// Transformer with no engine behind it.
    pub fn unavailable() -> Self {
        Self::with_options(None, EngineOptions::default())
    }

    pub fn with_options(engine: Option<Box<dyn TransformEngine>>, options: EngineOptions) -> Self {
        let mut transformer = Self { engine, options };
        if let Some(engine) = transformer.engine.as_mut() {
            engine.set_auto_fix_tone(options.auto_fix_tone);
            engine.set_input_method(options.input_method);
            engine.set_output_encoding(options.output_encoding);
        }
        transformer
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn set_auto_fix_tone(&mut self, enabled: bool) {
        self.options.auto_fix_tone = enabled;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_auto_fix_tone(enabled);
        }
    }

    pub fn set_input_method(&mut self, method: InputMethod) {
        self.options.input_method = method;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_input_method(method);
        }
    }

    pub fn set_output_encoding(&mut self, encoding: OutputEncoding) {
        self.options.output_encoding = encoding;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_output_encoding(encoding);
        }
    }

    /// Push only the options that differ from what the engine already has.
    pub fn apply_options(&mut self, options: EngineOptions) {
        if options.auto_fix_tone != self.options.auto_fix_tone {
            self.set_auto_fix_tone(options.auto_fix_tone);
        }
        if options.input_method != self.options.input_method {
            self.set_input_method(options.input_method);
        }
        if options.output_encoding != self.options.output_encoding {
            self.set_output_encoding(options.output_encoding);
        }
    }

    pub fn process(&mut self, input: &str) -> Option<EditAction> {
        self.engine.as_mut()?.process(input)
    }

    pub fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
    }

    pub fn delete_last_character(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.delete_last_character();
        }
    }
}

/// The engine linked into this build, if any.
pub fn builtin_engine() -> Option<Box<dyn TransformEngine>> {
    #[cfg(feature = "vitype-engine")]
    {
        crate::core::ffi_engine::FfiEngine::new()
            .map(|engine| Box::new(engine) as Box<dyn TransformEngine>)
    }
    #[cfg(not(feature = "vitype-engine"))]
    {
        None
    }
}
