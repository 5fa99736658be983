//! Binding to the `vitype_core` engine over its C ABI.

use crate::core::engine::{EditAction, InputMethod, OutputEncoding, TransformEngine};
use std::ffi::{c_char, c_int, c_void, CStr, CString};

#[repr(C)]
struct RawResult {
    has_action: bool,
    delete_count: c_int,
    text: *mut c_char,
}

#[link(name = "vitype_core")]
extern "C" {
    fn vitype_engine_new() -> *mut c_void;
    fn vitype_engine_free(engine: *mut c_void);
    fn vitype_engine_set_auto_fix_tone(engine: *mut c_void, enabled: bool);
    fn vitype_engine_set_output_encoding(engine: *mut c_void, encoding: c_int);
    fn vitype_engine_set_input_method(engine: *mut c_void, method: c_int);
    fn vitype_engine_process(engine: *mut c_void, input: *const c_char) -> RawResult;
    fn vitype_engine_free_string(text: *mut c_char);
    fn vitype_engine_reset(engine: *mut c_void);
    fn vitype_engine_delete_last_character(engine: *mut c_void);
}

/// Owned engine instance, freed on drop.
pub struct FfiEngine {
    handle: *mut c_void,
}

// The handle is only ever used from the thread that owns this value.
unsafe impl Send for FfiEngine {}

impl FfiEngine {
    /// Create an engine. `None` if the library returned a null handle.
    pub fn new() -> Option<Self> {
        let handle = unsafe { vitype_engine_new() };
        if handle.is_null() {
            tracing::warn!("vitype_engine_new returned null");
            return None;
        }
        Some(Self { handle })
    }
}

impl TransformEngine for FfiEngine {
    fn set_auto_fix_tone(&mut self, enabled: bool) {
        unsafe { vitype_engine_set_auto_fix_tone(self.handle, enabled) }
    }

    fn set_input_method(&mut self, method: InputMethod) {
        unsafe { vitype_engine_set_input_method(self.handle, method.raw()) }
    }

    fn set_output_encoding(&mut self, encoding: OutputEncoding) {
        unsafe { vitype_engine_set_output_encoding(self.handle, encoding.raw()) }
    }

    fn process(&mut self, input: &str) -> Option<EditAction> {
        // Interior NULs cannot cross the C boundary.
        let input = CString::new(input).ok()?;
        let result = unsafe { vitype_engine_process(self.handle, input.as_ptr()) };

        let text = if result.text.is_null() {
            String::new()
        } else {
            let copied = unsafe { CStr::from_ptr(result.text) }
                .to_string_lossy()
                .into_owned();
            unsafe { vitype_engine_free_string(result.text) };
            copied
        };

        if !result.has_action {
            return None;
        }
        let delete_count = usize::try_from(result.delete_count).unwrap_or(0);
        Some(EditAction::new(delete_count, text))
    }

    fn reset(&mut self) {
        unsafe { vitype_engine_reset(self.handle) }
    }

    fn delete_last_character(&mut self) {
        unsafe { vitype_engine_delete_last_character(self.handle) }
    }
}

impl Drop for FfiEngine {
    fn drop(&mut self) {
        unsafe { vitype_engine_free(self.handle) }
    }
}
