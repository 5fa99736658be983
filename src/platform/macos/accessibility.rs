//! Accessibility reads of the focused text element.
//!
//! AX calls are made on the main thread through [`MainThreadHandle`].

use crate::core::ghost::{FocusInspector, SelectionContext};
use crate::core::main_thread::MainThreadHandle;
use crate::platform::macos::workspace;
use core_foundation::base::{CFType, CFTypeID, CFTypeRef, TCFType};
use core_foundation::string::{CFString, CFStringRef};
use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

type AXUIElementRef = *const c_void;
type AXError = i32;

const AX_ERROR_SUCCESS: AXError = 0;
const AX_VALUE_TYPE_CF_RANGE: u32 = 4;

const FOCUSED_UI_ELEMENT: &str = "AXFocusedUIElement";
const SELECTED_TEXT_RANGE: &str = "AXSelectedTextRange";
const VALUE: &str = "AXValue";
const SELECTED_TEXT: &str = "AXSelectedText";

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct AxRange {
    location: isize,
    length: isize,
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXUIElementCreateSystemWide() -> AXUIElementRef;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> AXError;
    fn AXUIElementGetTypeID() -> CFTypeID;
    fn AXValueGetTypeID() -> CFTypeID;
    fn AXValueGetType(value: CFTypeRef) -> u32;
    fn AXValueGetValue(value: CFTypeRef, value_type: u32, out: *mut c_void) -> bool;
}

/// Whether this process is trusted for accessibility.
pub fn is_trusted() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Focus inspector backed by the macOS accessibility API.
pub struct AxFocusInspector {
    main_thread: MainThreadHandle,
}

impl AxFocusInspector {
    pub fn new(main_thread: MainThreadHandle) -> Self {
        Self { main_thread }
    }
}

impl FocusInspector for AxFocusInspector {
    fn is_trusted(&self) -> bool {
        is_trusted()
    }

    fn read_selection(&self, timeout: Duration) -> Option<SelectionContext> {
        self.main_thread
            .run_sync(read_focused_selection, timeout)
            .flatten()
    }
}

fn read_focused_selection() -> Option<SelectionContext> {
    let element = focused_element()?;

    let range_value = copy_attribute(element.as_CFTypeRef(), SELECTED_TEXT_RANGE)?;
    if range_value.type_of() != unsafe { AXValueGetTypeID() } {
        return None;
    }
    let raw = range_value.as_CFTypeRef();
    if unsafe { AXValueGetType(raw) } != AX_VALUE_TYPE_CF_RANGE {
        return None;
    }
    let mut range = AxRange::default();
    let ok = unsafe {
        AXValueGetValue(
            raw,
            AX_VALUE_TYPE_CF_RANGE,
            &mut range as *mut AxRange as *mut c_void,
        )
    };
    if !ok || range.location < 0 || range.length <= 0 {
        return None;
    }

    Some(SelectionContext {
        location: range.location as usize,
        length: range.length as usize,
        value_length: string_length(element.as_CFTypeRef(), VALUE),
        selected_text_length: string_length(element.as_CFTypeRef(), SELECTED_TEXT),
    })
}

/// The focused element of the frontmost app, falling back to system-wide.
fn focused_element() -> Option<CFType> {
    if let Some(pid) = workspace::frontmost_pid() {
        let app = wrap_created(unsafe { AXUIElementCreateApplication(pid) });
        if let Some(element) = app.as_ref().and_then(copy_focused_element) {
            return Some(element);
        }
    }
    let system_wide = wrap_created(unsafe { AXUIElementCreateSystemWide() })?;
    copy_focused_element(&system_wide)
}

/// Take ownership of a +1 reference.
fn wrap_created(reference: CFTypeRef) -> Option<CFType> {
    if reference.is_null() {
        return None;
    }
    Some(unsafe { CFType::wrap_under_create_rule(reference) })
}

fn copy_focused_element(root: &CFType) -> Option<CFType> {
    let value = copy_attribute(root.as_CFTypeRef(), FOCUSED_UI_ELEMENT)?;
    (value.type_of() == unsafe { AXUIElementGetTypeID() }).then_some(value)
}

fn copy_attribute(element: CFTypeRef, name: &str) -> Option<CFType> {
    if element.is_null() {
        return None;
    }
    let attribute = CFString::new(name);
    let mut value: CFTypeRef = ptr::null();
    let err = unsafe {
        AXUIElementCopyAttributeValue(element, attribute.as_concrete_TypeRef(), &mut value)
    };
    if err != AX_ERROR_SUCCESS {
        return None;
    }
    wrap_created(value)
}

/// UTF-16 length of a string attribute.
fn string_length(element: CFTypeRef, name: &str) -> Option<usize> {
    let value = copy_attribute(element, name)?;
    let string = value.downcast::<CFString>()?;
    usize::try_from(string.char_len()).ok()
}
