//! macOS keyboard tap using a CGEvent tap.
//!
//! The tap runs on its own thread with its own `CFRunLoop`. It is an active
//! (filtering) tap at the head of the session event stream, so the callback
//! can veto key-downs. It requires Input Monitoring and Accessibility
//! permission; without them creation fails and the thread retries.

use crate::core::interceptor::{ControlEvent, Decision, Interceptor};
use crate::core::keys::{KeyEvent, Modifiers};
use crate::platform::TapError;
use core_foundation::base::TCFType;
use core_foundation::mach_port::{CFMachPort, CFMachPortRef};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult, EventField,
};
use crossbeam_channel::Receiver;
use foreign_types::ForeignType;
use std::cell::RefCell;
use std::ffi::{c_ulong, c_void};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventKeyboardGetUnicodeString(
        event: *mut c_void,
        max_length: c_ulong,
        actual_length: *mut c_ulong,
        buffer: *mut u16,
    );
}

/// Run-loop slice between control-channel drains and shutdown checks.
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

/// How often a failed tap creation is retried.
const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Keyboard tap driving an [`Interceptor`] on a dedicated thread.
pub struct KeyTap {
    running: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl KeyTap {
    /// Move `interceptor` onto a new tap thread and start intercepting.
    ///
    /// Control events sent on `controls` are applied in order before every
    /// key event and between run-loop slices.
    pub fn start(
        interceptor: Interceptor,
        controls: Receiver<ControlEvent>,
    ) -> Result<Self, TapError> {
        let running = Arc::new(AtomicBool::new(true));
        let active = Arc::new(AtomicBool::new(false));

        let thread_running = running.clone();
        let thread_active = active.clone();
        let handle = thread::Builder::new()
            .name("vitype-tap".into())
            .spawn(move || {
                let state = Rc::new(RefCell::new(TapState {
                    interceptor,
                    controls,
                }));
                run_tap_thread(state, &thread_running, &thread_active);
                thread_active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| TapError::ThreadSpawnFailed(e.to_string()))?;

        Ok(Self {
            running,
            active,
            thread_handle: Some(handle),
        })
    }

    /// Stop intercepting and join the tap thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the OS tap currently exists.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for KeyTap {
    fn drop(&mut self) {
        self.stop();
    }
}

struct TapState {
    interceptor: Interceptor,
    controls: Receiver<ControlEvent>,
}

impl TapState {
    fn drain_controls(&mut self) {
        while let Ok(event) = self.controls.try_recv() {
            self.interceptor.apply_control(event);
        }
    }
}

fn run_tap_thread(state: Rc<RefCell<TapState>>, running: &AtomicBool, active: &AtomicBool) {
    let mut warned = false;

    while running.load(Ordering::SeqCst) {
        let port = Rc::new(RefCell::new(None::<CFMachPort>));
        let tap = match create_tap(state.clone(), port.clone()) {
            Ok(tap) => tap,
            Err(e) => {
                if warned {
                    tracing::debug!("Keyboard tap still unavailable: {e}");
                } else {
                    tracing::warn!("{e}; keys pass through until permission is granted");
                    warned = true;
                }
                wait_for_retry(&state, running);
                continue;
            }
        };

        let source = match tap.mach_port().create_runloop_source(0) {
            Ok(source) => source,
            Err(_) => {
                tracing::warn!("{}", TapError::RunLoopSourceFailed);
                wait_for_retry(&state, running);
                continue;
            }
        };

        let run_loop = CFRunLoop::get_current();
        unsafe {
            run_loop.add_source(&source, kCFRunLoopCommonModes);
        }
        *port.borrow_mut() = Some(tap.mach_port().clone());
        tap.enable();
        active.store(true, Ordering::SeqCst);
        tracing::info!("Keyboard tap installed");

        while running.load(Ordering::SeqCst) {
            CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_LOOP_SLICE, false);
            if let Ok(mut state) = state.try_borrow_mut() {
                state.drain_controls();
            }
        }

        run_loop.remove_source(&source, unsafe { kCFRunLoopCommonModes });
        active.store(false, Ordering::SeqCst);
        tracing::info!("Keyboard tap removed");
    }
}

/// Sleep until the next creation attempt, still honouring control events.
fn wait_for_retry(state: &Rc<RefCell<TapState>>, running: &AtomicBool) {
    let deadline = Instant::now() + RETRY_INTERVAL;
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        if let Ok(mut state) = state.try_borrow_mut() {
            state.drain_controls();
        }
        thread::sleep(RUN_LOOP_SLICE);
    }
}

fn create_tap<'a>(
    state: Rc<RefCell<TapState>>,
    port: Rc<RefCell<Option<CFMachPort>>>,
) -> Result<CGEventTap<'a>, TapError> {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown],
        move |_proxy, event_type, event: &CGEvent| match event_type {
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                tracing::warn!("Keyboard tap disabled by the system, re-enabling");
                if let Some(port) = port.borrow().as_ref() {
                    unsafe { CGEventTapEnable(port.as_concrete_TypeRef(), true) };
                }
                CallbackResult::Keep
            }
            CGEventType::KeyDown => {
                let Ok(mut state) = state.try_borrow_mut() else {
                    return CallbackResult::Keep;
                };
                state.drain_controls();
                match state.interceptor.handle(&key_event(event)) {
                    Decision::Forward => CallbackResult::Keep,
                    Decision::Suppress => CallbackResult::Drop,
                }
            }
            _ => CallbackResult::Keep,
        },
    )
    .map_err(|_| TapError::CreationFailed)
}

fn key_event(event: &CGEvent) -> KeyEvent {
    let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
    let user_data = event.get_integer_value_field(EventField::EVENT_SOURCE_USER_DATA);
    let flags = Modifiers::from_bits(event.get_flags().bits());
    let text = unicode_string(event);
    KeyEvent::new(key_code, flags, text.as_deref()).with_user_data(user_data)
}

/// Text the key produces under the active layout.
fn unicode_string(event: &CGEvent) -> Option<String> {
    let mut buffer = [0u16; 4];
    let mut length: c_ulong = 0;
    unsafe {
        CGEventKeyboardGetUnicodeString(
            event.as_ptr() as *mut c_void,
            buffer.len() as c_ulong,
            &mut length,
            buffer.as_mut_ptr(),
        );
    }
    let length = (length as usize).min(buffer.len());
    if length == 0 {
        return None;
    }
    String::from_utf16(&buffer[..length]).ok()
}

/// Whether a keyboard tap can be created.
///
/// macOS has no direct query for Input Monitoring; a passive probe tap
/// fails when permission is missing.
pub fn check_permission() -> bool {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    )
    .is_ok()
}
