//! Frontmost application, activation notifications and the main run loop.
//!
//! AppKit delivers workspace notifications only while the main run loop
//! turns, so the agent pumps it from its main loop.

use block2::RcBlock;
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, NSObjectProtocol, ProtocolObject};
use objc2_app_kit::{
    NSRunningApplication, NSWorkspace, NSWorkspaceApplicationKey,
    NSWorkspaceDidActivateApplicationNotification,
};
use objc2_foundation::{NSBundle, NSNotification, NSNotificationCenter};
use std::ptr::NonNull;
use std::time::Duration;

/// Bundle identifier of the frontmost application.
pub fn frontmost_bundle_id() -> Option<String> {
    let workspace = unsafe { NSWorkspace::sharedWorkspace() };
    let app = unsafe { workspace.frontmostApplication() }?;
    let bundle_id = unsafe { app.bundleIdentifier() }?;
    Some(bundle_id.to_string())
}

/// Process id of the frontmost application.
pub fn frontmost_pid() -> Option<i32> {
    let workspace = unsafe { NSWorkspace::sharedWorkspace() };
    let app = unsafe { workspace.frontmostApplication() }?;
    let pid = unsafe { app.processIdentifier() };
    (pid > 0).then_some(pid)
}

/// Bundle identifier of this process, when it runs from an app bundle.
pub fn self_bundle_id() -> Option<String> {
    let bundle = unsafe { NSBundle::mainBundle() };
    unsafe { bundle.bundleIdentifier() }.map(|id| id.to_string())
}

/// Run the current thread's run loop for at most `timeout`.
pub fn pump_run_loop(timeout: Duration) {
    CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, timeout, true);
}

/// Calls back with the bundle id of every newly activated application.
///
/// Install on the main thread. Removed from the workspace notification
/// center on drop.
pub struct AppActivationObserver {
    center: Retained<NSNotificationCenter>,
    token: Retained<ProtocolObject<dyn NSObjectProtocol>>,
}

impl AppActivationObserver {
    pub fn install(on_activate: impl Fn(Option<String>) + 'static) -> Self {
        let workspace = unsafe { NSWorkspace::sharedWorkspace() };
        let center = unsafe { workspace.notificationCenter() };

        let block = RcBlock::new(move |note: NonNull<NSNotification>| {
            let note = unsafe { note.as_ref() };
            on_activate(activated_bundle_id(note).or_else(frontmost_bundle_id));
        });
        let token = unsafe {
            center.addObserverForName_object_queue_usingBlock(
                Some(NSWorkspaceDidActivateApplicationNotification),
                None,
                None,
                &block,
            )
        };
        tracing::debug!("Observing application activation");

        Self { center, token }
    }
}

impl Drop for AppActivationObserver {
    fn drop(&mut self) {
        let observer: &AnyObject = AsRef::<AnyObject>::as_ref(&*self.token);
        unsafe { self.center.removeObserver(observer) };
    }
}

/// The app named in the notification's `NSWorkspaceApplicationKey` entry.
fn activated_bundle_id(note: &NSNotification) -> Option<String> {
    let info = unsafe { note.userInfo() }?;
    let key: &AnyObject = unsafe { NSWorkspaceApplicationKey };
    let app = unsafe { info.objectForKey(key) }?;
    let app = app.downcast_ref::<NSRunningApplication>()?;
    unsafe { app.bundleIdentifier() }.map(|id| id.to_string())
}
