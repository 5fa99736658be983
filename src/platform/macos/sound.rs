//! Toggle feedback sounds.

use objc2::rc::Retained;
use objc2_app_kit::NSSound;
use objc2_foundation::NSString;

/// System sound name for the enable or disable cue.
fn toggle_sound_name(enabled: bool) -> &'static str {
    if enabled {
        "Tink"
    } else {
        "Pop"
    }
}

/// Plays the enable/disable cue through `NSSound`, one at a time.
///
/// Lives on the main thread.
#[derive(Default)]
pub struct SoundPlayer {
    current: Option<Retained<NSSound>>,
}

impl SoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_toggle(&mut self, enabled: bool) {
        self.stop();
        let name = NSString::from_str(toggle_sound_name(enabled));
        let Some(sound) = (unsafe { NSSound::soundNamed(&name) }) else {
            tracing::debug!(name = %name, "Toggle sound not found");
            return;
        };
        if !unsafe { sound.play() } {
            tracing::debug!(name = %name, "Could not play toggle sound");
        }
        self.current = Some(sound);
    }

    /// Stop the sound still playing, if any.
    pub fn stop(&mut self) {
        if let Some(sound) = self.current.take() {
            if unsafe { sound.isPlaying() } {
                unsafe { sound.stop() };
            }
        }
    }
}

impl Drop for SoundPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
