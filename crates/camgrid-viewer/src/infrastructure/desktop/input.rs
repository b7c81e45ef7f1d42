//! Translation of winit input into viewer terms.

use std::time::{Duration, Instant};

use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};

use crate::application::keys::{Key, KeyPress};

/// Two clicks on the same window closer than this make a double click.
pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);

/// Maps a logical winit key to a [`KeyPress`].  Keys the viewer never binds
/// return `None`.
///
/// Some platforms report `Ctrl+<letter>` as the ASCII control character;
/// it is folded back to the letter.
pub fn key_press(key: &WinitKey, modifiers: ModifiersState) -> Option<KeyPress> {
    let ctrl = modifiers.control_key();
    let key = match key {
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Character(text) => {
            let c = text.chars().next()?;
            if ctrl && ('\u{1}'..='\u{1a}').contains(&c) {
                Key::Char(char::from(c as u8 + b'a' - 1))
            } else {
                Key::Char(c)
            }
        }
        _ => return None,
    };
    Some(KeyPress { key, ctrl })
}

/// Turns single clicks into double clicks.
///
/// winit reports button presses only; a second press on the same target
/// within [`DOUBLE_CLICK_INTERVAL`] completes a double click.
#[derive(Debug, Clone)]
pub struct ClickTracker<K> {
    last: Option<(K, Instant)>,
}

impl<K: Copy + PartialEq> Default for ClickTracker<K> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<K: Copy + PartialEq> ClickTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press on `target` at `now`.  Returns `true` if it completes
    /// a double click; the pair is then consumed.
    pub fn press(&mut self, target: K, now: Instant) -> bool {
        match self.last {
            Some((previous, at))
                if previous == target
                    && now.saturating_duration_since(at) <= DOUBLE_CLICK_INTERVAL =>
            {
                self.last = None;
                true
            }
            _ => {
                self.last = Some((target, now));
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
