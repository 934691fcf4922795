//! Modifier tracking over raw OS key events

use rdev::{Event, EventType, Key};

use crate::hotkey::{ChordModifiers, QuitChord};

/// Held state of each modifier, left and right tracked separately so that
/// releasing one side does not clear a modifier still held on the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierTracker {
    ctrl: [bool; 2],
    shift: [bool; 2],
    alt: bool,
    alt_gr: bool,
    super_key: [bool; 2],
}

impl ModifierTracker {
    /// Update from a press or release. Returns true if the key was a modifier.
    pub fn update(&mut self, key: Key, down: bool) -> bool {
        match key {
            Key::ControlLeft => self.ctrl[0] = down,
            Key::ControlRight => self.ctrl[1] = down,
            Key::ShiftLeft => self.shift[0] = down,
            Key::ShiftRight => self.shift[1] = down,
            Key::Alt => self.alt = down,
            Key::AltGr => self.alt_gr = down,
            Key::MetaLeft => self.super_key[0] = down,
            Key::MetaRight => self.super_key[1] = down,
            _ => return false,
        }
        true
    }

    /// Modifiers as a chord sees them. Windows reports AltGr as a synthetic
    /// left Ctrl plus AltGr, so Ctrl does not count while AltGr is down.
    pub fn held(&self) -> ChordModifiers {
        ChordModifiers {
            ctrl: self.ctrl.contains(&true) && !self.alt_gr,
            shift: self.shift.contains(&true),
            alt: self.alt,
            super_key: self.super_key.contains(&true),
        }
    }
}

/// Watches the raw key stream for any configured quit chord
#[derive(Debug, Clone)]
pub struct QuitDetector {
    chords: Vec<QuitChord>,
    modifiers: ModifierTracker,
}

impl QuitDetector {
    pub fn new(chords: Vec<QuitChord>) -> Self {
        Self {
            chords,
            modifiers: ModifierTracker::default(),
        }
    }

    #[cfg(test)]
    pub fn modifiers(&self) -> &ModifierTracker {
        &self.modifiers
    }

    /// Feed one OS event. Returns true when a quit chord was completed.
    /// Mouse events and keys that match no chord are ignored.
    pub fn on_event(&mut self, event: &Event) -> bool {
        match event.event_type {
            EventType::KeyPress(key) => {
                if self.modifiers.update(key, true) {
                    return false;
                }
                let Some(pressed) = typed_key(key, event.name.as_deref()) else {
                    return false;
                };
                let held = self.modifiers.held();
                self.chords
                    .iter()
                    .any(|chord| chord.key == pressed && chord.modifiers.satisfied_by(held))
            }
            EventType::KeyRelease(key) => {
                self.modifiers.update(key, false);
                false
            }
            _ => false,
        }
    }
}

/// Chord key for a press, taken from the character the active layout produced.
/// With Ctrl held the OS reports control characters, 0x01..=0x1A for A..Z.
/// Only when the hook could not translate the key is the physical key used.
fn typed_key(key: Key, name: Option<&str>) -> Option<char> {
    let Some(name) = name else {
        return chord_key(key);
    };
    let mut chars = name.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return None,
    };
    match c {
        '\u{1}'..='\u{1a}' => Some((b'A' + (c as u8 - 1)) as char),
        c if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// Letter or digit printed on a US-layout key
fn chord_key(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'A',
        Key::KeyB => 'B',
        Key::KeyC => 'C',
        Key::KeyD => 'D',
        Key::KeyE => 'E',
        Key::KeyF => 'F',
        Key::KeyG => 'G',
        Key::KeyH => 'H',
        Key::KeyI => 'I',
        Key::KeyJ => 'J',
        Key::KeyK => 'K',
        Key::KeyL => 'L',
        Key::KeyM => 'M',
        Key::KeyN => 'N',
        Key::KeyO => 'O',
        Key::KeyP => 'P',
        Key::KeyQ => 'Q',
        Key::KeyR => 'R',
        Key::KeyS => 'S',
        Key::KeyT => 'T',
        Key::KeyU => 'U',
        Key::KeyV => 'V',
        Key::KeyW => 'W',
        Key::KeyX => 'X',
        Key::KeyY => 'Y',
        Key::KeyZ => 'Z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::parse_chords;
    use std::time::SystemTime;

    fn detector() -> QuitDetector {
        QuitDetector::new(parse_chords(&["Ctrl+Q", "Super+Q"]).unwrap())
    }

    fn event(event_type: EventType, name: Option<&str>) -> Event {
        Event {
            time: SystemTime::now(),
            name: name.map(str::to_string),
            event_type,
        }
    }

    fn press(key: Key, name: Option<&str>) -> Event {
        event(EventType::KeyPress(key), name)
    }

    fn release(key: Key) -> Event {
        event(EventType::KeyRelease(key), None)
    }

    #[test]
    fn test_ctrl_q_detected() {
        let mut d = detector();
        assert!(!d.on_event(&press(Key::ControlLeft, None)));
        assert!(d.on_event(&press(Key::KeyQ, Some("\u{11}"))));
    }

    #[test]
    fn test_right_side_and_meta() {
        let mut d = detector();
        d.on_event(&press(Key::ControlRight, None));
        assert!(d.on_event(&press(Key::KeyQ, Some("\u{11}"))));
        d.on_event(&release(Key::ControlRight));

        d.on_event(&press(Key::MetaLeft, None));
        assert!(d.on_event(&press(Key::KeyQ, Some("q"))));
    }

    #[test]
    fn test_q_alone_ignored() {
        let mut d = detector();
        assert!(!d.on_event(&press(Key::KeyQ, Some("q"))));
        assert!(!d.on_event(&press(Key::ShiftLeft, None)));
        assert!(!d.on_event(&press(Key::KeyQ, Some("Q"))));
    }

    #[test]
    fn test_release_clears_modifier() {
        let mut d = detector();
        d.on_event(&press(Key::ControlLeft, None));
        d.on_event(&release(Key::ControlLeft));
        assert!(!d.modifiers().held().ctrl);
        assert!(!d.on_event(&press(Key::KeyQ, Some("q"))));
    }

    #[test]
    fn test_one_side_released_other_held() {
        let mut tracker = ModifierTracker::default();
        tracker.update(Key::ControlLeft, true);
        tracker.update(Key::ControlRight, true);
        tracker.update(Key::ControlLeft, false);
        assert!(tracker.held().ctrl);
        tracker.update(Key::ControlRight, false);
        assert!(tracker.held().is_empty());
    }

    #[test]
    fn test_non_character_keys_ignored() {
        let mut d = detector();
        d.on_event(&press(Key::ControlLeft, None));
        assert!(!d.on_event(&press(Key::F1, None)));
        assert!(!d.on_event(&press(Key::Escape, Some("\u{1b}"))));
        assert!(!d.on_event(&event(EventType::MouseMove { x: 1.0, y: 2.0 }, None)));
        assert!(!d.on_event(&release(Key::Unknown(999))));
        assert!(d.modifiers().held().ctrl);
    }

    #[test]
    fn test_altgr_does_not_count_as_ctrl() {
        // German layout: AltGr+Q types '@', arriving as LCtrl + AltGr + Q
        let mut d = detector();
        d.on_event(&press(Key::ControlLeft, None));
        d.on_event(&press(Key::AltGr, None));
        assert!(!d.modifiers().held().ctrl);
        assert!(!d.on_event(&press(Key::KeyQ, Some("@"))));

        d.on_event(&release(Key::AltGr));
        assert!(d.on_event(&press(Key::KeyQ, Some("\u{11}"))));
    }

    #[test]
    fn test_layout_character_wins_over_physical_key() {
        // AZERTY: the key in the US 'Q' position types 'a', and 'q' sits on KeyA
        let mut d = detector();
        d.on_event(&press(Key::ControlLeft, None));
        assert!(!d.on_event(&press(Key::KeyQ, Some("\u{1}"))));
        assert!(!d.on_event(&press(Key::KeyQ, Some("a"))));
        assert!(d.on_event(&press(Key::KeyA, Some("\u{11}"))));
        assert!(d.on_event(&press(Key::KeyA, Some("q"))));
    }

    #[test]
    fn test_untranslated_key_uses_physical_position() {
        let mut d = detector();
        d.on_event(&press(Key::ControlLeft, None));
        assert!(d.on_event(&press(Key::KeyQ, None)));
        assert!(!d.on_event(&press(Key::KeyW, None)));
    }

    #[test]
    fn test_typed_key_mapping() {
        assert_eq!(typed_key(Key::KeyQ, Some("\u{11}")), Some('Q'));
        assert_eq!(typed_key(Key::KeyZ, Some("\u{1a}")), Some('Z'));
        assert_eq!(typed_key(Key::Num7, Some("7")), Some('7'));
        assert_eq!(typed_key(Key::KeyQ, Some("")), None);
        assert_eq!(typed_key(Key::KeyQ, Some("qq")), None);
        assert_eq!(typed_key(Key::Num2, Some("é")), None);
    }
}
