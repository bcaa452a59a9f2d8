use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Current input state for the window.
///
/// Holds "is down" information and the pointer position. Per-frame
/// transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,

    /// Pointer position in logical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies an event to the current state and records it in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are not delivered while unfocused.
                    self.keys_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::MouseWheel(delta) => {
                frame.scroll_lines += delta.lines_y();
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, repeat: false }
    }

    #[test]
    fn press_and_release_track_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        assert!(state.key_down(Key::W));
        assert!(frame.keys_pressed.contains(&Key::W));

        state.apply_event(&mut frame, key(Key::W, KeyState::Released));
        assert!(!state.key_down(Key::W));
        assert!(frame.keys_released.contains(&Key::W));
        assert_eq!(frame.events.len(), 2);
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::A, KeyState::Pressed));
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());
    }

    #[test]
    fn wheel_accumulates_lines() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 0.0, y: 80.0 }));
        assert_eq!(frame.scroll_lines, 3.0);
        frame.clear();
        assert_eq!(frame.scroll_lines, 0.0);
    }
}
