use std::fmt;

/// Keyboard key identifier.
///
/// Letters, arrows and a few controls are named; anything else maps to
/// `Key::Unknown` carrying the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Space,
    Shift,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    /// Fullscreen toggle.
    F11,
    Unknown(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse wheel delta.
///
/// `Line` is notched wheel input; `Pixel` comes from touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

impl MouseWheelDelta {
    /// Pixel deltas are folded into lines at this rate.
    pub const PIXELS_PER_LINE: f32 = 40.0;

    /// Vertical component in lines, positive away from the user.
    pub fn lines_y(self) -> f32 {
        match self {
            Self::Line { y, .. } => y,
            Self::Pixel { y, .. } => y / Self::PIXELS_PER_LINE,
        }
    }
}

/// Platform-agnostic input events emitted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        state: KeyState,
        /// True when the event is an OS key-repeat.
        repeat: bool,
    },

    /// Pointer position in logical pixels, origin top-left.
    PointerMoved { x: f32, y: f32 },

    /// Pointer left the window surface.
    PointerLeft,

    MouseWheel(MouseWheelDelta),

    Focused(bool),
}

impl InputEvent {
    /// True for a non-repeat press of `key`.
    pub fn is_press(&self, key: Key) -> bool {
        matches!(
            self,
            InputEvent::Key { key: k, state: KeyState::Pressed, repeat: false } if *k == key
        )
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
