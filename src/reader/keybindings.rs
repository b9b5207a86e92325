// Keybindings for the strip reader
// Maps toolkit-neutral key and wheel input to reader commands
//
// Keybindings:
// - Left / Right: Previous / next item (single mode)
// - Up / Down: Scroll by 3 units
// - Ctrl + Plus / Ctrl + Minus: Zoom in / out (coarse step)
// - Ctrl + 0: Reset zoom
// - Ctrl + wheel: Zoom in / out (fine step)
// - Wheel: Scroll by 3 units
// - F11: Toggle fullscreen
// - Escape: Leave fullscreen

/// Scroll distance for arrow keys and plain wheel input, in toolkit units.
pub const SCROLL_UNITS: i32 = 3;

/// Keys the reader reacts to. The shell translates its toolkit keyvals into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Plus,
    Minus,
    Zero,
    F11,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true };
}

/// What an input event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Previous,
    Next,
    /// Scroll the viewport by this many units; positive is down.
    /// Scroll position belongs to the toolkit, so the reader hands this back.
    Scroll(i32),
    ZoomIn,
    ZoomOut,
    ZoomInFine,
    ZoomOutFine,
    ResetZoom,
    ToggleFullscreen,
    ExitFullscreen,
}

impl Command {
    /// Whether the toolkit, not the reader, carries this command out.
    pub fn is_toolkit_command(&self) -> bool {
        matches!(
            self,
            Command::Scroll(_) | Command::ToggleFullscreen | Command::ExitFullscreen
        )
    }
}

/// Resolve a key press.
pub fn resolve_key(key: Key, modifiers: Modifiers) -> Option<Command> {
    if modifiers.ctrl {
        return match key {
            Key::Plus => Some(Command::ZoomIn),
            Key::Minus => Some(Command::ZoomOut),
            Key::Zero => Some(Command::ResetZoom),
            _ => None,
        };
    }

    match key {
        Key::Left => Some(Command::Previous),
        Key::Right => Some(Command::Next),
        Key::Up => Some(Command::Scroll(-SCROLL_UNITS)),
        Key::Down => Some(Command::Scroll(SCROLL_UNITS)),
        Key::F11 => Some(Command::ToggleFullscreen),
        Key::Escape => Some(Command::ExitFullscreen),
        _ => None,
    }
}

/// Resolve a wheel event. `delta > 0` is the wheel moving away from the user.
///
/// This is the only wheel handler: with Ctrl held the wheel zooms by the fine
/// step, otherwise it scrolls. The shell must not bind the wheel elsewhere.
pub fn resolve_wheel(delta: f64, modifiers: Modifiers) -> Option<Command> {
    if delta == 0.0 || delta.is_nan() {
        return None;
    }

    let up = delta > 0.0;
    Some(match (modifiers.ctrl, up) {
        (true, true) => Command::ZoomInFine,
        (true, false) => Command::ZoomOutFine,
        (false, true) => Command::Scroll(-SCROLL_UNITS),
        (false, false) => Command::Scroll(SCROLL_UNITS),
    })
}
