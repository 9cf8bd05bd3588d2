//! Keyboard input handling
//!
//! Translates raw keycodes into bindings, bindings into commands, and keeps
//! the set of held pan keys that drive keyboard panning.

use std::collections::HashMap;

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{BindingConfig, Config};

/// Input handling errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid key: {0}")]
    Key(String),
    #[error("Invalid modifier: {0}")]
    Modifier(String),
    #[error("Invalid binding: {0}")]
    Binding(String),
}

bitflags! {
    /// Keyboard modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT     = 0b0000_0001;
        const CTRL      = 0b0000_0010;
        const ALT       = 0b0000_0100;
        const SUPER     = 0b0000_1000;
        const CAPS_LOCK = 0b0001_0000;
        const NUM_LOCK  = 0b0010_0000;

        /// Lock states never take part in binding lookup.
        const LOCKS = Self::CAPS_LOCK.bits() | Self::NUM_LOCK.bits();
    }
}

impl Modifiers {
    fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "shift" => Some(Self::SHIFT),
            "ctrl" | "control" => Some(Self::CTRL),
            "alt" | "mod1" => Some(Self::ALT),
            "super" | "mod4" | "logo" | "win" => Some(Self::SUPER),
            _ => None,
        }
    }

    /// Parse modifiers from a string like "Mod4+Shift"
    pub fn from_str_list(s: &str) -> Result<Self, InputError> {
        s.split('+').try_fold(Self::empty(), |mods, part| {
            Self::parse_name(part)
                .map(|m| mods | m)
                .ok_or_else(|| InputError::Modifier(part.trim().to_string()))
        })
    }
}

/// A key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Key0,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    Escape,
    Tab,
    Space,
    Return,
    Backspace,
    Left,
    Right,
    Up,
    Down,

    /// Unknown/unmapped key
    Unknown(u32),
}

impl KeyCode {
    /// Parse a key name to `KeyCode`
    pub fn from_name(name: &str) -> Result<Self, InputError> {
        let key = match name.to_lowercase().as_str() {
            "a" => Self::A,
            "b" => Self::B,
            "c" => Self::C,
            "d" => Self::D,
            "e" => Self::E,
            "f" => Self::F,
            "g" => Self::G,
            "h" => Self::H,
            "i" => Self::I,
            "j" => Self::J,
            "k" => Self::K,
            "l" => Self::L,
            "m" => Self::M,
            "n" => Self::N,
            "o" => Self::O,
            "p" => Self::P,
            "q" => Self::Q,
            "r" => Self::R,
            "s" => Self::S,
            "t" => Self::T,
            "u" => Self::U,
            "v" => Self::V,
            "w" => Self::W,
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,

            "1" | "key1" => Self::Key1,
            "2" | "key2" => Self::Key2,
            "3" | "key3" => Self::Key3,
            "4" | "key4" => Self::Key4,
            "5" | "key5" => Self::Key5,
            "6" | "key6" => Self::Key6,
            "7" | "key7" => Self::Key7,
            "8" | "key8" => Self::Key8,
            "9" | "key9" => Self::Key9,
            "0" | "key0" => Self::Key0,

            "f1" => Self::F1,
            "f2" => Self::F2,
            "f3" => Self::F3,
            "f4" => Self::F4,
            "f5" => Self::F5,
            "f6" => Self::F6,
            "f7" => Self::F7,
            "f8" => Self::F8,
            "f9" => Self::F9,
            "f10" => Self::F10,
            "f11" => Self::F11,
            "f12" => Self::F12,

            "escape" | "esc" => Self::Escape,
            "tab" => Self::Tab,
            "space" => Self::Space,
            "return" | "enter" => Self::Return,
            "backspace" => Self::Backspace,
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,

            _ => return Err(InputError::Key(name.to_string())),
        };

        Ok(key)
    }

    /// Translate a Linux evdev keycode.
    // This is a simplified mapping, a full keymap would go through xkbcommon.
    pub const fn from_evdev(keycode: u32) -> Self {
        match keycode {
            16 => Self::Q,
            17 => Self::W,
            18 => Self::E,
            19 => Self::R,
            20 => Self::T,
            21 => Self::Y,
            22 => Self::U,
            23 => Self::I,
            24 => Self::O,
            25 => Self::P,
            30 => Self::A,
            31 => Self::S,
            32 => Self::D,
            33 => Self::F,
            34 => Self::G,
            35 => Self::H,
            36 => Self::J,
            37 => Self::K,
            38 => Self::L,
            44 => Self::Z,
            45 => Self::X,
            46 => Self::C,
            47 => Self::V,
            48 => Self::B,
            49 => Self::N,
            50 => Self::M,
            2 => Self::Key1,
            3 => Self::Key2,
            4 => Self::Key3,
            5 => Self::Key4,
            6 => Self::Key5,
            7 => Self::Key6,
            8 => Self::Key7,
            9 => Self::Key8,
            10 => Self::Key9,
            11 => Self::Key0,
            1 => Self::Escape,
            28 => Self::Return,
            57 => Self::Space,
            14 => Self::Backspace,
            15 => Self::Tab,
            103 => Self::Up,
            108 => Self::Down,
            105 => Self::Left,
            106 => Self::Right,
            59 => Self::F1,
            60 => Self::F2,
            61 => Self::F3,
            62 => Self::F4,
            63 => Self::F5,
            64 => Self::F6,
            65 => Self::F7,
            66 => Self::F8,
            67 => Self::F9,
            68 => Self::F10,
            87 => Self::F11,
            88 => Self::F12,
            other => Self::Unknown(other),
        }
    }
}

/// A key binding (modifiers + key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

impl KeyBinding {
    pub const fn new(modifiers: Modifiers, key: KeyCode) -> Self {
        Self { modifiers, key }
    }

    /// Parse a binding string like "Alt+Shift+Left"
    pub fn parse(s: &str) -> Result<Self, InputError> {
        let mut modifiers = Modifiers::empty();
        let mut key_part: Option<&str> = None;

        for part in s.split('+').map(str::trim) {
            if let Some(m) = Modifiers::parse_name(part) {
                modifiers.insert(m);
            } else if key_part.replace(part).is_some() {
                return Err(InputError::Binding(s.to_string()));
            }
        }

        match key_part {
            Some(k) => Ok(Self::new(modifiers, KeyCode::from_name(k)?)),
            None => Err(InputError::Binding(s.to_string())),
        }
    }
}

/// Direction the desktop content moves while a pan key is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

impl PanDirection {
    /// Viewport offset change for one step.
    pub fn delta(self, step: f64) -> (f64, f64) {
        match self {
            Self::Left => (step, 0.0),
            Self::Right => (-step, 0.0),
            Self::Up => (0.0, step),
            Self::Down => (0.0, -step),
        }
    }
}

/// Command to execute from a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    /// Raise and focus the back-most toplevel
    FocusNext,
    Pan(PanDirection),
    Unknown(String),
}

impl Command {
    /// Parse a command string
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let parts: Vec<&str> = s.splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map_or("", |s| s.trim());

        match cmd.as_str() {
            "exit" => Self::Exit,
            "focus" => match args.to_lowercase().as_str() {
                "next" => Self::FocusNext,
                _ => Self::Unknown(s.to_string()),
            },
            "pan" => match args.to_lowercase().as_str() {
                "left" => Self::Pan(PanDirection::Left),
                "right" => Self::Pan(PanDirection::Right),
                "up" => Self::Pan(PanDirection::Up),
                "down" => Self::Pan(PanDirection::Down),
                _ => Self::Unknown(s.to_string()),
            },
            _ => Self::Unknown(s.to_string()),
        }
    }
}

/// What to do with a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A compositor binding matched; the client never sees the key.
    Command(Command),
    /// Pass the key on to the focused client.
    Forward,
}

/// Input state manager
#[derive(Debug)]
pub struct InputRouter {
    bindings: HashMap<KeyBinding, Command>,
    /// Modifier that must be held for any binding to fire
    accelerator: Modifiers,
    /// Current modifier state
    pub modifiers: Modifiers,
    /// Pan keys currently held, by raw keycode
    held: Vec<(u32, PanDirection)>,
}

impl InputRouter {
    pub fn new(config: &Config) -> Self {
        let accelerator = Modifiers::from_str_list(&config.general.accelerator).unwrap_or_else(|e| {
            warn!("{}, falling back to Alt", e);
            Modifiers::ALT
        });
        let mut router = Self {
            bindings: HashMap::new(),
            accelerator,
            modifiers: Modifiers::empty(),
            held: Vec::new(),
        };
        router.load_bindings(&config.bindings);
        router
    }

    /// Load bindings from configuration
    pub fn load_bindings(&mut self, bindings: &[BindingConfig]) {
        for binding_config in bindings {
            match KeyBinding::parse(&binding_config.keys) {
                Ok(key_binding) => {
                    let command = Command::parse(&binding_config.command);
                    self.bindings.insert(key_binding, command);
                }
                Err(e) => warn!("Skipping binding {:?}: {}", binding_config.keys, e),
            }
        }
    }

    /// Update modifier state
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Handle a raw key event.
    pub fn key(&mut self, keycode: u32, pressed: bool) -> KeyOutcome {
        if !pressed {
            self.held.retain(|&(code, _)| code != keycode);
            return KeyOutcome::Forward;
        }
        if !self.modifiers.contains(self.accelerator) {
            return KeyOutcome::Forward;
        }

        let modifiers = self.modifiers - Modifiers::LOCKS;
        let binding = KeyBinding::new(modifiers, KeyCode::from_evdev(keycode));
        match self.bindings.get(&binding) {
            Some(Command::Unknown(cmd)) => {
                warn!("Ignoring unknown command {:?}", cmd);
                KeyOutcome::Forward
            }
            Some(command) => {
                if let Command::Pan(direction) = *command {
                    if !self.held.iter().any(|&(code, _)| code == keycode) {
                        self.held.push((keycode, direction));
                    }
                }
                debug!("Binding {:?} -> {:?}", binding, command);
                KeyOutcome::Command(command.clone())
            }
            None => KeyOutcome::Forward,
        }
    }

    pub fn is_panning(&self) -> bool {
        !self.held.is_empty()
    }

    /// Sum of one step in every held direction.
    pub fn pan_delta(&self, step: f64) -> (f64, f64) {
        self.held.iter().fold((0.0, 0.0), |(x, y), &(_, dir)| {
            let (dx, dy) = dir.delta(step);
            (x + dx, y + dy)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ESC: u32 = 1;
    const KEY_LEFT: u32 = 105;
    const KEY_UP: u32 = 103;

    fn router() -> InputRouter {
        let mut router = InputRouter::new(&Config::default());
        router.set_modifiers(Modifiers::ALT);
        router
    }

    #[test]
    fn test_key_binding_parse() {
        let binding = KeyBinding::parse("Mod4+Return").unwrap();
        assert!(binding.modifiers.contains(Modifiers::SUPER));
        assert_eq!(binding.key, KeyCode::Return);

        let binding = KeyBinding::parse("Alt+Shift+q").unwrap();
        assert!(binding.modifiers.contains(Modifiers::ALT));
        assert!(binding.modifiers.contains(Modifiers::SHIFT));
        assert_eq!(binding.key, KeyCode::Q);

        assert!(KeyBinding::parse("Alt+Shift").is_err());
        assert!(KeyBinding::parse("Alt+q+w").is_err());
        assert_eq!(KeyBinding::parse("Alt+Nope"), Err(InputError::Key("Nope".into())));
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse("focus next"), Command::FocusNext);
        assert_eq!(Command::parse("pan Left"), Command::Pan(PanDirection::Left));
        assert!(matches!(Command::parse("pan sideways"), Command::Unknown(_)));
    }

    #[test]
    fn test_modifiers() {
        let mods = Modifiers::from_str_list("Mod4+Shift").unwrap();
        assert!(mods.contains(Modifiers::SUPER));
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::CTRL));
        assert!(Modifiers::from_str_list("Hyper").is_err());
    }

    #[test]
    fn bindings_need_the_accelerator() {
        let mut router = router();
        assert_eq!(router.key(KEY_ESC, true), KeyOutcome::Command(Command::Exit));

        router.set_modifiers(Modifiers::empty());
        assert_eq!(router.key(KEY_ESC, true), KeyOutcome::Forward);
    }

    #[test]
    fn lock_modifiers_do_not_block_bindings() {
        let mut router = router();
        router.set_modifiers(Modifiers::ALT | Modifiers::CAPS_LOCK);
        assert_eq!(router.key(KEY_ESC, true), KeyOutcome::Command(Command::Exit));

        router.set_modifiers(Modifiers::ALT | Modifiers::NUM_LOCK | Modifiers::CAPS_LOCK);
        assert_eq!(router.key(KEY_ESC, true), KeyOutcome::Command(Command::Exit));
    }

    #[test]
    fn release_clears_held_pan_key() {
        let mut router = router();
        router.key(KEY_LEFT, true);
        router.key(KEY_UP, true);
        assert_eq!(router.pan_delta(10.0), (10.0, 10.0));

        router.set_modifiers(Modifiers::empty());
        assert_eq!(router.key(KEY_LEFT, false), KeyOutcome::Forward);
        assert_eq!(router.pan_delta(10.0), (0.0, 10.0));
        router.key(KEY_UP, false);
        assert!(!router.is_panning());
    }
}
