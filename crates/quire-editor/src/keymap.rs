//! Keyboard input types and key bindings.
//!
//! Bindings are written as strings like `Shift-Mod-z`. `Mod` is the
//! platform's primary modifier: Cmd on Mac, Ctrl elsewhere. Matching an
//! incoming [`KeyCombo`] resolves `Mod` against the editor's platform.

use std::fmt;
use std::str::FromStr;

use quire_model::Attrs;
use smol_str::SmolStr;

/// Key values for keyboard input.
///
/// Platform code converts native key events to this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key. Letters are compared case-insensitively.
    Character(SmolStr),

    Backspace,
    Delete,
    Enter,
    Tab,
    Space,

    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,

    Alt,
    Control,
    Meta,
    Shift,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft | Self::ArrowRight | Self::ArrowUp | Self::ArrowDown
        )
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Alt | Self::Control | Self::Meta | Self::Shift)
    }

    fn named(name: &str) -> Option<Self> {
        Some(match name {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Space" => Self::Space,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            _ => return None,
        })
    }

    fn same_key(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Character(a), Key::Character(b)) => a.to_lowercase() == b.to_lowercase(),
            (Key::Character(c), Key::Space) | (Key::Space, Key::Character(c)) => c == " ",
            _ => self == other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Character(c) => f.write_str(c),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        shift: true,
        ..Self::NONE
    };

    pub const META_SHIFT: Self = Self {
        meta: true,
        shift: true,
        ..Self::NONE
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    fn union(self, other: Self) -> Self {
        Self {
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
            shift: self.shift || other.shift,
            meta: self.meta || other.meta,
        }
    }
}

/// A pressed key with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn meta(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::META)
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self::with_modifiers(key, Modifiers::primary(is_mac))
    }

    pub fn primary_shift(key: Key, is_mac: bool) -> Self {
        Self::with_modifiers(key, Modifiers::primary(is_mac).union(Modifiers::SHIFT))
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// A bound command applied, prevent default.
    Handled,
    /// No binding applied, let the platform handle it.
    NotHandled,
    /// Navigation and bare modifier keys are never bound.
    PassThrough,
}

/// A parsed binding such as `Shift-Mod-z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub key: Key,
    pub modifiers: Modifiers,
    /// The binding used `Mod`.
    pub primary: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid key binding `{0}`")]
pub struct KeySpecError(pub SmolStr);

impl FromStr for KeySpec {
    type Err = KeySpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeySpecError(s.into());
        // A trailing `-` is the minus key itself.
        let (mods, key) = match s.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None if s == "-" => ("", "-"),
            None => match s.rsplit_once('-') {
                Some((mods, key)) => (mods, key),
                None => ("", s),
            },
        };
        if key.is_empty() {
            return Err(err());
        }
        let mut modifiers = Modifiers::NONE;
        let mut primary = false;
        for part in mods.split('-').filter(|p| !p.is_empty()) {
            match part {
                "Mod" => primary = true,
                "Ctrl" | "Control" => modifiers.ctrl = true,
                "Alt" => modifiers.alt = true,
                "Shift" => modifiers.shift = true,
                "Meta" | "Cmd" => modifiers.meta = true,
                _ => return Err(err()),
            }
        }
        let key = match Key::named(key) {
            Some(named) => named,
            None if key.chars().count() == 1 => Key::character(key),
            None => return Err(err()),
        };
        Ok(Self {
            key,
            modifiers,
            primary,
        })
    }
}

impl fmt::Display for KeySpec {
    /// Canonical order: `Mod-Ctrl-Alt-Shift-Meta-key`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            f.write_str("Mod-")?;
        }
        if self.modifiers.ctrl {
            f.write_str("Ctrl-")?;
        }
        if self.modifiers.alt {
            f.write_str("Alt-")?;
        }
        if self.modifiers.shift {
            f.write_str("Shift-")?;
        }
        if self.modifiers.meta {
            f.write_str("Meta-")?;
        }
        write!(f, "{}", self.key)
    }
}

impl KeySpec {
    /// Whether `combo` triggers this binding on the given platform.
    pub fn matches(&self, combo: &KeyCombo, is_mac: bool) -> bool {
        let wanted = if self.primary {
            self.modifiers.union(Modifiers::primary(is_mac))
        } else {
            self.modifiers
        };
        wanted == combo.modifiers && self.key.same_key(&combo.key)
    }
}

/// One binding: a key spec and the command it invokes.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub spec: KeySpec,
    pub command: SmolStr,
    pub attrs: Attrs,
}

impl KeyBinding {
    pub fn new(spec: &str, command: impl Into<SmolStr>) -> Result<Self, KeySpecError> {
        Ok(Self {
            spec: spec.parse()?,
            command: command.into(),
            attrs: Attrs::new(),
        })
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Bindings in registration order.
///
/// A key may be bound more than once. The bindings are tried in order
/// until a command applies, so the first registered binding wins when
/// several would apply.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, binding: KeyBinding) {
        if self
            .bindings
            .iter()
            .any(|b| b.spec == binding.spec && b.command == binding.command && b.attrs == binding.attrs)
        {
            return;
        }
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings triggered by `combo`, in registration order.
    pub fn lookup<'a>(&'a self, combo: &'a KeyCombo, is_mac: bool) -> impl Iterator<Item = &'a KeyBinding> + 'a {
        self.bindings
            .iter()
            .filter(move |b| b.spec.matches(combo, is_mac))
    }
}
