use std::fmt;
use std::str::FromStr;

/// Named keys and their virtual-key codes. Letters, digits and F-keys are
/// derived in [`KeyCode::from_str`].
static NAMED_KEYS: &[(&str, u16)] = &[
    ("backspace", 0x08),
    ("tab", 0x09),
    ("enter", 0x0D),
    ("return", 0x0D),
    ("shift", 0x10),
    ("ctrl", 0x11),
    ("control", 0x11),
    ("alt", 0x12),
    ("menu", 0x12),
    ("pause", 0x13),
    ("capslock", 0x14),
    ("escape", 0x1B),
    ("esc", 0x1B),
    ("space", 0x20),
    ("pageup", 0x21),
    ("pagedown", 0x22),
    ("end", 0x23),
    ("home", 0x24),
    ("left", 0x25),
    ("up", 0x26),
    ("right", 0x27),
    ("down", 0x28),
    ("insert", 0x2D),
    ("delete", 0x2E),
    ("lwin", 0x5B),
    ("rwin", 0x5C),
    ("numlock", 0x90),
    ("scrolllock", 0x91),
    ("lshift", 0xA0),
    ("rshift", 0xA1),
    ("lctrl", 0xA2),
    ("rctrl", 0xA3),
    ("lalt", 0xA4),
    ("ralt", 0xA5),
];

const VK_F1: u16 = 0x70;

/// Virtual-key code bound to the gate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(u16);

impl KeyCode {
    pub const SPACE: KeyCode = KeyCode(0x20);

    pub fn from_code(code: u16) -> Option<Self> {
        (1..=0xFE).contains(&code).then_some(Self(code))
    }

    pub fn code(self) -> u16 {
        self.0
    }

    /// Preferred human-readable name, if the code has one.
    pub fn name(self) -> Option<String> {
        let code = self.0;
        if let Some((name, _)) = NAMED_KEYS.iter().find(|(_, vk)| *vk == code) {
            return Some((*name).to_string());
        }
        match code {
            0x30..=0x39 | 0x41..=0x5A => Some(char::from(code as u8).to_ascii_lowercase().to_string()),
            c if (VK_F1..VK_F1 + 24).contains(&c) => Some(format!("f{}", c - VK_F1 + 1)),
            _ => None,
        }
    }
}

impl Default for KeyCode {
    fn default() -> Self {
        Self::SPACE
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl FromStr for KeyCode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err("key must not be empty".to_string());
        }
        if let Some((_, code)) = NAMED_KEYS.iter().find(|(name, _)| *name == key) {
            return Ok(Self(*code));
        }
        let mut chars = key.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                return Ok(Self(u16::from(ch.to_ascii_uppercase() as u8)));
            }
        }
        if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
            if (1..=24).contains(&n) {
                return Ok(Self(VK_F1 + n - 1));
            }
        }
        let numeric = match key.strip_prefix("0x") {
            Some(hex) => u16::from_str_radix(hex, 16).ok(),
            None => key.parse::<u16>().ok(),
        };
        numeric
            .and_then(Self::from_code)
            .ok_or_else(|| format!("unknown key '{raw}'"))
    }
}
