//! Gender registry entries.

use super::{RegistryEntry, RegistryEntryKey};
use crate::LineageError;
use std::fmt;
use std::str::FromStr;

/// A display color written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LineageError::InvalidArgument(format!("color '{s}' is not #RRGGBB"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A gender a person can be recorded with.
///
/// Builtin genders carry no label (their display text comes from the
/// presentation layer) and may have their color overridden without
/// becoming user entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gender {
    key: RegistryEntryKey,
    label: Option<String>,
    color: Color,
}

impl Gender {
    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Relabel a user gender. Builtin genders are not relabeled.
    pub fn set_label(&mut self, label: impl Into<String>) -> Result<(), LineageError> {
        if self.key.is_builtin() {
            return Err(LineageError::BuiltinProtected(self.key.clone()));
        }
        self.label = Some(require_label(Some(label.into()))?);
        Ok(())
    }
}

pub(super) fn require_label(label: Option<String>) -> Result<String, LineageError> {
    match label {
        Some(label) if !label.trim().is_empty() => Ok(label),
        _ => Err(LineageError::InvalidArgument(
            "user registry entries need a non-empty label".to_string(),
        )),
    }
}

const BUILTIN_GENDERS: [(&str, Color); 5] = [
    ("female", Color::rgb(0xE8, 0x46, 0x7C)),
    ("male", Color::rgb(0x3D, 0x7F, 0xE0)),
    ("agender", Color::rgb(0xA0, 0xA0, 0xA0)),
    ("gender_fluid", Color::rgb(0xC8, 0x6D, 0xD7)),
    ("non_binary", Color::rgb(0xF4, 0xD0, 0x3F)),
];

impl RegistryEntry for Gender {
    type BuildArgs = Color;

    fn builtins() -> Vec<Self> {
        BUILTIN_GENDERS
            .iter()
            .map(|&(name, color)| Self {
                key: RegistryEntryKey::builtin_static(name),
                label: None,
                color,
            })
            .collect()
    }

    fn build(key: RegistryEntryKey, label: Option<String>, color: Color) -> Result<Self, LineageError> {
        Ok(Self {
            key,
            label: Some(require_label(label)?),
            color,
        })
    }

    fn key(&self) -> &RegistryEntryKey {
        &self.key
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn differs_from(&self, default: &Self) -> bool {
        self.color != default.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::GenderRegistry;

    #[test]
    fn color_parse_and_format() {
        let color: Color = "#aa00Aa".parse().expect("color");
        assert_eq!(color, Color::rgb(0xAA, 0x00, 0xAA));
        assert_eq!(color.to_string(), "#AA00AA");
    }

    #[test]
    fn color_rejects_malformed_values() {
        for bad in ["AA00AA", "#AA00A", "#AA00AAF", "#GG0000", "", "#"] {
            assert!(
                matches!(bad.parse::<Color>(), Err(LineageError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn user_gender_needs_label() {
        let mut registry = GenderRegistry::new();
        let key = RegistryEntryKey::user("crimson").expect("key");
        assert!(matches!(
            registry.register(key.clone(), None, Color::rgb(1, 2, 3)),
            Err(LineageError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register(key, Some("  ".to_string()), Color::rgb(1, 2, 3)),
            Err(LineageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn builtin_gender_cannot_be_relabeled() {
        let mut registry = GenderRegistry::new();
        let key = RegistryEntryKey::builtin("male").expect("key");
        let male = registry.get_mut(&key).expect("male");
        assert!(matches!(
            male.set_label("Man"),
            Err(LineageError::BuiltinProtected(_))
        ));
        assert_eq!(male.display_name(), "male");
    }
}
