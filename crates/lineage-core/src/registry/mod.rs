//! # Registries
//!
//! Keyed stores of extensible "kind" definitions: genders and life event types.
//!
//! ## Two Tiers
//!
//! A registry holds two tiers of entries addressed by the same key space:
//! - builtin entries, baked in at construction, never removable, whose key
//!   never changes (only designated mutable fields such as a color can be
//!   adjusted);
//! - user entries, appended per tree, fully removable.
//!
//! Lookups check both tiers transparently. The `RegistryEntryKey` is the
//! only identity that reaches the file format; positional indices are never
//! used because the number and order of entries differ between files.
//!
//! Registries are per-tree state. Every `FamilyTree` owns its own pair, so
//! two trees in one process never share user-defined kinds.

pub mod gender;
pub mod life_event_type;

pub use gender::{Color, Gender};
pub use life_event_type::{LifeEventGroup, LifeEventType, LifeEventTypeArgs};

use crate::primitives::{BUILTIN_NAMESPACE, MAX_REGISTRY_NAME_LENGTH, USER_NAMESPACE};
use crate::LineageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry of genders owned by one tree.
pub type GenderRegistry = Registry<Gender>;

/// Registry of life event types owned by one tree.
pub type LifeEventTypeRegistry = Registry<LifeEventType>;

// =============================================================================
// REGISTRY ENTRY KEY
// =============================================================================

/// Namespace of a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Builtin,
    User,
}

impl Namespace {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => BUILTIN_NAMESPACE,
            Self::User => USER_NAMESPACE,
        }
    }
}

/// Namespace-qualified identifier, written `namespace:name`.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryEntryKey {
    namespace: Namespace,
    name: String,
}

impl RegistryEntryKey {
    /// Create a key, validating the name.
    ///
    /// Names are 1..=64 characters of ASCII lowercase letters, digits, `_` and `-`.
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Result<Self, LineageError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(LineageError::InvalidArgument(format!(
                "registry key name '{name}' is invalid"
            )));
        }
        Ok(Self { namespace, name })
    }

    /// Create a key in the user namespace.
    pub fn user(name: impl Into<String>) -> Result<Self, LineageError> {
        Self::new(Namespace::User, name)
    }

    /// Create a key in the builtin namespace.
    pub fn builtin(name: impl Into<String>) -> Result<Self, LineageError> {
        Self::new(Namespace::Builtin, name)
    }

    /// Builtin tables use literal names that are valid by construction.
    pub(crate) fn builtin_static(name: &'static str) -> Self {
        Self {
            namespace: Namespace::Builtin,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.namespace == Namespace::Builtin
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_REGISTRY_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl fmt::Display for RegistryEntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.as_str(), self.name)
    }
}

impl FromStr for RegistryEntryKey {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s
            .split_once(':')
            .ok_or_else(|| LineageError::InvalidArgument(format!("registry key '{s}' has no namespace")))?;
        let namespace = match namespace {
            BUILTIN_NAMESPACE => Namespace::Builtin,
            USER_NAMESPACE => Namespace::User,
            other => {
                return Err(LineageError::InvalidArgument(format!(
                    "unknown registry namespace '{other}'"
                )));
            }
        };
        Self::new(namespace, name)
    }
}

impl TryFrom<String> for RegistryEntryKey {
    type Error = LineageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegistryEntryKey> for String {
    fn from(key: RegistryEntryKey) -> Self {
        key.to_string()
    }
}

// =============================================================================
// REGISTRY ENTRY TRAIT
// =============================================================================

/// A kind definition that can live in a `Registry`.
pub trait RegistryEntry: Clone + fmt::Debug {
    /// Kind-specific construction arguments for user entries.
    type BuildArgs;

    /// The builtin entries, in display order.
    fn builtins() -> Vec<Self>;

    /// Build a user entry.
    fn build(key: RegistryEntryKey, label: Option<String>, args: Self::BuildArgs) -> Result<Self, LineageError>;

    fn key(&self) -> &RegistryEntryKey;

    fn label(&self) -> Option<&str>;

    /// Whether the mutable fields differ from `default` (its builtin original).
    fn differs_from(&self, default: &Self) -> bool;

    /// The label if present, else the key name.
    fn display_name(&self) -> &str {
        self.label().unwrap_or_else(|| self.key().name())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// A keyed store of builtin and user entries.
///
/// Keys are unique across both tiers. Mutation is append/remove of user
/// entries or adjustment of mutable fields; there is no rollback, callers
/// needing atomicity discard the whole owning tree instead.
#[derive(Debug, Clone)]
pub struct Registry<E: RegistryEntry> {
    /// Pristine builtin entries, used to detect customization.
    defaults: Vec<E>,
    /// Working builtin entries.
    builtins: Vec<E>,
    /// User entries in registration order.
    user: Vec<E>,
}

impl<E: RegistryEntry> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RegistryEntry> Registry<E> {
    /// Create a registry holding only the builtin entries.
    #[must_use]
    pub fn new() -> Self {
        let defaults = E::builtins();
        Self {
            builtins: defaults.clone(),
            defaults,
            user: Vec::new(),
        }
    }

    /// Register a user entry.
    ///
    /// - `DuplicateKey` if the key already exists in either tier
    /// - `BuiltinProtected` if the key is in the builtin namespace
    pub fn register(
        &mut self,
        key: RegistryEntryKey,
        label: Option<String>,
        args: E::BuildArgs,
    ) -> Result<&E, LineageError> {
        if self.contains(&key) {
            return Err(LineageError::DuplicateKey(key));
        }
        if key.is_builtin() {
            return Err(LineageError::BuiltinProtected(key));
        }
        let entry = E::build(key, label, args)?;
        self.user.push(entry);
        let index = self.user.len() - 1;
        Ok(&self.user[index])
    }

    #[must_use]
    pub fn get(&self, key: &RegistryEntryKey) -> Option<&E> {
        self.iter().find(|entry| entry.key() == key)
    }

    /// Mutable access for adjusting mutable fields. Entry types keep their
    /// keys private, so identity cannot change through this.
    pub fn get_mut(&mut self, key: &RegistryEntryKey) -> Option<&mut E> {
        self.builtins
            .iter_mut()
            .chain(self.user.iter_mut())
            .find(|entry| entry.key() == key)
    }

    #[must_use]
    pub fn contains(&self, key: &RegistryEntryKey) -> bool {
        self.get(key).is_some()
    }

    /// Look up a key that must exist.
    pub fn require(&self, key: &RegistryEntryKey) -> Result<&E, LineageError> {
        self.get(key)
            .ok_or_else(|| LineageError::UnknownRegistryKey(key.clone()))
    }

    /// Remove a user entry.
    ///
    /// - `BuiltinProtected` for builtin entries
    /// - `UnknownRegistryKey` if absent
    pub fn remove(&mut self, key: &RegistryEntryKey) -> Result<E, LineageError> {
        if self.is_builtin(key) {
            return Err(LineageError::BuiltinProtected(key.clone()));
        }
        let position = self
            .user
            .iter()
            .position(|entry| entry.key() == key)
            .ok_or_else(|| LineageError::UnknownRegistryKey(key.clone()))?;
        Ok(self.user.remove(position))
    }

    /// Restore to builtins only, undoing every customization.
    pub fn reset(&mut self) {
        self.builtins = self.defaults.clone();
        self.user.clear();
    }

    /// Whether `key` names a shipped builtin entry.
    #[must_use]
    pub fn is_builtin(&self, key: &RegistryEntryKey) -> bool {
        self.builtin_default(key).is_some()
    }

    /// The pristine builtin version of `key`.
    #[must_use]
    pub fn builtin_default(&self, key: &RegistryEntryKey) -> Option<&E> {
        self.defaults.iter().find(|entry| entry.key() == key)
    }

    /// Whether the entry must be persisted: user entries always, builtin
    /// entries only when a mutable field was changed.
    #[must_use]
    pub fn is_customized(&self, key: &RegistryEntryKey) -> bool {
        match (self.get(key), self.builtin_default(key)) {
            (Some(entry), Some(default)) => entry.differs_from(default),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// All entries: builtins in declaration order, then user entries in
    /// registration order. Order is for display only.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.builtins.iter().chain(self.user.iter())
    }

    #[must_use]
    pub fn user_entries(&self) -> &[E] {
        &self.user
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.builtins.len() + self.user.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn crimson() -> Color {
        "#AA00AA".parse().expect("color")
    }

    #[test]
    fn key_parse_and_display() {
        let key: RegistryEntryKey = "user:crimson".parse().expect("key");
        assert_eq!(key.namespace(), Namespace::User);
        assert_eq!(key.name(), "crimson");
        assert_eq!(key.to_string(), "user:crimson");
    }

    #[test]
    fn key_rejects_bad_input() {
        assert!("crimson".parse::<RegistryEntryKey>().is_err());
        assert!("system:crimson".parse::<RegistryEntryKey>().is_err());
        assert!("user:".parse::<RegistryEntryKey>().is_err());
        assert!("user:Crimson".parse::<RegistryEntryKey>().is_err());
        assert!("user:a:b".parse::<RegistryEntryKey>().is_err());
    }

    #[test]
    fn register_and_get() {
        let mut registry = Registry::<Gender>::new();
        let builtin_count = registry.len();
        let key = RegistryEntryKey::user("crimson").expect("key");

        registry
            .register(key.clone(), Some("Crimson".to_string()), crimson())
            .expect("register");

        assert_eq!(registry.len(), builtin_count + 1);
        let entry = registry.get(&key).expect("entry");
        assert_eq!(entry.color(), crimson());
        assert_eq!(entry.display_name(), "Crimson");
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut registry = Registry::<Gender>::new();
        let key = RegistryEntryKey::user("crimson").expect("key");
        registry
            .register(key.clone(), Some("Crimson".to_string()), crimson())
            .expect("register");

        let result = registry.register(key, Some("Again".to_string()), crimson());
        assert!(matches!(result, Err(LineageError::DuplicateKey(_))));
    }

    #[test]
    fn builtin_namespace_cannot_be_registered() {
        let mut registry = Registry::<Gender>::new();
        let existing = RegistryEntryKey::builtin("male").expect("key");
        let fresh = RegistryEntryKey::builtin("other").expect("key");

        assert!(matches!(
            registry.register(existing, Some("x".to_string()), crimson()),
            Err(LineageError::DuplicateKey(_))
        ));
        assert!(matches!(
            registry.register(fresh, Some("x".to_string()), crimson()),
            Err(LineageError::BuiltinProtected(_))
        ));
    }

    #[test]
    fn builtin_entries_cannot_be_removed() {
        let mut registry = Registry::<Gender>::new();
        let key = RegistryEntryKey::builtin("female").expect("key");

        assert!(matches!(
            registry.remove(&key),
            Err(LineageError::BuiltinProtected(_))
        ));
        assert!(registry.contains(&key));
    }

    #[test]
    fn remove_user_entry() {
        let mut registry = Registry::<Gender>::new();
        let key = RegistryEntryKey::user("crimson").expect("key");
        registry
            .register(key.clone(), Some("Crimson".to_string()), crimson())
            .expect("register");

        let removed = registry.remove(&key).expect("remove");
        assert_eq!(removed.key(), &key);
        assert!(!registry.contains(&key));
        assert!(matches!(
            registry.remove(&key),
            Err(LineageError::UnknownRegistryKey(_))
        ));
    }

    #[test]
    fn color_override_marks_builtin_customized() {
        let mut registry = Registry::<Gender>::new();
        let key = RegistryEntryKey::builtin("male").expect("key");
        assert!(!registry.is_customized(&key));

        registry.get_mut(&key).expect("male").set_color(crimson());
        assert!(registry.is_customized(&key));
        assert!(registry.is_builtin(&key));

        registry.reset();
        assert!(!registry.is_customized(&key));
    }

    #[test]
    fn reset_drops_user_entries() {
        let mut registry = Registry::<Gender>::new();
        let builtin_count = registry.len();
        registry
            .register(
                RegistryEntryKey::user("crimson").expect("key"),
                Some("Crimson".to_string()),
                crimson(),
            )
            .expect("register");

        registry.reset();
        assert_eq!(registry.len(), builtin_count);
        assert!(registry.user_entries().is_empty());
    }

    #[test]
    fn iteration_lists_builtins_then_user_entries() {
        let mut registry = Registry::<Gender>::new();
        let key = RegistryEntryKey::user("crimson").expect("key");
        registry
            .register(key.clone(), Some("Crimson".to_string()), crimson())
            .expect("register");

        let last = registry.iter().last().expect("last");
        assert_eq!(last.key(), &key);
        let first = registry.iter().next().expect("first");
        assert!(first.key().is_builtin());
    }
}
