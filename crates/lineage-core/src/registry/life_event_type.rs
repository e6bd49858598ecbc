//! Life event type registry entries.
//!
//! A life event type fixes how many actors an event takes and what the event
//! implies for them (death, union, at most one per person).

use super::gender::require_label;
use super::{RegistryEntry, RegistryEntryKey};
use crate::LineageError;

/// Coarse classification of life event types.
///
/// The ordinal is the on-disk representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifeEventGroup {
    Birth,
    Union,
    Death,
    Experience,
    Medical,
    Administrative,
    Distinction,
    Other,
}

impl LifeEventGroup {
    pub const ALL: [Self; 8] = [
        Self::Birth,
        Self::Union,
        Self::Death,
        Self::Experience,
        Self::Medical,
        Self::Administrative,
        Self::Distinction,
        Self::Other,
    ];

    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_ordinal(ordinal: u32) -> Result<Self, LineageError> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or_else(|| LineageError::InvalidArgument(format!("life event group ordinal {ordinal}")))
    }
}

/// Construction arguments for a user life event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeEventTypeArgs {
    pub group: LifeEventGroup,
    pub indicates_death: bool,
    pub indicates_union: bool,
    pub min_actors: u32,
    pub max_actors: u32,
    pub unique: bool,
}

impl LifeEventTypeArgs {
    /// A type with exactly one actor and no implications.
    #[must_use]
    pub const fn single(group: LifeEventGroup) -> Self {
        Self {
            group,
            indicates_death: false,
            indicates_union: false,
            min_actors: 1,
            max_actors: 1,
            unique: false,
        }
    }

    fn validate(&self) -> Result<(), LineageError> {
        if self.min_actors == 0 || self.min_actors > self.max_actors {
            return Err(LineageError::InvalidArgument(format!(
                "actor bounds {}..={} are invalid",
                self.min_actors, self.max_actors
            )));
        }
        Ok(())
    }
}

/// A kind of life event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeEventType {
    key: RegistryEntryKey,
    label: Option<String>,
    args: LifeEventTypeArgs,
}

impl LifeEventType {
    #[must_use]
    pub const fn group(&self) -> LifeEventGroup {
        self.args.group
    }

    #[must_use]
    pub const fn indicates_death(&self) -> bool {
        self.args.indicates_death
    }

    #[must_use]
    pub const fn indicates_union(&self) -> bool {
        self.args.indicates_union
    }

    #[must_use]
    pub const fn min_actors(&self) -> u32 {
        self.args.min_actors
    }

    #[must_use]
    pub const fn max_actors(&self) -> u32 {
        self.args.max_actors
    }

    #[must_use]
    pub const fn unique(&self) -> bool {
        self.args.unique
    }

    #[must_use]
    pub const fn args(&self) -> LifeEventTypeArgs {
        self.args
    }

    /// Whether `count` actors fit this type.
    #[must_use]
    pub fn accepts_actor_count(&self, count: usize) -> bool {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        (self.args.min_actors..=self.args.max_actors).contains(&count)
    }

    /// Fails with `ActorCount` unless `count` actors fit this type.
    pub fn check_actor_count(&self, count: usize) -> Result<(), LineageError> {
        if self.accepts_actor_count(count) {
            return Ok(());
        }
        Err(LineageError::ActorCount {
            event_type: self.key.clone(),
            count,
            min: self.args.min_actors,
            max: self.args.max_actors,
        })
    }

    /// Relabel a user type. Builtin types are not relabeled.
    pub fn set_label(&mut self, label: impl Into<String>) -> Result<(), LineageError> {
        if self.key.is_builtin() {
            return Err(LineageError::BuiltinProtected(self.key.clone()));
        }
        self.label = Some(require_label(Some(label.into()))?);
        Ok(())
    }

    /// Replace the bounds and flags of a user type. The tree only calls this
    /// while no event uses the type.
    pub(crate) fn redefine(&mut self, args: LifeEventTypeArgs) -> Result<(), LineageError> {
        if self.key.is_builtin() {
            return Err(LineageError::BuiltinProtected(self.key.clone()));
        }
        args.validate()?;
        self.args = args;
        Ok(())
    }
}

// (name, group, min, max, death, union, unique)
type BuiltinRow = (&'static str, LifeEventGroup, u32, u32, bool, bool, bool);

const BUILTIN_TYPES: [BuiltinRow; 19] = [
    ("birth", LifeEventGroup::Birth, 1, 1, false, false, true),
    ("baptism", LifeEventGroup::Birth, 1, 1, false, false, true),
    ("death", LifeEventGroup::Death, 1, 1, true, false, true),
    ("burial", LifeEventGroup::Death, 1, 1, true, false, true),
    ("cremation", LifeEventGroup::Death, 1, 1, true, false, true),
    ("engagement", LifeEventGroup::Union, 2, 2, false, false, false),
    ("marriage", LifeEventGroup::Union, 2, 2, false, true, false),
    ("partnership", LifeEventGroup::Union, 2, 2, false, true, false),
    ("divorce", LifeEventGroup::Union, 2, 2, false, false, false),
    ("adoption", LifeEventGroup::Administrative, 1, 1, false, false, false),
    ("graduation", LifeEventGroup::Distinction, 1, 1, false, false, false),
    ("military_service", LifeEventGroup::Experience, 1, 1, false, false, false),
    ("occupation", LifeEventGroup::Experience, 1, 1, false, false, false),
    ("residence", LifeEventGroup::Other, 1, 64, false, false, false),
    ("retirement", LifeEventGroup::Experience, 1, 1, false, false, true),
    ("immigration", LifeEventGroup::Administrative, 1, 64, false, false, false),
    ("emigration", LifeEventGroup::Administrative, 1, 64, false, false, false),
    ("disease", LifeEventGroup::Medical, 1, 1, false, false, false),
    ("will", LifeEventGroup::Administrative, 1, 1, false, false, false),
];

impl RegistryEntry for LifeEventType {
    type BuildArgs = LifeEventTypeArgs;

    fn builtins() -> Vec<Self> {
        BUILTIN_TYPES
            .iter()
            .map(
                |&(name, group, min_actors, max_actors, indicates_death, indicates_union, unique)| Self {
                    key: RegistryEntryKey::builtin_static(name),
                    label: None,
                    args: LifeEventTypeArgs {
                        group,
                        indicates_death,
                        indicates_union,
                        min_actors,
                        max_actors,
                        unique,
                    },
                },
            )
            .collect()
    }

    fn build(key: RegistryEntryKey, label: Option<String>, args: LifeEventTypeArgs) -> Result<Self, LineageError> {
        args.validate()?;
        Ok(Self {
            key,
            label: Some(require_label(label)?),
            args,
        })
    }

    fn key(&self) -> &RegistryEntryKey {
        &self.key
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Builtin types have no mutable fields.
    fn differs_from(&self, _default: &Self) -> bool {
        false
    }
}
