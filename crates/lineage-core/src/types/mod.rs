//! # Core Type Definitions
//!
//! This module contains the small shared types of the Lineage model:
//! - Entity identifiers (`PersonId`, `LifeEventId`)
//! - Closed enumerations with stable on-disk ordinals (`LifeStatus`,
//!   `ParentSlot`, `RelativeType`)
//! - Error types (`LineageError`)
//!
//! ## Identity
//!
//! Persons and life events have no natural key. Two persons can be
//! structurally identical (same names, same dates) and still be different
//! individuals, so every entity is addressed by a tree-local handle that is
//! assigned once and never reused within that tree.

use crate::registry::RegistryEntryKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Handle of a person inside one `FamilyTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

/// Handle of a life event inside one `FamilyTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LifeEventId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "person#{}", self.0)
    }
}

impl fmt::Display for LifeEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

// =============================================================================
// ORDINAL ENUMERATIONS
// =============================================================================

/// Whether a person is known to be alive.
///
/// The ordinal is the on-disk representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifeStatus {
    #[default]
    Living,
    MaybeLiving,
    Deceased,
    Lost,
}

impl LifeStatus {
    pub const ALL: [Self; 4] = [Self::Living, Self::MaybeLiving, Self::Deceased, Self::Lost];

    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_ordinal(ordinal: u32) -> Result<Self, LineageError> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or_else(|| LineageError::InvalidArgument(format!("life status ordinal {ordinal}")))
    }
}

/// One of the two genetic parent positions of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParentSlot {
    First,
    Second,
}

impl ParentSlot {
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The slot that is not `self`.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Kind of a directed, non-genetic-parent relation from a person to a relative.
///
/// Relations are read as "`relative` is the `<type>` of `person`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeType {
    AdoptiveParent,
    Godparent,
    FosterParent,
    EggDonor,
    SpermDonor,
    SurrogateParent,
}

impl RelativeType {
    pub const ALL: [Self; 6] = [
        Self::AdoptiveParent,
        Self::Godparent,
        Self::FosterParent,
        Self::EggDonor,
        Self::SpermDonor,
        Self::SurrogateParent,
    ];

    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_ordinal(ordinal: u32) -> Result<Self, LineageError> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or_else(|| {
                LineageError::InvalidArgument(format!("relative type ordinal {ordinal}"))
            })
    }

    /// Donors contribute genetic material and count toward the genetic parent limit.
    #[must_use]
    pub const fn is_genetic(self) -> bool {
        matches!(self, Self::EggDonor | Self::SpermDonor)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Lineage model and its persistence protocol.
///
/// - No silent failures
/// - Use `Result<T, LineageError>` for fallible operations
/// - The model should never panic; all errors must be recoverable
///
/// Failures during a load are wrapped once in `Load`, failures during a
/// save in `Save`, so callers see one failure per attempt. `cause()` returns
/// the underlying kind.
#[derive(Debug, Error)]
pub enum LineageError {
    /// Malformed document structure or a missing required tag/attribute.
    #[error("Format error: {0}")]
    Format(String),

    /// The document declares a format version this build cannot read.
    #[error("Unsupported format version: {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: u32 },

    /// A reference to a registry key absent from the tree's registry.
    #[error("Unknown registry key: {0}")]
    UnknownRegistryKey(RegistryEntryKey),

    /// A builtin-namespaced key that the registry does not ship.
    #[error("Undefined builtin key: {0}")]
    UndefinedBuiltinKey(RegistryEntryKey),

    /// Registering a key that already exists.
    #[error("Duplicate registry key: {0}")]
    DuplicateKey(RegistryEntryKey),

    /// Removing or re-keying a builtin entry.
    #[error("Builtin registry entry is protected: {0}")]
    BuiltinProtected(RegistryEntryKey),

    /// Bad color, bad enum ordinal, bad arity, bad number.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A serialized person or event index points outside its list.
    #[error("Dangling {kind} reference: index {index} (count {count})")]
    DanglingReference {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// The number of actors does not fit the event type's bounds.
    #[error("Event type {event_type} takes {min}..={max} actors, got {count}")]
    ActorCount {
        event_type: RegistryEntryKey,
        count: usize,
        min: u32,
        max: u32,
    },

    /// Both parent slots would reference the same person.
    #[error("Both parents of {0} would be the same person")]
    IdenticalParents(PersonId),

    /// A person referenced as its own parent or relative.
    #[error("{0} cannot be its own parent or relative")]
    SelfReference(PersonId),

    /// A person handle that does not belong to this tree.
    #[error("{0} is not a member of this tree")]
    NotMember(PersonId),

    /// An actor already has an event of a type flagged unique.
    #[error("{person} already has an event of unique type {event_type}")]
    UniqueEventViolation {
        person: PersonId,
        event_type: RegistryEntryKey,
    },

    /// Parents plus genetic donors would exceed two.
    #[error("{0} would have more than two genetic parents")]
    GeneticParentLimit(PersonId),

    /// The tree has persons but no root; it cannot be serialized.
    #[error("Tree has no root person")]
    MissingRoot,

    /// A calendar name no calendar system answers to.
    #[error("Unknown calendar: {0}")]
    UnknownCalendar(String),

    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    #[error("Life event not found: {0}")]
    LifeEventNotFound(LifeEventId),

    /// An I/O or low-level XML error.
    #[error("I/O error: {0}")]
    Io(String),

    /// A tree could not be loaded; no partial tree exists.
    #[error("Failed to load family tree: {0}")]
    Load(#[source] Box<LineageError>),

    /// A tree could not be saved; no output was produced.
    #[error("Failed to save family tree: {0}")]
    Save(#[source] Box<LineageError>),
}

impl LineageError {
    /// The innermost error, looking through `Load` and `Save` wrappers.
    #[must_use]
    pub fn cause(&self) -> &LineageError {
        match self {
            Self::Load(inner) | Self::Save(inner) => inner.cause(),
            other => other,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub(crate) fn io(error: impl fmt::Display) -> Self {
        Self::Io(error.to_string())
    }

    pub(crate) fn into_load(self) -> Self {
        match self {
            Self::Load(_) => self,
            other => Self::Load(Box::new(other)),
        }
    }

    pub(crate) fn into_save(self) -> Self {
        match self {
            Self::Save(_) => self,
            other => Self::Save(Box::new(other)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_status_ordinals_roundtrip() {
        for status in LifeStatus::ALL {
            let restored = LifeStatus::from_ordinal(status.ordinal()).expect("ordinal");
            assert_eq!(restored, status);
        }
    }

    #[test]
    fn out_of_range_ordinal_is_invalid_argument() {
        assert!(matches!(
            LifeStatus::from_ordinal(4),
            Err(LineageError::InvalidArgument(_))
        ));
        assert!(matches!(
            RelativeType::from_ordinal(6),
            Err(LineageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn only_donors_are_genetic() {
        let genetic: Vec<_> = RelativeType::ALL
            .iter()
            .filter(|t| t.is_genetic())
            .collect();
        assert_eq!(genetic, vec![&RelativeType::EggDonor, &RelativeType::SpermDonor]);
    }

    #[test]
    fn parent_slot_other() {
        assert_eq!(ParentSlot::First.other(), ParentSlot::Second);
        assert_eq!(ParentSlot::Second.other(), ParentSlot::First);
    }

    #[test]
    fn cause_looks_through_wrappers() {
        let err = LineageError::MissingRoot.into_save();
        assert!(matches!(err, LineageError::Save(_)));
        assert!(matches!(err.cause(), LineageError::MissingRoot));

        // Wrapping twice does not nest.
        let err = LineageError::SelfReference(PersonId(1)).into_load().into_load();
        assert!(matches!(
            &err,
            LineageError::Load(inner) if matches!(**inner, LineageError::SelfReference(_))
        ));
    }
}
