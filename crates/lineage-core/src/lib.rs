//! # lineage-core
//!
//! The genealogy model for Lineage: persons, shared life events, the family
//! tree that owns them, and the versioned XML format they are stored in.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Owns all model state; registries are per tree, never global
//! - Validates every cross-entity mutation before applying it
//! - Performs no file I/O; the format module maps trees to and from strings
//!   and document file changes are queued for the caller to execute
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod calendar;
pub mod document;
pub mod formats;
pub mod life_event;
pub mod person;
pub mod primitives;
pub mod registry;
pub mod tree;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{LifeEventId, LifeStatus, LineageError, ParentSlot, PersonId, RelativeType};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use calendar::{
    CalendarSpecificDateTime, CalendarSystem, DateAlternative, DatePrecision, DateRange, DateTime,
    DateWithPrecision,
};
pub use document::{AttachedDocument, DocumentProvider, FileOperation, MetadataDocuments};
pub use life_event::{LatLon, LifeEvent, Place};
pub use person::Person;
pub use registry::{
    Color, Gender, GenderRegistry, LifeEventGroup, LifeEventType, LifeEventTypeArgs,
    LifeEventTypeRegistry, Namespace, Registry, RegistryEntry, RegistryEntryKey,
};
pub use tree::{FamilyTree, TreeStats};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{read_tree, read_tree_with_metadata, write_tree};
