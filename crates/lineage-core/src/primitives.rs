//! # Format and Model Primitives
//!
//! Hardcoded constants for the Lineage model and its file format.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Changing any of them is a file format change.

/// Current version of the XML tree format.
///
/// The reader rejects any other value. Increment this when making breaking
/// changes to the element or attribute schema.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum number of candidate dates in a `DateTime::Alternative`.
pub const MAX_DATES: usize = 5;

/// Minimum number of candidate dates in a `DateTime::Alternative`.
pub const MIN_ALTERNATIVE_DATES: usize = 2;

/// Namespace of registry entries shipped with the system.
pub const BUILTIN_NAMESPACE: &str = "builtin";

/// Namespace of registry entries defined per tree.
pub const USER_NAMESPACE: &str = "user";

/// Separator between the calendar value and the calendar name in a wire date.
pub const CALENDAR_SEPARATOR: char = ';';

/// Maximum number of filled genetic parent positions for one person.
///
/// Counts both parent slots and genetic relatives (egg and sperm donors).
pub const MAX_GENETIC_PARENTS: usize = 2;

/// Maximum depth for ancestor traversal.
///
/// All queries must be computationally bounded.
pub const MAX_TRAVERSAL_DEPTH: usize = 64;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a tree document accepted by the reader (256 MiB).
///
/// Validated before any parsing happens.
pub const MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024;

/// Maximum length of a registry entry name (the part after `namespace:`).
pub const MAX_REGISTRY_NAME_LENGTH: usize = 64;
