//! # Attached Documents
//!
//! Pictures and other files attached to persons and events.
//!
//! The model only tracks document metadata and references by file name.
//! Moving bytes on disk is the caller's job: every model change that implies
//! a file change is recorded as a `FileOperation` on the tree, and the caller
//! drains and executes them after a successful save.

use crate::calendar::DateTime;
use crate::LineageError;
use std::path::PathBuf;

/// A document known to a tree, keyed by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDocument {
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime>,
}

impl AttachedDocument {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            date: None,
        }
    }
}

/// Materializes documents while a tree is loaded.
///
/// Invoked once per distinct file name in a load session. Implemented for
/// any `FnMut(&str, Option<&str>, Option<&DateTime>) -> Result<AttachedDocument, LineageError>`.
pub trait DocumentProvider {
    fn provide(
        &mut self,
        name: &str,
        description: Option<&str>,
        date: Option<&DateTime>,
    ) -> Result<AttachedDocument, LineageError>;
}

impl<F> DocumentProvider for F
where
    F: FnMut(&str, Option<&str>, Option<&DateTime>) -> Result<AttachedDocument, LineageError>,
{
    fn provide(
        &mut self,
        name: &str,
        description: Option<&str>,
        date: Option<&DateTime>,
    ) -> Result<AttachedDocument, LineageError> {
        self(name, description, date)
    }
}

/// Provider that builds documents straight from their recorded metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataDocuments;

impl DocumentProvider for MetadataDocuments {
    fn provide(
        &mut self,
        name: &str,
        description: Option<&str>,
        date: Option<&DateTime>,
    ) -> Result<AttachedDocument, LineageError> {
        Ok(AttachedDocument {
            name: name.to_string(),
            description: description.map(str::to_string),
            date: date.cloned(),
        })
    }
}

/// A deferred change to the tree's attachment directory.
///
/// Names are relative to that directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// Copy an external file into the directory under `name`.
    Copy { source: PathBuf, name: String },
    Rename { from: String, to: String },
    Delete { name: String },
}

/// Reject names that would escape the attachment directory.
pub(crate) fn validate_document_name(name: &str) -> Result<(), LineageError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(LineageError::InvalidArgument(format!(
            "document name '{name}' is not a plain file name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_providers() {
        let mut calls = 0;
        let mut provider = |name: &str,
                            _: Option<&str>,
                            _: Option<&DateTime>|
         -> Result<AttachedDocument, LineageError> {
            calls += 1;
            Ok(AttachedDocument::new(name.to_uppercase()))
        };
        let document = provider.provide("a.png", None, None).expect("provide");
        assert_eq!(document.name, "A.PNG");
        assert_eq!(calls, 1);
    }

    #[test]
    fn metadata_provider_copies_fields() {
        let document = MetadataDocuments
            .provide("scan.jpg", Some("Parish register"), None)
            .expect("provide");
        assert_eq!(document.description.as_deref(), Some("Parish register"));
    }

    #[test]
    fn path_like_names_rejected() {
        for name in ["", "..", "a/b.png", "a\\b.png"] {
            assert!(validate_document_name(name).is_err(), "{name}");
        }
        assert!(validate_document_name("portrait.png").is_ok());
    }
}
