//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands, plus
//! the tree directory I/O they share.

use crate::config::Config;
use lineage_core::{
    AttachedDocument, DateTime, FamilyTree, FileOperation, LineageError, PersonId, read_tree,
    primitives::MAX_DOCUMENT_SIZE, write_tree,
};
use std::path::{Path, PathBuf};

// =============================================================================
// TREE DIRECTORY LAYOUT
// =============================================================================

/// File name of the tree document inside a tree directory.
pub const TREE_FILE: &str = "tree.xml";

/// Maximum tree file size accepted for loading.
const MAX_TREE_FILE_SIZE: u64 = MAX_DOCUMENT_SIZE as u64;

/// A tree directory: `tree.xml` plus the attachment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDir {
    dir: PathBuf,
    files_dir: PathBuf,
}

impl TreeDir {
    #[must_use]
    pub fn new(dir: &Path, config: &Config) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files_dir: dir.join(&config.tree.files_dir),
        }
    }

    #[must_use]
    pub fn tree_file(&self) -> PathBuf {
        self.dir.join(TREE_FILE)
    }

    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }
}

/// A loaded tree and the attached documents whose files were not found.
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: FamilyTree,
    pub missing_documents: Vec<String>,
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), LineageError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| LineageError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(LineageError::InvalidArgument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize a path and require it to name a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, LineageError> {
    let canonical = path.canonicalize().map_err(|e| {
        LineageError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(LineageError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Load `tree.xml`, recording attached documents missing on disk.
pub fn load_tree(tree_dir: &TreeDir) -> Result<LoadedTree, LineageError> {
    let path = validate_file_path(&tree_dir.tree_file())?;
    validate_file_size(&path, MAX_TREE_FILE_SIZE)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| LineageError::Io(format!("Read tree: {}", e)))?;

    let files_dir = tree_dir.files_dir();
    let mut missing_documents = Vec::new();
    let mut provider = |name: &str,
                        description: Option<&str>,
                        date: Option<&DateTime>|
     -> Result<AttachedDocument, LineageError> {
        if !files_dir.join(name).is_file() {
            tracing::warn!(document = name, "Attached document not found in {}", files_dir.display());
            missing_documents.push(name.to_string());
        }
        Ok(AttachedDocument {
            name: name.to_string(),
            description: description.map(str::to_string),
            date: date.cloned(),
        })
    };
    let tree = read_tree(&text, &mut provider)?;

    Ok(LoadedTree {
        tree,
        missing_documents,
    })
}

/// Stage `tree.xml`, execute the queued file operations, then move the
/// staged file into place.
///
/// A failed file operation leaves the previous `tree.xml` and the queue
/// untouched. Returns the number of file operations executed.
pub fn save_tree(tree: &mut FamilyTree, tree_dir: &TreeDir) -> Result<usize, LineageError> {
    let xml = write_tree(tree)?;

    std::fs::create_dir_all(&tree_dir.dir)
        .map_err(|e| LineageError::Io(format!("Create tree directory: {}", e)))?;
    let path = tree_dir.tree_file();
    let staging = tree_dir.dir.join(format!("{}.tmp", TREE_FILE));
    std::fs::write(&staging, xml.as_bytes())
        .map_err(|e| LineageError::Io(format!("Write tree: {}", e)))?;

    let operations = tree.pending_file_operations().to_vec();
    let executed = match execute_file_operations(&operations, tree_dir.files_dir()) {
        Ok(executed) => executed,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                tracing::warn!(error = %cleanup, "Staged tree left behind");
            }
            return Err(e);
        }
    };
    tree.take_file_operations();

    std::fs::rename(&staging, &path)
        .map_err(|e| LineageError::Io(format!("Replace tree: {}", e)))?;
    tracing::debug!(path = %path.display(), bytes = xml.len(), "Tree saved");
    Ok(executed)
}

/// Apply deferred document changes to the attachment directory.
pub fn execute_file_operations(
    operations: &[FileOperation],
    files_dir: &Path,
) -> Result<usize, LineageError> {
    if operations.is_empty() {
        return Ok(0);
    }
    std::fs::create_dir_all(files_dir)
        .map_err(|e| LineageError::Io(format!("Create attachment directory: {}", e)))?;

    for operation in operations {
        match operation {
            FileOperation::Copy { source, name } => {
                std::fs::copy(source, files_dir.join(name)).map_err(|e| {
                    LineageError::Io(format!("Copy '{}': {}", source.display(), e))
                })?;
            }
            FileOperation::Rename { from, to } => {
                std::fs::rename(files_dir.join(from), files_dir.join(to))
                    .map_err(|e| LineageError::Io(format!("Rename '{}': {}", from, e)))?;
            }
            FileOperation::Delete { name } => match std::fs::remove_file(files_dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(document = %name, "Document to delete was already gone");
                }
                Err(e) => return Err(LineageError::Io(format!("Delete '{}': {}", name, e))),
            },
        }
        tracing::debug!(?operation, "File operation executed");
    }

    Ok(operations.len())
}

/// Handle of the person at a file index (handle order, as written).
fn person_at(tree: &FamilyTree, index: usize) -> Result<PersonId, LineageError> {
    tree.persons()
        .nth(index)
        .map(|p| p.id())
        .ok_or(LineageError::DanglingReference {
            kind: "person",
            index,
            count: tree.person_count(),
        })
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a tree directory holding one root person.
pub fn cmd_init(
    tree_dir: &TreeDir,
    name: &str,
    first_names: &[String],
    last_name: Option<&str>,
    force: bool,
    quiet: bool,
) -> Result<(), LineageError> {
    if tree_dir.tree_file().exists() && !force {
        return Err(LineageError::InvalidArgument(format!(
            "Tree already exists at {}. Use --force to overwrite.",
            tree_dir.tree_file().display()
        )));
    }
    if first_names.is_empty() {
        return Err(LineageError::InvalidArgument(
            "Root person needs at least one first name".to_string(),
        ));
    }

    let mut tree = FamilyTree::new(name);
    let root = tree.add_person();
    if let Some(person) = tree.person_mut(root) {
        person.legal_first_names = first_names.to_vec();
        person.legal_last_name = last_name.map(str::to_string);
    }
    tree.set_root(root)?;
    save_tree(&mut tree, tree_dir)?;

    tracing::info!(tree = name, "Tree initialized");
    if !quiet {
        println!("Initialized tree '{}' at {}", name, tree_dir.dir.display());
    }
    Ok(())
}

// =============================================================================
// INFO COMMAND
// =============================================================================

/// Show tree statistics.
pub fn cmd_info(tree_dir: &TreeDir, json_mode: bool) -> Result<(), LineageError> {
    let loaded = load_tree(tree_dir)?;
    let stats = loaded.tree.stats();

    if json_mode {
        let output = serde_json::json!({
            "directory": tree_dir.dir.to_string_lossy(),
            "stats": stats,
            "missing_documents": loaded.missing_documents,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Family Tree: {}", stats.name);
    println!("============");
    println!("Directory: {}", tree_dir.dir.display());
    println!("Root:      {}", stats.root.as_deref().unwrap_or("-"));
    println!();
    println!(
        "Persons:          {} ({} living, {} deceased)",
        stats.person_count, stats.living_count, stats.deceased_count
    );
    println!("Life events:      {}", stats.life_event_count);
    println!("Documents:        {}", stats.document_count);
    println!("User genders:     {}", stats.user_gender_count);
    println!("User event types: {}", stats.user_life_event_type_count);
    if !loaded.missing_documents.is_empty() {
        println!("Missing files:    {}", loaded.missing_documents.join(", "));
    }

    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Load a tree and report whether it is valid.
pub fn cmd_validate(tree_dir: &TreeDir, json_mode: bool) -> Result<(), LineageError> {
    match load_tree(tree_dir) {
        Ok(loaded) => {
            if json_mode {
                let output = serde_json::json!({
                    "valid": true,
                    "persons": loaded.tree.person_count(),
                    "life_events": loaded.tree.life_event_count(),
                    "missing_documents": loaded.missing_documents,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).unwrap_or_default()
                );
            } else {
                println!(
                    "OK: {} persons, {} life events",
                    loaded.tree.person_count(),
                    loaded.tree.life_event_count()
                );
                for name in &loaded.missing_documents {
                    println!("warning: missing document file '{}'", name);
                }
            }
            Ok(())
        }
        Err(e) => {
            if json_mode {
                let output = serde_json::json!({
                    "valid": false,
                    "error": e.to_string(),
                    "cause": e.cause().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).unwrap_or_default()
                );
            }
            Err(e)
        }
    }
}

// =============================================================================
// NORMALIZE COMMAND
// =============================================================================

/// Rewrite a tree in canonical form. Returns whether the file changed.
pub fn cmd_normalize(tree_dir: &TreeDir, quiet: bool) -> Result<bool, LineageError> {
    let before = std::fs::read(tree_dir.tree_file())
        .map_err(|e| LineageError::Io(format!("Read tree: {}", e)))?;
    let mut loaded = load_tree(tree_dir)?;
    save_tree(&mut loaded.tree, tree_dir)?;
    let after = std::fs::read(tree_dir.tree_file())
        .map_err(|e| LineageError::Io(format!("Read tree: {}", e)))?;

    let changed = before != after;
    tracing::info!(changed, "Tree normalized");
    if !quiet {
        if changed {
            println!("Rewrote {} in canonical form", tree_dir.tree_file().display());
        } else {
            println!("{} is already canonical", tree_dir.tree_file().display());
        }
    }
    Ok(changed)
}

// =============================================================================
// PEOPLE COMMAND
// =============================================================================

/// List persons with their file index.
pub fn cmd_people(tree_dir: &TreeDir, json_mode: bool) -> Result<(), LineageError> {
    let loaded = load_tree(tree_dir)?;
    let tree = &loaded.tree;
    let root = tree.root();

    if json_mode {
        let people: Vec<serde_json::Value> = tree
            .persons()
            .enumerate()
            .map(|(index, person)| {
                serde_json::json!({
                    "index": index,
                    "name": person.display_name(),
                    "life_status": person.life_status(),
                    "gender": person.gender().map(|g| g.to_string()),
                    "root": root == Some(person.id()),
                    "life_events": person.life_events().count(),
                })
            })
            .collect();
        let output = serde_json::json!({ "people": people });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{:>5}  {:<40} {:<13} EVENTS", "INDEX", "NAME", "STATUS");
    for (index, person) in tree.persons().enumerate() {
        let marker = if root == Some(person.id()) { " *" } else { "" };
        let status = format!("{:?}", person.life_status());
        println!(
            "{:>5}  {:<40} {:<13} {}{}",
            index,
            person.display_name(),
            status,
            person.life_events().count(),
            marker
        );
    }

    Ok(())
}

// =============================================================================
// ATTACH COMMAND
// =============================================================================

/// Register a file as a document and copy it into the attachment directory.
pub fn cmd_attach(
    tree_dir: &TreeDir,
    file: &Path,
    person: Option<usize>,
    description: Option<&str>,
    main_picture: bool,
    quiet: bool,
) -> Result<(), LineageError> {
    let source = validate_file_path(file)?;
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            LineageError::InvalidArgument(format!(
                "'{}' has no usable file name",
                file.display()
            ))
        })?;

    let mut loaded = load_tree(tree_dir)?;
    let tree = &mut loaded.tree;
    let mut document = AttachedDocument::new(name.clone());
    document.description = description.map(str::to_string);
    tree.add_document(document, Some(source))?;
    if let Some(index) = person {
        let id = person_at(tree, index)?;
        tree.attach_document_to_person(id, &name, main_picture)?;
    }
    let executed = save_tree(tree, tree_dir)?;

    tracing::info!(document = %name, executed, "Document attached");
    if !quiet {
        println!("Attached '{}'", name);
    }
    Ok(())
}
