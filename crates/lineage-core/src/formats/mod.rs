//! # Tree Document Format
//!
//! Versioned XML serialization of a `FamilyTree`.
//!
//! This module is a pure transformation between a tree and a string. Reading
//! and writing files, and executing the queued document file operations,
//! belong to the application layer.

mod dom;
pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::{read_tree, read_tree_with_metadata};
pub use writer::write_tree;
