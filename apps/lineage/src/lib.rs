//! # Lineage
//!
//! Command line front end for `lineage-core`: tree directory I/O,
//! configuration and the CLI commands.

pub mod cli;
pub mod config;
