//! # Lineage CLI Module
//!
//! This module implements the CLI interface for Lineage. Every command
//! operates on a tree directory holding `tree.xml` and its attachment
//! directory.
//!
//! ## Available Commands
//!
//! - `init` - Create a tree with one root person
//! - `info` - Show tree statistics
//! - `validate` - Load a tree and report success or failure
//! - `normalize` - Rewrite a tree in canonical form
//! - `people` - List persons with their file index
//! - `attach` - Register a document and copy it into the tree

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use lineage_core::LineageError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Lineage - family tree keeper
///
/// Persons, shared life events and attached documents, stored as a
/// versioned XML file.
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: lineage.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a tree directory with one root person
    Init {
        /// Tree directory
        dir: PathBuf,

        /// Tree name
        #[arg(short, long)]
        name: String,

        /// First names of the root person
        #[arg(short, long, num_args = 1.., required = true)]
        root: Vec<String>,

        /// Last name of the root person
        #[arg(short, long)]
        last_name: Option<String>,

        /// Overwrite an existing tree
        #[arg(short, long)]
        force: bool,
    },

    /// Show tree statistics
    Info {
        /// Tree directory
        dir: PathBuf,
    },

    /// Load a tree and report whether it is valid
    Validate {
        /// Tree directory
        dir: PathBuf,
    },

    /// Rewrite a tree in canonical form
    Normalize {
        /// Tree directory
        dir: PathBuf,
    },

    /// List persons with their file index
    People {
        /// Tree directory
        dir: PathBuf,
    },

    /// Register a document and copy it into the attachment directory
    Attach {
        /// Tree directory
        dir: PathBuf,

        /// File to attach
        file: PathBuf,

        /// Index of the person to attach the document to (see `people`)
        #[arg(short, long)]
        person: Option<usize>,

        /// Document description
        #[arg(short, long)]
        description: Option<String>,

        /// Make the document the person's main picture
        #[arg(long, requires = "person")]
        main: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), LineageError> {
    let json_mode = cli.json;
    let quiet = cli.quiet || json_mode;

    match cli.command {
        Commands::Init {
            dir,
            name,
            root,
            last_name,
            force,
        } => cmd_init(
            &TreeDir::new(&dir, config),
            &name,
            &root,
            last_name.as_deref(),
            force,
            quiet,
        ),
        Commands::Info { dir } => cmd_info(&TreeDir::new(&dir, config), json_mode),
        Commands::Validate { dir } => cmd_validate(&TreeDir::new(&dir, config), json_mode),
        Commands::Normalize { dir } => {
            cmd_normalize(&TreeDir::new(&dir, config), quiet).map(|_| ())
        }
        Commands::People { dir } => cmd_people(&TreeDir::new(&dir, config), json_mode),
        Commands::Attach {
            dir,
            file,
            person,
            description,
            main,
        } => cmd_attach(
            &TreeDir::new(&dir, config),
            &file,
            person,
            description.as_deref(),
            main,
            quiet,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn init_takes_several_first_names() {
        let cli = Cli::try_parse_from([
            "lineage", "init", "tree", "--name", "Doe", "--root", "Ada", "Mary", "--last-name",
            "Doe",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Init { ref root, ref last_name, .. }
                if root.len() == 2 && last_name.as_deref() == Some("Doe")
        ));
    }

    #[test]
    fn main_picture_requires_person() {
        assert!(Cli::try_parse_from(["lineage", "attach", "tree", "a.png", "--main"]).is_err());
        assert!(
            Cli::try_parse_from(["lineage", "attach", "tree", "a.png", "--person", "0", "--main"])
                .is_ok()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lineage", "info", "tree", "--json", "-q"]).expect("parse");
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(cli.config.is_none());
    }
}
