//! # Facsimile CLI Module
//!
//! This module implements the CLI interface for Facsimile.
//!
//! ## Available Commands
//!
//! - `clone` - Clone a snapshot document
//! - `verify` - Clone a document and audit the copy
//! - `config` - Show the effective clone options

mod commands;

use clap::{Args, Parser, Subcommand};
use facsimile::CloneSection;
use facsimile_core::{DepthPolicy, FacsimileError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Facsimile - deep copies of value-graph snapshots
///
/// Copies cyclic, shared, and deeply nested snapshot documents into
/// independent graphs and reports what was copied.
#[derive(Parser, Debug)]
#[command(name = "facsimile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress summaries; only documents and errors are printed
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Configuration file (default: ./facsimile.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Clone options given on the command line. They override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CloneArgs {
    /// Levels to copy; deeper nodes are shared with the input
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Disable cycle detection (cyclic input will not terminate)
    #[arg(long)]
    pub no_circular: bool,

    /// Also copy non-enumerable fields
    #[arg(long)]
    pub include_hidden: bool,

    /// Fail instead of sharing nodes below the depth limit
    #[arg(long)]
    pub strict_depth: bool,

    /// Shape name given to every record copy
    #[arg(long)]
    pub shape: Option<String>,
}

impl CloneArgs {
    /// Overlay the flags that were given onto a config section.
    pub fn apply(&self, section: &mut CloneSection) -> Result<(), FacsimileError> {
        if let Some(depth) = self.depth {
            let depth = i64::try_from(depth).map_err(|_| {
                FacsimileError::Config(format!(
                    "--depth {depth} exceeds the largest supported depth {}",
                    i64::MAX
                ))
            })?;
            section.depth = Some(depth);
        }
        if self.no_circular {
            section.circular = false;
        }
        if self.include_hidden {
            section.include_hidden = true;
        }
        if self.strict_depth {
            section.on_depth_exhausted = DepthPolicy::Fail;
        }
        if let Some(shape) = &self.shape {
            section.shape = Some(shape.clone());
        }
        Ok(())
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone a snapshot document
    Clone {
        /// Input document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output document (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: CloneArgs,
    },

    /// Clone a snapshot document and audit the copy
    Verify {
        /// Input document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Fail if any node of the copy is shared with the input
        #[arg(long)]
        require_independent: bool,

        #[command(flatten)]
        options: CloneArgs,
    },

    /// Show the effective clone options
    Config {
        #[command(flatten)]
        options: CloneArgs,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), FacsimileError> {
    let output = OutputMode {
        json: cli.json_mode,
        quiet: cli.quiet,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Clone {
            input,
            output: target,
            options,
        }) => cmd_clone(config, output, &input, target.as_deref(), &options),
        Some(Commands::Verify {
            input,
            require_independent,
            options,
        }) => cmd_verify(config, output, &input, require_independent, &options),
        Some(Commands::Config { options }) => cmd_config(config, output, &options),
        None => {
            // No subcommand - show the effective options
            cmd_config(config, output, &CloneArgs::default())
        }
    }
}
