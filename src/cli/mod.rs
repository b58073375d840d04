//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `deploy <manifest>` | Deploy configs in dependency order |
//! | `delete <manifest> --file <delete.yaml>` | Delete listed objects |
//! | `graph <manifest>` | Print dependency graphs as DOT |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs; `RUST_LOG` takes precedence:
//! ```bash
//! cac --verbose deploy manifest.yaml --dry-run
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod delete;
mod deploy;
mod graph;
mod output;

pub use app::{run, Cli, Commands, DeleteArgs, DeployArgs, GraphArgs};
pub use output::{Output, OutputFormat};
