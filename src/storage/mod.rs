//! # Storage Layer
//!
//! Everything read from or written to disk.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Manifest | YAML | any path, given on the command line |
//! | Projects | YAML config files + templates | project directories named in the manifest |
//! | Delete files | YAML | any path, given on the command line |
//! | Settings | TOML | `cac.toml` next to the manifest, global `config.toml` |
//! | Mirror targets | JSONL (one object per line) | `{target}/objects.jsonl` |
//!
//! ## Concurrency Safety
//!
//! - [`MirrorStore`] uses file locking (`fs2`) for concurrent access
//! - Mirror writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Manifest`] - Projects and environments of a deployment
//! - [`load_projects`] - Loads configs for the selected environments
//! - [`Settings`] - Global and per-manifest settings
//! - [`MirrorStore`] - Objects deployed to a local target

mod config;
mod loader;
mod manifest;
mod mirror;

pub use config::{Settings, SettingsError, SettingsFile, LOCAL_SETTINGS_FILE};
pub use loader::{load_project, load_projects, LoadError};
pub use manifest::{
    load_delete_file, Environment, EnvironmentDefinition, EnvironmentGroup, Manifest,
    ProjectDefinition,
};
pub use mirror::{MirrorRecord, MirrorStore, MirrorWrite};
