//! # Deployment
//!
//! Resolves, renders and deploys configs in dependency order.
//!
//! ```text
//! projects ──▶ build_graphs ──▶ independently_sorted_components
//!                                        │
//!                  ┌─────────────────────┼─────────────────────┐
//!                  ▼                     ▼                     ▼
//!             component 1           component 2           component n
//!        resolve → render → dispatch (one task per component when parallel)
//! ```

mod delete;
mod dispatch;
mod errors;
pub mod identifiers;
mod orchestrator;
mod resolve;

pub use delete::{delete_configs, DeleteEntry, DeleteError};
pub use errors::{DeployError, EnvironmentDeploymentErrors};
pub use orchestrator::{
    deploy_config_graph, DeployOptions, DeploymentOutcome, EnvironmentClients,
};
pub use resolve::{resolve_parameters, resolve_properties, sort_parameters, ResolutionErrors};
