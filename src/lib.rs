//! cac - configuration as code, deployed in dependency order
//!
//! Configs reference each other by coordinate (`project:type:id`). Deployment
//! builds a dependency graph per environment, splits it into independent
//! components and deploys each component in topological order, resolving every
//! config's parameters against the configs deployed before it.

pub mod client;
pub mod cli;
pub mod deploy;
pub mod domain;
pub mod graph;
pub mod logging;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

pub use deploy::{deploy_config_graph, DeployOptions, DeploymentOutcome, EnvironmentClients};
pub use domain::{Config, ConfigType, Coordinate, EntityLookup, Parameter, ResolvedEntity};
