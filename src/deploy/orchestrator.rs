//! Deployment orchestrator
//!
//! Deploys every environment independently. Within an environment the graph is
//! split into sorted components; each component is deployed in order by a
//! single task that owns the component's [`EntityLookup`] and do-not-deploy set.
//!
//! When a config fails (or its client answers with a skip), every config that
//! depends on it, directly or transitively, is left out. Only the failure
//! itself is reported.

use futures::future::join_all;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::dispatch;
use super::errors::{DeployError, EnvironmentDeploymentErrors};
use super::resolve::resolve_properties;
use crate::client::ClientSet;
use crate::domain::{Config, EntityLookup, Project, ResolvedEntity};
use crate::graph::{build_graphs, independently_sorted_components, ConfigGraph, SortedComponent};

/// Deployment behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Keep deploying after a failure
    pub continue_on_error: bool,
    /// Deploying against no-op clients; implies `continue_on_error`
    pub dry_run: bool,
    /// Deploy the components of an environment concurrently
    pub parallel: bool,
}

impl DeployOptions {
    /// Whether processing continues past the first failure
    pub fn keep_going(&self) -> bool {
        self.continue_on_error || self.dry_run
    }
}

/// An environment and the clients that deploy to it
#[derive(Debug, Clone)]
pub struct EnvironmentClients {
    pub name: String,
    pub clients: ClientSet,
}

impl EnvironmentClients {
    pub fn new(name: impl Into<String>, clients: ClientSet) -> Self {
        Self {
            name: name.into(),
            clients,
        }
    }
}

/// Result of a deployment run
#[derive(Debug, Clone, Default)]
pub struct DeploymentOutcome {
    /// Entities resolved per environment, merged across components
    pub entities: BTreeMap<String, EntityLookup>,
    pub errors: EnvironmentDeploymentErrors,
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// The resolved entities of one environment
    pub fn lookup(&self, environment: &str) -> Option<&EntityLookup> {
        self.entities.get(environment)
    }
}

#[derive(Debug, Default)]
struct ComponentResult {
    entities: EntityLookup,
    errors: Vec<DeployError>,
}

/// Deploys all configs of `projects` to every environment in `environments`
///
/// Environments are deployed one after another. Unless the options say to keep
/// going, the first environment with an error ends the run.
pub async fn deploy_config_graph(
    projects: &[Project],
    environments: &[EnvironmentClients],
    options: DeployOptions,
) -> DeploymentOutcome {
    let names: Vec<String> = environments.iter().map(|e| e.name.clone()).collect();
    let graphs = build_graphs(projects, &names);

    let mut outcome = DeploymentOutcome::default();

    for environment in environments {
        let Some(graph) = graphs.get(&environment.name) else {
            continue;
        };

        info!(
            environment = %environment.name,
            configs = graph.len(),
            dry_run = options.dry_run,
            "Deploying environment"
        );

        let result = deploy_environment(graph, environment, options).await;
        let failed = !result.errors.is_empty();

        if failed {
            error!(
                environment = %environment.name,
                errors = result.errors.len(),
                "Deployment of environment failed"
            );
        } else {
            info!(
                environment = %environment.name,
                entities = result.entities.len(),
                "Deployment of environment finished"
            );
        }

        outcome
            .entities
            .insert(environment.name.clone(), result.entities);
        outcome.errors.extend(&environment.name, result.errors);

        if failed && !options.keep_going() {
            break;
        }
    }

    outcome
}

async fn deploy_environment(
    graph: &ConfigGraph,
    environment: &EnvironmentClients,
    options: DeployOptions,
) -> ComponentResult {
    let components = match independently_sorted_components(graph, &environment.name) {
        Ok(components) => components,
        Err(e) => {
            error!(environment = %environment.name, "{}", e);
            return ComponentResult {
                entities: EntityLookup::new(),
                errors: vec![DeployError::Sort(e)],
            };
        }
    };

    debug!(
        environment = %environment.name,
        components = components.len(),
        parallel = options.parallel,
        "Sorted configs into independent components"
    );

    if options.parallel {
        deploy_components_parallel(components, environment, options).await
    } else {
        deploy_components_sequential(components, environment, options).await
    }
}

async fn deploy_components_parallel(
    components: Vec<SortedComponent>,
    environment: &EnvironmentClients,
    options: DeployOptions,
) -> ComponentResult {
    let tasks = components.into_iter().map(|component| {
        tokio::spawn(deploy_component(
            component,
            environment.name.clone(),
            environment.clients.clone(),
            options,
        ))
    });

    let mut result = ComponentResult::default();
    for joined in join_all(tasks).await {
        match joined {
            Ok(component) => {
                result.entities.merge(component.entities);
                result.errors.extend(component.errors);
            }
            Err(e) => result.errors.push(DeployError::TaskFailed {
                environment: environment.name.clone(),
                reason: e.to_string(),
            }),
        }
    }
    result
}

async fn deploy_components_sequential(
    components: Vec<SortedComponent>,
    environment: &EnvironmentClients,
    options: DeployOptions,
) -> ComponentResult {
    let mut result = ComponentResult::default();
    for component in components {
        let component = deploy_component(
            component,
            environment.name.clone(),
            environment.clients.clone(),
            options,
        )
        .await;

        let failed = !component.errors.is_empty();
        result.entities.merge(component.entities);
        result.errors.extend(component.errors);

        if failed && !options.keep_going() {
            break;
        }
    }
    result
}

/// Deploys one component in sorted order
///
/// Takes its arguments by value so it can run as its own task.
async fn deploy_component(
    component: SortedComponent,
    environment: String,
    clients: ClientSet,
    options: DeployOptions,
) -> ComponentResult {
    let mut lookup = EntityLookup::new();
    let mut errors = Vec::new();
    let mut do_not_deploy: HashSet<NodeIndex> = HashSet::new();

    for &id in &component.sorted_nodes {
        if do_not_deploy.contains(&id) {
            continue;
        }
        let Some(node) = component.graph.node(id) else {
            continue;
        };
        let config = Arc::clone(&node.config);

        match deploy_node(&clients, &environment, &config, &lookup).await {
            Ok(entity) => lookup.put_resolved(entity),
            Err(err) => {
                let skipped = err.is_skip();
                if skipped {
                    warn!(coordinate = %config.coordinate, "{}", err);
                } else {
                    error!(coordinate = %config.coordinate, "{}", err);
                }

                mark_dependents(&component.graph, id, skipped, &mut do_not_deploy);

                if !skipped {
                    errors.push(err);
                    if !options.keep_going() {
                        break;
                    }
                }
            }
        }
    }

    ComponentResult {
        entities: lookup,
        errors,
    }
}

async fn deploy_node(
    clients: &ClientSet,
    environment: &str,
    config: &Config,
    lookup: &EntityLookup,
) -> Result<ResolvedEntity, DeployError> {
    if config.skip {
        debug!(coordinate = %config.coordinate, "Skipping config marked as skip");
        return Ok(ResolvedEntity::skipped(config));
    }

    debug!(coordinate = %config.coordinate, kind = config.config_type.label(), "Deploying config");

    let properties = resolve_properties(config, lookup).map_err(|e| {
        debug!(
            coordinate = %config.coordinate,
            resolved = ?e.partial,
            "Parameters resolved before the failure"
        );
        DeployError::Parameters {
            coordinate: config.coordinate.clone(),
            errors: e.errors,
        }
    })?;

    let payload = config
        .template
        .render(&properties)
        .map_err(|source| DeployError::Render {
            coordinate: config.coordinate.clone(),
            source,
        })?;

    let entity = dispatch::deploy_config(clients, environment, config, properties, payload).await?;

    debug!(
        coordinate = %config.coordinate,
        name = %entity.entity_name,
        "Deployed config"
    );
    Ok(entity)
}

/// Adds every transitive dependent of `blocked` to `do_not_deploy`
fn mark_dependents(
    graph: &ConfigGraph,
    blocked: NodeIndex,
    skipped: bool,
    do_not_deploy: &mut HashSet<NodeIndex>,
) {
    let Some(ancestor) = graph.node(blocked).map(|n| n.config.coordinate.clone()) else {
        return;
    };
    let outcome = if skipped { "was skipped" } else { "failed" };

    let mut stack = graph.dependents(blocked);
    while let Some(id) = stack.pop() {
        if !do_not_deploy.insert(id) {
            continue;
        }
        if let Some(node) = graph.node(id) {
            warn!(
                coordinate = %node.config.coordinate,
                ancestor = %ancestor,
                "Skipping deployment of {}, because it depends on {} which {}",
                node.config.coordinate,
                ancestor,
                outcome
            );
        }
        stack.extend(graph.dependents(id));
    }
}
