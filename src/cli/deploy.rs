//! Deploy command

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::app::DeployArgs;
use super::output::Output;
use crate::client::{ClientSet, MirrorClient};
use crate::deploy::{deploy_config_graph, DeployOptions, DeploymentOutcome, EnvironmentClients};
use crate::domain::project::with_dependencies;
use crate::domain::{Project, ResolvedEntity};
use crate::storage::{load_projects, Environment, Manifest, MirrorStore, Settings};

#[derive(Serialize)]
struct EnvironmentReport<'a> {
    environment: &'a str,
    deployed: Vec<&'a ResolvedEntity>,
    skipped: Vec<&'a ResolvedEntity>,
    errors: Vec<String>,
}

/// Clients deploying into an environment's target
pub(super) fn clients_for(environment: &Environment, dry_run: bool) -> Result<ClientSet> {
    if dry_run {
        return Ok(ClientSet::dry_run());
    }

    match &environment.target {
        Some(dir) => Ok(ClientSet::uniform(Arc::new(MirrorClient::new(
            MirrorStore::new(dir),
        )))),
        None => bail!(
            "Environment '{}' has no target; it can only be used with --dry-run",
            environment.name
        ),
    }
}

/// Loads the selected projects plus every project they depend on
fn select_projects(
    manifest: &Manifest,
    selected: &[String],
    environments: &[Environment],
) -> Result<Vec<Project>> {
    manifest.check_projects(selected)?;
    let projects = load_projects(manifest, &[], environments)?;
    if selected.is_empty() {
        return Ok(projects);
    }

    let names: Vec<String> = environments.iter().map(|e| e.name.clone()).collect();
    let wanted: BTreeSet<String> = with_dependencies(&projects, selected, &names);
    Ok(projects
        .into_iter()
        .filter(|p| wanted.contains(&p.id))
        .collect())
}

pub async fn run(args: DeployArgs, settings: &Settings, output: &Output) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let environments = manifest.select_environments(&args.environments)?;
    let projects = select_projects(&manifest, &args.projects, &environments)?;

    let clients = environments
        .iter()
        .map(|env| Ok(EnvironmentClients::new(env.name.clone(), clients_for(env, args.dry_run)?)))
        .collect::<Result<Vec<_>>>()?;

    let options = DeployOptions {
        continue_on_error: args.continue_on_error || settings.continue_on_error,
        dry_run: args.dry_run,
        parallel: args.parallel.unwrap_or(settings.parallel_deploy),
    };

    info!(
        projects = projects.len(),
        environments = clients.len(),
        parallel = options.parallel,
        "Starting deployment"
    );

    let outcome = deploy_config_graph(&projects, &clients, options).await;
    report(&outcome, &clients, output);

    if !outcome.is_success() {
        return Err(outcome.errors.into());
    }

    if args.dry_run {
        output.success("Validation finished without errors");
    } else {
        output.success("Deployment finished without errors");
    }
    Ok(())
}

fn report(outcome: &DeploymentOutcome, environments: &[EnvironmentClients], output: &Output) {
    let reports: Vec<EnvironmentReport<'_>> = environments
        .iter()
        .filter_map(|env| {
            let lookup = outcome.lookup(&env.name)?;
            let (skipped, deployed): (Vec<_>, Vec<_>) =
                lookup.entities().into_iter().partition(|e| e.skip);
            Some(EnvironmentReport {
                environment: &env.name,
                deployed,
                skipped,
                errors: outcome
                    .errors
                    .get(&env.name)
                    .iter()
                    .map(|e| e.to_string())
                    .collect(),
            })
        })
        .collect();

    if output.is_json() {
        output.data(&reports);
        return;
    }

    for report in &reports {
        output.line(&format!(
            "{}: {} deployed, {} skipped, {} error(s)",
            report.environment,
            report.deployed.len(),
            report.skipped.len(),
            report.errors.len()
        ));
        for entity in &report.deployed {
            output.line(&format!("  {}  {}", entity.coordinate, entity.entity_name));
        }
        for error in &report.errors {
            output.line(&format!("  error: {}", error));
        }
    }
}
