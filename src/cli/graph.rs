//! Graph command

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use super::app::GraphArgs;
use super::output::Output;
use crate::graph::build_graphs;
use crate::storage::{load_projects, Manifest};

pub fn run(args: GraphArgs, output: &Output) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let environments = manifest.select_environments(&args.environments)?;
    let projects = load_projects(&manifest, &[], &environments)?;

    let names: Vec<String> = environments.iter().map(|e| e.name.clone()).collect();
    let graphs = build_graphs(&projects, &names);

    if output.is_json() {
        let dots: BTreeMap<&str, String> = graphs
            .iter()
            .map(|(env, graph)| (env.as_str(), graph.to_dot()))
            .collect();
        output.data(&dots);
        return Ok(());
    }

    for name in &names {
        if let Some(graph) = graphs.get(name) {
            output.line(&format!("// environment: {}", name));
            output.line(&graph.to_dot());
        }
    }
    Ok(())
}
