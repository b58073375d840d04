//! Delete command

use anyhow::{bail, Context, Result};
use tracing::info;

use super::app::DeleteArgs;
use super::deploy::clients_for;
use super::output::Output;
use crate::deploy::delete_configs;
use crate::storage::{load_delete_file, Manifest};

pub async fn run(args: DeleteArgs, output: &Output) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let environments = manifest.select_environments(&args.environments)?;
    let entries = load_delete_file(&args.file)?;

    info!(entries = entries.len(), environments = environments.len(), "Deleting objects");

    let mut failed = 0;
    let mut report = Vec::new();

    for environment in &environments {
        let clients = clients_for(environment, false)?;
        let errors = delete_configs(&entries, &clients).await;
        failed += errors.len();

        for error in &errors {
            output.line(&format!("{}: error: {}", environment.name, error));
        }
        report.push(serde_json::json!({
            "environment": environment.name,
            "errors": errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        }));
    }

    if output.is_json() {
        output.data(&report);
    }

    if failed > 0 {
        bail!("Failed to delete {} object(s)", failed);
    }

    output.success(&format!(
        "Processed {} delete entr{} in {} environment(s)",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        environments.len()
    ));
    Ok(())
}
