//! Deployment manifests
//!
//! A manifest names the projects to deploy and the environments to deploy
//! them to:
//!
//! ```yaml
//! projects:
//!   - name: infra
//!   - name: apps
//!     path: projects/apps
//! environmentGroups:
//!   - name: production
//!     environments:
//!       - name: prod
//!         target: targets/prod
//! ```
//!
//! Paths are relative to the manifest. An environment's `target` is the
//! directory objects are deployed into; environments without one can only be
//! deployed in dry-run mode.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::loader::LoadError;
use crate::deploy::DeleteEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDefinition {
    pub name: String,

    /// Project directory; defaults to the project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentGroup {
    pub name: String,
    pub environments: Vec<EnvironmentDefinition>,
}

/// An environment with its group and resolved target directory
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub name: String,
    pub group: String,
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub projects: Vec<ProjectDefinition>,

    #[serde(default)]
    pub environment_groups: Vec<EnvironmentGroup>,

    /// Directory containing the manifest
    #[serde(skip)]
    pub root: PathBuf,
}

impl Manifest {
    /// Reads and validates a manifest file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut manifest: Manifest =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        manifest.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), LoadError> {
        let mut names: Vec<&str> = self.projects.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(LoadError::InvalidManifest {
                path: path.to_path_buf(),
                reason: format!("project '{}' is defined more than once", pair[0]),
            });
        }

        let mut environments: Vec<&str> = self
            .environment_groups
            .iter()
            .flat_map(|g| g.environments.iter().map(|e| e.name.as_str()))
            .collect();
        environments.sort_unstable();
        if let Some(pair) = environments.windows(2).find(|w| w[0] == w[1]) {
            return Err(LoadError::InvalidManifest {
                path: path.to_path_buf(),
                reason: format!("environment '{}' is defined more than once", pair[0]),
            });
        }

        Ok(())
    }

    /// Directory of a project
    pub fn project_dir(&self, project: &ProjectDefinition) -> PathBuf {
        self.root
            .join(project.path.as_deref().unwrap_or(&project.name))
    }

    /// All environments in declaration order
    pub fn environments(&self) -> Vec<Environment> {
        self.environment_groups
            .iter()
            .flat_map(|group| {
                group.environments.iter().map(move |env| Environment {
                    name: env.name.clone(),
                    group: group.name.clone(),
                    target: env.target.as_ref().map(|t| self.root.join(t)),
                })
            })
            .collect()
    }

    /// The named environments, or all of them when `names` is empty
    pub fn select_environments(&self, names: &[String]) -> Result<Vec<Environment>, LoadError> {
        let all = self.environments();
        if names.is_empty() {
            return Ok(all);
        }

        if let Some(unknown) = names.iter().find(|n| !all.iter().any(|e| &e.name == *n)) {
            return Err(LoadError::UnknownEnvironment(unknown.clone()));
        }

        Ok(all
            .into_iter()
            .filter(|e| names.contains(&e.name))
            .collect())
    }

    /// Checks that every name refers to a project of this manifest
    pub fn check_projects(&self, names: &[String]) -> Result<(), LoadError> {
        match names
            .iter()
            .find(|n| !self.projects.iter().any(|p| &p.name == *n))
        {
            Some(unknown) => Err(LoadError::UnknownProject(unknown.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteFile {
    delete: Vec<DeleteEntry>,
}

/// Reads the entries of a delete file
pub fn load_delete_file(path: &Path) -> Result<Vec<DeleteEntry>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file: DeleteFile = serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(file.delete)
}
