//! Deployment errors

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::client::ClientError;
use crate::domain::{Coordinate, ParameterError, RenderError};
use crate::graph::SortError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeployError {
    #[error("{coordinate}: failed to resolve parameters: {}", join_errors(.errors))]
    Parameters {
        coordinate: Coordinate,
        errors: Vec<ParameterError>,
    },

    #[error("{coordinate}: {source}")]
    Render {
        coordinate: Coordinate,
        source: RenderError,
    },

    #[error("{coordinate}: failed to deploy {kind}: {source}")]
    Client {
        coordinate: Coordinate,
        kind: &'static str,
        source: ClientError,
    },

    #[error("{coordinate}: no {kind} client is configured for environment '{environment}'")]
    MissingClient {
        coordinate: Coordinate,
        kind: &'static str,
        environment: String,
    },

    #[error("{coordinate}: required property '{property}' is not set")]
    MissingProperty {
        coordinate: Coordinate,
        property: &'static str,
    },

    #[error(transparent)]
    Sort(#[from] SortError),

    /// Not a failure: the object was deliberately not deployed
    #[error("{coordinate}: deployment skipped: {reason}")]
    Skipped { coordinate: Coordinate, reason: String },

    #[error("Deployment task in environment '{environment}' failed: {reason}")]
    TaskFailed { environment: String, reason: String },
}

fn join_errors(errors: &[ParameterError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DeployError {
    /// True for the skip marker, which stops dependents but is not reported
    pub fn is_skip(&self) -> bool {
        matches!(self, DeployError::Skipped { .. })
    }

    /// The config the error is attributed to, if any
    pub fn coordinate(&self) -> Option<&Coordinate> {
        match self {
            DeployError::Parameters { coordinate, .. }
            | DeployError::Render { coordinate, .. }
            | DeployError::Client { coordinate, .. }
            | DeployError::MissingClient { coordinate, .. }
            | DeployError::MissingProperty { coordinate, .. }
            | DeployError::Skipped { coordinate, .. } => Some(coordinate),
            DeployError::Sort(_) | DeployError::TaskFailed { .. } => None,
        }
    }
}

/// Deployment errors keyed by environment name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentDeploymentErrors(BTreeMap<String, Vec<DeployError>>);

impl EnvironmentDeploymentErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, environment: &str, error: DeployError) {
        self.0.entry(environment.to_string()).or_default().push(error);
    }

    pub fn extend(&mut self, environment: &str, errors: impl IntoIterator<Item = DeployError>) {
        for error in errors {
            self.push(environment, error);
        }
    }

    pub fn get(&self, environment: &str) -> &[DeployError] {
        self.0.get(environment).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DeployError])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of errors across all environments
    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl fmt::Display for EnvironmentDeploymentErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary: Vec<String> = self
            .iter()
            .map(|(env, errors)| format!("{} ({} error(s))", env, errors.len()))
            .collect();
        write!(f, "Deployment failed for environment(s): {}", summary.join(", "))
    }
}

impl std::error::Error for EnvironmentDeploymentErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped() -> DeployError {
        DeployError::Skipped {
            coordinate: Coordinate::new("p", "bucket", "b"),
            reason: "not available".into(),
        }
    }

    #[test]
    fn skip_marker() {
        assert!(skipped().is_skip());
        assert!(!DeployError::TaskFailed {
            environment: "prod".into(),
            reason: "panicked".into()
        }
        .is_skip());
    }

    #[test]
    fn errors_per_environment() {
        let mut errors = EnvironmentDeploymentErrors::new();
        assert!(errors.is_empty());

        errors.push("prod", skipped());
        errors.extend("staging", vec![skipped(), skipped()]);

        assert_eq!(errors.count(), 3);
        assert_eq!(errors.get("staging").len(), 2);
        assert!(errors.get("dev").is_empty());
        assert_eq!(errors.environments().collect::<Vec<_>>(), vec!["prod", "staging"]);
        assert_eq!(
            errors.to_string(),
            "Deployment failed for environment(s): prod (1 error(s)), staging (2 error(s))"
        );
    }

    #[test]
    fn parameter_errors_are_listed() {
        let c = Coordinate::new("p", "dashboard", "a");
        let err = DeployError::Parameters {
            coordinate: c.clone(),
            errors: vec![ParameterError::SelfReference {
                coordinate: c,
                parameter: "name".into(),
            }],
        };
        assert!(err.to_string().contains("referencing itself"));
    }
}
