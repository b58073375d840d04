//! Coordinates identify a single configuration object
//!
//! Format: `{project}:{type}:{config-id}` (e.g., `infra:dashboard:overview`)
//!
//! The type segment may itself contain colons (settings schema ids such as
//! `builtin:alerting.profile`), so parsing splits off the project from the
//! front and the config id from the back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Invalid coordinate format: expected '{{project}}:{{type}}:{{config-id}}', got '{0}'")]
    InvalidFormat(String),

    #[error("Coordinate segment '{0}' must not be empty")]
    EmptySegment(&'static str),
}

/// Identity of a configuration: (project, type, config id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    pub project: String,
    pub config_type: String,
    pub config_id: String,
}

impl Coordinate {
    pub fn new(
        project: impl Into<String>,
        config_type: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            config_type: config_type.into(),
            config_id: config_id.into(),
        }
    }

    /// Returns true if both coordinates point at the same project
    pub fn same_project(&self, other: &Coordinate) -> bool {
        self.project == other.project
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.config_type, self.config_id)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (project, rest) = s
            .split_once(':')
            .ok_or_else(|| CoordinateError::InvalidFormat(s.to_string()))?;
        let (config_type, config_id) = rest
            .rsplit_once(':')
            .ok_or_else(|| CoordinateError::InvalidFormat(s.to_string()))?;

        if project.is_empty() {
            return Err(CoordinateError::EmptySegment("project"));
        }
        if config_type.is_empty() {
            return Err(CoordinateError::EmptySegment("type"));
        }
        if config_id.is_empty() {
            return Err(CoordinateError::EmptySegment("config-id"));
        }

        Ok(Self::new(project, config_type, config_id))
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coordinate> for String {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_format_is_correct() {
        let c = Coordinate::new("infra", "dashboard", "overview");
        assert_eq!(c.to_string(), "infra:dashboard:overview");
    }

    #[test]
    fn coordinate_parses_settings_schema_type() {
        let c: Coordinate = "infra:builtin:alerting.profile:team-a".parse().unwrap();
        assert_eq!(c.project, "infra");
        assert_eq!(c.config_type, "builtin:alerting.profile");
        assert_eq!(c.config_id, "team-a");
    }

    #[test]
    fn coordinate_rejects_invalid_format() {
        assert!(matches!(
            "infra".parse::<Coordinate>(),
            Err(CoordinateError::InvalidFormat(_))
        ));
        assert!(matches!(
            "infra:dashboard".parse::<Coordinate>(),
            Err(CoordinateError::InvalidFormat(_))
        ));
        assert_eq!(
            ":dashboard:x".parse::<Coordinate>(),
            Err(CoordinateError::EmptySegment("project"))
        );
        assert_eq!(
            "infra:dashboard:".parse::<Coordinate>(),
            Err(CoordinateError::EmptySegment("config-id"))
        );
    }

    #[test]
    fn equality_requires_all_fields() {
        let a = Coordinate::new("p", "t", "id");
        assert_eq!(a, Coordinate::new("p", "t", "id"));
        assert_ne!(a, Coordinate::new("q", "t", "id"));
        assert_ne!(a, Coordinate::new("p", "u", "id"));
        assert_ne!(a, Coordinate::new("p", "t", "other"));
    }

    #[test]
    fn serde_uses_string_form() {
        let c = Coordinate::new("infra", "slo-v2", "latency");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"infra:slo-v2:latency\"");
        let parsed: Coordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }
}
