//! Config domain model
//!
//! A config is one deployable monitoring object (dashboard, settings object,
//! workflow, bucket, ...) for one environment. Configs are built once by the
//! project loader and are read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::coordinate::Coordinate;
use super::parameter::Parameter;
use super::template::Template;

/// Automation resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationResource {
    Workflow,
    BusinessCalendar,
    SchedulingRule,
}

impl AutomationResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationResource::Workflow => "workflow",
            AutomationResource::BusinessCalendar => "business-calendar",
            AutomationResource::SchedulingRule => "scheduling-rule",
        }
    }
}

/// Document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Dashboard,
    Notebook,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Dashboard => "dashboard",
            DocumentKind::Notebook => "notebook",
        }
    }
}

/// The kind of object a config deploys, with the data its API needs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigType {
    /// Classic configuration API object, identified by name
    ClassicApi { api: String },

    /// Settings 2.0 object
    Settings {
        schema_id: String,
        schema_version: Option<String>,
    },

    /// Automation resource (workflows, calendars, scheduling rules)
    Automation { resource: AutomationResource },

    /// Grail storage bucket
    Bucket,

    /// OpenPipeline configuration; one per kind, update-only
    OpenPipeline { kind: String },

    /// Dashboard or notebook document
    Document { kind: DocumentKind, private: bool },

    /// Service level objective
    ServiceLevelObjective,
}

impl ConfigType {
    /// Returns the type segment used in coordinates
    pub fn id(&self) -> String {
        match self {
            ConfigType::ClassicApi { api } => api.clone(),
            ConfigType::Settings { schema_id, .. } => schema_id.clone(),
            ConfigType::Automation { resource } => resource.as_str().to_string(),
            ConfigType::Bucket => "bucket".to_string(),
            ConfigType::OpenPipeline { .. } => "openpipeline".to_string(),
            ConfigType::Document { .. } => "document".to_string(),
            ConfigType::ServiceLevelObjective => "slo-v2".to_string(),
        }
    }

    /// Short label for logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            ConfigType::ClassicApi { .. } => "classic config",
            ConfigType::Settings { .. } => "settings object",
            ConfigType::Automation { .. } => "automation",
            ConfigType::Bucket => "bucket",
            ConfigType::OpenPipeline { .. } => "openpipeline",
            ConfigType::Document { .. } => "document",
            ConfigType::ServiceLevelObjective => "slo",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Named parameters of a config
pub type Parameters = BTreeMap<String, Parameter>;

/// A configuration object for one environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub coordinate: Coordinate,
    pub config_type: ConfigType,
    pub environment: String,
    pub group: String,
    pub skip: bool,
    pub template: Template,
    pub parameters: Parameters,
    /// Configs this config depends on, in declaration order
    pub references: Vec<Coordinate>,
    /// Existing remote object to update instead of creating a new one
    pub origin_object_id: Option<String>,
}

impl Config {
    /// Derives a config's references from its parameters and explicit dependencies
    ///
    /// The result is de-duplicated, keeps first-seen order and never contains `owner`.
    pub fn derive_references(
        owner: &Coordinate,
        parameters: &Parameters,
        explicit: &[Coordinate],
    ) -> Vec<Coordinate> {
        let mut references: Vec<Coordinate> = Vec::new();

        let from_parameters = parameters
            .values()
            .flat_map(|p| p.references(owner))
            .map(|r| r.config);

        for coordinate in from_parameters.chain(explicit.iter().cloned()) {
            if &coordinate != owner && !references.contains(&coordinate) {
                references.push(coordinate);
            }
        }

        references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(id: &str) -> Coordinate {
        Coordinate::new("proj", "dashboard", id)
    }

    #[test]
    fn config_type_ids() {
        assert_eq!(
            ConfigType::ClassicApi {
                api: "alerting-profile".into()
            }
            .id(),
            "alerting-profile"
        );
        assert_eq!(
            ConfigType::Settings {
                schema_id: "builtin:tags.auto-tagging".into(),
                schema_version: None
            }
            .id(),
            "builtin:tags.auto-tagging"
        );
        assert_eq!(
            ConfigType::Automation {
                resource: AutomationResource::BusinessCalendar
            }
            .id(),
            "business-calendar"
        );
        assert_eq!(ConfigType::ServiceLevelObjective.id(), "slo-v2");
    }

    #[test]
    fn derive_references_dedups_and_excludes_self() {
        let owner = coord("a");
        let mut parameters = Parameters::new();
        parameters.insert("b_id".into(), Parameter::reference(coord("b"), "id"));
        parameters.insert("b_name".into(), Parameter::reference(coord("b"), "name"));
        parameters.insert("own".into(), Parameter::reference(owner.clone(), "name"));
        parameters.insert(
            "label".into(),
            Parameter::Compound {
                format: "{{own}}".into(),
                references: vec!["own".into()],
            },
        );

        let refs = Config::derive_references(&owner, &parameters, &[coord("c"), coord("b")]);
        assert_eq!(refs, vec![coord("b"), coord("c")]);
    }
}
