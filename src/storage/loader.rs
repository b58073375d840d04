//! Project loading
//!
//! Every `*.yaml`/`*.yml` file below a project directory that has a top-level
//! `configs:` list is a config file; other YAML files are ignored.
//!
//! ```yaml
//! configs:
//!   - id: team-overview
//!     type: dashboard
//!     config:
//!       name: Team overview
//!       template: overview.json
//!       parameters:
//!         threshold: 5
//!         profileId:
//!           type: reference
//!           configType: builtin:alerting.profile
//!           configId: default
//!           property: id
//!     environmentOverrides:
//!       - environment: stage
//!         override:
//!           skip: true
//! ```
//!
//! A config is loaded once per environment. Group overrides apply first, then
//! environment overrides.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::manifest::{Environment, Manifest};
use crate::domain::{
    AutomationResource, Config, ConfigType, Coordinate, DocumentKind, Parameter, Parameters,
    Project, Template,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Yaml { path: PathBuf, reason: String },

    #[error("Invalid manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("Unknown project '{0}'")]
    UnknownProject(String),

    #[error("Project directory {path} of project '{project}' does not exist")]
    ProjectNotFound { project: String, path: PathBuf },

    #[error("{path}: config '{config}': {reason}")]
    InvalidConfig {
        path: PathBuf,
        config: String,
        reason: String,
    },

    #[error("Config {coordinate} is defined more than once for environment '{environment}'")]
    DuplicateConfig {
        coordinate: Coordinate,
        environment: String,
    },
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    configs: Vec<ConfigEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigEntry {
    id: String,
    #[serde(rename = "type")]
    config_type: TypeDefinition,
    config: ConfigDefinition,
    #[serde(default)]
    environment_overrides: Vec<EnvironmentOverride>,
    #[serde(default)]
    group_overrides: Vec<GroupOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeDefinition {
    Name(String),
    Structured(StructuredType),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StructuredType {
    Api {
        name: String,
    },
    Settings {
        schema: String,
        #[serde(default, rename = "schemaVersion")]
        schema_version: Option<String>,
    },
    Automation {
        resource: AutomationResource,
    },
    Openpipeline {
        kind: String,
    },
    Document {
        kind: DocumentKind,
        #[serde(default)]
        private: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigDefinition {
    #[serde(default)]
    name: Option<Value>,
    template: String,
    #[serde(default)]
    skip: bool,
    #[serde(default)]
    origin_object_id: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
    #[serde(default)]
    depends_on: Vec<DependencyDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencyDefinition {
    Coordinate(String),
    #[serde(rename_all = "camelCase")]
    Config {
        #[serde(default)]
        project: Option<String>,
        config_type: String,
        config_id: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct OverrideDefinition {
    #[serde(default)]
    skip: Option<bool>,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentOverride {
    environment: String,
    #[serde(rename = "override")]
    overrides: OverrideDefinition,
}

#[derive(Debug, Deserialize)]
struct GroupOverride {
    group: String,
    #[serde(rename = "override")]
    overrides: OverrideDefinition,
}

impl TypeDefinition {
    fn to_config_type(&self) -> Result<ConfigType, String> {
        match self {
            TypeDefinition::Name(name) => match name.as_str() {
                "" => Err("type must not be empty".to_string()),
                "bucket" => Ok(ConfigType::Bucket),
                "slo-v2" => Ok(ConfigType::ServiceLevelObjective),
                "workflow" => Ok(ConfigType::Automation {
                    resource: AutomationResource::Workflow,
                }),
                "business-calendar" => Ok(ConfigType::Automation {
                    resource: AutomationResource::BusinessCalendar,
                }),
                "scheduling-rule" => Ok(ConfigType::Automation {
                    resource: AutomationResource::SchedulingRule,
                }),
                "openpipeline" | "document" => {
                    Err(format!("type '{}' needs the structured form", name))
                }
                schema if schema.starts_with("builtin:") => Ok(ConfigType::Settings {
                    schema_id: schema.to_string(),
                    schema_version: None,
                }),
                api => Ok(ConfigType::ClassicApi {
                    api: api.to_string(),
                }),
            },
            TypeDefinition::Structured(structured) => Ok(match structured {
                StructuredType::Api { name } => ConfigType::ClassicApi { api: name.clone() },
                StructuredType::Settings {
                    schema,
                    schema_version,
                } => ConfigType::Settings {
                    schema_id: schema.clone(),
                    schema_version: schema_version.clone(),
                },
                StructuredType::Automation { resource } => ConfigType::Automation {
                    resource: *resource,
                },
                StructuredType::Openpipeline { kind } => {
                    ConfigType::OpenPipeline { kind: kind.clone() }
                }
                StructuredType::Document { kind, private } => ConfigType::Document {
                    kind: *kind,
                    private: *private,
                },
            }),
        }
    }
}

/// Parses a parameter definition
///
/// Maps with a `type` of `value`, `reference`, `list`, `environment` or
/// `compound` are typed parameters; anything else is a literal value.
fn parse_parameter(project: &str, definition: &Value) -> Result<Parameter, String> {
    let Some(object) = definition.as_object() else {
        return Ok(Parameter::Value(definition.clone()));
    };
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Ok(Parameter::Value(definition.clone()));
    };

    let field = |name: &str| -> Result<&str, String> {
        object
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{} parameter needs a string '{}'", kind, name))
    };

    match kind {
        "value" => Ok(Parameter::Value(
            object.get("value").cloned().unwrap_or(Value::Null),
        )),
        "reference" => {
            let referenced_project = match object.get("project").and_then(Value::as_str) {
                Some(p) => p,
                None => project,
            };
            Ok(Parameter::reference(
                Coordinate::new(referenced_project, field("configType")?, field("configId")?),
                field("property")?,
            ))
        }
        "list" => {
            let values = object
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| "list parameter needs a 'values' list".to_string())?;
            values
                .iter()
                .map(|v| parse_parameter(project, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Parameter::List)
        }
        "environment" => Ok(Parameter::Environment {
            name: field("name")?.to_string(),
            default: object
                .get("default")
                .map(crate::domain::parameter::value_to_string),
        }),
        "compound" => {
            let references = object
                .get("references")
                .and_then(Value::as_array)
                .map(|refs| {
                    refs.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Ok(Parameter::Compound {
                format: field("format")?.to_string(),
                references,
            })
        }
        _ => Ok(Parameter::Value(definition.clone())),
    }
}

fn parse_dependency(project: &str, dependency: &DependencyDefinition) -> Result<Coordinate, String> {
    match dependency {
        DependencyDefinition::Coordinate(raw) => raw.parse().map_err(|e| format!("{}", e)),
        DependencyDefinition::Config {
            project: referenced,
            config_type,
            config_id,
        } => Ok(Coordinate::new(
            referenced.as_deref().unwrap_or(project),
            config_type.clone(),
            config_id.clone(),
        )),
    }
}

/// Loads the configs of the given projects for the given environments
pub fn load_projects(
    manifest: &Manifest,
    project_names: &[String],
    environments: &[Environment],
) -> Result<Vec<Project>, LoadError> {
    let mut projects = Vec::new();

    for definition in &manifest.projects {
        if !project_names.is_empty() && !project_names.contains(&definition.name) {
            continue;
        }

        let dir = manifest.project_dir(definition);
        if !dir.is_dir() {
            return Err(LoadError::ProjectNotFound {
                project: definition.name.clone(),
                path: dir,
            });
        }

        let project = load_project(&definition.name, &dir, environments)?;
        debug!(
            project = %project.id,
            configs = project.configs.values().map(Vec::len).sum::<usize>(),
            "Loaded project"
        );
        projects.push(project);
    }

    Ok(projects)
}

/// Loads one project directory
pub fn load_project(
    name: &str,
    dir: &Path,
    environments: &[Environment],
) -> Result<Project, LoadError> {
    let mut project = Project::new(name);
    let mut seen: BTreeSet<(String, Coordinate)> = BTreeSet::new();

    for path in yaml_files(dir)? {
        let Some(file) = read_config_file(&path)? else {
            continue;
        };
        let base = path.parent().unwrap_or(dir);

        for entry in &file.configs {
            let invalid = |reason: String| LoadError::InvalidConfig {
                path: path.clone(),
                config: entry.id.clone(),
                reason,
            };

            let config_type = entry.config_type.to_config_type().map_err(invalid)?;
            let coordinate = Coordinate::new(name, config_type.id(), entry.id.clone());

            let template_path = base.join(&entry.config.template);
            let content = fs::read_to_string(&template_path).map_err(|source| LoadError::Io {
                path: template_path.clone(),
                source,
            })?;
            let template = Template::new(entry.config.template.clone(), content);

            let explicit = entry
                .config
                .depends_on
                .iter()
                .map(|d| parse_dependency(name, d))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;

            for environment in environments {
                let config = build_config(
                    entry,
                    &coordinate,
                    &config_type,
                    &template,
                    &explicit,
                    environment,
                )
                .map_err(invalid)?;

                if !seen.insert((environment.name.clone(), coordinate.clone())) {
                    return Err(LoadError::DuplicateConfig {
                        coordinate,
                        environment: environment.name.clone(),
                    });
                }
                project.add_config(config);
            }
        }
    }

    Ok(project)
}

fn build_config(
    entry: &ConfigEntry,
    coordinate: &Coordinate,
    config_type: &ConfigType,
    template: &Template,
    explicit: &[Coordinate],
    environment: &Environment,
) -> Result<Config, String> {
    let mut skip = entry.config.skip;
    let mut definitions = entry.config.parameters.clone();
    if let Some(name) = &entry.config.name {
        definitions.insert("name".to_string(), name.clone());
    }

    let overrides = entry
        .group_overrides
        .iter()
        .filter(|o| o.group == environment.group)
        .map(|o| &o.overrides)
        .chain(
            entry
                .environment_overrides
                .iter()
                .filter(|o| o.environment == environment.name)
                .map(|o| &o.overrides),
        );
    for o in overrides {
        if let Some(s) = o.skip {
            skip = s;
        }
        definitions.extend(o.parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let mut parameters = Parameters::new();
    for (parameter, definition) in &definitions {
        let parsed = parse_parameter(&coordinate.project, definition)
            .map_err(|e| format!("parameter '{}': {}", parameter, e))?;
        parameters.insert(parameter.clone(), parsed);
    }

    let references = Config::derive_references(coordinate, &parameters, explicit);

    Ok(Config {
        coordinate: coordinate.clone(),
        config_type: config_type.clone(),
        environment: environment.name.clone(),
        group: environment.group.clone(),
        skip,
        template: template.clone(),
        parameters,
        references,
        origin_object_id: entry.config.origin_object_id.clone(),
    })
}

fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml_error = |e: serde_yaml::Error| LoadError::Yaml {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(yaml_error)?;
    let has_configs = value
        .as_mapping()
        .map(|m| m.contains_key("configs"))
        .unwrap_or(false);
    if !has_configs {
        return Ok(None);
    }

    serde_yaml::from_value(value).map(Some).map_err(yaml_error)
}

/// All YAML files below `dir`, sorted by path
fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|source| LoadError::Io {
            path: current.clone(),
            source,
        })?;

        for entry in entries {
            let path = entry
                .map_err(|source| LoadError::Io {
                    path: current.clone(),
                    source,
                })?
                .path();

            if path.is_dir() {
                pending.push(path);
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
