//! Config parameters
//!
//! Parameters are the values substituted into a config's template. A parameter
//! is either a literal value, a reference to a property of another (or the same)
//! config, a list of parameters, an environment variable lookup, or a compound
//! format string built from other parameters of the same config.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::coordinate::Coordinate;
use super::template;

/// Resolved parameter values of a config, keyed by parameter name
pub type Properties = BTreeMap<String, Value>;

/// Parameter holding the remote id of a deployed object
pub const ID_PARAMETER: &str = "id";

/// Parameter holding the display name of a config
pub const NAME_PARAMETER: &str = "name";

/// Parameter holding the scope of a settings object
pub const SCOPE_PARAMETER: &str = "scope";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("{coordinate}: parameter '{parameter}' is referencing itself")]
    SelfReference {
        coordinate: Coordinate,
        parameter: String,
    },

    #[error("{coordinate}: parameter '{parameter}' references config {reference} which was not found")]
    ReferencedConfigNotFound {
        coordinate: Coordinate,
        parameter: String,
        reference: Coordinate,
    },

    #[error("{coordinate}: parameter '{parameter}' is referencing skipped config {reference}")]
    ReferencingSkippedConfig {
        coordinate: Coordinate,
        parameter: String,
        reference: Coordinate,
    },

    #[error("{coordinate}: parameter '{parameter}' references property '{property}' of {reference}, which is not set")]
    UnresolvedProperty {
        coordinate: Coordinate,
        parameter: String,
        reference: Coordinate,
        property: String,
    },

    #[error("{coordinate}: parameter '{parameter}' requires environment variable '{variable}', which is not set")]
    MissingEnvironmentVariable {
        coordinate: Coordinate,
        parameter: String,
        variable: String,
    },

    #[error("{coordinate}: compound parameter '{parameter}' could not be rendered: {reason}")]
    Compound {
        coordinate: Coordinate,
        parameter: String,
        reason: String,
    },

    #[error("{coordinate}: parameters reference each other in a cycle: {}", .parameters.join(" -> "))]
    Cycle {
        coordinate: Coordinate,
        parameters: Vec<String>,
    },
}

impl ParameterError {
    /// The config the error is attributed to
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            ParameterError::SelfReference { coordinate, .. }
            | ParameterError::ReferencedConfigNotFound { coordinate, .. }
            | ParameterError::ReferencingSkippedConfig { coordinate, .. }
            | ParameterError::UnresolvedProperty { coordinate, .. }
            | ParameterError::MissingEnvironmentVariable { coordinate, .. }
            | ParameterError::Compound { coordinate, .. }
            | ParameterError::Cycle { coordinate, .. } => coordinate,
        }
    }
}

/// A reference to a property of a config
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterReference {
    pub config: Coordinate,
    pub property: String,
}

impl ParameterReference {
    pub fn new(config: Coordinate, property: impl Into<String>) -> Self {
        Self {
            config,
            property: property.into(),
        }
    }
}

impl fmt::Display for ParameterReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.config, self.property)
    }
}

/// Read access to properties of already resolved configs
pub trait PropertyResolver {
    fn get_resolved_property(&self, coordinate: &Coordinate, property: &str) -> Option<Value>;
}

/// Everything a parameter may consult while resolving its value
pub struct ResolveContext<'a> {
    pub property_resolver: &'a dyn PropertyResolver,
    pub coordinate: &'a Coordinate,
    pub group: &'a str,
    pub environment: &'a str,
    pub parameter_name: &'a str,
    /// Properties of the owning config resolved so far
    pub resolved_parameters: &'a Properties,
}

/// A config parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// A literal value
    Value(Value),

    /// A property of another config, or of the owning config
    Reference(ParameterReference),

    /// A list of parameters, resolved into a JSON array
    List(Vec<Parameter>),

    /// A process environment variable
    Environment {
        name: String,
        default: Option<String>,
    },

    /// A template over other parameters of the same config
    Compound {
        format: String,
        references: Vec<String>,
    },
}

impl Parameter {
    /// Creates a literal value parameter
    pub fn value(value: impl Into<Value>) -> Self {
        Parameter::Value(value.into())
    }

    /// Creates a reference parameter
    pub fn reference(config: Coordinate, property: impl Into<String>) -> Self {
        Parameter::Reference(ParameterReference::new(config, property))
    }

    /// Returns every reference this parameter declares
    ///
    /// Compound parameters reference other parameters of `owner`.
    pub fn references(&self, owner: &Coordinate) -> Vec<ParameterReference> {
        match self {
            Parameter::Value(_) | Parameter::Environment { .. } => vec![],
            Parameter::Reference(reference) => vec![reference.clone()],
            Parameter::List(items) => items.iter().flat_map(|p| p.references(owner)).collect(),
            Parameter::Compound { references, .. } => references
                .iter()
                .map(|name| ParameterReference::new(owner.clone(), name.clone()))
                .collect(),
        }
    }

    /// Resolves the parameter to its value
    pub fn resolve_value(&self, ctx: &ResolveContext<'_>) -> Result<Value, ParameterError> {
        match self {
            Parameter::Value(value) => Ok(value.clone()),

            Parameter::Reference(reference) => {
                let resolved = if &reference.config == ctx.coordinate {
                    ctx.resolved_parameters.get(&reference.property).cloned()
                } else {
                    ctx.property_resolver
                        .get_resolved_property(&reference.config, &reference.property)
                };

                resolved.ok_or_else(|| ParameterError::UnresolvedProperty {
                    coordinate: ctx.coordinate.clone(),
                    parameter: ctx.parameter_name.to_string(),
                    reference: reference.config.clone(),
                    property: reference.property.clone(),
                })
            }

            Parameter::List(items) => items
                .iter()
                .map(|item| item.resolve_value(ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Parameter::Environment { name, default } => match std::env::var(name) {
                Ok(value) => Ok(Value::String(value)),
                Err(_) => default.clone().map(Value::String).ok_or_else(|| {
                    ParameterError::MissingEnvironmentVariable {
                        coordinate: ctx.coordinate.clone(),
                        parameter: ctx.parameter_name.to_string(),
                        variable: name.clone(),
                    }
                }),
            },

            Parameter::Compound { format, references } => {
                let mut data = Properties::new();
                for name in references {
                    let value = ctx.resolved_parameters.get(name).ok_or_else(|| {
                        ParameterError::UnresolvedProperty {
                            coordinate: ctx.coordinate.clone(),
                            parameter: ctx.parameter_name.to_string(),
                            reference: ctx.coordinate.clone(),
                            property: name.clone(),
                        }
                    })?;
                    data.insert(name.clone(), value.clone());
                }

                template::render_str(format, &data)
                    .map(Value::String)
                    .map_err(|reason| ParameterError::Compound {
                        coordinate: ctx.coordinate.clone(),
                        parameter: ctx.parameter_name.to_string(),
                        reason,
                    })
            }
        }
    }
}

/// Converts a resolved value to the string form used for names and scopes
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapResolver(HashMap<(Coordinate, String), Value>);

    impl PropertyResolver for MapResolver {
        fn get_resolved_property(&self, coordinate: &Coordinate, property: &str) -> Option<Value> {
            self.0.get(&(coordinate.clone(), property.to_string())).cloned()
        }
    }

    fn coord(id: &str) -> Coordinate {
        Coordinate::new("proj", "dashboard", id)
    }

    fn ctx<'a>(
        resolver: &'a MapResolver,
        owner: &'a Coordinate,
        name: &'a str,
        resolved: &'a Properties,
    ) -> ResolveContext<'a> {
        ResolveContext {
            property_resolver: resolver,
            coordinate: owner,
            group: "default",
            environment: "prod",
            parameter_name: name,
            resolved_parameters: resolved,
        }
    }

    #[test]
    fn value_resolves_to_itself() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let resolved = Properties::new();
        let p = Parameter::value(json!({"threshold": 5}));
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "x", &resolved)).unwrap(),
            json!({"threshold": 5})
        );
        assert!(p.references(&owner).is_empty());
    }

    #[test]
    fn reference_reads_other_config() {
        let mut map = HashMap::new();
        map.insert((coord("b"), "id".to_string()), json!("remote-b"));
        let resolver = MapResolver(map);
        let owner = coord("a");
        let resolved = Properties::new();

        let p = Parameter::reference(coord("b"), "id");
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "b_id", &resolved)).unwrap(),
            json!("remote-b")
        );
    }

    #[test]
    fn reference_to_own_config_reads_resolved_parameters() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let mut resolved = Properties::new();
        resolved.insert("name".to_string(), json!("My dashboard"));

        let p = Parameter::reference(owner.clone(), "name");
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "title", &resolved)).unwrap(),
            json!("My dashboard")
        );
    }

    #[test]
    fn missing_property_is_an_error() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let resolved = Properties::new();

        let p = Parameter::reference(coord("b"), "id");
        let err = p
            .resolve_value(&ctx(&resolver, &owner, "b_id", &resolved))
            .unwrap_err();
        assert!(matches!(err, ParameterError::UnresolvedProperty { .. }));
    }

    #[test]
    fn list_resolves_elements() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let resolved = Properties::new();

        let p = Parameter::List(vec![Parameter::value("x"), Parameter::value(2)]);
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "l", &resolved)).unwrap(),
            json!(["x", 2])
        );
    }

    #[test]
    fn list_collects_nested_references() {
        let owner = coord("a");
        let p = Parameter::List(vec![
            Parameter::reference(coord("b"), "id"),
            Parameter::reference(coord("c"), "name"),
        ]);
        let refs = p.references(&owner);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].config, coord("c"));
    }

    #[test]
    fn environment_falls_back_to_default() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let resolved = Properties::new();

        let p = Parameter::Environment {
            name: "CAC_TEST_SURELY_UNSET_VARIABLE".to_string(),
            default: Some("fallback".to_string()),
        };
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "e", &resolved)).unwrap(),
            json!("fallback")
        );

        let p = Parameter::Environment {
            name: "CAC_TEST_SURELY_UNSET_VARIABLE".to_string(),
            default: None,
        };
        assert!(matches!(
            p.resolve_value(&ctx(&resolver, &owner, "e", &resolved)),
            Err(ParameterError::MissingEnvironmentVariable { .. })
        ));
    }

    #[test]
    fn compound_renders_format() {
        let resolver = MapResolver(HashMap::new());
        let owner = coord("a");
        let mut resolved = Properties::new();
        resolved.insert("team".to_string(), json!("payments"));
        resolved.insert("tier".to_string(), json!(1));

        let p = Parameter::Compound {
            format: "{{team}}-tier{{tier}}".to_string(),
            references: vec!["team".to_string(), "tier".to_string()],
        };
        assert_eq!(
            p.resolve_value(&ctx(&resolver, &owner, "label", &resolved)).unwrap(),
            json!("payments-tier1")
        );

        let refs = p.references(&owner);
        assert!(refs.iter().all(|r| r.config == owner));
    }

    #[test]
    fn value_to_string_keeps_plain_strings() {
        assert_eq!(value_to_string(&json!("abc")), "abc");
        assert_eq!(value_to_string(&json!(12)), "12");
    }
}
