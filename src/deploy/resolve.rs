//! Parameter resolution
//!
//! Resolves the parameters of a config against the entities resolved earlier
//! in the same deployment pass.
//!
//! References to other configs are validated before a parameter is resolved:
//! the referenced config must already be resolved and must not be skipped.
//! References to other parameters of the same config are resolved in
//! dependency order; a parameter referencing itself is always an error.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::parameter::value_to_string;
use crate::domain::{
    Config, EntityLookup, Parameter, ParameterError, Properties, ResolveContext, NAME_PARAMETER,
};

/// Parameters that could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionErrors {
    /// Properties resolved before and between the failures; for diagnostics only
    pub partial: Properties,
    pub errors: Vec<ParameterError>,
}

/// Orders a config's parameters so that same-config references come first
pub fn sort_parameters(config: &Config) -> Result<Vec<(&str, &Parameter)>, ParameterError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for name in config.parameters.keys() {
        index.insert(name.as_str(), graph.add_node(name.as_str()));
    }

    // Edge direction: referenced parameter -> referencing parameter
    for (name, parameter) in &config.parameters {
        for reference in parameter.references(&config.coordinate) {
            if reference.config != config.coordinate || &reference.property == name {
                continue;
            }
            if let (Some(from), Some(to)) = (
                index.get(reference.property.as_str()),
                index.get(name.as_str()),
            ) {
                graph.update_edge(*from, *to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order
            .into_iter()
            .map(|idx| {
                let name = graph[idx];
                (name, &config.parameters[name])
            })
            .collect()),
        Err(cycle) => {
            let mut parameters: Vec<String> = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&cycle.node_id()))
                .unwrap_or_default()
                .into_iter()
                .map(|idx| graph[idx].to_string())
                .collect();
            parameters.sort();

            Err(ParameterError::Cycle {
                coordinate: config.coordinate.clone(),
                parameters,
            })
        }
    }
}

/// Resolves `parameters` of `config`, in the given order
///
/// Every parameter is attempted; all errors are collected.
pub fn resolve_parameters(
    config: &Config,
    lookup: &EntityLookup,
    parameters: &[(&str, &Parameter)],
) -> Result<Properties, ResolutionErrors> {
    let mut properties = Properties::new();
    let mut errors = Vec::new();

    for (name, parameter) in parameters {
        let reference_errors = validate_references(config, lookup, name, parameter);
        if !reference_errors.is_empty() {
            errors.extend(reference_errors);
            continue;
        }

        let resolved = {
            let ctx = ResolveContext {
                property_resolver: lookup,
                coordinate: &config.coordinate,
                group: &config.group,
                environment: &config.environment,
                parameter_name: *name,
                resolved_parameters: &properties,
            };
            parameter.resolve_value(&ctx)
        };

        match resolved {
            Ok(value) => {
                let value = if *name == NAME_PARAMETER {
                    Value::String(value_to_string(&value))
                } else {
                    value
                };
                properties.insert(name.to_string(), value);
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(properties)
    } else {
        Err(ResolutionErrors {
            partial: properties,
            errors,
        })
    }
}

fn validate_references(
    config: &Config,
    lookup: &EntityLookup,
    name: &str,
    parameter: &Parameter,
) -> Vec<ParameterError> {
    let mut errors = Vec::new();

    for reference in parameter.references(&config.coordinate) {
        if reference.config == config.coordinate {
            // Other parameters of the same config resolve through the
            // properties resolved so far, not through the lookup
            if reference.property == name {
                errors.push(ParameterError::SelfReference {
                    coordinate: config.coordinate.clone(),
                    parameter: name.to_string(),
                });
            }
            continue;
        }

        match lookup.get_resolved_entity(&reference.config) {
            None => errors.push(ParameterError::ReferencedConfigNotFound {
                coordinate: config.coordinate.clone(),
                parameter: name.to_string(),
                reference: reference.config.clone(),
            }),
            Some(entity) if entity.skip => errors.push(ParameterError::ReferencingSkippedConfig {
                coordinate: config.coordinate.clone(),
                parameter: name.to_string(),
                reference: reference.config.clone(),
            }),
            Some(_) => {}
        }
    }

    errors
}

/// Sorts and resolves all parameters of a config
pub fn resolve_properties(
    config: &Config,
    lookup: &EntityLookup,
) -> Result<Properties, ResolutionErrors> {
    let sorted = sort_parameters(config).map_err(|e| ResolutionErrors {
        partial: Properties::new(),
        errors: vec![e],
    })?;
    resolve_parameters(config, lookup, &sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, ResolvedEntity};
    use crate::test_utils::{classic_config, coord};
    use serde_json::json;

    fn deployed(id: &str, remote_id: &str) -> ResolvedEntity {
        let mut properties = Properties::new();
        properties.insert("id".into(), json!(remote_id));
        properties.insert("name".into(), json!(id));
        ResolvedEntity {
            entity_name: id.into(),
            coordinate: coord(id),
            properties,
            skip: false,
        }
    }

    #[test]
    fn resolves_reference_to_deployed_config() {
        let mut lookup = EntityLookup::new();
        lookup.put_resolved(deployed("a", "remote-a"));

        let b = classic_config("b", &["a"]);
        let props = resolve_properties(&b, &lookup).unwrap();
        assert_eq!(props["a__id"], json!("remote-a"));
        assert_eq!(props["name"], json!("b"));
    }

    #[test]
    fn missing_reference_is_an_error() {
        let b = classic_config("b", &["a"]);
        let err = resolve_properties(&b, &EntityLookup::new()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(matches!(
            &err.errors[0],
            ParameterError::ReferencedConfigNotFound { reference, .. } if reference == &coord("a")
        ));
        // The name still resolved
        assert_eq!(err.partial["name"], json!("b"));
    }

    #[test]
    fn reference_to_skipped_config_is_an_error() {
        let mut lookup = EntityLookup::new();
        let mut a = classic_config("a", &[]);
        a.skip = true;
        lookup.put_resolved(ResolvedEntity::skipped(&a));

        let b = classic_config("b", &["a"]);
        let err = resolve_properties(&b, &lookup).unwrap_err();
        assert!(matches!(
            &err.errors[0],
            ParameterError::ReferencingSkippedConfig { .. }
        ));
    }

    #[test]
    fn self_reference_is_an_error_even_when_resolved() {
        let mut a = classic_config("a", &[]);
        a.parameters
            .insert("loop".into(), Parameter::reference(coord("a"), "loop"));

        let mut lookup = EntityLookup::new();
        lookup.put_resolved(deployed("a", "remote-a"));

        let err = resolve_properties(&a, &lookup).unwrap_err();
        assert_eq!(
            err.errors,
            vec![ParameterError::SelfReference {
                coordinate: coord("a"),
                parameter: "loop".into()
            }]
        );
    }

    #[test]
    fn same_config_references_resolve_in_order() {
        let mut a = classic_config("a", &[]);
        // "alpha" sorts before "name" but depends on it
        a.parameters
            .insert("alpha".into(), Parameter::reference(coord("a"), "name"));
        a.parameters.insert(
            "label".into(),
            Parameter::Compound {
                format: "{{alpha}}!".into(),
                references: vec!["alpha".into()],
            },
        );

        let props = resolve_properties(&a, &EntityLookup::new()).unwrap();
        assert_eq!(props["alpha"], json!("a"));
        assert_eq!(props["label"], json!("a!"));
    }

    #[test]
    fn parameter_cycle_is_reported() {
        let mut a = classic_config("a", &[]);
        a.parameters
            .insert("x".into(), Parameter::reference(coord("a"), "y"));
        a.parameters
            .insert("y".into(), Parameter::reference(coord("a"), "x"));

        let err = resolve_properties(&a, &EntityLookup::new()).unwrap_err();
        assert_eq!(
            err.errors,
            vec![ParameterError::Cycle {
                coordinate: coord("a"),
                parameters: vec!["x".into(), "y".into()]
            }]
        );
    }

    #[test]
    fn name_is_coerced_to_string() {
        let mut a = classic_config("a", &[]);
        a.parameters.insert("name".into(), Parameter::value(42));
        let props = resolve_properties(&a, &EntityLookup::new()).unwrap();
        assert_eq!(props["name"], json!("42"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut c = classic_config("c", &["a", "b"]);
        c.parameters.insert(
            "other".into(),
            Parameter::reference(Coordinate::new("x", "y", "z"), "id"),
        );
        let err = resolve_properties(&c, &EntityLookup::new()).unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }
}
