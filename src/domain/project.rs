//! Loaded projects
//!
//! A project is a named set of configs per environment.

use std::collections::{BTreeMap, BTreeSet};

use super::config::Config;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Project {
    pub id: String,
    /// Configs keyed by environment name
    pub configs: BTreeMap<String, Vec<Config>>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configs: BTreeMap::new(),
        }
    }

    /// Adds a config to the environment the config belongs to
    pub fn add_config(&mut self, config: Config) {
        self.configs
            .entry(config.environment.clone())
            .or_default()
            .push(config);
    }

    /// Configs for one environment
    pub fn configs_for(&self, environment: &str) -> &[Config] {
        self.configs
            .get(environment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Other projects this project references in `environment`
    pub fn dependencies(&self, environment: &str) -> BTreeSet<String> {
        self.configs_for(environment)
            .iter()
            .flat_map(|c| c.references.iter())
            .filter(|r| r.project != self.id)
            .map(|r| r.project.clone())
            .collect()
    }
}

/// Expands `selected` with every project it transitively depends on
///
/// Unknown project names are returned unchanged so the caller can report them.
pub fn with_dependencies(
    projects: &[Project],
    selected: &[String],
    environments: &[String],
) -> BTreeSet<String> {
    let by_id: BTreeMap<&str, &Project> = projects.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut result = BTreeSet::new();
    let mut stack: Vec<String> = selected.to_vec();

    while let Some(id) = stack.pop() {
        if !result.insert(id.clone()) {
            continue;
        }
        if let Some(project) = by_id.get(id.as_str()) {
            for environment in environments {
                stack.extend(project.dependencies(environment));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigType, Coordinate, Parameters, Template};

    fn config(project: &str, id: &str, refs: Vec<Coordinate>) -> Config {
        Config {
            coordinate: Coordinate::new(project, "dashboard", id),
            config_type: ConfigType::ClassicApi {
                api: "dashboard".into(),
            },
            environment: "prod".into(),
            group: "default".into(),
            skip: false,
            template: Template::new("t.json", "{}"),
            parameters: Parameters::new(),
            references: refs,
            origin_object_id: None,
        }
    }

    #[test]
    fn dependencies_ignore_own_project() {
        let mut p = Project::new("app");
        p.add_config(config(
            "app",
            "a",
            vec![
                Coordinate::new("app", "dashboard", "b"),
                Coordinate::new("infra", "dashboard", "c"),
            ],
        ));

        assert_eq!(p.dependencies("prod").into_iter().collect::<Vec<_>>(), vec!["infra"]);
        assert!(p.dependencies("staging").is_empty());
    }

    #[test]
    fn with_dependencies_is_transitive() {
        let mut app = Project::new("app");
        app.add_config(config("app", "a", vec![Coordinate::new("infra", "dashboard", "c")]));
        let mut infra = Project::new("infra");
        infra.add_config(config("infra", "c", vec![Coordinate::new("base", "dashboard", "d")]));
        let base = Project::new("base");
        let unrelated = Project::new("other");

        let selected = with_dependencies(
            &[app, infra, base, unrelated],
            &["app".to_string()],
            &["prod".to_string()],
        );
        assert_eq!(
            selected.into_iter().collect::<Vec<_>>(),
            vec!["app", "base", "infra"]
        );
    }
}
