//! Shared fixtures for the scenario tests

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use cac_deploy::client::{ClassicConfigClient, ClassicRequest, ClientError, RemoteObject};
use cac_deploy::deploy::identifiers;
use cac_deploy::domain::{Config, ConfigType, Coordinate, Parameter, Parameters, Template};

/// Coordinate of a dashboard in project `proj`
pub fn coord(id: &str) -> Coordinate {
    Coordinate::new("proj", "dashboard", id)
}

/// A classic dashboard config in environment `prod`
///
/// Every dependency `d` adds a parameter `d__id` referencing the `id` of `d`.
pub fn classic_config(id: &str, dependencies: &[&str]) -> Config {
    let coordinate = coord(id);

    let mut parameters = Parameters::new();
    parameters.insert("name".to_string(), Parameter::value(id));
    for dependency in dependencies {
        parameters.insert(
            format!("{}__id", dependency),
            Parameter::reference(coord(dependency), "id"),
        );
    }

    let references = Config::derive_references(&coordinate, &parameters, &[]);

    Config {
        coordinate,
        config_type: ConfigType::ClassicApi {
            api: "dashboard".to_string(),
        },
        environment: "prod".to_string(),
        group: "default".to_string(),
        skip: false,
        template: Template::new("dashboard.json", r#"{"name": "{{name}}"}"#),
        parameters,
        references,
        origin_object_id: None,
    }
}

/// Classic config client that records every deployed name
#[derive(Debug, Default)]
pub struct RecordingClient {
    deployed: Mutex<Vec<String>>,
    fail_on: HashSet<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every deployment of an object with this name
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    /// Names of all objects deployed (or attempted), in call order
    pub async fn deployed(&self) -> Vec<String> {
        self.deployed.lock().await.clone()
    }

    pub fn id_for(api: &str, name: &str) -> String {
        identifiers::uuid_from(&format!("{}/{}", api, name))
    }
}

#[async_trait]
impl ClassicConfigClient for RecordingClient {
    async fn upsert(&self, request: ClassicRequest<'_>) -> Result<RemoteObject, ClientError> {
        self.deployed.lock().await.push(request.name.to_string());

        if self.fail_on.contains(request.name) {
            return Err(ClientError::Request(format!(
                "simulated failure for '{}'",
                request.name
            )));
        }

        Ok(RemoteObject {
            id: Self::id_for(request.api, request.name),
            name: Some(request.name.to_string()),
        })
    }

    async fn delete_by_name(&self, _api: &str, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }
}
