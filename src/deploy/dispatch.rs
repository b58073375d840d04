//! Type dispatch
//!
//! Hands a rendered config to the client responsible for its type, passing the
//! identifying data that type's API needs.

use serde_json::Value;

use super::errors::DeployError;
use super::identifiers;
use crate::client::{ClassicRequest, ClientError, ClientSet, DocumentRequest, RemoteObject, SettingsRequest};
use crate::domain::parameter::value_to_string;
use crate::domain::{
    Config, ConfigType, Properties, ResolvedEntity, ID_PARAMETER, NAME_PARAMETER, SCOPE_PARAMETER,
};

/// Deploys one config and returns its resolved entity
pub(crate) async fn deploy_config(
    clients: &ClientSet,
    environment: &str,
    config: &Config,
    mut properties: Properties,
    payload: String,
) -> Result<ResolvedEntity, DeployError> {
    let coordinate = &config.coordinate;
    let origin = config.origin_object_id.as_deref();
    let payload = payload.as_bytes();
    let name = properties.get(NAME_PARAMETER).map(value_to_string);

    let missing_client = || DeployError::MissingClient {
        coordinate: coordinate.clone(),
        kind: config.config_type.label(),
        environment: environment.to_string(),
    };
    let missing_property = |property: &'static str| DeployError::MissingProperty {
        coordinate: coordinate.clone(),
        property,
    };

    let result: Result<RemoteObject, ClientError> = match &config.config_type {
        ConfigType::ClassicApi { api } => {
            let client = clients.classic.as_ref().ok_or_else(missing_client)?;
            let name = name.as_deref().ok_or_else(|| missing_property(NAME_PARAMETER))?;
            client
                .upsert(ClassicRequest {
                    api,
                    name,
                    origin_object_id: origin,
                    payload,
                })
                .await
        }
        ConfigType::Settings {
            schema_id,
            schema_version,
        } => {
            let client = clients.settings.as_ref().ok_or_else(missing_client)?;
            let scope = properties
                .get(SCOPE_PARAMETER)
                .map(value_to_string)
                .ok_or_else(|| missing_property(SCOPE_PARAMETER))?;
            let external_id = identifiers::settings_external_id(coordinate);
            client
                .upsert(SettingsRequest {
                    schema_id,
                    schema_version: schema_version.as_deref(),
                    scope: &scope,
                    external_id: &external_id,
                    origin_object_id: origin,
                    payload,
                })
                .await
        }
        ConfigType::Automation { resource } => {
            let client = clients.automation.as_ref().ok_or_else(missing_client)?;
            let id = origin
                .map(str::to_string)
                .unwrap_or_else(|| identifiers::uuid_for(coordinate));
            client.upsert(*resource, &id, payload).await
        }
        ConfigType::Bucket => {
            let client = clients.bucket.as_ref().ok_or_else(missing_client)?;
            let bucket_name = origin
                .map(str::to_string)
                .unwrap_or_else(|| identifiers::bucket_name(coordinate));
            client.upsert(&bucket_name, payload).await
        }
        ConfigType::OpenPipeline { kind } => {
            let client = clients.openpipeline.as_ref().ok_or_else(missing_client)?;
            client.update(kind, payload).await
        }
        ConfigType::Document { kind, private } => {
            let client = clients.document.as_ref().ok_or_else(missing_client)?;
            let name = name.as_deref().ok_or_else(|| missing_property(NAME_PARAMETER))?;
            let id = origin
                .map(str::to_string)
                .unwrap_or_else(|| identifiers::uuid_for(coordinate));
            client
                .upsert(DocumentRequest {
                    kind: *kind,
                    id: &id,
                    name,
                    private: *private,
                    payload,
                })
                .await
        }
        ConfigType::ServiceLevelObjective => {
            let client = clients.slo.as_ref().ok_or_else(missing_client)?;
            let id = origin
                .map(str::to_string)
                .unwrap_or_else(|| identifiers::uuid_for(coordinate));
            client.upsert(&id, payload).await
        }
    };

    let object = result.map_err(|source| match source {
        ClientError::Skipped(reason) => DeployError::Skipped {
            coordinate: coordinate.clone(),
            reason,
        },
        source => DeployError::Client {
            coordinate: coordinate.clone(),
            kind: config.config_type.label(),
            source,
        },
    })?;

    let entity_name = name
        .or_else(|| object.name.clone())
        .unwrap_or_else(|| coordinate.config_id.clone());

    properties.insert(ID_PARAMETER.to_string(), Value::String(object.id));
    properties.insert(NAME_PARAMETER.to_string(), Value::String(entity_name.clone()));

    Ok(ResolvedEntity {
        entity_name,
        coordinate: coordinate.clone(),
        properties,
        skip: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DryRunClient;
    use crate::domain::{AutomationResource, Parameter};
    use crate::test_utils::{classic_config, RecordingClient};
    use serde_json::json;
    use std::sync::Arc;

    fn properties(config: &Config) -> Properties {
        config
            .parameters
            .iter()
            .filter_map(|(k, p)| match p {
                Parameter::Value(v) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn classic_config_gets_remote_id() {
        let config = classic_config("a", &[]);
        let entity = deploy_config(
            &ClientSet::dry_run(),
            "prod",
            &config,
            properties(&config),
            "{}".into(),
        )
        .await
        .unwrap();

        assert_eq!(entity.entity_name, "a");
        assert_eq!(
            entity.properties["id"],
            json!(RecordingClient::id_for("dashboard", "a"))
        );
        assert!(!entity.skip);
    }

    #[tokio::test]
    async fn missing_client_is_an_error() {
        let config = classic_config("a", &[]);
        let err = deploy_config(
            &ClientSet::default(),
            "prod",
            &config,
            properties(&config),
            "{}".into(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::MissingClient { kind: "classic config", .. }));
    }

    #[tokio::test]
    async fn settings_require_scope() {
        let mut config = classic_config("s", &[]);
        config.config_type = ConfigType::Settings {
            schema_id: "builtin:alerting.profile".into(),
            schema_version: None,
        };

        let err = deploy_config(
            &ClientSet::dry_run(),
            "prod",
            &config,
            properties(&config),
            "{}".into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::MissingProperty { property: "scope", .. }));

        let mut props = properties(&config);
        props.insert("scope".into(), json!("environment"));
        let entity = deploy_config(&ClientSet::dry_run(), "prod", &config, props, "{}".into())
            .await
            .unwrap();
        assert_eq!(
            entity.properties["id"],
            json!(identifiers::uuid_from(&identifiers::settings_external_id(
                &config.coordinate
            )))
        );
    }

    #[tokio::test]
    async fn automation_uses_origin_id() {
        let mut config = classic_config("wf", &[]);
        config.config_type = ConfigType::Automation {
            resource: AutomationResource::Workflow,
        };
        config.origin_object_id = Some("existing-wf".into());

        let entity = deploy_config(
            &ClientSet::uniform(Arc::new(DryRunClient::new())),
            "prod",
            &config,
            properties(&config),
            "{}".into(),
        )
        .await
        .unwrap();
        assert_eq!(entity.properties["id"], json!("existing-wf"));
    }

    #[tokio::test]
    async fn client_skip_becomes_skip_marker() {
        let config = classic_config("a", &[]);
        let clients = ClientSet {
            classic: Some(Arc::new(RecordingClient::new().skipping_on("a"))),
            ..Default::default()
        };

        let err = deploy_config(&clients, "prod", &config, properties(&config), "{}".into())
            .await
            .unwrap_err();
        assert!(err.is_skip());
    }
}
