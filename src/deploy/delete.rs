//! Deleting deployed objects
//!
//! A delete file lists objects by type plus either the config coordinate they
//! were deployed from or their remote name/id. Identifiers are derived the same
//! way the deployer derives them, so objects created by a deployment can be
//! deleted by naming their config.
//!
//! ```yaml
//! delete:
//!   - type: dashboard          # classic API: by name
//!     name: Team overview
//!   - type: builtin:alerting.profile
//!     project: infra
//!     id: default-profile
//!   - type: workflow
//!     objectId: 9d3d7c0e-...
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::identifiers;
use crate::client::{ClientError, ClientSet};
use crate::domain::{AutomationResource, Coordinate};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeleteError {
    #[error("Delete entry of type '{config_type}' needs {needed}")]
    MissingIdentifier {
        config_type: String,
        needed: &'static str,
    },

    #[error("Objects of type '{0}' cannot be deleted")]
    Unsupported(String),

    #[error("No {kind} client is configured")]
    MissingClient { kind: &'static str },

    #[error("Failed to delete {target}: {source}")]
    Client { target: String, source: ClientError },
}

/// One object to delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntry {
    #[serde(rename = "type")]
    pub config_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Config id the object was deployed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Object name, for classic API objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Remote object id; takes precedence over a derived id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum DeleteTarget {
    Classic { api: String, name: String },
    Settings { schema_id: String, external_id: String },
    Automation { resource: AutomationResource, id: String },
    Bucket { name: String },
    Document { id: String },
    Slo { id: String },
}

impl std::fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteTarget::Classic { api, name } => write!(f, "{} '{}'", api, name),
            DeleteTarget::Settings {
                schema_id,
                external_id,
            } => write!(f, "{} '{}'", schema_id, external_id),
            DeleteTarget::Automation { resource, id } => {
                write!(f, "{} '{}'", resource.as_str(), id)
            }
            DeleteTarget::Bucket { name } => write!(f, "bucket '{}'", name),
            DeleteTarget::Document { id } => write!(f, "document '{}'", id),
            DeleteTarget::Slo { id } => write!(f, "slo '{}'", id),
        }
    }
}

fn automation_resource(config_type: &str) -> Option<AutomationResource> {
    match config_type {
        "workflow" => Some(AutomationResource::Workflow),
        "business-calendar" => Some(AutomationResource::BusinessCalendar),
        "scheduling-rule" => Some(AutomationResource::SchedulingRule),
        _ => None,
    }
}

impl DeleteEntry {
    fn coordinate(&self) -> Option<Coordinate> {
        match (&self.project, &self.id) {
            (Some(project), Some(id)) => Some(Coordinate::new(
                project.clone(),
                self.config_type.clone(),
                id.clone(),
            )),
            _ => None,
        }
    }

    /// Remote id: the given object id, or one derived from the coordinate
    fn remote_id(&self, derive: fn(&Coordinate) -> String) -> Result<String, DeleteError> {
        self.object_id
            .clone()
            .or_else(|| self.coordinate().map(|c| derive(&c)))
            .ok_or_else(|| self.missing("objectId, or project and id"))
    }

    fn missing(&self, needed: &'static str) -> DeleteError {
        DeleteError::MissingIdentifier {
            config_type: self.config_type.clone(),
            needed,
        }
    }

    fn target(&self) -> Result<DeleteTarget, DeleteError> {
        let config_type = self.config_type.as_str();

        if let Some(resource) = automation_resource(config_type) {
            return Ok(DeleteTarget::Automation {
                resource,
                id: self.remote_id(identifiers::uuid_for)?,
            });
        }

        match config_type {
            "bucket" => Ok(DeleteTarget::Bucket {
                name: self.remote_id(identifiers::bucket_name)?,
            }),
            "document" => Ok(DeleteTarget::Document {
                id: self.remote_id(identifiers::uuid_for)?,
            }),
            "slo-v2" => Ok(DeleteTarget::Slo {
                id: self.remote_id(identifiers::uuid_for)?,
            }),
            "openpipeline" => Err(DeleteError::Unsupported(self.config_type.clone())),
            t if t.starts_with("builtin:") => {
                let external_id = self
                    .coordinate()
                    .map(|c| identifiers::settings_external_id(&c))
                    .ok_or_else(|| self.missing("project and id"))?;
                Ok(DeleteTarget::Settings {
                    schema_id: self.config_type.clone(),
                    external_id,
                })
            }
            _ => {
                let name = self.name.clone().ok_or_else(|| self.missing("name"))?;
                Ok(DeleteTarget::Classic {
                    api: self.config_type.clone(),
                    name,
                })
            }
        }
    }
}

/// Deletes every entry; all entries are attempted and all failures returned
pub async fn delete_configs(entries: &[DeleteEntry], clients: &ClientSet) -> Vec<DeleteError> {
    let mut errors = Vec::new();

    for entry in entries {
        let target = match entry.target() {
            Ok(target) => target,
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
                continue;
            }
        };

        match delete_target(&target, clients).await {
            Ok(()) => info!(object = %target, "Deleted object"),
            Err(DeleteError::Client {
                source: ClientError::NotFound(_),
                ..
            }) => debug!(object = %target, "Object does not exist, nothing to delete"),
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
            }
        }
    }

    errors
}

async fn delete_target(target: &DeleteTarget, clients: &ClientSet) -> Result<(), DeleteError> {
    let missing = |kind: &'static str| DeleteError::MissingClient { kind };

    let result = match target {
        DeleteTarget::Classic { api, name } => {
            let client = clients.classic.as_ref().ok_or_else(|| missing("classic config"))?;
            client.delete_by_name(api, name).await
        }
        DeleteTarget::Settings {
            schema_id,
            external_id,
        } => {
            let client = clients.settings.as_ref().ok_or_else(|| missing("settings object"))?;
            client.delete(schema_id, external_id).await
        }
        DeleteTarget::Automation { resource, id } => {
            let client = clients.automation.as_ref().ok_or_else(|| missing("automation"))?;
            client.delete(*resource, id).await
        }
        DeleteTarget::Bucket { name } => {
            let client = clients.bucket.as_ref().ok_or_else(|| missing("bucket"))?;
            client.delete(name).await
        }
        DeleteTarget::Document { id } => {
            let client = clients.document.as_ref().ok_or_else(|| missing("document"))?;
            client.delete(id).await
        }
        DeleteTarget::Slo { id } => {
            let client = clients.slo.as_ref().ok_or_else(|| missing("slo"))?;
            client.delete(id).await
        }
    };

    result.map_err(|source| DeleteError::Client {
        target: target.to_string(),
        source,
    })
}
