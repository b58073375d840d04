//! Mirror client
//!
//! Deploys objects into a [`MirrorStore`] directory instead of a remote API.
//! Objects are matched by their identifying key, so deploying the same config
//! again updates the stored object and keeps its id.

use async_trait::async_trait;

use super::{
    AutomationClient, BucketClient, ClassicConfigClient, ClassicRequest, ClientError,
    DocumentClient, DocumentRequest, OpenPipelineClient, RemoteObject, SettingsClient,
    SettingsRequest, SloClient,
};
use crate::deploy::identifiers;
use crate::domain::AutomationResource;
use crate::storage::{MirrorRecord, MirrorStore, MirrorWrite};

#[derive(Debug, Clone)]
pub struct MirrorClient {
    store: MirrorStore,
}

impl MirrorClient {
    pub fn new(store: MirrorStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MirrorStore {
        &self.store
    }

    async fn upsert_record(
        &self,
        kind: String,
        key: String,
        origin_id: Option<String>,
        name: Option<String>,
        payload: Vec<u8>,
    ) -> Result<RemoteObject, ClientError> {
        let store = self.store.clone();
        let record = tokio::task::spawn_blocking(move || {
            let seed = format!("{}/{}", kind, key);
            store.upsert(
                MirrorWrite {
                    kind: &kind,
                    key: &key,
                    origin_id: origin_id.as_deref(),
                    name: name.as_deref(),
                    payload: &payload,
                },
                || identifiers::uuid_from(&seed),
            )
        })
        .await
        .map_err(|e| ClientError::Storage(e.to_string()))?
        .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;

        Ok(remote_object(record))
    }

    async fn remove_record(&self, kind: String, key: String) -> Result<(), ClientError> {
        let store = self.store.clone();
        let label = format!("{} '{}'", kind, key);
        let removed = tokio::task::spawn_blocking(move || store.remove(&kind, &key))
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))?
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;

        if removed {
            Ok(())
        } else {
            Err(ClientError::NotFound(label))
        }
    }
}

fn remote_object(record: MirrorRecord) -> RemoteObject {
    RemoteObject {
        id: record.id,
        name: record.name,
    }
}

#[async_trait]
impl ClassicConfigClient for MirrorClient {
    async fn upsert(&self, request: ClassicRequest<'_>) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            format!("classic/{}", request.api),
            request.name.to_string(),
            request.origin_object_id.map(str::to_string),
            Some(request.name.to_string()),
            request.payload.to_vec(),
        )
        .await
    }

    async fn delete_by_name(&self, api: &str, name: &str) -> Result<(), ClientError> {
        self.remove_record(format!("classic/{}", api), name.to_string())
            .await
    }
}

#[async_trait]
impl SettingsClient for MirrorClient {
    async fn upsert(&self, request: SettingsRequest<'_>) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            format!("settings/{}", request.schema_id),
            request.external_id.to_string(),
            request.origin_object_id.map(str::to_string),
            None,
            request.payload.to_vec(),
        )
        .await
    }

    async fn delete(&self, schema_id: &str, external_id: &str) -> Result<(), ClientError> {
        self.remove_record(format!("settings/{}", schema_id), external_id.to_string())
            .await
    }
}

#[async_trait]
impl AutomationClient for MirrorClient {
    async fn upsert(
        &self,
        resource: AutomationResource,
        id: &str,
        payload: &[u8],
    ) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            format!("automation/{}", resource.as_str()),
            id.to_string(),
            Some(id.to_string()),
            None,
            payload.to_vec(),
        )
        .await
    }

    async fn delete(&self, resource: AutomationResource, id: &str) -> Result<(), ClientError> {
        self.remove_record(format!("automation/{}", resource.as_str()), id.to_string())
            .await
    }
}

#[async_trait]
impl BucketClient for MirrorClient {
    async fn upsert(&self, bucket_name: &str, payload: &[u8]) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            "bucket".to_string(),
            bucket_name.to_string(),
            Some(bucket_name.to_string()),
            Some(bucket_name.to_string()),
            payload.to_vec(),
        )
        .await
    }

    async fn delete(&self, bucket_name: &str) -> Result<(), ClientError> {
        self.remove_record("bucket".to_string(), bucket_name.to_string())
            .await
    }
}

#[async_trait]
impl OpenPipelineClient for MirrorClient {
    async fn update(&self, kind: &str, payload: &[u8]) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            "openpipeline".to_string(),
            kind.to_string(),
            Some(kind.to_string()),
            None,
            payload.to_vec(),
        )
        .await
    }
}

#[async_trait]
impl DocumentClient for MirrorClient {
    async fn upsert(&self, request: DocumentRequest<'_>) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            format!("document/{}", request.kind.as_str()),
            request.id.to_string(),
            Some(request.id.to_string()),
            Some(request.name.to_string()),
            request.payload.to_vec(),
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        // Documents share one id space across kinds
        for kind in ["document/dashboard", "document/notebook"] {
            match self.remove_record(kind.to_string(), id.to_string()).await {
                Err(ClientError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(ClientError::NotFound(format!("document '{}'", id)))
    }
}

#[async_trait]
impl SloClient for MirrorClient {
    async fn upsert(&self, id: &str, payload: &[u8]) -> Result<RemoteObject, ClientError> {
        self.upsert_record(
            "slo".to_string(),
            id.to_string(),
            Some(id.to_string()),
            None,
            payload.to_vec(),
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.remove_record("slo".to_string(), id.to_string()).await
    }
}
