//! Dry-run client
//!
//! Accepts every request and answers with the id the object would keep:
//! the origin object id when one is given, otherwise a stable generated id.

use async_trait::async_trait;

use super::{
    AutomationClient, BucketClient, ClassicConfigClient, ClassicRequest, ClientError,
    DocumentClient, DocumentRequest, OpenPipelineClient, RemoteObject, SettingsClient,
    SettingsRequest, SloClient,
};
use crate::deploy::identifiers;
use crate::domain::AutomationResource;

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunClient;

impl DryRunClient {
    pub fn new() -> Self {
        Self
    }
}

fn object(id: impl Into<String>, name: Option<&str>) -> RemoteObject {
    RemoteObject {
        id: id.into(),
        name: name.map(str::to_string),
    }
}

#[async_trait]
impl ClassicConfigClient for DryRunClient {
    async fn upsert(&self, request: ClassicRequest<'_>) -> Result<RemoteObject, ClientError> {
        let id = match request.origin_object_id {
            Some(id) => id.to_string(),
            None => identifiers::uuid_from(&format!("{}/{}", request.api, request.name)),
        };
        Ok(object(id, Some(request.name)))
    }

    async fn delete_by_name(&self, _api: &str, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

#[async_trait]
impl SettingsClient for DryRunClient {
    async fn upsert(&self, request: SettingsRequest<'_>) -> Result<RemoteObject, ClientError> {
        let id = match request.origin_object_id {
            Some(id) => id.to_string(),
            None => identifiers::uuid_from(request.external_id),
        };
        Ok(object(id, None))
    }

    async fn delete(&self, _schema_id: &str, _external_id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

#[async_trait]
impl AutomationClient for DryRunClient {
    async fn upsert(
        &self,
        _resource: AutomationResource,
        id: &str,
        _payload: &[u8],
    ) -> Result<RemoteObject, ClientError> {
        Ok(object(id, None))
    }

    async fn delete(&self, _resource: AutomationResource, _id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

#[async_trait]
impl BucketClient for DryRunClient {
    async fn upsert(&self, bucket_name: &str, _payload: &[u8]) -> Result<RemoteObject, ClientError> {
        Ok(object(bucket_name, Some(bucket_name)))
    }

    async fn delete(&self, _bucket_name: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

#[async_trait]
impl OpenPipelineClient for DryRunClient {
    async fn update(&self, kind: &str, _payload: &[u8]) -> Result<RemoteObject, ClientError> {
        Ok(object(kind, None))
    }
}

#[async_trait]
impl DocumentClient for DryRunClient {
    async fn upsert(&self, request: DocumentRequest<'_>) -> Result<RemoteObject, ClientError> {
        Ok(object(request.id, Some(request.name)))
    }

    async fn delete(&self, _id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

#[async_trait]
impl SloClient for DryRunClient {
    async fn upsert(&self, id: &str, _payload: &[u8]) -> Result<RemoteObject, ClientError> {
        Ok(object(id, None))
    }

    async fn delete(&self, _id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}
