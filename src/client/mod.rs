//! # Deploy Clients
//!
//! One capability per config type. The deployer only knows these traits; the
//! transport behind them (HTTP APIs, a local mirror, a dry run) is chosen by
//! the caller.
//!
//! | Trait | Config type | Identified by |
//! |-------|-------------|---------------|
//! | [`ClassicConfigClient`] | classic API objects | API + name (or origin id) |
//! | [`SettingsClient`] | settings objects | schema + scope + external id |
//! | [`AutomationClient`] | workflows, calendars, rules | resource + id |
//! | [`BucketClient`] | storage buckets | bucket name |
//! | [`OpenPipelineClient`] | openpipeline configs | kind |
//! | [`DocumentClient`] | dashboards, notebooks | id |
//! | [`SloClient`] | service level objectives | id |
//!
//! A client may answer [`ClientError::Skipped`] to signal that it deliberately
//! did not deploy an object; dependents of that object are then not deployed
//! either, but no error is reported.

mod dry_run;
mod mirror;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{AutomationResource, DocumentKind};

pub use dry_run::DryRunClient;
pub use mirror::MirrorClient;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Deployment skipped: {0}")]
    Skipped(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// An object as stored on the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: Option<String>,
}

/// Classic config API upsert
#[derive(Debug, Clone, Copy)]
pub struct ClassicRequest<'a> {
    pub api: &'a str,
    pub name: &'a str,
    pub origin_object_id: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Settings object upsert
#[derive(Debug, Clone, Copy)]
pub struct SettingsRequest<'a> {
    pub schema_id: &'a str,
    pub schema_version: Option<&'a str>,
    pub scope: &'a str,
    pub external_id: &'a str,
    pub origin_object_id: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Document upsert
#[derive(Debug, Clone, Copy)]
pub struct DocumentRequest<'a> {
    pub kind: DocumentKind,
    pub id: &'a str,
    pub name: &'a str,
    pub private: bool,
    pub payload: &'a [u8],
}

#[async_trait]
pub trait ClassicConfigClient: Send + Sync {
    async fn upsert(&self, request: ClassicRequest<'_>) -> Result<RemoteObject, ClientError>;

    async fn delete_by_name(&self, api: &str, name: &str) -> Result<(), ClientError>;
}

#[async_trait]
pub trait SettingsClient: Send + Sync {
    async fn upsert(&self, request: SettingsRequest<'_>) -> Result<RemoteObject, ClientError>;

    async fn delete(&self, schema_id: &str, external_id: &str) -> Result<(), ClientError>;
}

#[async_trait]
pub trait AutomationClient: Send + Sync {
    async fn upsert(
        &self,
        resource: AutomationResource,
        id: &str,
        payload: &[u8],
    ) -> Result<RemoteObject, ClientError>;

    async fn delete(&self, resource: AutomationResource, id: &str) -> Result<(), ClientError>;
}

#[async_trait]
pub trait BucketClient: Send + Sync {
    async fn upsert(&self, bucket_name: &str, payload: &[u8]) -> Result<RemoteObject, ClientError>;

    async fn delete(&self, bucket_name: &str) -> Result<(), ClientError>;
}

/// OpenPipeline configs always exist remotely and can only be updated
#[async_trait]
pub trait OpenPipelineClient: Send + Sync {
    async fn update(&self, kind: &str, payload: &[u8]) -> Result<RemoteObject, ClientError>;
}

#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn upsert(&self, request: DocumentRequest<'_>) -> Result<RemoteObject, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

#[async_trait]
pub trait SloClient: Send + Sync {
    async fn upsert(&self, id: &str, payload: &[u8]) -> Result<RemoteObject, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// The clients available for one environment
///
/// A missing client means objects of that type cannot be deployed to the environment.
#[derive(Clone, Default)]
pub struct ClientSet {
    pub classic: Option<Arc<dyn ClassicConfigClient>>,
    pub settings: Option<Arc<dyn SettingsClient>>,
    pub automation: Option<Arc<dyn AutomationClient>>,
    pub bucket: Option<Arc<dyn BucketClient>>,
    pub openpipeline: Option<Arc<dyn OpenPipelineClient>>,
    pub document: Option<Arc<dyn DocumentClient>>,
    pub slo: Option<Arc<dyn SloClient>>,
}

impl ClientSet {
    /// Uses one client for every config type
    pub fn uniform<C>(client: Arc<C>) -> Self
    where
        C: ClassicConfigClient
            + SettingsClient
            + AutomationClient
            + BucketClient
            + OpenPipelineClient
            + DocumentClient
            + SloClient
            + 'static,
    {
        Self {
            classic: Some(Arc::clone(&client) as Arc<dyn ClassicConfigClient>),
            settings: Some(Arc::clone(&client) as Arc<dyn SettingsClient>),
            automation: Some(Arc::clone(&client) as Arc<dyn AutomationClient>),
            bucket: Some(Arc::clone(&client) as Arc<dyn BucketClient>),
            openpipeline: Some(Arc::clone(&client) as Arc<dyn OpenPipelineClient>),
            document: Some(Arc::clone(&client) as Arc<dyn DocumentClient>),
            slo: Some(client as Arc<dyn SloClient>),
        }
    }

    /// Clients that accept every deployment without contacting anything
    pub fn dry_run() -> Self {
        Self::uniform(Arc::new(DryRunClient::new()))
    }
}

impl std::fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSet")
            .field("classic", &self.classic.is_some())
            .field("settings", &self.settings.is_some())
            .field("automation", &self.automation.is_some())
            .field("bucket", &self.bucket.is_some())
            .field("openpipeline", &self.openpipeline.is_some())
            .field("document", &self.document.is_some())
            .field("slo", &self.slo.is_some())
            .finish()
    }
}
