//! Raw access to the compute API: kinds, wire schemas per API track, and the
//! client trait the rest of the crate talks through.

pub mod alpha;
pub mod beta;
#[cfg(test)]
pub(crate) mod fake;
pub mod ga;
mod gce;
mod registry;
mod resource_id;
pub mod types;

use async_trait::async_trait;
pub use gce::{GceClient, COMPUTE_ENDPOINT};
pub use registry::{KindInfo, KindRegistry, ResourceKind};
pub use resource_id::{ResourceId, ResourceIdError, COMPUTE_BASE_URL};
use serde_json::Value;
use thiserror::Error;
use types::BackendServiceGroupHealth;

use crate::common::{Location, ResourceKey, Version};

pub const HTTP_FORBIDDEN: u16 = 403;
pub const HTTP_NOT_FOUND: u16 = 404;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("googleapi: Error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unable to decode response: {0}")]
    Decode(String),
}

impl CloudError {
    pub fn not_found(message: &str) -> Self {
        CloudError::Api {
            code: HTTP_NOT_FOUND,
            message: message.to_owned(),
        }
    }

    pub fn forbidden(message: &str) -> Self {
        CloudError::Api {
            code: HTTP_FORBIDDEN,
            message: message.to_owned(),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            CloudError::Api { code, .. } => Some(*code),
            CloudError::Transport(_) | CloudError::Decode(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(HTTP_NOT_FOUND)
    }

    pub fn is_forbidden(&self) -> bool {
        self.code() == Some(HTTP_FORBIDDEN)
    }
}

/// Document level access to the compute API.
///
/// Implementations own transport concerns such as authentication, per call
/// timeouts and waiting for long running operations. Documents are exchanged
/// as JSON in the schema of the requested track.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    fn project(&self) -> &str;

    async fn get(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<Value, CloudError>;

    async fn list(&self, kind: ResourceKind, version: Version, location: &Location) -> Result<Vec<Value>, CloudError>;

    async fn insert(&self, kind: ResourceKind, version: Version, key: &ResourceKey, document: Value) -> Result<(), CloudError>;

    async fn update(&self, kind: ResourceKind, version: Version, key: &ResourceKey, document: Value) -> Result<(), CloudError>;

    async fn delete(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<(), CloudError>;

    async fn backend_service_health(&self, version: Version, key: &ResourceKey, group: &str) -> Result<BackendServiceGroupHealth, CloudError>;

    /// Network tags of the instances backing the named nodes.
    async fn node_tags(&self, node_names: &[String]) -> Result<Vec<String>, CloudError>;
}
