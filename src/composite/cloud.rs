use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{CompositeResource, ConversionError};
use crate::{
    common::{Location, ResourceKey, Scope, Version},
    compute::{CloudError, ComputeClient, KindRegistry, ResourceKind},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("{kind} is not available at {version} for {scope} scope")]
    Unsupported { kind: ResourceKind, version: Version, scope: Scope },
    #[error("{0} does not support update")]
    UpdateNotSupported(ResourceKind),
}

impl CompositeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CompositeError::Cloud(e) if e.is_not_found())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, CompositeError::Cloud(e) if e.is_forbidden())
    }
}

/// Typed access to any composite kind over a raw compute client.
#[derive(Clone)]
pub struct CompositeCloud {
    client: Arc<dyn ComputeClient>,
    registry: Arc<KindRegistry>,
    region: String,
}

impl CompositeCloud {
    pub fn new(client: Arc<dyn ComputeClient>, registry: Arc<KindRegistry>, region: &str) -> Self {
        Self {
            client,
            registry,
            region: region.to_owned(),
        }
    }

    pub fn client(&self) -> &Arc<dyn ComputeClient> {
        &self.client
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn project(&self) -> &str {
        self.client.project()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Key for a global or regional resource in the cluster's region.
    pub fn create_key(&self, name: &str, regional: bool) -> ResourceKey {
        if regional {
            ResourceKey::regional(name, &self.region)
        } else {
            ResourceKey::global(name)
        }
    }

    fn check(&self, kind: ResourceKind, version: Version, scope: Scope) -> Result<(), CompositeError> {
        if self.registry.supports(kind, version, scope) {
            Ok(())
        } else {
            Err(CompositeError::Unsupported { kind, version, scope })
        }
    }

    pub async fn get<R: CompositeResource>(&self, version: Version, key: &ResourceKey) -> Result<R, CompositeError> {
        self.check(R::KIND, version, key.scope())?;
        debug!("Getting {} {key} at {version}", R::KIND);
        let document = self.client.get(R::KIND, version, key).await?;
        Ok(R::from_wire(version, document)?)
    }

    pub async fn list<R: CompositeResource>(&self, version: Version, location: &Location) -> Result<Vec<R>, CompositeError> {
        self.check(R::KIND, version, location.scope())?;
        debug!("Listing {} in {location} at {version}", R::KIND);
        let documents = self.client.list(R::KIND, version, location).await?;
        documents.into_iter().map(|document| R::from_wire(version, document).map_err(CompositeError::from)).collect()
    }

    /// Inserts `resource` at its own version.
    pub async fn create<R: CompositeResource>(&self, resource: &R, key: &ResourceKey) -> Result<(), CompositeError> {
        let version = resource.version();
        self.check(R::KIND, version, key.scope())?;
        debug!("Creating {} {key} at {version}", R::KIND);
        let document = resource.to_wire(version)?;
        Ok(self.client.insert(R::KIND, version, key, document).await?)
    }

    /// Updates `resource` at its own version.
    pub async fn update<R: CompositeResource>(&self, resource: &R, key: &ResourceKey) -> Result<(), CompositeError> {
        if !self.registry.has_update(R::KIND) {
            return Err(CompositeError::UpdateNotSupported(R::KIND));
        }
        let version = resource.version();
        self.check(R::KIND, version, key.scope())?;
        debug!("Updating {} {key} at {version}", R::KIND);
        let document = resource.to_wire(version)?;
        Ok(self.client.update(R::KIND, version, key, document).await?)
    }

    pub async fn delete(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<(), CompositeError> {
        self.check(kind, version, key.scope())?;
        debug!("Deleting {kind} {key} at {version}");
        Ok(self.client.delete(kind, version, key).await?)
    }
}

impl std::fmt::Debug for CompositeCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCloud").field("project", &self.project()).field("region", &self.region).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        compute::fake::{FakeCompute, Op},
        composite::{BackendService, ForwardingRule, TargetHttpProxy},
    };

    fn cloud() -> (Arc<FakeCompute>, CompositeCloud) {
        let fake = Arc::new(FakeCompute::default());
        let cloud = CompositeCloud::new(Arc::clone(&fake) as Arc<dyn ComputeClient>, Arc::new(KindRegistry::new()), "us-central1");
        (fake, cloud)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (fake, cloud) = cloud();
        let key = cloud.create_key("bs", false);
        let resource = BackendService {
            version: Version::Beta,
            name: "bs".to_owned(),
            security_policy: "armor".to_owned(),
            ..Default::default()
        };
        cloud.create(&resource, &key).await.unwrap();
        assert_eq!(fake.calls_of(Op::Insert)[0].version, Some(Version::Beta));

        let fetched: BackendService = cloud.get(Version::Beta, &key).await.unwrap();
        assert_eq!(fetched.security_policy, "armor");
        assert_eq!(fetched.fingerprint, "fp-1");
        let fetched: BackendService = cloud.get(Version::Ga, &key).await.unwrap();
        assert_eq!(fetched.security_policy, "");
    }

    #[tokio::test]
    async fn test_unsupported_combinations_rejected_before_calls() {
        let (fake, cloud) = cloud();
        let key = cloud.create_key("bs", true);
        let result = cloud.get::<BackendService>(Version::Ga, &key).await;
        assert_eq!(
            result,
            Err(CompositeError::Unsupported {
                kind: ResourceKind::BackendService,
                version: Version::Ga,
                scope: Scope::Regional
            })
        );

        let proxy = TargetHttpProxy {
            name: "tp".to_owned(),
            ..Default::default()
        };
        let result = cloud.update(&proxy, &ResourceKey::global("tp")).await;
        assert_eq!(result, Err(CompositeError::UpdateNotSupported(ResourceKind::TargetHttpProxy)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (fake, cloud) = cloud();
        fake.seed(ResourceKind::ForwardingRule, &ResourceKey::global("fr1"), json!({"IPAddress": "1.2.3.4"}));
        fake.seed(ResourceKind::ForwardingRule, &ResourceKey::regional("fr2", "us-central1"), json!({"IPAddress": "1.2.3.4"}));
        let rules: Vec<ForwardingRule> = cloud.list(Version::Ga, &Location::Global).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "fr1");

        cloud.delete(ResourceKind::ForwardingRule, Version::Ga, &ResourceKey::global("fr1")).await.unwrap();
        let error = cloud.delete(ResourceKind::ForwardingRule, Version::Ga, &ResourceKey::global("fr1")).await.unwrap_err();
        assert!(error.is_not_found());
    }
}
