use std::fmt::Display;

use thiserror::Error;

use super::{KindRegistry, ResourceKind};
use crate::common::{Location, ResourceKey, Version};

pub const COMPUTE_BASE_URL: &str = "https://www.googleapis.com/compute";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("malformed resource url {0:?}")]
    Malformed(String),
    #[error("unknown collection {collection:?} in {url:?}")]
    UnknownCollection { collection: String, url: String },
}

/// A fully qualified resource reference, as carried by self links and by the
/// reference fields of other resources.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId {
    pub project: String,
    pub kind: ResourceKind,
    pub key: ResourceKey,
}

impl ResourceId {
    pub fn new(project: &str, kind: ResourceKind, key: ResourceKey) -> Self {
        Self {
            project: project.to_owned(),
            kind,
            key,
        }
    }

    /// Parses a full self link or a partial `projects/...`, `global/...`,
    /// `regions/...`, `zones/...` path.
    pub fn parse(registry: &KindRegistry, url: &str) -> Result<Self, ResourceIdError> {
        let malformed = || ResourceIdError::Malformed(url.to_owned());
        let path = match url.find("/projects/") {
            Some(index) => &url[index + 1..],
            None => url.trim_start_matches('/'),
        };
        let parts: Vec<&str> = path.split('/').collect();
        let (project, rest) = match parts.as_slice() {
            ["projects", project, rest @ ..] => (*project, rest),
            rest => ("", rest),
        };

        let (location, collection, name) = match rest {
            ["global", collection, name] => (Location::Global, *collection, *name),
            ["regions", region, collection, name] if !region.is_empty() => (Location::Region((*region).to_owned()), *collection, *name),
            ["zones", zone, collection, name] if !zone.is_empty() => (Location::Zone((*zone).to_owned()), *collection, *name),
            _ => return Err(malformed()),
        };
        if name.is_empty() {
            return Err(malformed());
        }

        let kind = registry.kind_for_collection(collection).ok_or_else(|| ResourceIdError::UnknownCollection {
            collection: collection.to_owned(),
            url: url.to_owned(),
        })?;

        Ok(Self {
            project: project.to_owned(),
            kind,
            key: ResourceKey {
                name: name.to_owned(),
                location,
            },
        })
    }

    /// Renders the self link of this resource at `version`. `None` when the
    /// kind has no collection at the key's scope.
    pub fn self_link(&self, registry: &KindRegistry, version: Version) -> Option<String> {
        let collection = registry.collection(self.kind, self.key.scope())?;
        Some(format!(
            "{COMPUTE_BASE_URL}/{}/projects/{}/{}/{collection}/{}",
            version.api_path(),
            self.project,
            self.key.location.path(),
            self.key.name
        ))
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let registry = KindRegistry::new();
        let id = ResourceId::parse(
            &registry,
            "https://www.googleapis.com/compute/v1/projects/mock-project/global/targetHttpProxies/k8s-tp-default-ing1",
        )
        .unwrap();
        assert_eq!(id.project, "mock-project");
        assert_eq!(id.kind, ResourceKind::TargetHttpProxy);
        assert_eq!(id.key, ResourceKey::global("k8s-tp-default-ing1"));
    }

    #[test]
    fn test_parse_partial_paths() {
        let registry = KindRegistry::new();
        let id = ResourceId::parse(&registry, "projects/p1/zones/us-central1-b/networkEndpointGroups/neg-1").unwrap();
        assert_eq!(id.kind, ResourceKind::NetworkEndpointGroup);
        assert_eq!(id.key, ResourceKey::zonal("neg-1", "us-central1-b"));

        let id = ResourceId::parse(&registry, "regions/us-central1/backendServices/bs-1").unwrap();
        assert_eq!(id.project, "");
        assert_eq!(id.key, ResourceKey::regional("bs-1", "us-central1"));
    }

    #[test]
    fn test_parse_errors() {
        let registry = KindRegistry::new();
        assert!(matches!(ResourceId::parse(&registry, ""), Err(ResourceIdError::Malformed(_))));
        assert!(matches!(ResourceId::parse(&registry, "projects/p1/global/urlMaps"), Err(ResourceIdError::Malformed(_))));
        assert!(matches!(ResourceId::parse(&registry, "projects/p1/global/urlMaps/"), Err(ResourceIdError::Malformed(_))));
        assert!(matches!(
            ResourceId::parse(&registry, "projects/p1/global/targetPools/tp"),
            Err(ResourceIdError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn test_self_link_parses_back() {
        let registry = KindRegistry::new();
        let id = ResourceId::new("p1", ResourceKind::BackendService, ResourceKey::regional("bs", "europe-west1"));
        let link = id.self_link(&registry, Version::Alpha).unwrap();
        assert_eq!(link, "https://www.googleapis.com/compute/alpha/projects/p1/regions/europe-west1/backendServices/bs");
        assert_eq!(ResourceId::parse(&registry, &link).unwrap(), id);

        let id = ResourceId::new("p1", ResourceKind::InstanceGroup, ResourceKey::global("ig"));
        assert_eq!(id.self_link(&registry, Version::Ga), None);
    }
}
