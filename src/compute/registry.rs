use std::{collections::BTreeMap, fmt::Display};

use crate::common::{Scope, Version};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ResourceKind {
    ForwardingRule,
    TargetHttpProxy,
    TargetHttpsProxy,
    UrlMap,
    BackendService,
    NetworkEndpointGroup,
    InstanceGroup,
    Firewall,
    Subnetwork,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Schema facts about one composite kind.
#[derive(Clone, Debug)]
pub struct KindInfo {
    pub kind: ResourceKind,
    pub global_collection: Option<&'static str>,
    pub regional_collection: Option<&'static str>,
    pub zonal_collection: Option<&'static str>,
    pub global_versions: &'static [Version],
    pub regional_versions: &'static [Version],
    pub zonal_versions: &'static [Version],
    pub has_update: bool,
}

impl KindInfo {
    pub fn collection(&self, scope: Scope) -> Option<&'static str> {
        match scope {
            Scope::Global => self.global_collection,
            Scope::Regional => self.regional_collection,
            Scope::Zonal => self.zonal_collection,
        }
    }

    pub fn supports(&self, version: Version, scope: Scope) -> bool {
        let versions = match scope {
            Scope::Global => self.global_versions,
            Scope::Regional => self.regional_versions,
            Scope::Zonal => self.zonal_versions,
        };
        self.collection(scope).is_some() && versions.contains(&version)
    }
}

const ALL: &[Version] = &[Version::Ga, Version::Beta, Version::Alpha];
const ALPHA_ONLY: &[Version] = &[Version::Alpha];
const GA_ONLY: &[Version] = &[Version::Ga];
const BETA_AND_ALPHA: &[Version] = &[Version::Beta, Version::Alpha];
const NONE: &[Version] = &[];

const SCHEMA: &[KindInfo] = &[
    KindInfo {
        kind: ResourceKind::ForwardingRule,
        global_collection: Some("globalForwardingRules"),
        regional_collection: Some("forwardingRules"),
        zonal_collection: None,
        global_versions: ALL,
        regional_versions: ALL,
        zonal_versions: NONE,
        has_update: false,
    },
    KindInfo {
        kind: ResourceKind::TargetHttpProxy,
        global_collection: Some("targetHttpProxies"),
        regional_collection: Some("targetHttpProxies"),
        zonal_collection: None,
        global_versions: ALL,
        regional_versions: ALPHA_ONLY,
        zonal_versions: NONE,
        has_update: false,
    },
    KindInfo {
        kind: ResourceKind::TargetHttpsProxy,
        global_collection: Some("targetHttpsProxies"),
        regional_collection: Some("targetHttpsProxies"),
        zonal_collection: None,
        global_versions: ALL,
        regional_versions: ALPHA_ONLY,
        zonal_versions: NONE,
        has_update: false,
    },
    KindInfo {
        kind: ResourceKind::UrlMap,
        global_collection: Some("urlMaps"),
        regional_collection: Some("urlMaps"),
        zonal_collection: None,
        global_versions: ALL,
        regional_versions: ALPHA_ONLY,
        zonal_versions: NONE,
        has_update: true,
    },
    KindInfo {
        kind: ResourceKind::BackendService,
        global_collection: Some("backendServices"),
        regional_collection: Some("backendServices"),
        zonal_collection: None,
        global_versions: ALL,
        regional_versions: ALPHA_ONLY,
        zonal_versions: NONE,
        has_update: true,
    },
    KindInfo {
        kind: ResourceKind::NetworkEndpointGroup,
        global_collection: None,
        regional_collection: None,
        zonal_collection: Some("networkEndpointGroups"),
        global_versions: NONE,
        regional_versions: NONE,
        zonal_versions: ALL,
        has_update: false,
    },
    KindInfo {
        kind: ResourceKind::InstanceGroup,
        global_collection: None,
        regional_collection: None,
        zonal_collection: Some("instanceGroups"),
        global_versions: NONE,
        regional_versions: NONE,
        zonal_versions: GA_ONLY,
        has_update: false,
    },
    KindInfo {
        kind: ResourceKind::Firewall,
        global_collection: Some("firewalls"),
        regional_collection: None,
        zonal_collection: None,
        global_versions: GA_ONLY,
        regional_versions: NONE,
        zonal_versions: NONE,
        has_update: true,
    },
    KindInfo {
        kind: ResourceKind::Subnetwork,
        global_collection: None,
        regional_collection: Some("subnetworks"),
        zonal_collection: None,
        global_versions: NONE,
        regional_versions: BETA_AND_ALPHA,
        zonal_versions: NONE,
        has_update: false,
    },
];

/// Every composite kind known to the controller.
///
/// Built once at startup and handed to whoever needs it; there is no
/// process-wide instance.
#[derive(Clone, Debug)]
pub struct KindRegistry {
    kinds: BTreeMap<ResourceKind, KindInfo>,
    collections: BTreeMap<&'static str, ResourceKind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::from_schema(SCHEMA)
    }

    pub fn from_schema(schema: &[KindInfo]) -> Self {
        let mut kinds = BTreeMap::new();
        let mut collections = BTreeMap::new();
        for info in schema {
            for collection in [info.global_collection, info.regional_collection, info.zonal_collection].into_iter().flatten() {
                collections.insert(collection, info.kind);
            }
            kinds.insert(info.kind, info.clone());
        }
        Self { kinds, collections }
    }

    pub fn info(&self, kind: ResourceKind) -> Option<&KindInfo> {
        self.kinds.get(&kind)
    }

    pub fn kind_for_collection(&self, collection: &str) -> Option<ResourceKind> {
        self.collections.get(collection).copied()
    }

    pub fn collection(&self, kind: ResourceKind, scope: Scope) -> Option<&'static str> {
        self.info(kind).and_then(|info| info.collection(scope))
    }

    pub fn supports(&self, kind: ResourceKind, version: Version, scope: Scope) -> bool {
        self.info(kind).is_some_and(|info| info.supports(version, scope))
    }

    pub fn has_update(&self, kind: ResourceKind) -> bool {
        self.info(kind).is_some_and(|info| info.has_update)
    }
}
