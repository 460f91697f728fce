use std::collections::BTreeMap;

use crate::{
    common::{Scope, Version},
    compute::ResourceKind,
    features::{l7_ilb_scope, l7_ilb_version, Feature},
};

/// API version a feature needs for each kind of a load balancer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceVersions {
    pub forwarding_rule: Version,
    pub target_http_proxy: Version,
    pub target_https_proxy: Version,
    pub url_map: Version,
    pub backend_service: Version,
    pub network_endpoint_group: Version,
    pub instance_group: Version,
}

impl ResourceVersions {
    pub fn version(&self, kind: ResourceKind) -> Version {
        match kind {
            ResourceKind::ForwardingRule => self.forwarding_rule,
            ResourceKind::TargetHttpProxy => self.target_http_proxy,
            ResourceKind::TargetHttpsProxy => self.target_https_proxy,
            ResourceKind::UrlMap => self.url_map,
            ResourceKind::BackendService => self.backend_service,
            ResourceKind::NetworkEndpointGroup => self.network_endpoint_group,
            ResourceKind::InstanceGroup => self.instance_group,
            ResourceKind::Firewall | ResourceKind::Subnetwork => Version::Ga,
        }
    }
}

/// A feature exercised by a load balancer, stating which API versions and
/// which scope its resources have to be read at.
pub trait FeatureValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn resource_versions(&self) -> ResourceVersions {
        ResourceVersions::default()
    }

    /// Scope of the load balancer's forwarding rules, proxies, url map and
    /// backend services.
    fn scope(&self) -> Scope {
        Scope::Global
    }
}

pub struct BasicHttpValidator;

impl FeatureValidator for BasicHttpValidator {
    fn name(&self) -> &'static str {
        "BasicHTTP"
    }
}

pub struct SecurityPolicyValidator;

impl FeatureValidator for SecurityPolicyValidator {
    fn name(&self) -> &'static str {
        Feature::SecurityPolicy.as_str()
    }

    fn resource_versions(&self) -> ResourceVersions {
        ResourceVersions {
            backend_service: Feature::SecurityPolicy.version(),
            ..Default::default()
        }
    }
}

pub struct LocalityLbPolicyValidator;

impl FeatureValidator for LocalityLbPolicyValidator {
    fn name(&self) -> &'static str {
        Feature::LocalityLbPolicy.as_str()
    }

    fn resource_versions(&self) -> ResourceVersions {
        ResourceVersions {
            backend_service: Feature::LocalityLbPolicy.version(),
            ..Default::default()
        }
    }
}

pub struct L7IlbValidator;

impl FeatureValidator for L7IlbValidator {
    fn name(&self) -> &'static str {
        Feature::L7Ilb.as_str()
    }

    fn resource_versions(&self) -> ResourceVersions {
        let version = l7_ilb_version();
        ResourceVersions {
            forwarding_rule: version,
            target_http_proxy: version,
            target_https_proxy: version,
            url_map: version,
            backend_service: version,
            ..Default::default()
        }
    }

    fn scope(&self) -> Scope {
        l7_ilb_scope()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    pub version: Version,
    pub scope: Scope,
}

const GRAPH_KINDS: &[ResourceKind] = &[
    ResourceKind::ForwardingRule,
    ResourceKind::TargetHttpProxy,
    ResourceKind::TargetHttpsProxy,
    ResourceKind::UrlMap,
    ResourceKind::BackendService,
    ResourceKind::NetworkEndpointGroup,
    ResourceKind::InstanceGroup,
];

/// Version and scope to read each kind at, folded once from every validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyMap {
    policies: BTreeMap<ResourceKind, Policy>,
}

impl PolicyMap {
    pub fn from_validators(validators: &[Box<dyn FeatureValidator>]) -> Self {
        let regional = validators.iter().any(|validator| validator.scope() == Scope::Regional);
        let policies = GRAPH_KINDS
            .iter()
            .map(|kind| {
                let version = validators.iter().map(|validator| validator.resource_versions().version(*kind)).max().unwrap_or_default();
                let scope = match kind {
                    ResourceKind::NetworkEndpointGroup | ResourceKind::InstanceGroup => Scope::Zonal,
                    _ if regional => Scope::Regional,
                    _ => Scope::Global,
                };
                (*kind, Policy { version, scope })
            })
            .collect();
        Self { policies }
    }

    pub fn get(&self, kind: ResourceKind) -> Policy {
        self.policies.get(&kind).copied().unwrap_or_default()
    }
}
