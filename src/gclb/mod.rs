//! The load balancer resource graph rooted at a VIP: discovery and deletion
//! checks.

mod deletion;
mod resolver;
mod validator;

use std::collections::BTreeMap;

pub use deletion::{DeletionError, DeletionFailure, FailureReason, GclbDeleteOptions, DEFAULT_BACKEND_SERVICE};
pub use resolver::GraphResolver;
use thiserror::Error;
pub use validator::{
    BasicHttpValidator, FeatureValidator, L7IlbValidator, LocalityLbPolicyValidator, Policy, PolicyMap, ResourceVersions, SecurityPolicyValidator,
};

use crate::{
    common::{ResourceKey, Scope, Version},
    composite::{
        BackendService, CompositeError, ForwardingRule, InstanceGroup, NetworkEndpointGroup, TargetHttpProxy, TargetHttpsProxy, UrlMap,
    },
    compute::{ResourceIdError, ResourceKind},
};

/// Path segment of backend group urls pointing at network endpoint groups.
pub const NEG_RESOURCE_TYPE: &str = "networkEndpointGroup";
/// Path segment of backend group urls pointing at instance groups.
pub const IG_RESOURCE_TYPE: &str = "instanceGroup";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unable to get {kind} {key} at {version}: {source}")]
    Fetch {
        kind: ResourceKind,
        key: ResourceKey,
        version: Version,
        source: CompositeError,
    },
    #[error("unable to list {kind}: {source}")]
    List { kind: ResourceKind, source: CompositeError },
    #[error("invalid reference {url:?}: {source}")]
    InvalidReference { url: String, source: ResourceIdError },
    #[error("unhandled target {target:?} of forwarding rule {rule}")]
    UnhandledTarget { rule: ResourceKey, target: String },
    #[error("target proxies reference different url maps {first} != {second}")]
    UrlMapMismatch { first: ResourceKey, second: ResourceKey },
    #[error("no forwarding rules for {0}")]
    NoForwardingRules(String),
    #[error("{kind} is not available at {version} for {scope} scope")]
    Unsupported { kind: ResourceKind, version: Version, scope: Scope },
}

/// Every resource of one load balancer, each at the version it was read at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gclb {
    pub vip: String,
    pub forwarding_rules: BTreeMap<ResourceKey, ForwardingRule>,
    pub target_http_proxies: BTreeMap<ResourceKey, TargetHttpProxy>,
    pub target_https_proxies: BTreeMap<ResourceKey, TargetHttpsProxy>,
    pub url_maps: BTreeMap<ResourceKey, UrlMap>,
    pub backend_services: BTreeMap<ResourceKey, BackendService>,
    pub network_endpoint_groups: BTreeMap<ResourceKey, NetworkEndpointGroup>,
    pub instance_groups: BTreeMap<ResourceKey, InstanceGroup>,
}

impl Gclb {
    pub fn new(vip: &str) -> Self {
        Self {
            vip: vip.to_owned(),
            ..Default::default()
        }
    }
}
