//! Maps the features enabled on a resource to the API track and scope it has
//! to be read and written at.

mod l7ilb;
mod lbpolicy;

use std::fmt::Display;

pub use l7ilb::{ilb_subnet_source_range, l7_ilb_scope, l7_ilb_version, SubnetError};
pub use lbpolicy::ensure_locality_lb_policy;

use crate::common::{AppProtocol, Description, Scope, ServicePort, Version};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Http2,
    SecurityPolicy,
    CustomRequestHeaders,
    L7Ilb,
    LocalityLbPolicy,
    Neg,
}

pub const ALL_FEATURES: &[Feature] =
    &[Feature::Http2, Feature::SecurityPolicy, Feature::CustomRequestHeaders, Feature::L7Ilb, Feature::LocalityLbPolicy, Feature::Neg];

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Http2 => "HTTP2",
            Feature::SecurityPolicy => "SecurityPolicy",
            Feature::CustomRequestHeaders => "CustomRequestHeaders",
            Feature::L7Ilb => "L7ILB",
            Feature::LocalityLbPolicy => "LocalityLbPolicy",
            Feature::Neg => "NEG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_FEATURES.iter().copied().find(|feature| feature.as_str() == name)
    }

    pub fn version(self) -> Version {
        match self {
            Feature::Http2 | Feature::SecurityPolicy | Feature::CustomRequestHeaders => Version::Beta,
            Feature::L7Ilb | Feature::LocalityLbPolicy => Version::Alpha,
            Feature::Neg => Version::Ga,
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            Feature::L7Ilb => Scope::Regional,
            _ => Scope::Global,
        }
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Least stable version any of `features` needs. Unknown names need nothing.
pub fn version_from_features<S: AsRef<str>>(features: &[S]) -> Version {
    features
        .iter()
        .filter_map(|name| Feature::from_name(name.as_ref()))
        .map(Feature::version)
        .max()
        .unwrap_or_default()
}

pub fn scope_from_features<S: AsRef<str>>(features: &[S]) -> Scope {
    if features.iter().filter_map(|name| Feature::from_name(name.as_ref())).any(|feature| feature.scope() == Scope::Regional) {
        Scope::Regional
    } else {
        Scope::Global
    }
}

/// Version required by the features recorded in a persisted description.
pub fn version_from_description(description: &str) -> Version {
    version_from_features(&Description::parse(description).x_features)
}

pub fn features_from_service_port(sp: &ServicePort) -> Vec<Feature> {
    let mut features = vec![];
    if sp.protocol == AppProtocol::Http2 {
        features.push(Feature::Http2);
    }
    if sp.security_policy().is_some() {
        features.push(Feature::SecurityPolicy);
    }
    if !sp.custom_request_headers().is_empty() {
        features.push(Feature::CustomRequestHeaders);
    }
    if sp.l7_ilb_enabled {
        features.push(Feature::L7Ilb);
    }
    if sp.locality_lb_policy().is_some() {
        features.push(Feature::LocalityLbPolicy);
    }
    if sp.neg_enabled {
        features.push(Feature::Neg);
    }
    features
}

fn names(features: &[Feature]) -> Vec<&'static str> {
    features.iter().map(|feature| feature.as_str()).collect()
}

pub fn version_from_service_port(sp: &ServicePort) -> Version {
    version_from_features(&names(&features_from_service_port(sp)))
}

pub fn scope_from_service_port(sp: &ServicePort) -> Scope {
    scope_from_features(&names(&features_from_service_port(sp)))
}

/// Description identifying the service port a backend service was created for.
pub fn service_port_description(sp: &ServicePort) -> Description {
    Description {
        service_name: sp.id.service.to_string(),
        service_port: sp.id.port.clone(),
        x_features: vec![],
    }
}

/// Records in `description` every feature of `sp` which moves the resource
/// off the stable track or out of global scope.
pub fn set_description(description: &mut Description, sp: &ServicePort) {
    description.x_features = features_from_service_port(sp)
        .into_iter()
        .filter(|feature| feature.version() != Version::Ga || feature.scope() != Scope::Global)
        .map(|feature| feature.as_str().to_owned())
        .collect();
}
