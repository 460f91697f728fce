//! One canonical shape per resource kind, converted to and from each API
//! track, and typed cloud access built on it.

mod cloud;
mod policy;
mod resources;

pub use cloud::{CompositeCloud, CompositeError};
pub use resources::{
    BackendService, Firewall, ForwardingRule, InstanceGroup, NetworkEndpointGroup, Subnetwork, TargetHttpProxy, TargetHttpsProxy, UrlMap,
};
use serde_json::Value;
use thiserror::Error;

use crate::{
    common::{Location, ResourceKey, Scope, Version},
    compute::{alpha, beta, ga, ResourceKind},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("malformed {kind} document at {version}: {message}")]
    Malformed { kind: ResourceKind, version: Version, message: String },
    #[error("{kind} has no {version} representation")]
    UnsupportedVersion { kind: ResourceKind, version: Version },
}

/// A canonical resource convertible to and from the wire schema of each
/// track it exists at.
pub trait CompositeResource: Clone + Default + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Parses a wire document of `version` into the canonical shape.
    fn from_wire(version: Version, document: Value) -> Result<Self, ConversionError>;

    /// Projects onto the schema of `version`, dropping fields that track lacks.
    fn to_wire(&self, version: Version) -> Result<Value, ConversionError>;

    fn name(&self) -> &str;
    fn version(&self) -> Version;
    fn set_version(&mut self, version: Version);
    fn scope(&self) -> Scope;
    fn set_scope(&mut self, scope: Scope);

    /// Location taken from the resource's region or zone field.
    fn location(&self) -> Location;

    fn key(&self) -> ResourceKey {
        ResourceKey {
            name: self.name().to_owned(),
            location: self.location(),
        }
    }
}

/// Region and zone fields hold either a bare name or a url.
fn last_segment(value: &str) -> String {
    value.rsplit('/').next().unwrap_or(value).to_owned()
}

macro_rules! composite_resource {
    ($canonical:ident, [$($loc_field:ident => $loc_variant:ident),*], { $($track:ident => $wire:ty),+ $(,)? }) => {
        impl CompositeResource for $canonical {
            const KIND: ResourceKind = ResourceKind::$canonical;

            fn from_wire(version: Version, document: Value) -> Result<Self, ConversionError> {
                let mut resource: Self = match version {
                    $(Version::$track => serde_json::from_value::<$wire>(document)
                        .map_err(|e| ConversionError::Malformed {
                            kind: Self::KIND,
                            version,
                            message: e.to_string(),
                        })?
                        .into(),)+
                    #[allow(unreachable_patterns)]
                    _ => return Err(ConversionError::UnsupportedVersion { kind: Self::KIND, version }),
                };
                resource.version = version;
                resource.scope = resource.location().scope();
                Ok(resource)
            }

            fn to_wire(&self, version: Version) -> Result<Value, ConversionError> {
                let mut document = match version {
                    $(Version::$track => serde_json::to_value(<$wire>::from(self)).map_err(|e| ConversionError::Malformed {
                        kind: Self::KIND,
                        version,
                        message: e.to_string(),
                    })?,)+
                    #[allow(unreachable_patterns)]
                    _ => return Err(ConversionError::UnsupportedVersion { kind: Self::KIND, version }),
                };
                policy::apply_force_send(Self::KIND, &mut document);
                Ok(document)
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn version(&self) -> Version {
                self.version
            }

            fn set_version(&mut self, version: Version) {
                self.version = version;
            }

            fn scope(&self) -> Scope {
                self.scope
            }

            fn set_scope(&mut self, scope: Scope) {
                self.scope = scope;
            }

            fn location(&self) -> Location {
                $(
                    if !self.$loc_field.is_empty() {
                        return Location::$loc_variant(last_segment(&self.$loc_field));
                    }
                )*
                Location::Global
            }
        }
    };
}

composite_resource!(ForwardingRule, [region => Region], { Ga => ga::ForwardingRule, Beta => beta::ForwardingRule, Alpha => alpha::ForwardingRule });
composite_resource!(TargetHttpProxy, [region => Region], { Ga => ga::TargetHttpProxy, Beta => beta::TargetHttpProxy, Alpha => alpha::TargetHttpProxy });
composite_resource!(TargetHttpsProxy, [region => Region], { Ga => ga::TargetHttpsProxy, Beta => beta::TargetHttpsProxy, Alpha => alpha::TargetHttpsProxy });
composite_resource!(UrlMap, [region => Region], { Ga => ga::UrlMap, Beta => beta::UrlMap, Alpha => alpha::UrlMap });
composite_resource!(BackendService, [region => Region], { Ga => ga::BackendService, Beta => beta::BackendService, Alpha => alpha::BackendService });
composite_resource!(NetworkEndpointGroup, [zone => Zone], { Ga => ga::NetworkEndpointGroup, Beta => beta::NetworkEndpointGroup, Alpha => alpha::NetworkEndpointGroup });
composite_resource!(InstanceGroup, [zone => Zone], { Ga => ga::InstanceGroup });
composite_resource!(Firewall, [], { Ga => ga::Firewall });
composite_resource!(Subnetwork, [region => Region], { Beta => beta::Subnetwork, Alpha => alpha::Subnetwork });
