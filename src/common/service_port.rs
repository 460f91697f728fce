use std::fmt::Display;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::Namer;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl Display for NamespacedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServicePortId {
    pub service: NamespacedName,
    /// Port number or port name as written in the ingress backend.
    pub port: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppProtocol {
    #[default]
    Http,
    Https,
    Http2,
}

impl AppProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            AppProtocol::Http => "HTTP",
            AppProtocol::Https => "HTTPS",
            AppProtocol::Http2 => "HTTP2",
        }
    }
}

/// Per service port settings taken from the service's backend configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct BackendConfig {
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub security_policy: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub custom_request_headers: Vec<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub locality_lb_policy: Option<String>,
}

/// A service port referenced by an ingress, as translated for load balancing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ServicePort {
    pub id: ServicePortId,
    #[builder(default)]
    #[serde(default)]
    pub node_port: i64,
    #[builder(default)]
    #[serde(default)]
    pub protocol: AppProtocol,
    /// Name of the service port, used to match endpoint ports.
    #[builder(default, setter(into))]
    #[serde(default)]
    pub port_name: String,
    /// Container port number, or a container port name to be resolved
    /// through the service's endpoints.
    #[builder(default)]
    #[serde(default)]
    pub target_port: String,
    #[builder(default)]
    #[serde(default)]
    pub neg_enabled: bool,
    #[builder(default)]
    #[serde(default)]
    pub l7_ilb_enabled: bool,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub backend_config: Option<BackendConfig>,
}

impl ServicePort {
    pub fn backend_name(&self, namer: &Namer) -> String {
        if self.neg_enabled {
            namer.neg(&self.id.service.namespace, &self.id.service.name, &self.id.port)
        } else {
            namer.instance_group_backend(self.node_port)
        }
    }

    /// Configured security policy; an empty name means none.
    pub fn security_policy(&self) -> Option<&str> {
        self.backend_config.as_ref().and_then(|config| config.security_policy.as_deref()).filter(|policy| !policy.is_empty())
    }

    pub fn custom_request_headers(&self) -> &[String] {
        self.backend_config.as_ref().map_or(&[], |config| config.custom_request_headers.as_slice())
    }

    pub fn locality_lb_policy(&self) -> Option<&str> {
        self.backend_config.as_ref().and_then(|config| config.locality_lb_policy.as_deref()).filter(|policy| !policy.is_empty())
    }
}
