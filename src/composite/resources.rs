//! Canonical resource shapes: the union of every track's fields, plus the
//! controller-only version and scope markers which never reach the wire.

use crate::{
    common::{Scope, Version},
    compute::types::{
        Backend, BackendServiceCdnPolicy, BackendServiceIap, BackendServiceLogConfig, ConnectionDraining, FirewallAllowed, HostRule,
        HttpHeaderAction, HttpRedirectAction, Labels, NamedPort, PathMatcher, UrlMapTest,
    },
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForwardingRule {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub ip_address: String,
    pub ip_protocol: String,
    pub port_range: String,
    pub ports: Vec<String>,
    pub target: String,
    pub backend_service: String,
    pub load_balancing_scheme: String,
    pub network: String,
    pub subnetwork: String,
    pub network_tier: String,
    pub all_ports: bool,
    pub labels: Labels,
    pub label_fingerprint: String,
    pub fingerprint: String,
    pub service_label: String,
    pub service_name: String,
    pub allow_global_access: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetHttpProxy {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub url_map: String,
    pub fingerprint: String,
    pub proxy_bind: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetHttpsProxy {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub url_map: String,
    pub ssl_certificates: Vec<String>,
    pub ssl_policy: String,
    pub quic_override: String,
    pub fingerprint: String,
    pub certificate_map: String,
    pub server_tls_policy: String,
    pub proxy_bind: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UrlMap {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub default_service: String,
    pub host_rules: Vec<HostRule>,
    pub path_matchers: Vec<PathMatcher>,
    pub tests: Vec<UrlMapTest>,
    pub fingerprint: String,
    pub header_action: Option<HttpHeaderAction>,
    pub default_url_redirect: Option<HttpRedirectAction>,
}

impl UrlMap {
    /// Default service, path matcher defaults and path rule services, each
    /// once, in order of first appearance.
    pub fn referenced_services(&self) -> Vec<String> {
        let mut services: Vec<String> = vec![];
        let candidates = std::iter::once(&self.default_service).chain(self.path_matchers.iter().flat_map(|matcher| {
            std::iter::once(&matcher.default_service).chain(matcher.path_rules.iter().map(|rule| &rule.service))
        }));
        for service in candidates {
            if !service.is_empty() && !services.contains(service) {
                services.push(service.clone());
            }
        }
        services
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendService {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub backends: Vec<Backend>,
    pub health_checks: Vec<String>,
    pub port: i64,
    pub port_name: String,
    pub protocol: String,
    pub timeout_sec: i64,
    pub load_balancing_scheme: String,
    pub session_affinity: String,
    pub affinity_cookie_ttl_sec: i64,
    pub connection_draining: Option<ConnectionDraining>,
    pub cdn_policy: Option<BackendServiceCdnPolicy>,
    pub enable_cdn: bool,
    pub iap: Option<BackendServiceIap>,
    pub fingerprint: String,
    pub custom_request_headers: Vec<String>,
    pub log_config: Option<BackendServiceLogConfig>,
    pub security_policy: String,
    pub locality_lb_policy: String,
    pub custom_response_headers: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkEndpointGroup {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub zone: String,
    pub network: String,
    pub subnetwork: String,
    pub network_endpoint_type: String,
    pub default_port: i64,
    pub size: i64,
    pub annotations: Labels,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceGroup {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub zone: String,
    pub network: String,
    pub subnetwork: String,
    pub size: i64,
    pub named_ports: Vec<NamedPort>,
    pub fingerprint: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Firewall {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub network: String,
    pub priority: i64,
    pub direction: String,
    pub source_ranges: Vec<String>,
    pub target_tags: Vec<String>,
    pub allowed: Vec<FirewallAllowed>,
    pub disabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subnetwork {
    pub version: Version,
    pub scope: Scope,
    pub name: String,
    pub description: String,
    pub self_link: String,
    pub creation_timestamp: String,
    pub region: String,
    pub network: String,
    pub ip_cidr_range: String,
    pub gateway_address: String,
    pub purpose: String,
    pub role: String,
    pub private_ip_google_access: bool,
    pub enable_flow_logs: bool,
}
