//! Stable (`v1`) wire schemas.

use super::types::{
    wire_resource, Backend, BackendServiceCdnPolicy, BackendServiceIap, ConnectionDraining, FirewallAllowed, HostRule, Labels, NamedPort,
    PathMatcher, UrlMapTest,
};
use crate::composite;

wire_resource!(ForwardingRule => composite::ForwardingRule {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    region: String,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    #[serde(rename = "IPProtocol")]
    ip_protocol: String,
    port_range: String,
    ports: Vec<String>,
    target: String,
    backend_service: String,
    load_balancing_scheme: String,
    network: String,
    subnetwork: String,
    network_tier: String,
    all_ports: bool,
    labels: Labels,
    label_fingerprint: String,
    fingerprint: String,
});

wire_resource!(TargetHttpProxy => composite::TargetHttpProxy {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    region: String,
    url_map: String,
    fingerprint: String,
});

wire_resource!(TargetHttpsProxy => composite::TargetHttpsProxy {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    region: String,
    url_map: String,
    ssl_certificates: Vec<String>,
    ssl_policy: String,
    quic_override: String,
    fingerprint: String,
});

wire_resource!(UrlMap => composite::UrlMap {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    region: String,
    default_service: String,
    host_rules: Vec<HostRule>,
    path_matchers: Vec<PathMatcher>,
    tests: Vec<UrlMapTest>,
    fingerprint: String,
});

wire_resource!(BackendService => composite::BackendService {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    region: String,
    backends: Vec<Backend>,
    health_checks: Vec<String>,
    port: i64,
    port_name: String,
    protocol: String,
    timeout_sec: i64,
    load_balancing_scheme: String,
    session_affinity: String,
    affinity_cookie_ttl_sec: i64,
    connection_draining: Option<ConnectionDraining>,
    cdn_policy: Option<BackendServiceCdnPolicy>,
    #[serde(rename = "enableCDN")]
    enable_cdn: bool,
    iap: Option<BackendServiceIap>,
    fingerprint: String,
});

wire_resource!(NetworkEndpointGroup => composite::NetworkEndpointGroup {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    zone: String,
    network: String,
    subnetwork: String,
    network_endpoint_type: String,
    default_port: i64,
    size: i64,
});

wire_resource!(InstanceGroup => composite::InstanceGroup {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    zone: String,
    network: String,
    subnetwork: String,
    size: i64,
    named_ports: Vec<NamedPort>,
    fingerprint: String,
});

wire_resource!(Firewall => composite::Firewall {
    name: String,
    description: String,
    self_link: String,
    creation_timestamp: String,
    network: String,
    priority: i64,
    direction: String,
    source_ranges: Vec<String>,
    target_tags: Vec<String>,
    allowed: Vec<FirewallAllowed>,
    disabled: bool,
});
