//! Nested wire objects shared by every API track, and the macros that declare
//! the per track top level resources.

use std::collections::BTreeMap;

/// Zero values are left off the wire.
pub fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Declares a wire object whose zero valued fields are elided on output.
macro_rules! wire_object {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "crate::compute::types::is_zero")]
                pub $field: $ty,
            )*
        }
    };
}

/// Declares one track of a resource kind together with its conversions to and
/// from the canonical shape. Naming a field the canonical shape lacks, or with
/// a different type, fails to compile.
macro_rules! wire_resource {
    ($(#[$meta:meta])* $name:ident => $canonical:ty { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        crate::compute::types::wire_object!($(#[$meta])* $name { $($(#[$fmeta])* $field : $ty),* });

        impl From<$name> for $canonical {
            #[allow(clippy::needless_update)]
            fn from(wire: $name) -> Self {
                Self {
                    $($field: wire.$field,)*
                    ..Default::default()
                }
            }
        }

        impl From<&$canonical> for $name {
            fn from(canonical: &$canonical) -> Self {
                Self {
                    $($field: canonical.$field.clone(),)*
                }
            }
        }
    };
}

pub(crate) use wire_object;
pub(crate) use wire_resource;

wire_object!(Backend {
    group: String,
    balancing_mode: String,
    capacity_scaler: f64,
    max_rate_per_endpoint: f64,
    max_rate_per_instance: f64,
    max_utilization: f64,
    description: String,
});

wire_object!(ConnectionDraining { draining_timeout_sec: i64 });

wire_object!(CacheKeyPolicy {
    include_host: bool,
    include_protocol: bool,
    include_query_string: bool,
    query_string_blacklist: Vec<String>,
    query_string_whitelist: Vec<String>,
});

wire_object!(BackendServiceCdnPolicy {
    cache_key_policy: Option<CacheKeyPolicy>,
    signed_url_cache_max_age_sec: i64,
    signed_url_key_names: Vec<String>,
});

wire_object!(BackendServiceIap {
    enabled: bool,
    oauth2_client_id: String,
    oauth2_client_secret: String,
});

wire_object!(BackendServiceLogConfig { enable: bool, sample_rate: f64 });

wire_object!(HostRule {
    description: String,
    hosts: Vec<String>,
    path_matcher: String,
});

wire_object!(PathRule { paths: Vec<String>, service: String });

wire_object!(PathMatcher {
    name: String,
    description: String,
    default_service: String,
    path_rules: Vec<PathRule>,
});

wire_object!(UrlMapTest {
    description: String,
    host: String,
    path: String,
    service: String,
});

wire_object!(HttpHeaderOption {
    header_name: String,
    header_value: String,
    replace: bool,
});

wire_object!(HttpHeaderAction {
    request_headers_to_add: Vec<HttpHeaderOption>,
    request_headers_to_remove: Vec<String>,
    response_headers_to_add: Vec<HttpHeaderOption>,
    response_headers_to_remove: Vec<String>,
});

wire_object!(HttpRedirectAction {
    host_redirect: String,
    path_redirect: String,
    https_redirect: bool,
    redirect_response_code: String,
    strip_query: bool,
});

wire_object!(NamedPort { name: String, port: i64 });

wire_object!(FirewallAllowed {
    #[serde(rename = "IPProtocol")]
    ip_protocol: String,
    ports: Vec<String>,
});

wire_object!(HealthStatus {
    health_state: String,
    instance: String,
    ip_address: String,
    port: i64,
});

wire_object!(BackendServiceGroupHealth { health_status: Vec<HealthStatus> });

/// Labels as sent on the wire.
pub type Labels = BTreeMap<String, String>;
