mod description;
mod ingress;
mod namer;
mod resource_key;
mod service_port;
mod task_queue;
mod version;

pub use description::Description;
pub use ingress::{
    ingress_backends, is_gce_ingress, is_gce_l7_ilb_ingress, is_gce_multi_cluster_ingress, references_service, suppresses_firewall_xpn_error,
    GCE_INGRESS_CLASS, GCE_L7_ILB_INGRESS_CLASS, GCE_MULTI_CLUSTER_INGRESS_CLASS, INGRESS_CLASS_ANNOTATION, SUPPRESS_FIREWALL_XPN_ERROR_ANNOTATION,
};
pub use namer::Namer;
pub use resource_key::{Location, ResourceKey};
pub use service_port::{AppProtocol, BackendConfig, NamespacedName, ServicePort, ServicePortId};
pub use task_queue::TaskQueue;
pub use version::{is_lower_version, Scope, Version, ALL_VERSIONS};
