use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::{core::v1::Service, networking::v1::Ingress};
use kube::runtime::events::EventType;

use crate::{common::ServicePort, features::SubnetError, firewalls::FirewallError};

mod firewall;
mod translator;
mod watchers;

pub use firewall::{FirewallController, FirewallControllerContext, QUEUE_KEY};
pub use translator::{gather_endpoint_ports, ServicePortTranslator, APP_PROTOCOLS_ANNOTATION, NEG_ANNOTATION};
pub use watchers::{ClusterStores, ClusterWatchers, KubeEventRecorder};

const STORE_SYNC_POLL_PERIOD: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    CachesNotSynced,
    NodeListing(String),
    IlbSubnet(SubnetError),
    Firewall(FirewallError),
    EventRecording(String),
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub trait IngressLister: Send + Sync {
    fn list(&self) -> Vec<Ingress>;
}

pub trait ServiceLister: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Option<Service>;
}

pub trait EndpointLister: Send + Sync {
    /// TCP port numbers the service's endpoints expose under `port_name`.
    fn endpoint_ports(&self, namespace: &str, service: &str, port_name: &str) -> Vec<i32>;
}

pub trait NodeLister: Send + Sync {
    /// Names of schedulable nodes reporting `Ready`.
    fn ready_node_names(&self) -> Result<Vec<String>, ControllerError>;
}

/// Reports whether the local caches have completed their initial listing.
pub trait CacheSync: Send + Sync {
    fn has_synced(&self) -> bool;
}

pub trait IngressTranslator: Send + Sync {
    /// Every service port the ingress routes to.
    fn translate_ingress(&self, ingress: &Ingress) -> Vec<ServicePort>;

    /// Numeric ports the firewall has to open for `service_ports`.
    fn gather_endpoint_ports(&self, service_ports: &[ServicePort]) -> Vec<String>;
}

#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(&self, ingress: &Ingress, event_type: EventType, reason: &str, message: &str) -> Result<(), ControllerError>;
}
