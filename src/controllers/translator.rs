use std::{collections::BTreeMap, sync::Arc};

use itertools::Itertools;
use k8s_openapi::{
    api::{
        core::v1::{Service, ServicePort as KubeServicePort},
        networking::v1::{Ingress, ServiceBackendPort},
    },
    apimachinery::pkg::util::intstr::IntOrString,
};
use kube::ResourceExt;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EndpointLister, IngressTranslator, ServiceLister};
use crate::common::{ingress_backends, AppProtocol, NamespacedName, ServicePort, ServicePortId};

/// Opts service ports into network endpoint groups, `{"ingress": true}`.
pub const NEG_ANNOTATION: &str = "cloud.google.com/neg";
/// Maps port names to backend protocols, `{"https-port": "HTTPS"}`.
pub const APP_PROTOCOLS_ANNOTATION: &str = "cloud.google.com/app-protocols";

#[derive(Deserialize, Default)]
struct NegAnnotation {
    #[serde(default)]
    ingress: bool,
}

fn neg_enabled(service: &Service) -> bool {
    service
        .annotations()
        .get(NEG_ANNOTATION)
        .and_then(|value| serde_json::from_str::<NegAnnotation>(value).ok())
        .is_some_and(|annotation| annotation.ingress)
}

fn app_protocols(service: &Service) -> BTreeMap<String, AppProtocol> {
    service
        .annotations()
        .get(APP_PROTOCOLS_ANNOTATION)
        .and_then(|value| serde_json::from_str(value).ok())
        .unwrap_or_default()
}

fn find_port<'a>(service: &'a Service, backend_port: &ServiceBackendPort) -> Option<&'a KubeServicePort> {
    let ports = service.spec.as_ref()?.ports.as_ref()?;
    match (&backend_port.number, &backend_port.name) {
        (Some(number), _) => ports.iter().find(|port| port.port == *number),
        (None, Some(name)) => ports.iter().find(|port| port.name.as_ref() == Some(name)),
        (None, None) => None,
    }
}

/// Translates ingress backends into service ports using the service and
/// endpoint caches.
pub struct ServicePortTranslator {
    services: Arc<dyn ServiceLister>,
    endpoints: Arc<dyn EndpointLister>,
}

impl ServicePortTranslator {
    pub fn new(services: Arc<dyn ServiceLister>, endpoints: Arc<dyn EndpointLister>) -> Self {
        Self { services, endpoints }
    }
}

impl IngressTranslator for ServicePortTranslator {
    fn translate_ingress(&self, ingress: &Ingress) -> Vec<ServicePort> {
        let namespace = ingress.namespace().unwrap_or_default();
        let mut service_ports: Vec<ServicePort> = vec![];
        for backend in ingress_backends(ingress).into_iter().filter_map(|backend| backend.service.as_ref()) {
            let Some(service) = self.services.get(&namespace, &backend.name) else {
                debug!("Service {namespace}/{} not found", backend.name);
                continue;
            };
            let Some(port) = backend.port.as_ref().and_then(|backend_port| find_port(&service, backend_port)) else {
                debug!("Service {namespace}/{} has no port {:?}", backend.name, backend.port);
                continue;
            };

            let id = ServicePortId {
                service: NamespacedName::new(&namespace, &backend.name),
                port: backend
                    .port
                    .as_ref()
                    .and_then(|backend_port| backend_port.number.map(|number| number.to_string()).or_else(|| backend_port.name.clone()))
                    .unwrap_or_default(),
            };
            if service_ports.iter().any(|known| known.id == id) {
                continue;
            }

            let target_port = match &port.target_port {
                Some(IntOrString::Int(number)) => number.to_string(),
                Some(IntOrString::String(name)) => name.clone(),
                None => port.port.to_string(),
            };
            let protocol = port.name.as_ref().and_then(|name| app_protocols(&service).get(name).copied()).unwrap_or_default();

            service_ports.push(
                ServicePort::builder()
                    .id(id)
                    .port_name(port.name.clone().unwrap_or_default())
                    .node_port(port.node_port.map(i64::from).unwrap_or_default())
                    .protocol(protocol)
                    .target_port(target_port)
                    .neg_enabled(neg_enabled(&service))
                    .build(),
            );
        }
        service_ports
    }

    fn gather_endpoint_ports(&self, service_ports: &[ServicePort]) -> Vec<String> {
        gather_endpoint_ports(service_ports, self.endpoints.as_ref())
    }
}

/// Ports the firewall has to open towards endpoints: the target port of NEG
/// backed service ports and the node port of instance group backed ones.
///
/// A named target port is resolved to the numbers the service's endpoints
/// expose for the service port. Names that resolve to nothing are dropped.
pub fn gather_endpoint_ports(service_ports: &[ServicePort], endpoints: &dyn EndpointLister) -> Vec<String> {
    let mut ports: Vec<i64> = vec![];
    for service_port in service_ports {
        if !service_port.neg_enabled {
            if service_port.node_port > 0 {
                ports.push(service_port.node_port);
            }
            continue;
        }
        if service_port.target_port.is_empty() {
            continue;
        }
        if let Ok(number) = service_port.target_port.parse::<i64>() {
            ports.push(number);
            continue;
        }

        let service = &service_port.id.service;
        let resolved = endpoints.endpoint_ports(&service.namespace, &service.name, &service_port.port_name);
        if resolved.is_empty() {
            warn!("Target port {:?} of service {service} has no endpoint ports, not opening it", service_port.target_port);
        }
        ports.extend(resolved.into_iter().map(i64::from));
    }
    ports.into_iter().filter(|port| *port > 0).sorted().dedup().map(|port| port.to_string()).collect()
}
