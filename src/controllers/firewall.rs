use std::{sync::Arc, time::Duration};

use k8s_openapi::api::{core::v1::Service, networking::v1::Ingress};
use kube::{runtime::events::EventType, ResourceExt};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use typed_builder::TypedBuilder;

use super::{CacheSync, ControllerError, EventRecorder, IngressLister, IngressTranslator, NodeLister, STORE_SYNC_POLL_PERIOD};
use crate::{
    common::{
        is_gce_ingress, is_gce_l7_ilb_ingress, is_gce_multi_cluster_ingress, references_service, suppresses_firewall_xpn_error, ServicePort, TaskQueue,
    },
    composite::CompositeCloud,
    features::ilb_subnet_source_range,
    firewalls::{FirewallError, SingleFirewallPool},
};

/// The only key ever queued; every trigger collapses into one pending sync.
pub const QUEUE_KEY: &str = "queueKey";
const XPN_EVENT_REASON: &str = "XPN";

#[derive(TypedBuilder)]
pub struct FirewallControllerContext {
    ingresses: Arc<dyn IngressLister>,
    nodes: Arc<dyn NodeLister>,
    translator: Arc<dyn IngressTranslator>,
    recorder: Arc<dyn EventRecorder>,
    caches: Arc<dyn CacheSync>,
    firewall_pool: Arc<dyn SingleFirewallPool>,
    cloud: CompositeCloud,
    #[builder(default)]
    enable_l7_ilb: bool,
    #[builder(default, setter(into))]
    network: String,
    #[builder(default = STORE_SYNC_POLL_PERIOD)]
    store_sync_poll_period: Duration,
}

/// Keeps the cluster's L7 firewall rule in line with the set of GCE ingresses.
#[derive(TypedBuilder)]
pub struct FirewallController {
    ctx: Arc<FirewallControllerContext>,
    queue: TaskQueue,
}

impl FirewallController {
    pub fn on_ingress_change(&self, ingress: &Ingress) {
        if !is_gce_ingress(ingress, self.ctx.enable_l7_ilb) && !is_gce_multi_cluster_ingress(ingress) {
            return;
        }
        debug!("Ingress {}/{} changed", ingress.namespace().unwrap_or_default(), ingress.name_any());
        self.queue.enqueue(QUEUE_KEY);
    }

    pub fn on_service_change(&self, service: &Service) {
        if self.ctx.ingresses.list().iter().any(|ingress| references_service(ingress, service)) {
            debug!("Service {}/{} referenced by an ingress changed", service.namespace().unwrap_or_default(), service.name_any());
            self.queue.enqueue(QUEUE_KEY);
        }
    }

    pub async fn sync(&self) -> Result<(), ControllerError> {
        self.ctx.sync().await
    }

    pub async fn run(&self) {
        info!("Firewall controller...started");
        let ctx = Arc::clone(&self.ctx);
        self.queue
            .run(move |_key| {
                let ctx = Arc::clone(&ctx);
                async move { ctx.sync().await }
            })
            .await;
        info!("Firewall controller...stopped");
    }

    /// Only called when the process is terminating.
    pub fn shutdown(&self) {
        info!("Shutting down Firewall controller");
        self.queue.shutdown();
    }
}

impl FirewallControllerContext {
    fn to_service_ports(&self, ingresses: &[Ingress]) -> Vec<ServicePort> {
        let mut known_ports = vec![];
        for ingress in ingresses {
            let mut service_ports = self.translator.translate_ingress(ingress);
            if self.enable_l7_ilb && is_gce_l7_ilb_ingress(ingress) {
                for service_port in &mut service_ports {
                    service_port.l7_ilb_enabled = true;
                }
            }
            known_ports.extend(service_ports);
        }
        known_ports
    }

    async fn ilb_firewall_source_range(&self, ingresses: &[Ingress]) -> Result<Option<String>, ControllerError> {
        if !ingresses.iter().any(is_gce_l7_ilb_ingress) {
            return Ok(None);
        }
        let range = ilb_subnet_source_range(&self.cloud, self.cloud.region(), &self.network).await.map_err(ControllerError::IlbSubnet)?;
        Ok(Some(range))
    }

    async fn raise_xpn_events(&self, ingresses: &[Ingress], message: &str) {
        for ingress in ingresses.iter().filter(|ingress| !suppresses_firewall_xpn_error(ingress)) {
            if let Err(e) = self.recorder.record(ingress, EventType::Normal, XPN_EVENT_REASON, message).await {
                warn!("Unable to record event for {}/{}: {e}", ingress.namespace().unwrap_or_default(), ingress.name_any());
            }
        }
    }

    #[instrument(level = "info", name = "FirewallController::sync", skip_all)]
    async fn sync(&self) -> Result<(), ControllerError> {
        if !self.caches.has_synced() {
            sleep(self.store_sync_poll_period).await;
            return Err(ControllerError::CachesNotSynced);
        }
        debug!("Syncing firewall");

        let gce_ingresses: Vec<Ingress> = self.ingresses.list().into_iter().filter(|ingress| is_gce_ingress(ingress, self.enable_l7_ilb)).collect();

        if gce_ingresses.is_empty() {
            info!("No GCE ingresses left, removing firewall rule");
            return match self.firewall_pool.gc().await {
                Ok(()) => Ok(()),
                Err(FirewallError::Xpn(e)) => {
                    warn!("Unable to remove firewall rule: {e}");
                    Ok(())
                },
                Err(e) => Err(ControllerError::Firewall(e)),
            };
        }

        let service_ports = self.to_service_ports(&gce_ingresses);
        let node_names = self.nodes.ready_node_names()?;
        let endpoint_ports = self.translator.gather_endpoint_ports(&service_ports);

        let mut additional_ranges = vec![];
        if self.enable_l7_ilb {
            additional_ranges.extend(self.ilb_firewall_source_range(&gce_ingresses).await?);
        }

        match self.firewall_pool.sync(&node_names, &endpoint_ports, &additional_ranges).await {
            Ok(()) => Ok(()),
            Err(FirewallError::Xpn(e)) => {
                self.raise_xpn_events(&gce_ingresses, &e.message).await;
                Ok(())
            },
            Err(e) => Err(ControllerError::Firewall(e)),
        }
    }
}
