use std::sync::Arc;

use futures::FutureExt;
use kube::Client;
use tracing::info;

pub mod backends;
pub mod common;
pub mod composite;
pub mod compute;
pub mod configuration;
pub mod controllers;
pub mod features;
pub mod firewalls;
pub mod gclb;

pub use configuration::Configuration;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

use common::{Namer, TaskQueue};
use composite::CompositeCloud;
use compute::{ComputeClient, GceClient, KindRegistry};
use controllers::{
    CacheSync, ClusterWatchers, EndpointLister, EventRecorder, FirewallController, FirewallControllerContext, IngressLister, IngressTranslator, KubeEventRecorder,
    NodeLister, ServiceLister, ServicePortTranslator,
};
use firewalls::{FirewallRules, SingleFirewallPool};

/// Runs the firewall controller and the cluster watchers feeding it until
/// `shutdown` resolves.
pub async fn start(configuration: Configuration, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> Result<()> {
    info!("{} started", configuration.controller_name);
    let client = Client::try_default().await?;

    let registry = Arc::new(KindRegistry::new());
    let gce = GceClient::new(
        &configuration.compute.endpoint,
        &configuration.cluster.project,
        registry.as_ref().clone(),
        configuration.call_timeout(),
    )?;
    let cloud = CompositeCloud::new(Arc::new(gce) as Arc<dyn ComputeClient>, registry, &configuration.cluster.region);

    let mut namer = Namer::new(&configuration.cluster.uid);
    if let Some(suffix) = &configuration.cluster.firewall_suffix {
        namer = namer.with_firewall_suffix(suffix);
    }

    let firewall_pool = FirewallRules::builder()
        .cloud(cloud.clone())
        .namer(namer)
        .node_port_ranges(configuration.node_port_ranges.clone())
        .health_check_ranges(configuration.health_check_ranges.clone())
        .network_url(configuration.network_url())
        .on_xpn(configuration.cluster.on_xpn)
        .build();

    let watchers = ClusterWatchers::new(&client);
    let stores = watchers.stores();
    let translator = ServicePortTranslator::new(Arc::clone(&stores) as Arc<dyn ServiceLister>, Arc::clone(&stores) as Arc<dyn EndpointLister>);
    let recorder = KubeEventRecorder::new(client.clone(), &configuration.controller_name);

    let context = FirewallControllerContext::builder()
        .ingresses(Arc::clone(&stores) as Arc<dyn IngressLister>)
        .nodes(Arc::clone(&stores) as Arc<dyn NodeLister>)
        .translator(Arc::new(translator) as Arc<dyn IngressTranslator>)
        .recorder(Arc::new(recorder) as Arc<dyn EventRecorder>)
        .caches(stores as Arc<dyn CacheSync>)
        .firewall_pool(Arc::new(firewall_pool) as Arc<dyn SingleFirewallPool>)
        .cloud(cloud)
        .enable_l7_ilb(configuration.enable_l7_ilb)
        .network(configuration.network_url())
        .build();
    let firewall_controller = Arc::new(
        FirewallController::builder()
            .ctx(Arc::new(context))
            .queue(TaskQueue::new("firewall", configuration.retry_delay()))
            .build(),
    );

    let watchers_task = watchers.start(Arc::clone(&firewall_controller));
    let controller_task = {
        let controller = Arc::clone(&firewall_controller);
        async move {
            controller.run().await;
            crate::Result::<()>::Ok(())
        }
    };
    let shutdown_task = async move {
        shutdown.await;
        firewall_controller.shutdown();
        crate::Result::<()>::Ok(())
    };

    // The watchers never finish on their own, the controller queue stops on
    // shutdown.
    futures::future::select(futures::future::join(controller_task.boxed(), shutdown_task.boxed()).boxed(), watchers_task.boxed()).await;
    info!("{} stopped", configuration.controller_name);
    Ok(())
}
