use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures::{future::BoxFuture, stream::BoxStream, FutureExt, StreamExt};
use k8s_openapi::api::{
    core::v1::{Node, Service},
    discovery::v1::EndpointSlice,
    networking::v1::Ingress,
};
use kube::{
    runtime::{
        events::{Event, EventType, Recorder, Reporter},
        reflector::{self, ObjectRef, Store},
        watcher, WatchStreamExt,
    },
    Api, Client, Resource, ResourceExt,
};
use tracing::{debug, info, warn};

use super::{CacheSync, ControllerError, EndpointLister, EventRecorder, FirewallController, IngressLister, NodeLister, ServiceLister};

const EXCLUDE_FROM_LOAD_BALANCERS_LABEL: &str = "node.kubernetes.io/exclude-from-external-load-balancers";
const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";

/// Local caches of the cluster objects the controllers read.
pub struct ClusterStores {
    ingresses: Store<Ingress>,
    services: Store<Service>,
    endpoint_slices: Store<EndpointSlice>,
    nodes: Store<Node>,
    synced: AtomicBool,
}

fn is_ready_node(node: &Node) -> bool {
    if node.labels().contains_key(EXCLUDE_FROM_LOAD_BALANCERS_LABEL) {
        return false;
    }
    if node.spec.as_ref().and_then(|spec| spec.unschedulable).unwrap_or_default() {
        return false;
    }
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| conditions.iter().any(|condition| condition.type_ == "Ready" && condition.status == "True"))
}

impl IngressLister for ClusterStores {
    fn list(&self) -> Vec<Ingress> {
        self.ingresses.state().iter().map(|ingress| ingress.as_ref().clone()).collect()
    }
}

impl ServiceLister for ClusterStores {
    fn get(&self, namespace: &str, name: &str) -> Option<Service> {
        self.services.get(&ObjectRef::new(name).within(namespace)).map(|service| service.as_ref().clone())
    }
}

fn slice_ports(slice: &EndpointSlice, port_name: &str) -> Vec<i32> {
    slice
        .ports
        .iter()
        .flatten()
        .filter(|port| port.protocol.as_deref().unwrap_or("TCP") == "TCP" && port.name.as_deref().unwrap_or_default() == port_name)
        .filter_map(|port| port.port)
        .collect()
}

impl EndpointLister for ClusterStores {
    fn endpoint_ports(&self, namespace: &str, service: &str, port_name: &str) -> Vec<i32> {
        self.endpoint_slices
            .state()
            .iter()
            .filter(|slice| slice.namespace().as_deref() == Some(namespace) && slice.labels().get(SERVICE_NAME_LABEL).map(String::as_str) == Some(service))
            .flat_map(|slice| slice_ports(slice, port_name))
            .collect()
    }
}

impl NodeLister for ClusterStores {
    fn ready_node_names(&self) -> Result<Vec<String>, ControllerError> {
        if !self.has_synced() {
            return Err(ControllerError::NodeListing("node cache has not synced".to_owned()));
        }
        let mut names: Vec<String> = self.nodes.state().iter().filter(|node| is_ready_node(node)).map(|node| node.name_any()).collect();
        names.sort();
        Ok(names)
    }
}

impl CacheSync for ClusterStores {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

type WatchStream<K> = BoxStream<'static, Result<watcher::Event<K>, watcher::Error>>;

/// Reflectors feeding [`ClusterStores`] and the controller's event handlers.
pub struct ClusterWatchers {
    stores: Arc<ClusterStores>,
    ingresses: WatchStream<Ingress>,
    services: WatchStream<Service>,
    endpoint_slices: WatchStream<EndpointSlice>,
    nodes: WatchStream<Node>,
}

fn reflect<K>(client: &Client) -> (Store<K>, WatchStream<K>)
where
    K: Resource<DynamicType = ()> + Clone + std::fmt::Debug + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    let (store, writer) = reflector::store::<K>();
    let stream = reflector::reflector(writer, watcher::watcher(Api::<K>::all(client.clone()), watcher::Config::default()).default_backoff()).boxed();
    (store, stream)
}

impl ClusterWatchers {
    pub fn new(client: &Client) -> Self {
        let (ingresses_store, ingresses) = reflect::<Ingress>(client);
        let (services_store, services) = reflect::<Service>(client);
        let (endpoint_slices_store, endpoint_slices) = reflect::<EndpointSlice>(client);
        let (nodes_store, nodes) = reflect::<Node>(client);
        Self {
            stores: Arc::new(ClusterStores {
                ingresses: ingresses_store,
                services: services_store,
                endpoint_slices: endpoint_slices_store,
                nodes: nodes_store,
                synced: AtomicBool::new(false),
            }),
            ingresses,
            services,
            endpoint_slices,
            nodes,
        }
    }

    pub fn stores(&self) -> Arc<ClusterStores> {
        Arc::clone(&self.stores)
    }

    /// Drives the reflectors until their streams end, dispatching changes to
    /// the firewall controller.
    pub async fn start(self, controller: Arc<FirewallController>) -> crate::Result<()> {
        let Self {
            stores,
            ingresses,
            services,
            endpoint_slices,
            nodes,
        } = self;

        let readiness = {
            let stores = Arc::clone(&stores);
            async move {
                let ready = stores
                    .ingresses
                    .wait_until_ready()
                    .await
                    .and(stores.services.wait_until_ready().await)
                    .and(stores.endpoint_slices.wait_until_ready().await)
                    .and(stores.nodes.wait_until_ready().await);
                match ready {
                    Ok(()) => {
                        info!("Cluster caches...synced");
                        stores.synced.store(true, Ordering::SeqCst);
                    },
                    Err(e) => warn!("Cluster caches never synced {e}"),
                }
            }
        };

        let ingress_watcher = {
            let controller = Arc::clone(&controller);
            ingresses.for_each(move |event| {
                match event {
                    Ok(watcher::Event::Apply(ingress) | watcher::Event::InitApply(ingress) | watcher::Event::Delete(ingress)) => {
                        controller.on_ingress_change(&ingress);
                    },
                    Ok(_) => (),
                    Err(e) => warn!("Ingress watcher error {e}"),
                }
                futures::future::ready(())
            })
        };

        let service_watcher = services.for_each(move |event| {
            match event {
                Ok(watcher::Event::Apply(service) | watcher::Event::InitApply(service)) => controller.on_service_change(&service),
                Ok(_) => (),
                Err(e) => warn!("Service watcher error {e}"),
            }
            futures::future::ready(())
        });

        let node_watcher = nodes.for_each(|event| {
            if let Err(e) = event {
                warn!("Node watcher error {e}");
            }
            futures::future::ready(())
        });

        // Endpoint changes only refresh the cache, the next ingress or service
        // triggered sync picks them up.
        let endpoint_slice_watcher = endpoint_slices.for_each(|event| {
            if let Err(e) = event {
                warn!("EndpointSlice watcher error {e}");
            }
            futures::future::ready(())
        });

        let tasks: Vec<BoxFuture<'static, ()>> =
            vec![readiness.boxed(), ingress_watcher.boxed(), service_watcher.boxed(), endpoint_slice_watcher.boxed(), node_watcher.boxed()];
        info!("Cluster watchers...started");
        futures::future::join_all(tasks).await;
        info!("Cluster watchers...stopped");
        Ok(())
    }
}

/// Publishes Kubernetes events on ingresses.
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl KubeEventRecorder {
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_owned(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record(&self, ingress: &Ingress, event_type: EventType, reason: &str, message: &str) -> Result<(), ControllerError> {
        debug!("Recording {reason} event on {}/{}", ingress.namespace().unwrap_or_default(), ingress.name_any());
        let event = Event {
            type_: event_type,
            reason: reason.to_owned(),
            note: Some(message.to_owned()),
            action: "Sync".to_owned(),
            secondary: None,
        };
        self.recorder.publish(&event, &ingress.object_ref(&())).await.map_err(|e| ControllerError::EventRecording(e.to_string()))
    }
}
