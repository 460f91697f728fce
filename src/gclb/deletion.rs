use std::{collections::BTreeMap, fmt::Display};

use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, warn};

use super::Gclb;
use crate::{
    common::{Description, ResourceKey},
    composite::{
        BackendService, CompositeCloud, CompositeError, CompositeResource, ForwardingRule, NetworkEndpointGroup, TargetHttpProxy, TargetHttpsProxy,
        UrlMap,
    },
    compute::ResourceKind,
};

/// Service whose backend service is shared by every ingress of a cluster.
pub const DEFAULT_BACKEND_SERVICE: &str = "kube-system/default-http-backend";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GclbDeleteOptions {
    /// Tolerate the default backend service outliving the load balancer.
    pub skip_default_backend: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    StillExists,
    Error(CompositeError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionFailure {
    pub kind: ResourceKind,
    pub key: ResourceKey,
    pub reason: FailureReason,
}

impl Display for DeletionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            FailureReason::StillExists => write!(f, "{} {} still exists", self.kind, self.key),
            FailureReason::Error(e) => write!(f, "{} {} is not deleted/error to get: {e}", self.kind, self.key),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resources not deleted ({})", failures.iter().join(", "))]
pub struct DeletionError {
    pub failures: Vec<DeletionFailure>,
}

async fn check_absent<R: CompositeResource>(
    cloud: &CompositeCloud,
    resources: &BTreeMap<ResourceKey, R>,
    keep: impl Fn(&R) -> bool,
    failures: &mut Vec<DeletionFailure>,
) {
    for (key, resource) in resources {
        let reason = match cloud.get::<R>(resource.version(), key).await {
            Ok(live) if keep(&live) => {
                debug!("Ignoring {} {key}", R::KIND);
                continue;
            },
            Ok(_) => FailureReason::StillExists,
            Err(e) if e.is_not_found() => continue,
            Err(e) => FailureReason::Error(e),
        };
        warn!("{} {key} was not deleted {reason:?}", R::KIND);
        failures.push(DeletionFailure {
            kind: R::KIND,
            key: key.clone(),
            reason,
        });
    }
}

fn into_result(failures: Vec<DeletionFailure>) -> Result<(), DeletionError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DeletionError { failures })
    }
}

impl Gclb {
    /// Confirms every resource of the load balancer is gone. Instance groups
    /// are shared by all load balancers of a cluster and are not checked.
    pub async fn check_resource_deletion(&self, cloud: &CompositeCloud, options: GclbDeleteOptions) -> Result<(), DeletionError> {
        let mut failures = vec![];
        check_absent::<ForwardingRule>(cloud, &self.forwarding_rules, |_| false, &mut failures).await;
        check_absent::<TargetHttpProxy>(cloud, &self.target_http_proxies, |_| false, &mut failures).await;
        check_absent::<TargetHttpsProxy>(cloud, &self.target_https_proxies, |_| false, &mut failures).await;
        check_absent::<UrlMap>(cloud, &self.url_maps, |_| false, &mut failures).await;
        let is_default_backend =
            |service: &BackendService| options.skip_default_backend && Description::parse(&service.description).service_name == DEFAULT_BACKEND_SERVICE;
        check_absent(cloud, &self.backend_services, is_default_backend, &mut failures).await;
        check_absent::<NetworkEndpointGroup>(cloud, &self.network_endpoint_groups, |_| false, &mut failures).await;
        into_result(failures)
    }

    /// Confirms the network endpoint groups of the load balancer are gone.
    pub async fn check_neg_deletion(&self, cloud: &CompositeCloud) -> Result<(), DeletionError> {
        let mut failures = vec![];
        check_absent::<NetworkEndpointGroup>(cloud, &self.network_endpoint_groups, |_| false, &mut failures).await;
        into_result(failures)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        common::{Scope, Version},
        compute::{
            fake::{FakeCompute, Op},
            CloudError, ComputeClient, KindRegistry,
        },
    };

    const ZONE: &str = "us-central1-a";

    fn cloud() -> (Arc<FakeCompute>, CompositeCloud) {
        let fake = Arc::new(FakeCompute::default());
        let cloud = CompositeCloud::new(Arc::clone(&fake) as Arc<dyn ComputeClient>, Arc::new(KindRegistry::new()), "us-central1");
        (fake, cloud)
    }

    fn graph() -> Gclb {
        let mut gclb = Gclb::new("35.1.2.3");
        gclb.forwarding_rules.insert(ResourceKey::global("fr"), ForwardingRule::default());
        gclb.target_http_proxies.insert(ResourceKey::global("tp"), TargetHttpProxy::default());
        gclb.url_maps.insert(ResourceKey::global("um"), UrlMap::default());
        gclb.backend_services.insert(
            ResourceKey::global("bs"),
            BackendService {
                version: Version::Beta,
                ..Default::default()
            },
        );
        gclb.backend_services.insert(ResourceKey::global("bs-default"), BackendService::default());
        gclb.network_endpoint_groups.insert(
            ResourceKey::zonal("neg", ZONE),
            NetworkEndpointGroup {
                scope: Scope::Zonal,
                ..Default::default()
            },
        );
        gclb
    }

    fn seed_default_backend(fake: &FakeCompute) {
        fake.seed(
            ResourceKind::BackendService,
            &ResourceKey::global("bs-default"),
            json!({"description": r#"{"kubernetes.io/service-name":"kube-system/default-http-backend","kubernetes.io/service-port":"80"}"#}),
        );
    }

    #[tokio::test]
    async fn test_everything_deleted() {
        let (fake, cloud) = cloud();
        let gclb = graph();
        assert_eq!(gclb.check_resource_deletion(&cloud, GclbDeleteOptions::default()).await, Ok(()));
        let bs_versions: Vec<_> = fake
            .calls_of(Op::Get)
            .into_iter()
            .filter(|call| call.key == Some(ResourceKey::global("bs")))
            .map(|call| call.version)
            .collect();
        assert_eq!(bs_versions, vec![Some(Version::Beta)]);
    }

    #[tokio::test]
    async fn test_default_backend_skipped_only_when_asked() {
        let (fake, cloud) = cloud();
        seed_default_backend(&fake);
        let gclb = graph();

        let options = GclbDeleteOptions { skip_default_backend: true };
        assert_eq!(gclb.check_resource_deletion(&cloud, options).await, Ok(()));

        let error = gclb.check_resource_deletion(&cloud, GclbDeleteOptions::default()).await.unwrap_err();
        assert_eq!(
            error.failures,
            vec![DeletionFailure {
                kind: ResourceKind::BackendService,
                key: ResourceKey::global("bs-default"),
                reason: FailureReason::StillExists
            }]
        );
    }

    #[tokio::test]
    async fn test_failures_aggregated() {
        let (fake, cloud) = cloud();
        seed_default_backend(&fake);
        fake.seed(ResourceKind::UrlMap, &ResourceKey::global("um"), json!({}));
        fake.fail(Op::Get, Some(ResourceKind::NetworkEndpointGroup), CloudError::Transport("reset".to_owned()));

        let error = gclb_error(&cloud).await;
        let failed: Vec<_> = error.failures.iter().map(|failure| failure.kind).collect();
        assert_eq!(failed, vec![ResourceKind::UrlMap, ResourceKind::NetworkEndpointGroup]);
        assert!(matches!(error.failures[1].reason, FailureReason::Error(_)));
        assert!(error.to_string().contains("UrlMap global/um still exists"));
    }

    async fn gclb_error(cloud: &CompositeCloud) -> DeletionError {
        graph()
            .check_resource_deletion(cloud, GclbDeleteOptions { skip_default_backend: true })
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_neg_deletion() {
        let (fake, cloud) = cloud();
        let gclb = graph();
        assert_eq!(gclb.check_neg_deletion(&cloud).await, Ok(()));

        fake.seed(ResourceKind::NetworkEndpointGroup, &ResourceKey::zonal("neg", ZONE), json!({}));
        fake.seed(ResourceKind::UrlMap, &ResourceKey::global("um"), json!({}));
        let error = gclb.check_neg_deletion(&cloud).await.unwrap_err();
        assert_eq!(error.failures.len(), 1);
        assert_eq!(error.failures[0].key, ResourceKey::zonal("neg", ZONE));
    }
}
