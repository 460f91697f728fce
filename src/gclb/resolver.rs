use std::collections::BTreeSet;

use tracing::{debug, info, instrument, warn};
use typed_builder::TypedBuilder;

use super::{FeatureValidator, Gclb, GraphError, PolicyMap, IG_RESOURCE_TYPE, NEG_RESOURCE_TYPE};
use crate::{
    common::{Location, ResourceKey, Scope},
    composite::{
        BackendService, CompositeCloud, CompositeError, CompositeResource, ForwardingRule, InstanceGroup, NetworkEndpointGroup, TargetHttpProxy,
        TargetHttpsProxy, UrlMap,
    },
    compute::{ResourceId, ResourceIdError, ResourceKind},
};

/// Discovers the complete resource graph of a load balancer from its VIP.
#[derive(TypedBuilder)]
pub struct GraphResolver {
    cloud: CompositeCloud,
    #[builder(setter(into))]
    region: String,
}

impl GraphResolver {
    fn parse(&self, url: &str) -> Result<ResourceId, GraphError> {
        ResourceId::parse(self.cloud.registry(), url).map_err(|source| GraphError::InvalidReference { url: url.to_owned(), source })
    }

    async fn fetch<R: CompositeResource>(&self, policies: &PolicyMap, key: &ResourceKey) -> Result<R, GraphError> {
        let version = policies.get(R::KIND).version;
        self.cloud.get(version, key).await.map_err(|e| match e {
            CompositeError::Unsupported { kind, version, scope } => GraphError::Unsupported { kind, version, scope },
            source => {
                warn!("Error getting {} {key}: {source}", R::KIND);
                GraphError::Fetch {
                    kind: R::KIND,
                    key: key.clone(),
                    version,
                    source,
                }
            },
        })
    }

    /// Resolves the graph behind `vip`, reading every kind at the least stable
    /// version any of `validators` requires. Fails on the first missing or
    /// inconsistent resource.
    #[instrument(level = "info", name = "GraphResolver", skip(self, validators))]
    pub async fn gclb_for_vip(&self, vip: &str, validators: &[Box<dyn FeatureValidator>]) -> Result<Gclb, GraphError> {
        let policies = PolicyMap::from_validators(validators);
        let mut gclb = Gclb::new(vip);

        let rule_policy = policies.get(ResourceKind::ForwardingRule);
        let location = match rule_policy.scope {
            Scope::Regional => Location::Region(self.region.clone()),
            Scope::Global | Scope::Zonal => Location::Global,
        };
        let rules: Vec<ForwardingRule> = self.cloud.list(rule_policy.version, &location).await.map_err(|source| {
            warn!("Error listing forwarding rules: {source}");
            GraphError::List {
                kind: ResourceKind::ForwardingRule,
                source,
            }
        })?;
        let rules: Vec<ForwardingRule> = rules.into_iter().filter(|rule| rule.ip_address == vip).collect();
        if rules.is_empty() {
            return Err(GraphError::NoForwardingRules(vip.to_owned()));
        }

        let mut url_map_key: Option<ResourceKey> = None;
        for rule in rules {
            let rule_key = rule.key();
            let target = match ResourceId::parse(self.cloud.registry(), &rule.target) {
                Ok(target) => target,
                Err(ResourceIdError::UnknownCollection { .. }) => {
                    return Err(GraphError::UnhandledTarget {
                        rule: rule_key,
                        target: rule.target.clone(),
                    })
                },
                Err(source) => return Err(GraphError::InvalidReference { url: rule.target.clone(), source }),
            };

            let url_map = match target.kind {
                ResourceKind::TargetHttpProxy => {
                    let proxy: TargetHttpProxy = self.fetch(&policies, &target.key).await?;
                    let url_map = proxy.url_map.clone();
                    gclb.target_http_proxies.insert(target.key, proxy);
                    url_map
                },
                ResourceKind::TargetHttpsProxy => {
                    let proxy: TargetHttpsProxy = self.fetch(&policies, &target.key).await?;
                    let url_map = proxy.url_map.clone();
                    gclb.target_https_proxies.insert(target.key, proxy);
                    url_map
                },
                _ => {
                    warn!("Unhandled target {} of {rule_key}", rule.target);
                    return Err(GraphError::UnhandledTarget {
                        rule: rule_key,
                        target: rule.target.clone(),
                    });
                },
            };
            gclb.forwarding_rules.insert(rule_key, rule);

            let key = self.parse(&url_map)?.key;
            match &url_map_key {
                None => url_map_key = Some(key),
                Some(first) if *first != key => {
                    warn!("Target proxy references are not the same ({first} != {key})");
                    return Err(GraphError::UrlMapMismatch { first: first.clone(), second: key });
                },
                Some(_) => (),
            }
        }

        let Some(url_map_key) = url_map_key else {
            return Err(GraphError::NoForwardingRules(vip.to_owned()));
        };
        let url_map: UrlMap = self.fetch(&policies, &url_map_key).await?;
        let mut service_keys = vec![];
        for service in url_map.referenced_services() {
            let key = self.parse(&service)?.key;
            if !service_keys.contains(&key) {
                service_keys.push(key);
            }
        }
        gclb.url_maps.insert(url_map_key, url_map);

        let mut neg_keys = BTreeSet::new();
        let mut ig_keys = BTreeSet::new();
        for key in service_keys {
            let service: BackendService = self.fetch(&policies, &key).await?;
            for backend in &service.backends {
                if backend.group.contains(NEG_RESOURCE_TYPE) {
                    neg_keys.insert(self.parse(&backend.group)?.key);
                } else if backend.group.contains(IG_RESOURCE_TYPE) {
                    ig_keys.insert(self.parse(&backend.group)?.key);
                }
            }
            gclb.backend_services.insert(key, service);
        }

        for key in neg_keys {
            let neg: NetworkEndpointGroup = self.fetch(&policies, &key).await?;
            gclb.network_endpoint_groups.insert(key, neg);
        }
        for key in ig_keys {
            let group: InstanceGroup = self.fetch(&policies, &key).await?;
            gclb.instance_groups.insert(key, group);
        }

        info!(
            "Resolved {} forwarding rules, {} backend services, {} NEGs, {} instance groups",
            gclb.forwarding_rules.len(),
            gclb.backend_services.len(),
            gclb.network_endpoint_groups.len(),
            gclb.instance_groups.len()
        );
        debug!("{gclb:?}");
        Ok(gclb)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        common::Version,
        compute::{
            fake::{FakeCompute, Op},
            CloudError, ComputeClient, KindRegistry,
        },
        gclb::{BasicHttpValidator, L7IlbValidator, SecurityPolicyValidator},
    };

    const VIP: &str = "35.1.2.3";
    const REGION: &str = "us-central1";
    const ZONE: &str = "us-central1-a";

    fn resolver() -> (Arc<FakeCompute>, GraphResolver) {
        let fake = Arc::new(FakeCompute::default());
        let cloud = CompositeCloud::new(Arc::clone(&fake) as Arc<dyn ComputeClient>, Arc::new(KindRegistry::new()), REGION);
        (fake, GraphResolver::builder().cloud(cloud).region(REGION).build())
    }

    fn link(fake: &FakeCompute, kind: ResourceKind, key: &ResourceKey) -> Value {
        Value::from(fake.self_link(kind, key))
    }

    /// Two forwarding rules (http and https) on one VIP sharing a url map with
    /// two backend services, one backed by a NEG and one by an instance group.
    fn seed_global_lb(fake: &FakeCompute) {
        let neg = ResourceKey::zonal("neg-1", ZONE);
        let ig = ResourceKey::zonal("ig-1", ZONE);
        let bs_neg = ResourceKey::global("bs-neg");
        let bs_ig = ResourceKey::global("bs-ig");
        let url_map = ResourceKey::global("um");
        let http_proxy = ResourceKey::global("tp");
        let https_proxy = ResourceKey::global("tps");

        fake.seed(ResourceKind::NetworkEndpointGroup, &neg, json!({"networkEndpointType": "GCE_VM_IP_PORT"}));
        fake.seed(ResourceKind::InstanceGroup, &ig, json!({"size": 3}));
        fake.seed(
            ResourceKind::BackendService,
            &bs_neg,
            json!({"backends": [{"group": link(fake, ResourceKind::NetworkEndpointGroup, &neg)}]}),
        );
        fake.seed(
            ResourceKind::BackendService,
            &bs_ig,
            json!({"backends": [{"group": link(fake, ResourceKind::InstanceGroup, &ig)}], "securityPolicy": "armor"}),
        );
        fake.seed(
            ResourceKind::UrlMap,
            &url_map,
            json!({
                "defaultService": link(fake, ResourceKind::BackendService, &bs_ig),
                "pathMatchers": [{
                    "name": "m",
                    "defaultService": link(fake, ResourceKind::BackendService, &bs_ig),
                    "pathRules": [{"paths": ["/neg"], "service": link(fake, ResourceKind::BackendService, &bs_neg)}],
                }],
            }),
        );
        fake.seed(ResourceKind::TargetHttpProxy, &http_proxy, json!({"urlMap": link(fake, ResourceKind::UrlMap, &url_map)}));
        fake.seed(ResourceKind::TargetHttpsProxy, &https_proxy, json!({"urlMap": link(fake, ResourceKind::UrlMap, &url_map)}));
        fake.seed(
            ResourceKind::ForwardingRule,
            &ResourceKey::global("fr-http"),
            json!({"IPAddress": VIP, "target": link(fake, ResourceKind::TargetHttpProxy, &http_proxy)}),
        );
        fake.seed(
            ResourceKind::ForwardingRule,
            &ResourceKey::global("fr-https"),
            json!({"IPAddress": VIP, "target": link(fake, ResourceKind::TargetHttpsProxy, &https_proxy)}),
        );
        fake.seed(ResourceKind::ForwardingRule, &ResourceKey::global("fr-other"), json!({"IPAddress": "35.9.9.9", "target": "garbage"}));
    }

    #[tokio::test]
    async fn test_resolves_complete_graph() {
        let (fake, resolver) = resolver();
        seed_global_lb(&fake);
        let validators: Vec<Box<dyn FeatureValidator>> = vec![Box::new(BasicHttpValidator)];
        let gclb = resolver.gclb_for_vip(VIP, &validators).await.unwrap();

        assert_eq!(gclb.vip, VIP);
        assert_eq!(gclb.forwarding_rules.keys().cloned().collect::<Vec<_>>(), vec![ResourceKey::global("fr-http"), ResourceKey::global("fr-https")]);
        assert_eq!(gclb.target_http_proxies.len(), 1);
        assert_eq!(gclb.target_https_proxies.len(), 1);
        assert_eq!(gclb.url_maps.keys().cloned().collect::<Vec<_>>(), vec![ResourceKey::global("um")]);
        assert_eq!(gclb.backend_services.len(), 2);
        assert_eq!(gclb.network_endpoint_groups.keys().cloned().collect::<Vec<_>>(), vec![ResourceKey::zonal("neg-1", ZONE)]);
        assert_eq!(gclb.instance_groups.keys().cloned().collect::<Vec<_>>(), vec![ResourceKey::zonal("ig-1", ZONE)]);
        assert!(gclb.backend_services.values().all(|bs| bs.version == Version::Ga && bs.security_policy.is_empty()));
        assert!(fake.calls_of(Op::Get).iter().all(|call| call.version == Some(Version::Ga)));
    }

    #[tokio::test]
    async fn test_backend_services_read_at_validator_version() {
        let (fake, resolver) = resolver();
        seed_global_lb(&fake);
        let validators: Vec<Box<dyn FeatureValidator>> = vec![Box::new(BasicHttpValidator), Box::new(SecurityPolicyValidator)];
        let gclb = resolver.gclb_for_vip(VIP, &validators).await.unwrap();
        let bs = &gclb.backend_services[&ResourceKey::global("bs-ig")];
        assert_eq!(bs.version, Version::Beta);
        assert_eq!(bs.security_policy, "armor");
        assert!(gclb.url_maps.values().all(|um| um.version == Version::Ga));
    }

    #[tokio::test]
    async fn test_url_map_mismatch() {
        let (fake, resolver) = resolver();
        seed_global_lb(&fake);
        let other_url_map = ResourceKey::global("um-2");
        fake.seed(ResourceKind::UrlMap, &other_url_map, json!({}));
        fake.seed(
            ResourceKind::TargetHttpsProxy,
            &ResourceKey::global("tps"),
            json!({"urlMap": link(&fake, ResourceKind::UrlMap, &other_url_map)}),
        );
        let result = resolver.gclb_for_vip(VIP, &[]).await;
        assert_eq!(
            result,
            Err(GraphError::UrlMapMismatch {
                first: ResourceKey::global("um"),
                second: other_url_map
            })
        );
        assert!(fake.calls_of(Op::Get).iter().all(|call| call.kind != Some(ResourceKind::UrlMap)));
    }

    #[tokio::test]
    async fn test_no_forwarding_rules() {
        let (fake, resolver) = resolver();
        seed_global_lb(&fake);
        assert_eq!(resolver.gclb_for_vip("1.1.1.1", &[]).await, Err(GraphError::NoForwardingRules("1.1.1.1".to_owned())));
    }

    #[tokio::test]
    async fn test_unhandled_target() {
        let (fake, resolver) = resolver();
        fake.seed(
            ResourceKind::ForwardingRule,
            &ResourceKey::global("fr"),
            json!({"IPAddress": VIP, "target": "https://www.googleapis.com/compute/v1/projects/mock-project/regions/us-central1/targetPools/tp"}),
        );
        assert!(matches!(resolver.gclb_for_vip(VIP, &[]).await, Err(GraphError::UnhandledTarget { .. })));
    }

    #[tokio::test]
    async fn test_missing_resource_aborts() {
        let (fake, resolver) = resolver();
        seed_global_lb(&fake);
        fake.remove(ResourceKind::NetworkEndpointGroup, &ResourceKey::zonal("neg-1", ZONE));
        match resolver.gclb_for_vip(VIP, &[]).await {
            Err(GraphError::Fetch { kind, key, version, source }) => {
                assert_eq!(kind, ResourceKind::NetworkEndpointGroup);
                assert_eq!(key, ResourceKey::zonal("neg-1", ZONE));
                assert_eq!(version, Version::Ga);
                assert!(source.is_not_found());
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_failure() {
        let (fake, resolver) = resolver();
        fake.fail(Op::List, None, CloudError::Transport("reset".to_owned()));
        assert!(matches!(resolver.gclb_for_vip(VIP, &[]).await, Err(GraphError::List { .. })));
    }

    #[tokio::test]
    async fn test_regional_graph() {
        let (fake, resolver) = resolver();
        let bs = ResourceKey::regional("bs", REGION);
        let url_map = ResourceKey::regional("um", REGION);
        let proxy = ResourceKey::regional("tp", REGION);
        fake.seed(ResourceKind::BackendService, &bs, json!({"localityLbPolicy": "RING_HASH"}));
        fake.seed(ResourceKind::UrlMap, &url_map, json!({"defaultService": link(&fake, ResourceKind::BackendService, &bs)}));
        fake.seed(ResourceKind::TargetHttpProxy, &proxy, json!({"urlMap": link(&fake, ResourceKind::UrlMap, &url_map)}));
        fake.seed(
            ResourceKind::ForwardingRule,
            &ResourceKey::regional("fr", REGION),
            json!({"IPAddress": "10.0.0.5", "target": link(&fake, ResourceKind::TargetHttpProxy, &proxy)}),
        );

        let validators: Vec<Box<dyn FeatureValidator>> = vec![Box::new(L7IlbValidator)];
        let gclb = resolver.gclb_for_vip("10.0.0.5", &validators).await.unwrap();
        assert_eq!(gclb.backend_services[&bs].locality_lb_policy, "RING_HASH");
        assert_eq!(gclb.backend_services[&bs].scope, Scope::Regional);
        assert!(gclb.forwarding_rules.contains_key(&ResourceKey::regional("fr", REGION)));

        let result = resolver.gclb_for_vip("10.0.0.5", &[]).await;
        assert_eq!(result, Err(GraphError::NoForwardingRules("10.0.0.5".to_owned())));
    }
}
