use thiserror::Error;
use tracing::debug;

use super::{scope_from_features, version_from_features, Feature};
use crate::{
    common::{Location, Scope, Version},
    composite::{CompositeCloud, CompositeError, Subnetwork},
};

const ACTIVE_ROLE: &str = "ACTIVE";
const ILB_SUBNET_PURPOSE: &str = "INTERNAL_HTTPS_LOAD_BALANCER";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubnetError {
    #[error("error obtaining subnets for region {region}: {source}")]
    Cloud { region: String, source: CompositeError },
    #[error("L7 ILB subnet not found in region {0}")]
    NotFound(String),
}

pub fn l7_ilb_version() -> Version {
    version_from_features(&[Feature::L7Ilb.as_str()])
}

pub fn l7_ilb_scope() -> Scope {
    scope_from_features(&[Feature::L7Ilb.as_str()])
}

fn on_network(subnet: &Subnetwork, network: &str) -> bool {
    network.is_empty() || subnet.network.is_empty() || subnet.network.rsplit('/').next() == network.rsplit('/').next()
}

/// CIDR of the active proxy-only subnet reserved for L7 ILB in `region` on
/// the cluster's network.
pub async fn ilb_subnet_source_range(cloud: &CompositeCloud, region: &str, network: &str) -> Result<String, SubnetError> {
    let subnets: Vec<Subnetwork> = cloud
        .list(Version::Beta, &Location::Region(region.to_owned()))
        .await
        .map_err(|source| SubnetError::Cloud { region: region.to_owned(), source })?;

    subnets
        .into_iter()
        .find(|subnet| subnet.role == ACTIVE_ROLE && subnet.purpose == ILB_SUBNET_PURPOSE && on_network(subnet, network))
        .map(|subnet| {
            debug!("Using L7 ILB subnet {} {}", subnet.name, subnet.ip_cidr_range);
            subnet.ip_cidr_range
        })
        .ok_or_else(|| SubnetError::NotFound(region.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        common::ResourceKey,
        compute::{
            fake::{FakeCompute, Op},
            CloudError, ComputeClient, KindRegistry, ResourceKind,
        },
    };

    const REGION: &str = "us-central1";

    fn cloud() -> (Arc<FakeCompute>, CompositeCloud) {
        let fake = Arc::new(FakeCompute::default());
        let cloud = CompositeCloud::new(Arc::clone(&fake) as Arc<dyn ComputeClient>, Arc::new(KindRegistry::new()), REGION);
        (fake, cloud)
    }

    fn seed_subnet(fake: &FakeCompute, name: &str, region: &str, cidr: &str, network: &str) {
        let network = if network.is_empty() { String::new() } else { format!("https://www.googleapis.com/compute/v1/projects/mock-project/global/networks/{network}") };
        fake.seed(
            ResourceKind::Subnetwork,
            &ResourceKey::regional(name, region),
            json!({"ipCidrRange": cidr, "network": network, "role": "ACTIVE", "purpose": "INTERNAL_HTTPS_LOAD_BALANCER"}),
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(l7_ilb_version(), Version::Alpha);
        assert_eq!(l7_ilb_scope(), Scope::Regional);
    }

    #[tokio::test]
    async fn test_one_subnet() {
        let (fake, cloud) = cloud();
        seed_subnet(&fake, "subnet-1", REGION, "10.0.0.0/24", "");
        assert_eq!(ilb_subnet_source_range(&cloud, REGION, "default").await, Ok("10.0.0.0/24".to_owned()));
        assert_eq!(fake.calls_of(Op::List)[0].version, Some(Version::Beta));
    }

    #[tokio::test]
    async fn test_subnets_in_other_regions_ignored() {
        let (fake, cloud) = cloud();
        seed_subnet(&fake, "subnet-2", "us-west1", "10.1.2.0/24", "default");
        assert_eq!(ilb_subnet_source_range(&cloud, REGION, "default").await, Err(SubnetError::NotFound(REGION.to_owned())));
        seed_subnet(&fake, "subnet-1", REGION, "10.0.0.0/24", "");
        assert_eq!(ilb_subnet_source_range(&cloud, REGION, "default").await, Ok("10.0.0.0/24".to_owned()));
    }

    #[tokio::test]
    async fn test_subnets_in_other_networks_ignored() {
        let (fake, cloud) = cloud();
        seed_subnet(&fake, "subnet-a", REGION, "10.1.2.0/24", "other-network");
        seed_subnet(&fake, "subnet-z", REGION, "10.10.0.0/24", "default");
        assert_eq!(ilb_subnet_source_range(&cloud, REGION, "default").await, Ok("10.10.0.0/24".to_owned()));
    }

    #[tokio::test]
    async fn test_inactive_subnet_ignored() {
        let (fake, cloud) = cloud();
        fake.seed(
            ResourceKind::Subnetwork,
            &ResourceKey::regional("backup", REGION),
            json!({"ipCidrRange": "10.2.0.0/24", "role": "BACKUP", "purpose": "INTERNAL_HTTPS_LOAD_BALANCER"}),
        );
        fake.seed(ResourceKind::Subnetwork, &ResourceKey::regional("plain", REGION), json!({"ipCidrRange": "10.3.0.0/24"}));
        assert!(matches!(ilb_subnet_source_range(&cloud, REGION, "").await, Err(SubnetError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_failure() {
        let (fake, cloud) = cloud();
        fake.fail(Op::List, Some(ResourceKind::Subnetwork), CloudError::Transport("reset".to_owned()));
        assert!(matches!(ilb_subnet_source_range(&cloud, REGION, "").await, Err(SubnetError::Cloud { .. })));
    }
}
