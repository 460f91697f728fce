//! The single L7 firewall rule admitting load balancer traffic to the
//! cluster's nodes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use typed_builder::TypedBuilder;

use crate::{
    common::{Namer, ResourceKey, Version},
    composite::{CompositeCloud, CompositeError, Firewall},
    compute::{types::FirewallAllowed, CloudError, ResourceKind},
};

pub const L7_FIREWALL_DESCRIPTION: &str = "GCE L7 firewall rule";
pub const DEFAULT_NODE_PORT_RANGE: &str = "30000-32767";
pub const DEFAULT_HEALTH_CHECK_RANGES: &[&str] = &["130.211.0.0/22", "35.191.0.0/16"];

/// A firewall change the controller is not permitted to make in a shared
/// VPC host project. The message is the command a security admin can run
/// instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FirewallXpnError {
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FirewallError {
    #[error(transparent)]
    Xpn(#[from] FirewallXpnError),
    #[error("firewall {name}: {source}")]
    Cloud { name: String, source: CompositeError },
}

#[async_trait]
pub trait SingleFirewallPool: Send + Sync {
    async fn sync(&self, node_names: &[String], additional_ports: &[String], additional_ranges: &[String]) -> Result<(), FirewallError>;
    async fn gc(&self) -> Result<(), FirewallError>;
}

#[derive(TypedBuilder)]
pub struct FirewallRules {
    cloud: CompositeCloud,
    namer: Namer,
    #[builder(default = vec![DEFAULT_NODE_PORT_RANGE.to_owned()])]
    node_port_ranges: Vec<String>,
    #[builder(default = DEFAULT_HEALTH_CHECK_RANGES.iter().map(|range| (*range).to_owned()).collect())]
    health_check_ranges: Vec<String>,
    #[builder(setter(into))]
    network_url: String,
    #[builder(default)]
    on_xpn: bool,
}

fn sorted_unique<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    values.into_iter().filter(|value| !value.is_empty()).cloned().sorted().dedup().collect()
}

/// Every `(protocol, port)` pair the rule admits.
fn ports_of(rule: &Firewall) -> BTreeSet<(String, &str)> {
    rule.allowed
        .iter()
        .flat_map(|allowed| allowed.ports.iter().map(move |port| (allowed.ip_protocol.to_ascii_lowercase(), port.as_str())))
        .collect()
}

/// Network reference from `projects/` on, so full and partial URLs compare equal.
fn network_path(url: &str) -> &str {
    url.find("projects/").map_or(url, |index| &url[index..])
}

fn same_rule(live: &Firewall, desired: &Firewall) -> bool {
    fn set(values: &[String]) -> BTreeSet<&str> {
        values.iter().map(String::as_str).collect()
    }
    network_path(&live.network) == network_path(&desired.network)
        && ports_of(live) == ports_of(desired)
        && set(&live.source_ranges) == set(&desired.source_ranges)
        && set(&live.target_tags) == set(&desired.target_tags)
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

impl FirewallRules {
    fn key(&self) -> ResourceKey {
        ResourceKey::global(&self.namer.firewall_rule())
    }

    fn cloud_error(&self, source: CompositeError) -> FirewallError {
        FirewallError::Cloud {
            name: self.namer.firewall_rule(),
            source,
        }
    }

    /// Maps a permission failure to the XPN error when the rule lives in a
    /// host project the cluster cannot write to.
    fn classify(&self, source: CompositeError, command: impl FnOnce() -> String) -> FirewallError {
        if self.on_xpn && source.is_forbidden() {
            let message = format!("Firewall change required by security admin: `{}`", command());
            warn!("{message}");
            FirewallError::Xpn(FirewallXpnError { message })
        } else {
            self.cloud_error(source)
        }
    }

    fn gcloud_args(&self, rule: &Firewall) -> String {
        format!(
            "--allow {} --source-ranges {} --target-tags {} --project {}",
            rule.allowed.iter().flat_map(|allowed| allowed.ports.iter().map(move |port| format!("{}:{port}", allowed.ip_protocol))).join(","),
            rule.source_ranges.join(","),
            rule.target_tags.join(","),
            self.cloud.project()
        )
    }

    fn gcloud_create(&self, rule: &Firewall) -> String {
        format!(
            "gcloud compute firewall-rules create {} --network {} --description \"{}\" {}",
            rule.name,
            last_segment(&rule.network),
            rule.description,
            self.gcloud_args(rule)
        )
    }

    fn gcloud_update(&self, rule: &Firewall) -> String {
        format!("gcloud compute firewall-rules update {} {}", rule.name, self.gcloud_args(rule))
    }

    fn gcloud_delete(&self, name: &str) -> String {
        format!("gcloud compute firewall-rules delete {name} --project {}", self.cloud.project())
    }

    fn desired(&self, target_tags: Vec<String>, additional_ports: &[String], additional_ranges: &[String]) -> Firewall {
        Firewall {
            version: Version::Ga,
            name: self.namer.firewall_rule(),
            description: L7_FIREWALL_DESCRIPTION.to_owned(),
            network: self.network_url.clone(),
            source_ranges: sorted_unique(self.health_check_ranges.iter().chain(additional_ranges)),
            target_tags,
            allowed: vec![FirewallAllowed {
                ip_protocol: "tcp".to_owned(),
                ports: sorted_unique(self.node_port_ranges.iter().chain(additional_ports)),
            }],
            ..Default::default()
        }
    }
}

#[async_trait]
impl SingleFirewallPool for FirewallRules {
    #[instrument(level = "debug", name = "FirewallRules::sync", skip_all)]
    async fn sync(&self, node_names: &[String], additional_ports: &[String], additional_ranges: &[String]) -> Result<(), FirewallError> {
        if node_names.is_empty() {
            debug!("No nodes to target, skipping firewall sync");
            return Ok(());
        }

        let target_tags = self
            .cloud
            .client()
            .node_tags(node_names)
            .await
            .map_err(|e: CloudError| self.cloud_error(e.into()))?;
        let desired = self.desired(target_tags, additional_ports, additional_ranges);
        let key = self.key();

        match self.cloud.get::<Firewall>(Version::Ga, &key).await {
            Err(e) if e.is_not_found() => {
                info!("Creating firewall rule {key} for ports {:?}", desired.allowed);
                self.cloud.create(&desired, &key).await.map_err(|e| self.classify(e, || self.gcloud_create(&desired)))
            },
            Err(e) => Err(self.cloud_error(e)),
            Ok(live) if same_rule(&live, &desired) => {
                debug!("Firewall rule {key} is up to date");
                Ok(())
            },
            Ok(_) => {
                info!("Updating firewall rule {key} for ports {:?}", desired.allowed);
                self.cloud.update(&desired, &key).await.map_err(|e| self.classify(e, || self.gcloud_update(&desired)))
            },
        }
    }

    async fn gc(&self) -> Result<(), FirewallError> {
        let key = self.key();
        info!("Deleting firewall rule {key}");
        match self.cloud.delete(ResourceKind::Firewall, Version::Ga, &key).await {
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(self.classify(e, || self.gcloud_delete(&key.name))),
            Ok(()) => Ok(()),
        }
    }
}
