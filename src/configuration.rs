use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    compute::COMPUTE_ENDPOINT,
    firewalls::{DEFAULT_HEALTH_CHECK_RANGES, DEFAULT_NODE_PORT_RANGE},
    Result,
};

fn default_node_port_ranges() -> Vec<String> {
    vec![DEFAULT_NODE_PORT_RANGE.to_owned()]
}

fn default_health_check_ranges() -> Vec<String> {
    DEFAULT_HEALTH_CHECK_RANGES.iter().map(|range| (*range).to_owned()).collect()
}

fn default_compute_endpoint() -> String {
    COMPUTE_ENDPOINT.to_owned()
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    10
}

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct ClusterConfiguration {
    #[builder(setter(into))]
    pub uid: String,
    /// Overrides the cluster uid in the firewall rule name.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub firewall_suffix: Option<String>,
    #[builder(setter(into))]
    pub project: String,
    #[builder(setter(into))]
    pub region: String,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub network: String,
    /// The network lives in a shared VPC host project.
    #[builder(default)]
    #[serde(default)]
    pub on_xpn: bool,
}

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct ComputeConfiguration {
    #[builder(default = default_compute_endpoint(), setter(into))]
    #[serde(default = "default_compute_endpoint")]
    pub endpoint: String,
    #[builder(default = default_call_timeout_secs())]
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for ComputeConfiguration {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, TypedBuilder, Deserialize)]
pub struct Configuration {
    #[builder(setter(into))]
    pub controller_name: String,
    #[builder(default)]
    pub enable_open_telemetry: Option<bool>,
    #[builder(default)]
    #[serde(default)]
    pub enable_l7_ilb: bool,
    pub cluster: ClusterConfiguration,
    #[builder(default = default_node_port_ranges())]
    #[serde(default = "default_node_port_ranges")]
    pub node_port_ranges: Vec<String>,
    #[builder(default = default_health_check_ranges())]
    #[serde(default = "default_health_check_ranges")]
    pub health_check_ranges: Vec<String>,
    #[builder(default)]
    #[serde(default)]
    pub compute: ComputeConfiguration,
    #[builder(default = default_retry_delay_secs())]
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("controller name must be not empty")]
    ControllerName,
    #[error("cluster uid must be not empty")]
    ClusterUid,
    #[error("project must be not empty")]
    Project,
    #[error("region must be not empty")]
    Region,
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(Into::into)
    }

    fn check(&self) -> std::result::Result<(), ConfigurationError> {
        if self.controller_name.is_empty() {
            return Err(ConfigurationError::ControllerName);
        }
        if self.cluster.uid.is_empty() {
            return Err(ConfigurationError::ClusterUid);
        }
        if self.cluster.project.is_empty() {
            return Err(ConfigurationError::Project);
        }
        if self.cluster.region.is_empty() {
            return Err(ConfigurationError::Region);
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.compute.call_timeout_secs)
    }

    /// Full URL of the cluster network; a bare network name is qualified with
    /// the cluster project.
    pub fn network_url(&self) -> String {
        let network = if self.cluster.network.is_empty() { "default" } else { &self.cluster.network };
        if network.contains('/') {
            network.to_owned()
        } else {
            format!("{}/v1/projects/{}/global/networks/{network}", crate::compute::COMPUTE_BASE_URL, self.cluster.project)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_configuration_defaults() {
        let configuration: Configuration = serde_yaml::from_str(
            r"
controller_name: ingress-gclb
cluster:
  uid: uid1
  project: mock-project
  region: us-central1
",
        )
        .unwrap();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.enable_open_telemetry, None);
        assert!(!configuration.enable_l7_ilb);
        assert_eq!(configuration.node_port_ranges, vec!["30000-32767"]);
        assert_eq!(configuration.health_check_ranges, vec!["130.211.0.0/22", "35.191.0.0/16"]);
        assert_eq!(configuration.compute.endpoint, COMPUTE_ENDPOINT);
        assert_eq!(configuration.retry_delay(), Duration::from_secs(10));
        assert_eq!(configuration.network_url(), "https://www.googleapis.com/compute/v1/projects/mock-project/global/networks/default");
    }

    #[test]
    fn test_full_configuration() {
        let configuration: Configuration = serde_yaml::from_str(
            r"
controller_name: ingress-gclb
enable_open_telemetry: true
enable_l7_ilb: true
cluster:
  uid: uid1
  firewall_suffix: fw1
  project: mock-project
  region: europe-west1
  network: projects/host/global/networks/shared
  on_xpn: true
node_port_ranges: [30000-30100]
health_check_ranges: []
compute:
  endpoint: http://127.0.0.1:8080
  call_timeout_secs: 5
retry_delay_secs: 1
",
        )
        .unwrap();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.enable_open_telemetry, Some(true));
        assert!(configuration.cluster.on_xpn);
        assert_eq!(configuration.cluster.firewall_suffix.as_deref(), Some("fw1"));
        assert!(configuration.health_check_ranges.is_empty());
        assert_eq!(configuration.call_timeout(), Duration::from_secs(5));
        assert_eq!(configuration.network_url(), "projects/host/global/networks/shared");
    }

    #[test]
    fn test_validation() {
        let cluster = ClusterConfiguration::builder().uid("uid1").project("mock-project").region("us-central1").build();
        let configuration = Configuration::builder().controller_name("").cluster(cluster.clone()).build();
        assert_eq!(configuration.check(), Err(ConfigurationError::ControllerName));

        let configuration = Configuration::builder().controller_name("c").cluster(ClusterConfiguration { uid: String::new(), ..cluster.clone() }).build();
        assert_eq!(configuration.check(), Err(ConfigurationError::ClusterUid));

        let configuration = Configuration::builder().controller_name("c").cluster(ClusterConfiguration { region: String::new(), ..cluster }).build();
        assert_eq!(configuration.check(), Err(ConfigurationError::Region));
    }
}
