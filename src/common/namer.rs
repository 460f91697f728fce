const PREFIX: &str = "k8s";
const NEG_PREFIX: &str = "k8s1";
const MAX_NAME_LENGTH: usize = 63;

/// Generates cloud resource names owned by one cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namer {
    uid: String,
    firewall: String,
}

impl Namer {
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_owned(),
            firewall: uid.to_owned(),
        }
    }

    /// Overrides the suffix of the firewall rule name, which otherwise is the
    /// cluster uid.
    #[must_use]
    pub fn with_firewall_suffix(mut self, suffix: &str) -> Self {
        suffix.clone_into(&mut self.firewall);
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn firewall_rule(&self) -> String {
        truncate(format!("{PREFIX}-fw-l7--{}", self.firewall))
    }

    pub fn instance_group_backend(&self, node_port: i64) -> String {
        truncate(format!("{PREFIX}-be-{node_port}--{}", self.uid))
    }

    pub fn neg(&self, namespace: &str, name: &str, port: &str) -> String {
        truncate(format!("{NEG_PREFIX}-{}-{namespace}-{name}-{port}", self.uid))
    }

    pub fn named_port(node_port: i64) -> String {
        format!("port{node_port}")
    }

    pub fn name_belongs_to_cluster(&self, name: &str) -> bool {
        if self.uid.is_empty() {
            return false;
        }
        (name.starts_with(&format!("{PREFIX}-")) && name.ends_with(&format!("--{}", self.uid)))
            || name.starts_with(&format!("{NEG_PREFIX}-{}-", self.uid))
    }
}

fn truncate(mut name: String) -> String {
    if name.len() > MAX_NAME_LENGTH {
        name.truncate(MAX_NAME_LENGTH);
    }
    name
}
