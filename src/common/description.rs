use serde::{Deserialize, Serialize};

/// JSON document persisted in a backend service's `description` field.
///
/// Missing members decode as empty; text that is not a description decodes
/// to the empty description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "kubernetes.io/service-name", default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    #[serde(rename = "kubernetes.io/service-port", default, skip_serializing_if = "String::is_empty")]
    pub service_port: String,
    #[serde(rename = "x-features", default, skip_serializing_if = "Vec::is_empty")]
    pub x_features: Vec<String>,
}

impl Description {
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.service_name.is_empty() && self.service_port.is_empty() && self.x_features.is_empty()
    }

    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        serde_json::to_string(self).unwrap_or_default()
    }
}
