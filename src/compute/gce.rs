use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};

use async_trait::async_trait;
use itertools::Itertools;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};
use tracing::{debug, warn};

use super::{types::BackendServiceGroupHealth, CloudError, ComputeClient, KindRegistry, ResourceKind};
use crate::common::{Location, ResourceKey, Version};

pub const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(1);
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    self_link: String,
    #[serde(default)]
    http_error_status_code: Option<u16>,
    #[serde(default)]
    error: Option<OperationErrors>,
}

#[derive(Deserialize, Default)]
struct OperationErrors {
    #[serde(default)]
    errors: Vec<OperationErrorItem>,
}

#[derive(Deserialize, Default)]
struct OperationErrorItem {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// REST client for the compute API authenticated with the instance's default
/// service account.
pub struct GceClient {
    http: reqwest::Client,
    endpoint: String,
    project: String,
    registry: KindRegistry,
    token: Mutex<Option<CachedToken>>,
}

impl GceClient {
    pub fn new(endpoint: &str, project: &str, registry: KindRegistry, call_timeout: Duration) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder().timeout(call_timeout).build().map_err(|e| CloudError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            project: project.to_owned(),
            registry,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CloudError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Fetching access token from metadata server");
        let response = self
            .http
            .get(DEFAULT_TOKEN_URI)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;
        let response: TokenResponse = Self::decode(response).await?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CloudError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| CloudError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(error) => CloudError::Api {
                    code: error.error.code,
                    message: error.error.message,
                },
                Err(_) => CloudError::Api { code: status.as_u16(), message: body },
            });
        }
        serde_json::from_str(&body).map_err(|e| CloudError::Decode(e.to_string()))
    }

    fn collection_url(&self, kind: ResourceKind, version: Version, location: &Location) -> Result<String, CloudError> {
        let collection = self.registry.collection(kind, location.scope()).ok_or_else(|| CloudError::Api {
            code: 400,
            message: format!("{kind} has no collection at {} scope", location.scope()),
        })?;
        Ok(format!("{}/compute/{}/projects/{}/{}/{collection}", self.endpoint, version.api_path(), self.project, location.path()))
    }

    fn resource_url(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<String, CloudError> {
        Ok(format!("{}/{}", self.collection_url(kind, version, &key.location)?, key.name))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, CloudError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await.map_err(|e| CloudError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn wait_for(&self, operation: Operation) -> Result<(), CloudError> {
        let mut operation = operation;
        while operation.status != "DONE" {
            sleep(OPERATION_POLL_INTERVAL).await;
            debug!("Waiting for operation {}", operation.name);
            operation = self.send(self.http.get(&operation.self_link)).await?;
        }
        match operation.error {
            Some(errors) if !errors.errors.is_empty() => {
                let message = errors.errors.iter().map(|e| format!("{}: {}", e.code, e.message)).join(", ");
                warn!("Operation {} failed {message}", operation.name);
                Err(CloudError::Api {
                    code: operation.http_error_status_code.unwrap_or(400),
                    message,
                })
            },
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ComputeClient for GceClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn get(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<Value, CloudError> {
        let url = self.resource_url(kind, version, key)?;
        self.send(self.http.get(url)).await
    }

    async fn list(&self, kind: ResourceKind, version: Version, location: &Location) -> Result<Vec<Value>, CloudError> {
        let url = self.collection_url(kind, version, location)?;
        let mut items = vec![];
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: ListPage = self.send(request).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(items),
            }
        }
    }

    async fn insert(&self, kind: ResourceKind, version: Version, key: &ResourceKey, document: Value) -> Result<(), CloudError> {
        let url = self.collection_url(kind, version, &key.location)?;
        let operation = self.send(self.http.post(url).json(&document)).await?;
        self.wait_for(operation).await
    }

    async fn update(&self, kind: ResourceKind, version: Version, key: &ResourceKey, document: Value) -> Result<(), CloudError> {
        let url = self.resource_url(kind, version, key)?;
        let operation = self.send(self.http.put(url).json(&document)).await?;
        self.wait_for(operation).await
    }

    async fn delete(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<(), CloudError> {
        let url = self.resource_url(kind, version, key)?;
        let operation = self.send(self.http.delete(url)).await?;
        self.wait_for(operation).await
    }

    async fn backend_service_health(&self, version: Version, key: &ResourceKey, group: &str) -> Result<BackendServiceGroupHealth, CloudError> {
        let url = format!("{}/getHealth", self.resource_url(ResourceKind::BackendService, version, key)?);
        self.send(self.http.post(url).json(&json!({ "group": group }))).await
    }

    async fn node_tags(&self, node_names: &[String]) -> Result<Vec<String>, CloudError> {
        let wanted: BTreeSet<&str> = node_names.iter().map(String::as_str).collect();
        let url = format!("{}/compute/{}/projects/{}/aggregated/instances", self.endpoint, Version::Ga.api_path(), self.project);
        let mut found: HashMap<String, Vec<String>> = HashMap::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: Value = self.send(request).await?;
            let instances = page
                .get("items")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|scopes| scopes.values())
                .filter_map(|scoped| scoped.get("instances").and_then(Value::as_array))
                .flatten();
            for instance in instances {
                let Some(name) = instance.get("name").and_then(Value::as_str) else {
                    continue;
                };
                if wanted.contains(name) {
                    let tags = instance
                        .pointer("/tags/items")
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                        .filter_map(|tag| tag.as_str().map(str::to_owned))
                        .collect();
                    found.insert(name.to_owned(), tags);
                }
            }
            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_owned()),
                _ => break,
            }
        }

        let missing = wanted.iter().filter(|name| !found.contains_key(**name)).join(", ");
        if !missing.is_empty() {
            return Err(CloudError::not_found(&format!("instances not found: {missing}")));
        }
        Ok(found.into_values().flatten().sorted().dedup().collect())
    }
}

impl std::fmt::Debug for GceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GceClient").field("endpoint", &self.endpoint).field("project", &self.project).finish_non_exhaustive()
    }
}
