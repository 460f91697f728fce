//! In-memory compute API for tests.
//!
//! Documents are kept as written, in the richest schema any caller used, and
//! projected onto a track only when a caller deserializes them.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::Value;

use super::{types::BackendServiceGroupHealth, CloudError, ComputeClient, KindRegistry, ResourceId, ResourceKind, COMPUTE_BASE_URL};
use crate::common::{Location, ResourceKey, Version};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    List,
    Insert,
    Update,
    Delete,
    Health,
    NodeTags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub kind: Option<ResourceKind>,
    pub version: Option<Version>,
    pub key: Option<ResourceKey>,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<(ResourceKind, ResourceKey), Value>,
    failures: HashMap<(Op, Option<ResourceKind>), CloudError>,
    calls: Vec<Call>,
    node_tags: BTreeMap<String, Vec<String>>,
    health: BTreeMap<String, BackendServiceGroupHealth>,
    generation: u64,
}

pub struct FakeCompute {
    project: String,
    registry: KindRegistry,
    state: Mutex<State>,
}

impl Default for FakeCompute {
    fn default() -> Self {
        Self::new("mock-project")
    }
}

impl FakeCompute {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_owned(),
            registry: KindRegistry::new(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn self_link(&self, kind: ResourceKind, key: &ResourceKey) -> String {
        ResourceId::new(&self.project, kind, key.clone()).self_link(&self.registry, Version::Ga).unwrap_or_default()
    }

    fn stamp(&self, kind: ResourceKind, key: &ResourceKey, document: &mut Value, generation: u64) {
        if let Some(object) = document.as_object_mut() {
            object.insert("name".to_owned(), Value::from(key.name.clone()));
            object.insert("selfLink".to_owned(), Value::from(self.self_link(kind, key)));
            object.insert("fingerprint".to_owned(), Value::from(format!("fp-{generation}")));
            let location = format!("{COMPUTE_BASE_URL}/v1/projects/{}/{}", self.project, key.location.path());
            match &key.location {
                Location::Region(_) => {
                    object.insert("region".to_owned(), Value::from(location));
                },
                Location::Zone(_) => {
                    object.insert("zone".to_owned(), Value::from(location));
                },
                Location::Global => (),
            }
        }
    }

    /// Stores a document as if it had been created out of band.
    pub fn seed(&self, kind: ResourceKind, key: &ResourceKey, mut document: Value) {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
        self.stamp(kind, key, &mut document, state.generation);
        state.documents.insert((kind, key.clone()), document);
    }

    pub fn document(&self, kind: ResourceKind, key: &ResourceKey) -> Option<Value> {
        self.state.lock().unwrap().documents.get(&(kind, key.clone())).cloned()
    }

    pub fn remove(&self, kind: ResourceKind, key: &ResourceKey) {
        self.state.lock().unwrap().documents.remove(&(kind, key.clone()));
    }

    /// Every call of `op`, optionally restricted to `kind`, fails with `error`.
    pub fn fail(&self, op: Op, kind: Option<ResourceKind>, error: CloudError) {
        self.state.lock().unwrap().failures.insert((op, kind), error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.op == op).collect()
    }

    pub fn set_node_tags(&self, node: &str, tags: &[&str]) {
        self.state.lock().unwrap().node_tags.insert(node.to_owned(), tags.iter().map(|tag| (*tag).to_owned()).collect());
    }

    pub fn set_health(&self, backend_service: &str, health: BackendServiceGroupHealth) {
        self.state.lock().unwrap().health.insert(backend_service.to_owned(), health);
    }

    fn record(&self, op: Op, kind: Option<ResourceKind>, version: Option<Version>, key: Option<&ResourceKey>) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            kind,
            version,
            key: key.cloned(),
        });
        if let Some(error) = state.failures.get(&(op, kind)).or_else(|| state.failures.get(&(op, None))) {
            return Err(error.clone());
        }
        if let (Some(kind), Some(version), Some(key)) = (kind, version, key) {
            if !self.registry.supports(kind, version, key.scope()) {
                return Err(CloudError::Api {
                    code: 400,
                    message: format!("{kind} is not available at {version} for {} scope", key.scope()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeClient for FakeCompute {
    fn project(&self) -> &str {
        &self.project
    }

    async fn get(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<Value, CloudError> {
        self.record(Op::Get, Some(kind), Some(version), Some(key))?;
        self.document(kind, key).ok_or_else(|| CloudError::not_found(&format!("{kind} {key} was not found")))
    }

    async fn list(&self, kind: ResourceKind, version: Version, location: &Location) -> Result<Vec<Value>, CloudError> {
        self.record(Op::List, Some(kind), Some(version), None)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .documents
            .iter()
            .filter(|((stored_kind, key), _)| *stored_kind == kind && key.location == *location)
            .map(|(_, document)| document.clone())
            .collect())
    }

    async fn insert(&self, kind: ResourceKind, version: Version, key: &ResourceKey, mut document: Value) -> Result<(), CloudError> {
        self.record(Op::Insert, Some(kind), Some(version), Some(key))?;
        let mut state = self.state.lock().unwrap();
        if state.documents.contains_key(&(kind, key.clone())) {
            return Err(CloudError::Api {
                code: 409,
                message: format!("{kind} {key} already exists"),
            });
        }
        state.generation += 1;
        self.stamp(kind, key, &mut document, state.generation);
        state.documents.insert((kind, key.clone()), document);
        Ok(())
    }

    async fn update(&self, kind: ResourceKind, version: Version, key: &ResourceKey, mut document: Value) -> Result<(), CloudError> {
        self.record(Op::Update, Some(kind), Some(version), Some(key))?;
        let mut state = self.state.lock().unwrap();
        if !state.documents.contains_key(&(kind, key.clone())) {
            return Err(CloudError::not_found(&format!("{kind} {key} was not found")));
        }
        state.generation += 1;
        self.stamp(kind, key, &mut document, state.generation);
        state.documents.insert((kind, key.clone()), document);
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, version: Version, key: &ResourceKey) -> Result<(), CloudError> {
        self.record(Op::Delete, Some(kind), Some(version), Some(key))?;
        match self.state.lock().unwrap().documents.remove(&(kind, key.clone())) {
            Some(_) => Ok(()),
            None => Err(CloudError::not_found(&format!("{kind} {key} was not found"))),
        }
    }

    async fn backend_service_health(&self, version: Version, key: &ResourceKey, _group: &str) -> Result<BackendServiceGroupHealth, CloudError> {
        self.record(Op::Health, Some(ResourceKind::BackendService), Some(version), Some(key))?;
        self.state
            .lock()
            .unwrap()
            .health
            .get(&key.name)
            .cloned()
            .ok_or_else(|| CloudError::not_found(&format!("no health for {key}")))
    }

    async fn node_tags(&self, node_names: &[String]) -> Result<Vec<String>, CloudError> {
        self.record(Op::NodeTags, None, None, None)?;
        let state = self.state.lock().unwrap();
        let mut tags = vec![];
        for node in node_names {
            let node_tags = state.node_tags.get(node).ok_or_else(|| CloudError::not_found(&format!("instance {node} was not found")))?;
            tags.extend(node_tags.iter().cloned());
        }
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}
