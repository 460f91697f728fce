//! Backend services for the service ports of the cluster's ingresses.

use async_trait::async_trait;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::{
    common::{is_lower_version, Location, Namer, Scope, ServicePort, Version},
    composite::{BackendService, CompositeCloud, CompositeError, CompositeResource},
    compute::ResourceKind,
    features::{
        ensure_locality_lb_policy, l7_ilb_version, scope_from_service_port, service_port_description, set_description, version_from_description,
        version_from_service_port,
    },
};

pub const INTERNAL_MANAGED_SCHEME: &str = "INTERNAL_MANAGED";
pub const UNKNOWN_HEALTH: &str = "Unknown";

#[async_trait]
pub trait Pool: Send + Sync {
    async fn create(&self, sp: &ServicePort, health_check_link: &str) -> Result<BackendService, CompositeError>;
    async fn update(&self, be: &mut BackendService) -> Result<(), CompositeError>;
    async fn get(&self, name: &str, version: Version, scope: Scope) -> Result<BackendService, CompositeError>;
    async fn delete(&self, name: &str, scope: Scope) -> Result<(), CompositeError>;
    async fn health(&self, name: &str, version: Version, scope: Scope) -> String;
    async fn list(&self) -> Result<Vec<BackendService>, CompositeError>;
}

/// Sets the description `sp` calls for on `be`. Returns whether it changed.
pub fn ensure_description(be: &mut BackendService, sp: &ServicePort) -> bool {
    let mut description = service_port_description(sp);
    set_description(&mut description, sp);
    let description = description.render();
    if be.description == description {
        return false;
    }
    be.description = description;
    true
}

#[derive(TypedBuilder)]
pub struct Backends {
    cloud: CompositeCloud,
    namer: Namer,
    #[builder(default)]
    enable_l7_ilb: bool,
}

#[async_trait]
impl Pool for Backends {
    async fn create(&self, sp: &ServicePort, health_check_link: &str) -> Result<BackendService, CompositeError> {
        let name = sp.backend_name(&self.namer);
        let version = version_from_service_port(sp);
        let scope = scope_from_service_port(sp);
        let key = self.cloud.create_key(&name, scope == Scope::Regional);

        let mut be = BackendService {
            version,
            scope,
            name: name.clone(),
            protocol: sp.protocol.as_str().to_owned(),
            port: sp.node_port,
            port_name: Namer::named_port(sp.node_port),
            health_checks: vec![health_check_link.to_owned()],
            region: if scope == Scope::Regional { self.cloud.region().to_owned() } else { String::new() },
            ..Default::default()
        };
        if sp.l7_ilb_enabled {
            INTERNAL_MANAGED_SCHEME.clone_into(&mut be.load_balancing_scheme);
        }
        ensure_description(&mut be, sp);
        ensure_locality_lb_policy(sp, &mut be);

        info!("Creating backend service {key} at {version}");
        self.cloud.create(&be, &key).await?;
        // The fingerprint is only known after a read.
        self.get(&name, version, scope).await
    }

    async fn update(&self, be: &mut BackendService) -> Result<(), CompositeError> {
        be.set_version(version_from_description(&be.description));
        let key = self.cloud.create_key(&be.name, be.scope == Scope::Regional);
        debug!("Updating backend service {key} at {}", be.version);
        self.cloud.update(&*be, &key).await
    }

    async fn get(&self, name: &str, version: Version, scope: Scope) -> Result<BackendService, CompositeError> {
        let key = self.cloud.create_key(name, scope == Scope::Regional);
        let be: BackendService = self.cloud.get(version, &key).await?;
        let required = version_from_description(&be.description);
        if is_lower_version(version, required) {
            debug!("Backend service {key} needs {required}, fetched at {version}");
            return self.cloud.get(required, &key).await;
        }
        Ok(be)
    }

    async fn delete(&self, name: &str, scope: Scope) -> Result<(), CompositeError> {
        let regional = scope == Scope::Regional;
        let version = if regional { l7_ilb_version() } else { Version::Ga };
        let key = self.cloud.create_key(name, regional);
        info!("Deleting backend service {key}");
        match self.cloud.delete(ResourceKind::BackendService, version, &key).await {
            Err(e) if e.is_not_found() => Ok(()),
            result => result,
        }
    }

    async fn health(&self, name: &str, version: Version, scope: Scope) -> String {
        let Ok(be) = self.get(name, version, scope).await else {
            return UNKNOWN_HEALTH.to_owned();
        };
        let Some(backend) = be.backends.first() else {
            return UNKNOWN_HEALTH.to_owned();
        };
        let key = self.cloud.create_key(name, scope == Scope::Regional);
        match self.cloud.client().backend_service_health(be.version, &key, &backend.group).await {
            Ok(health) => health
                .health_status
                .first()
                .map(|status| status.health_state.clone())
                .filter(|state| !state.is_empty())
                .unwrap_or_else(|| UNKNOWN_HEALTH.to_owned()),
            Err(e) => {
                debug!("Unable to get health of {key}: {e}");
                UNKNOWN_HEALTH.to_owned()
            },
        }
    }

    async fn list(&self) -> Result<Vec<BackendService>, CompositeError> {
        let mut backends: Vec<BackendService> = self.cloud.list(Version::Ga, &Location::Global).await?;
        if self.enable_l7_ilb {
            let regional: Vec<BackendService> = self.cloud.list(l7_ilb_version(), &Location::Region(self.cloud.region().to_owned())).await?;
            backends.extend(regional);
        }
        backends.retain(|be| self.namer.name_belongs_to_cluster(&be.name));
        Ok(backends)
    }
}
