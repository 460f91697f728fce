use k8s_openapi::api::{
    core::v1::Service,
    networking::v1::{Ingress, IngressBackend},
};
use kube::ResourceExt;

pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
pub const SUPPRESS_FIREWALL_XPN_ERROR_ANNOTATION: &str = "networking.gke.io/suppress-firewall-xpn-error";

pub const GCE_INGRESS_CLASS: &str = "gce";
pub const GCE_L7_ILB_INGRESS_CLASS: &str = "gce-internal";
pub const GCE_MULTI_CLUSTER_INGRESS_CLASS: &str = "gce-multi-cluster";

fn ingress_class(ingress: &Ingress) -> &str {
    ingress
        .annotations()
        .get(INGRESS_CLASS_ANNOTATION)
        .map(String::as_str)
        .or_else(|| ingress.spec.as_ref().and_then(|spec| spec.ingress_class_name.as_deref()))
        .unwrap_or_default()
}

/// An ingress handled by this controller. Internal ingresses count only when
/// L7 ILB support is enabled.
pub fn is_gce_ingress(ingress: &Ingress, enable_l7_ilb: bool) -> bool {
    match ingress_class(ingress) {
        "" | GCE_INGRESS_CLASS => true,
        GCE_L7_ILB_INGRESS_CLASS => enable_l7_ilb,
        _ => false,
    }
}

pub fn is_gce_multi_cluster_ingress(ingress: &Ingress) -> bool {
    ingress_class(ingress) == GCE_MULTI_CLUSTER_INGRESS_CLASS
}

pub fn is_gce_l7_ilb_ingress(ingress: &Ingress) -> bool {
    ingress_class(ingress) == GCE_L7_ILB_INGRESS_CLASS
}

pub fn suppresses_firewall_xpn_error(ingress: &Ingress) -> bool {
    ingress.annotations().get(SUPPRESS_FIREWALL_XPN_ERROR_ANNOTATION).is_some_and(|value| value == "true")
}

/// Every backend of the ingress, default backend first.
pub fn ingress_backends(ingress: &Ingress) -> Vec<&IngressBackend> {
    let Some(spec) = ingress.spec.as_ref() else {
        return vec![];
    };
    spec.default_backend
        .iter()
        .chain(
            spec.rules
                .iter()
                .flatten()
                .filter_map(|rule| rule.http.as_ref())
                .flat_map(|http| http.paths.iter().map(|path| &path.backend)),
        )
        .collect()
}

pub fn references_service(ingress: &Ingress, service: &Service) -> bool {
    if ingress.namespace() != service.namespace() {
        return false;
    }
    let service_name = service.name_any();
    ingress_backends(ingress)
        .into_iter()
        .filter_map(|backend| backend.service.as_ref())
        .any(|backend| backend.name == service_name)
}
