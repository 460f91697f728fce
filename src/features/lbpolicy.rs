use tracing::info;

use crate::{common::ServicePort, composite::BackendService};

/// Copies the service port's locality load balancing policy onto `be`.
/// Returns whether `be` changed.
pub fn ensure_locality_lb_policy(sp: &ServicePort, be: &mut BackendService) -> bool {
    let Some(policy) = sp.locality_lb_policy() else {
        return false;
    };
    if be.locality_lb_policy == policy {
        return false;
    }
    policy.clone_into(&mut be.locality_lb_policy);
    info!("Updated LocalityLbPolicy settings for service {}", sp.id.service);
    true
}
