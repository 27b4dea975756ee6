use tracing::{info, warn};

use super::{RouteManager, RouteTarget};
use crate::error::{RouteError, Step};
use crate::gateway::{Gateway, ObjectKind};
use crate::ledger::ReferenceLedger;

impl<G: Gateway + ?Sized> RouteManager<'_, G> {
    /// Tear down every route bound to `front_vserver`, then the vserver itself.
    ///
    /// Each policy chain is removed child-first: unbind policy, delete
    /// policy, delete action, unbind services, delete load balancer, then
    /// release the services. Objects whose lookup or deletion fails are
    /// logged and left in place while the remaining policies are processed.
    /// A load balancer still targeted by another action is kept, and a
    /// service is deleted only when its ledger count reaches zero.
    ///
    /// If any policy could not be unbound, the vserver is kept and the
    /// first unbind failure is returned after all policies were visited.
    pub fn decommission(
        &self,
        front_vserver: &str,
        ledger: &mut ReferenceLedger,
    ) -> Result<(), RouteError> {
        let bound = self.list_bound_policies(front_vserver)?;
        let mut unbind_failure: Option<RouteError> = None;

        for binding in &bound {
            let policy = binding.policy.as_str();
            if let Err(failure) = self.unbind_policy(front_vserver, policy) {
                warn!(
                    vserver = %front_vserver,
                    policy = %policy,
                    error = %failure,
                    "Skipping teardown of policy that could not be unbound"
                );
                unbind_failure.get_or_insert(failure);
                continue;
            }

            self.teardown_chain(policy, ledger);
        }

        if let Some(failure) = unbind_failure {
            warn!(vserver = %front_vserver, "Keeping front vserver with policies still bound");
            return Err(failure);
        }

        self.delete(ObjectKind::FrontVserver, front_vserver)
            .map_err(|e| RouteError::step(Step::DeleteFrontVserver, front_vserver, e))?;
        info!(vserver = %front_vserver, policies = bound.len(), "Front vserver decommissioned");
        Ok(())
    }

    /// Unbind each of `policies` from `front_vserver` and delete the
    /// policy and its action. Load balancers and services are untouched.
    ///
    /// Every policy is attempted; the first failure is returned.
    pub fn delete_policies(&self, front_vserver: &str, policies: &[String]) -> Result<(), RouteError> {
        let mut first_failure: Option<RouteError> = None;

        for policy in policies {
            if let Err(failure) = self.delete_policy(front_vserver, policy) {
                warn!(vserver = %front_vserver, policy = %policy, error = %failure, "Failed to delete policy");
                first_failure.get_or_insert(failure);
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn unbind_policy(&self, front_vserver: &str, policy: &str) -> Result<(), RouteError> {
        match self.gateway.unbind(
            ObjectKind::FrontVserver,
            front_vserver,
            ObjectKind::SwitchPolicy,
            policy,
            ObjectKind::SwitchPolicy.bind_field(),
        ) {
            Err(e) if !e.is_not_found() => Err(RouteError::step(Step::UnbindPolicy, policy, e)),
            _ => Ok(()),
        }
    }

    fn delete_policy(&self, front_vserver: &str, policy: &str) -> Result<(), RouteError> {
        self.unbind_policy(front_vserver, policy)?;

        let action = self.resolve_action(policy);

        self.delete(ObjectKind::SwitchPolicy, policy)
            .map_err(|e| RouteError::step(Step::DeletePolicy, policy, e))?;

        if let Some(action) = action {
            self.delete(ObjectKind::SwitchAction, &action)
                .map_err(|e| RouteError::step(Step::DeleteAction, action.as_str(), e))?;
        }
        info!(vserver = %front_vserver, policy = %policy, "Policy deleted");
        Ok(())
    }

    /// Remove what hangs off a policy that was just unbound.
    ///
    /// The route releases one reference to its own service. That service is
    /// unbound from the load balancer once no sibling route on the balancer
    /// leads to it, and the balancer goes once no action targets it.
    fn teardown_chain(&self, policy: &str, ledger: &mut ReferenceLedger) {
        let action = self.resolve_action(policy);
        let route = action.as_deref().and_then(|action| self.resolve_route(action));

        if let Err(e) = self.delete(ObjectKind::SwitchPolicy, policy) {
            // Still held elsewhere; only this binding's reference goes away.
            warn!(policy = %policy, error = %e, "Failed to delete policy, releasing its reference only");
            if let Some(route) = route {
                ledger.decrement(&route.service);
            }
            return;
        }

        let Some(action) = action else {
            warn!(policy = %policy, "Policy had no resolvable action, leaking downstream objects");
            return;
        };
        let Some(RouteTarget { lb, service }) = route else {
            return;
        };

        if let Err(e) = self.delete(ObjectKind::SwitchAction, &action) {
            warn!(action = %action, lb = %lb, error = %e, "Failed to delete action");
        }
        let remaining = ledger.decrement(&service);

        let siblings = match self.actions_targeting(&lb) {
            Ok(siblings) => siblings,
            Err(e) => {
                warn!(lb = %lb, error = %e, "Could not list actions, keeping load balancer and its services");
                return;
            }
        };

        // Unattributed siblings may lead anywhere on the balancer.
        let shared = siblings
            .iter()
            .any(|sibling| sibling.comment.as_deref().map_or(true, |c| c == service));
        let unbound = !shared && self.unbind_service(&lb, &service);

        if siblings.is_empty() {
            self.delete_load_balancer(&lb);
        }

        if remaining > 0 {
            info!(service = %service, remaining, "Service still referenced, keeping it");
            return;
        }
        if !unbound {
            warn!(service = %service, lb = %lb, "Unreferenced service is still bound, leaking it");
            return;
        }
        match self.delete(ObjectKind::Service, &service) {
            Ok(()) => info!(service = %service, "Service deleted"),
            Err(e) => warn!(service = %service, error = %e, "Failed to delete service"),
        }
    }

    /// Unbind `service` from `lb`. Returns whether it is no longer bound.
    fn unbind_service(&self, lb: &str, service: &str) -> bool {
        match self.gateway.unbind(
            ObjectKind::LoadBalancer,
            lb,
            ObjectKind::Service,
            service,
            ObjectKind::Service.bind_field(),
        ) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                warn!(lb = %lb, service = %service, error = %e, "Failed to unbind service");
                false
            }
        }
    }

    /// Unbind whatever is left on an untargeted `lb`, then delete it.
    fn delete_load_balancer(&self, lb: &str) {
        let services = match self.bound_services(lb) {
            Ok(services) => services,
            Err(e) => {
                warn!(lb = %lb, error = %e, "Could not list bound services, leaking load balancer");
                return;
            }
        };

        let mut cleared = true;
        for service in &services {
            cleared &= self.unbind_service(lb, service);
        }
        if !cleared {
            return;
        }

        match self.delete(ObjectKind::LoadBalancer, lb) {
            Ok(()) => info!(lb = %lb, "Load balancer deleted"),
            Err(e) => warn!(lb = %lb, error = %e, "Failed to delete load balancer"),
        }
    }

    fn resolve_action(&self, policy: &str) -> Option<String> {
        match self.policy_action(policy) {
            Ok(action) => action,
            Err(e) => {
                warn!(policy = %policy, error = %e, "Could not resolve policy action");
                None
            }
        }
    }

    fn resolve_route(&self, action: &str) -> Option<RouteTarget> {
        match self.route_target(action) {
            Ok(Some(route)) => Some(route),
            Ok(None) => {
                warn!(action = %action, "Action has no resolvable load balancer and service, leaking it");
                None
            }
            Err(e) => {
                warn!(action = %action, error = %e, "Could not resolve action target, leaking it");
                None
            }
        }
    }
}
