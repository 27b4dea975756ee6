use tracing::{info, warn};

use super::RouteManager;
use crate::error::RouteError;
use crate::gateway::Gateway;
use crate::ledger::ReferenceLedger;

impl<G: Gateway + ?Sized> RouteManager<'_, G> {
    /// Rebuild `ledger` from what is bound on the appliance.
    ///
    /// Every policy bound to every front vserver counts one reference for
    /// the service its route was provisioned for, the same reference
    /// `provision` takes. Chains that cannot be followed are skipped. The
    /// previous ledger contents are discarded.
    pub fn reconcile_ledger(&self, ledger: &mut ReferenceLedger) -> Result<(), RouteError> {
        let mut rebuilt = ReferenceLedger::new();
        let mut chains = 0usize;

        for vserver in self.list_front_vservers()? {
            for binding in self.list_bound_policies(&vserver)? {
                let Some(service) = self.chain_service(&binding.policy) else {
                    warn!(vserver = %vserver, policy = %binding.policy, "Skipping unresolvable route");
                    continue;
                };
                rebuilt.increment(&service);
                chains += 1;
            }
        }

        info!(chains, services = rebuilt.len(), "Ledger reconciled");
        *ledger = rebuilt;
        Ok(())
    }

    /// Service the route behind `policy` was provisioned for.
    fn chain_service(&self, policy: &str) -> Option<String> {
        let action = self.policy_action(policy).ok().flatten()?;
        let route = self.route_target(&action).ok().flatten()?;
        Some(route.service)
    }
}
