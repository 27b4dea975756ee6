//! Lifecycle of the appliance object graph behind each route.
//!
//! A route is the chain
//! `front vserver → policy → action → load balancer → service`.
//! [`RouteManager`] creates chains, tears them down in dependency order,
//! and keeps a [`ReferenceLedger`](crate::ledger::ReferenceLedger) of how
//! many chains still lead to each backend service.

mod decommission;
mod provision;
mod reconcile;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RouteError, Step};
use crate::gateway::schema::{self, CsAction, CsPolicy, CsPolicyBinding, CsVserver, LbServiceBinding};
use crate::gateway::{Gateway, GatewayError, ObjectKind};
use crate::intent::FrontVserverSpec;

/// Default service type for services and load balancers.
pub const DEFAULT_SERVICE_TYPE: &str = "HTTP";

/// A policy bound to a front vserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPolicy {
    pub policy: String,
    pub priority: u32,
}

/// Where one route's switching action leads.
struct RouteTarget {
    lb: String,
    service: String,
}

/// Provisions and decommissions routes through a [`Gateway`].
pub struct RouteManager<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
    service_type: String,
}

impl<'a, G: Gateway + ?Sized> RouteManager<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
        }
    }

    /// Use `service_type` for the services and load balancers created.
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn gateway(&self) -> &G {
        self.gateway
    }

    /// Create the content-switching vserver routes will be bound to.
    pub fn create_front_vserver(&self, spec: &FrontVserverSpec) -> Result<(), RouteError> {
        let vserver = CsVserver {
            name: spec.name.clone(),
            ipv46: Some(spec.ip.to_string()),
            servicetype: spec.protocol.clone(),
            port: Some(spec.port),
        };
        self.create(
            ObjectKind::FrontVserver,
            &spec.name,
            &vserver,
            Step::CreateFrontVserver,
        )?;
        info!(vserver = %spec.name, ip = %spec.ip, port = spec.port, "Front vserver ready");
        Ok(())
    }

    pub fn front_vserver_exists(&self, name: &str) -> Result<bool, RouteError> {
        self.gateway
            .exists(ObjectKind::FrontVserver, name)
            .map_err(|e| RouteError::step(Step::LookupFrontVserver, name, e))
    }

    /// Names of every content-switching vserver on the appliance.
    pub fn list_front_vservers(&self) -> Result<Vec<String>, RouteError> {
        let records = self
            .gateway
            .find_all(ObjectKind::FrontVserver)
            .map_err(|e| RouteError::step(Step::ListFrontVservers, "*", e))?;

        records
            .into_iter()
            .map(|attrs| {
                schema::decode::<CsVserver>(ObjectKind::FrontVserver, attrs)
                    .map(|vserver| vserver.name)
                    .map_err(|e| RouteError::step(Step::ListFrontVservers, "*", e))
            })
            .collect()
    }

    /// Policies bound to `front_vserver`, in the order the appliance reports them.
    ///
    /// A missing vserver has no bindings. Bindings that cannot be decoded
    /// are skipped.
    pub fn list_bound_policies(&self, front_vserver: &str) -> Result<Vec<BoundPolicy>, RouteError> {
        let records = match self.gateway.find_all_bound(
            ObjectKind::FrontVserver,
            front_vserver,
            ObjectKind::SwitchPolicy,
        ) {
            Ok(records) => records,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(RouteError::step(Step::ListPolicies, front_vserver, e)),
        };

        let mut bound = Vec::with_capacity(records.len());
        for attrs in records {
            match schema::decode::<CsPolicyBinding>(ObjectKind::SwitchPolicy, attrs) {
                Ok(binding) => bound.push(BoundPolicy {
                    policy: binding.policyname,
                    priority: binding.priority,
                }),
                Err(e) => warn!(
                    vserver = %front_vserver,
                    error = %e,
                    "Skipping undecodable policy binding"
                ),
            }
        }
        Ok(bound)
    }

    /// Priority at which `policy` is bound to `front_vserver`, if it is.
    pub fn bound_policy_priority(
        &self,
        front_vserver: &str,
        policy: &str,
    ) -> Result<Option<u32>, RouteError> {
        let attrs = match self.gateway.find_bound(
            ObjectKind::FrontVserver,
            front_vserver,
            ObjectKind::SwitchPolicy,
            ObjectKind::SwitchPolicy.bind_field(),
            policy,
        ) {
            Ok(attrs) => attrs,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(RouteError::step(Step::ListPolicies, front_vserver, e)),
        };

        schema::decode::<CsPolicyBinding>(ObjectKind::SwitchPolicy, attrs)
            .map(|binding| Some(binding.priority))
            .map_err(|e| RouteError::step(Step::ListPolicies, front_vserver, e))
    }

    /// Create `name`, treating "already exists" as success.
    fn create<T: Serialize>(
        &self,
        kind: ObjectKind,
        name: &str,
        value: &T,
        step: Step,
    ) -> Result<(), RouteError> {
        let attrs = schema::encode(kind, value).map_err(|e| RouteError::step(step, name, e))?;
        match self.gateway.create(kind, name, &attrs) {
            Ok(()) => {
                debug!(kind = %kind, name = %name, "Created");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(kind = %kind, name = %name, "Already exists, reusing");
                Ok(())
            }
            Err(e) => Err(RouteError::step(step, name, e)),
        }
    }

    /// Bind `child_name` to `parent_name`, treating an existing binding as success.
    fn bind<T: Serialize>(
        &self,
        (parent, parent_name): (ObjectKind, &str),
        (child, child_name): (ObjectKind, &str),
        value: &T,
        step: Step,
    ) -> Result<(), RouteError> {
        let attrs = schema::encode(child, value).map_err(|e| RouteError::step(step, child_name, e))?;
        match self
            .gateway
            .bind(parent, parent_name, child, child_name, &attrs)
        {
            Ok(()) => {
                debug!(parent = %parent_name, child = %child_name, "Bound");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(parent = %parent_name, child = %child_name, "Already bound");
                Ok(())
            }
            Err(e) => Err(RouteError::step(step, child_name, e)),
        }
    }

    /// Delete `name`; an already-absent object counts as deleted.
    fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), GatewayError> {
        match self.gateway.delete(kind, name) {
            Err(e) if e.is_not_found() => {
                debug!(kind = %kind, name = %name, "Already deleted");
                Ok(())
            }
            other => other,
        }
    }

    /// Action fired by `policy`.
    fn policy_action(&self, policy: &str) -> Result<Option<String>, GatewayError> {
        let attrs = self.gateway.find(ObjectKind::SwitchPolicy, policy)?;
        let policy: CsPolicy = schema::decode(ObjectKind::SwitchPolicy, attrs)?;
        Ok(policy.action.filter(|a| !a.is_empty()))
    }

    /// Load balancer and service the route behind `action` leads to.
    ///
    /// The service is the one recorded on the action when it is still bound
    /// to the load balancer; an unattributed action is credited with the
    /// balancer's only service. Anything else is unresolvable.
    fn route_target(&self, action: &str) -> Result<Option<RouteTarget>, GatewayError> {
        let attrs = self.gateway.find(ObjectKind::SwitchAction, action)?;
        let action: CsAction = schema::decode(ObjectKind::SwitchAction, attrs)?;
        let Some(lb) = action.targetlbvserver.filter(|lb| !lb.is_empty()) else {
            return Ok(None);
        };

        let mut services = self.bound_services(&lb)?;
        let service = match action.comment.filter(|c| !c.is_empty()) {
            Some(recorded) if services.contains(&recorded) => Some(recorded),
            Some(_) => None,
            None if services.len() == 1 => services.pop(),
            None => None,
        };
        Ok(service.map(|service| RouteTarget { lb, service }))
    }

    /// Actions that target `lb`.
    fn actions_targeting(&self, lb: &str) -> Result<Vec<CsAction>, GatewayError> {
        let records = self.gateway.find_all(ObjectKind::SwitchAction)?;
        let mut actions = Vec::new();
        for attrs in records {
            let action: CsAction = schema::decode(ObjectKind::SwitchAction, attrs)?;
            if action.targetlbvserver.as_deref() == Some(lb) {
                actions.push(action);
            }
        }
        Ok(actions)
    }

    /// Services bound to `lb`; a missing load balancer has none.
    fn bound_services(&self, lb: &str) -> Result<Vec<String>, GatewayError> {
        let records = match self
            .gateway
            .find_all_bound(ObjectKind::LoadBalancer, lb, ObjectKind::Service)
        {
            Ok(records) => records,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        records
            .into_iter()
            .map(|attrs| {
                schema::decode::<LbServiceBinding>(ObjectKind::Service, attrs)
                    .map(|binding| binding.servicename)
            })
            .collect()
    }
}
