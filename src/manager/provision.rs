use tracing::info;

use super::RouteManager;
use crate::error::{RouteError, Step};
use crate::gateway::schema::{
    CsAction, CsPolicy, CsPolicyBinding, LbServiceBinding, LbVserver, Service, BIND_POINT_REQUEST,
};
use crate::gateway::{Gateway, ObjectKind};
use crate::intent::RoutingIntent;
use crate::ledger::ReferenceLedger;
use crate::naming;

impl<G: Gateway + ?Sized> RouteManager<'_, G> {
    /// Build the chain for `intent` and bind it to the intent's front vserver.
    ///
    /// Existing objects and bindings are reused, so re-running the same
    /// intent converges on the same objects. Each call counts as one more
    /// live reference to the backend service. A failure leaves the steps
    /// already applied in place and names the failed step.
    ///
    /// Returns the load balancer name.
    pub fn provision(
        &self,
        intent: &RoutingIntent,
        ledger: &mut ReferenceLedger,
    ) -> Result<String, RouteError> {
        intent.validate()?;

        let lb = naming::lb_name(&intent.namespace, &intent.host);
        let policy = naming::policy_name(&intent.namespace, &intent.host, &intent.path);
        let action = naming::action_name(&intent.namespace, &intent.host, &intent.path);
        let service = intent.service_name.as_str();

        self.create(
            ObjectKind::Service,
            service,
            &Service {
                name: service.to_string(),
                ip: intent.backend_ip.to_string(),
                servicetype: self.service_type.clone(),
                port: intent.backend_port,
            },
            Step::CreateService,
        )?;
        let references = ledger.increment(service);

        self.create(
            ObjectKind::LoadBalancer,
            &lb,
            &LbVserver {
                name: lb.clone(),
                servicetype: self.service_type.clone(),
            },
            Step::CreateLoadBalancer,
        )?;

        self.bind(
            (ObjectKind::LoadBalancer, &lb),
            (ObjectKind::Service, service),
            &LbServiceBinding {
                name: lb.clone(),
                servicename: service.to_string(),
            },
            Step::BindService,
        )?;

        self.create(
            ObjectKind::SwitchAction,
            &action,
            &CsAction {
                name: action.clone(),
                targetlbvserver: Some(lb.clone()),
                comment: Some(service.to_string()),
            },
            Step::CreateAction,
        )?;

        self.create(
            ObjectKind::SwitchPolicy,
            &policy,
            &CsPolicy {
                policyname: policy.clone(),
                rule: intent.rule().expression(),
                action: Some(action.clone()),
            },
            Step::CreatePolicy,
        )?;

        self.bind(
            (ObjectKind::FrontVserver, &intent.front_vserver),
            (ObjectKind::SwitchPolicy, &policy),
            &CsPolicyBinding {
                name: intent.front_vserver.clone(),
                policyname: policy.clone(),
                priority: intent.priority,
                bindpoint: Some(BIND_POINT_REQUEST.to_string()),
            },
            Step::BindPolicy,
        )?;

        info!(
            vserver = %intent.front_vserver,
            host = %intent.host,
            path = %intent.path,
            policy = %policy,
            lb = %lb,
            service = %service,
            references,
            "Route provisioned"
        );
        Ok(lb)
    }
}
