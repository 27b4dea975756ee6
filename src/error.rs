//! Errors surfaced by route provisioning and teardown.

use std::fmt;

use thiserror::Error;

use crate::gateway::GatewayError;

/// A single appliance step of provisioning, teardown, or reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateService,
    CreateLoadBalancer,
    BindService,
    CreateAction,
    CreatePolicy,
    BindPolicy,
    CreateFrontVserver,
    ListPolicies,
    UnbindPolicy,
    DeletePolicy,
    DeleteAction,
    ListServices,
    DeleteFrontVserver,
    ListFrontVservers,
    LookupFrontVserver,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::CreateService => "create service",
            Step::CreateLoadBalancer => "create load balancer",
            Step::BindService => "bind service to load balancer",
            Step::CreateAction => "create switching action",
            Step::CreatePolicy => "create switching policy",
            Step::BindPolicy => "bind policy to front vserver",
            Step::CreateFrontVserver => "create front vserver",
            Step::ListPolicies => "list bound policies",
            Step::UnbindPolicy => "unbind policy from front vserver",
            Step::DeletePolicy => "delete switching policy",
            Step::DeleteAction => "delete switching action",
            Step::ListServices => "list bound services",
            Step::DeleteFrontVserver => "delete front vserver",
            Step::ListFrontVservers => "list front vservers",
            Step::LookupFrontVserver => "look up front vserver",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`RouteManager`](crate::manager::RouteManager).
#[derive(Debug, Error)]
pub enum RouteError {
    /// An appliance call failed; earlier steps are left applied.
    #[error("Failed to {step} '{object}': {source}")]
    Step {
        step: Step,
        object: String,
        #[source]
        source: GatewayError,
    },

    /// The intent cannot be provisioned as given.
    #[error("Invalid routing intent: {0}")]
    InvalidIntent(String),
}

impl RouteError {
    pub(crate) fn step(step: Step, object: impl Into<String>, source: GatewayError) -> Self {
        RouteError::Step {
            step,
            object: object.into(),
            source,
        }
    }

    /// The step that failed, if the failure came from the appliance.
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            RouteError::Step { step, .. } => Some(*step),
            RouteError::InvalidIntent(_) => None,
        }
    }

    /// Whether re-running the whole operation can be expected to help.
    pub fn is_retryable(&self) -> bool {
        match self {
            RouteError::Step { source, .. } => source.is_retryable(),
            RouteError::InvalidIntent(_) => false,
        }
    }
}
