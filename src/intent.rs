//! Routing intents handed to the manager by its caller.

use std::fmt;
use std::net::IpAddr;

use crate::error::RouteError;

/// A request to route `host` + `path` on a front vserver to one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingIntent {
    pub namespace: String,
    /// Content-switching vserver the policy is bound to.
    pub front_vserver: String,
    pub host: String,
    /// Exact request path; empty means "any path on this host".
    pub path: String,
    /// Appliance service object representing the backend.
    pub service_name: String,
    pub backend_ip: IpAddr,
    pub backend_port: u16,
    pub priority: u32,
}

impl RoutingIntent {
    /// Reject intents that would produce unusable appliance objects.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.host.trim().is_empty() {
            return Err(RouteError::InvalidIntent("host must not be empty".to_string()));
        }
        if self.service_name.trim().is_empty() {
            return Err(RouteError::InvalidIntent(
                "service name must not be empty".to_string(),
            ));
        }
        if self.front_vserver.trim().is_empty() {
            return Err(RouteError::InvalidIntent(
                "front vserver must not be empty".to_string(),
            ));
        }
        if self.backend_port == 0 {
            return Err(RouteError::InvalidIntent(
                "backend port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rule(&self) -> RouteRule {
        RouteRule::for_route(&self.host, &self.path)
    }
}

/// Match expression evaluated by a switching policy.
///
/// Exact host match, optionally combined with an exact path match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRule {
    Host(String),
    HostAndPath { host: String, path: String },
}

impl RouteRule {
    pub fn for_route(host: &str, path: &str) -> Self {
        if path.is_empty() {
            RouteRule::Host(host.to_string())
        } else {
            RouteRule::HostAndPath {
                host: host.to_string(),
                path: path.to_string(),
            }
        }
    }

    /// Render in the appliance's policy expression syntax.
    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteRule::Host(host) => write!(f, "HTTP.REQ.HOSTNAME.EQ({})", quoted(host)),
            RouteRule::HostAndPath { host, path } => write!(
                f,
                "HTTP.REQ.HOSTNAME.EQ({}) && HTTP.REQ.URL.PATH.EQ({})",
                quoted(host),
                quoted(path)
            ),
        }
    }
}

/// String literal in policy expression syntax.
fn quoted(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            literal.push('\\');
        }
        literal.push(c);
    }
    literal.push('"');
    literal
}

/// Parameters for creating a content-switching vserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontVserverSpec {
    pub name: String,
    pub ip: IpAddr,
    pub port: u16,
    /// Service type, e.g. `HTTP` or `SSL`.
    pub protocol: String,
}
