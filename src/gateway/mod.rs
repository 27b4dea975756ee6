//! Capability boundary over the appliance's configuration API.
//!
//! Everything the manager does to the appliance goes through [`Gateway`]:
//! object CRUD plus binding CRUD. Attributes travel as JSON objects; the
//! [`schema`] module gives each object kind a typed view with explicit
//! decoding failures.

mod error;
pub mod nitro;
pub mod schema;

use std::fmt;

pub use error::GatewayError;
pub use nitro::NitroClient;

/// Untyped attribute set of one appliance object or binding.
pub type Attrs = serde_json::Map<String, serde_json::Value>;

/// Kinds of appliance objects the manager touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    FrontVserver,
    LoadBalancer,
    Service,
    SwitchAction,
    SwitchPolicy,
}

impl ObjectKind {
    /// Resource type name in the appliance API.
    pub fn resource_type(&self) -> &'static str {
        match self {
            ObjectKind::FrontVserver => "csvserver",
            ObjectKind::LoadBalancer => "lbvserver",
            ObjectKind::Service => "service",
            ObjectKind::SwitchAction => "csaction",
            ObjectKind::SwitchPolicy => "cspolicy",
        }
    }

    /// Attribute holding the object's name.
    pub fn name_field(&self) -> &'static str {
        match self {
            ObjectKind::SwitchPolicy => "policyname",
            _ => "name",
        }
    }

    /// Attribute naming this kind when it is the child side of a binding.
    pub fn bind_field(&self) -> &'static str {
        match self {
            ObjectKind::Service => "servicename",
            ObjectKind::SwitchPolicy => "policyname",
            ObjectKind::LoadBalancer => "lbvserver",
            ObjectKind::SwitchAction => "actionname",
            ObjectKind::FrontVserver => "csvserver",
        }
    }

    /// Resource type of the binding between `self` (parent) and `child`.
    pub fn binding_type(&self, child: ObjectKind) -> String {
        format!("{}_{}_binding", self.resource_type(), child.resource_type())
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// Object and binding operations against one appliance.
///
/// Every call is a blocking remote round trip. Implementations report a
/// create of an existing name as [`GatewayError::AlreadyExists`] and a
/// lookup of a missing object or binding as [`GatewayError::NotFound`], so
/// callers can tolerate exactly those cases.
pub trait Gateway {
    fn create(&self, kind: ObjectKind, name: &str, attrs: &Attrs) -> Result<(), GatewayError>;

    fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), GatewayError>;

    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool, GatewayError>;

    /// Bind `child_name` to `parent_name`. `attrs` carries binding
    /// attributes such as priority; the two names are added by the gateway.
    fn bind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        attrs: &Attrs,
    ) -> Result<(), GatewayError>;

    /// Remove the binding whose `filter_key` attribute equals `child_name`.
    fn unbind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        filter_key: &str,
    ) -> Result<(), GatewayError>;

    fn find(&self, kind: ObjectKind, name: &str) -> Result<Attrs, GatewayError>;

    /// All bindings of `child` kind on `parent_name`, in appliance order.
    fn find_all_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
    ) -> Result<Vec<Attrs>, GatewayError>;

    /// The first binding on `parent_name` whose `filter_key` equals `filter_value`.
    fn find_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        filter_key: &str,
        filter_value: &str,
    ) -> Result<Attrs, GatewayError>;

    fn find_all(&self, kind: ObjectKind) -> Result<Vec<Attrs>, GatewayError>;
}
