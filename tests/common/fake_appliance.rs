//! In-memory appliance for exercising the route manager.
//!
//! Enforces the referential rules of the real appliance: bound objects and
//! objects referenced by an action or policy cannot be deleted, and both
//! ends of a binding must exist. Every mutation is recorded in order.

use std::fmt;

use nsroute::gateway::{Attrs, Gateway, GatewayError, ObjectKind};
use parking_lot::Mutex;
use serde_json::Value;

/// A recorded appliance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create(ObjectKind, String),
    Delete(ObjectKind, String),
    Bind(ObjectKind, String, ObjectKind, String),
    Unbind(ObjectKind, String, ObjectKind, String),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Create(kind, name) => write!(f, "create {} {}", kind, name),
            Op::Delete(kind, name) => write!(f, "delete {} {}", kind, name),
            Op::Bind(parent, parent_name, child, child_name) => {
                write!(f, "bind {} {} {} {}", parent, parent_name, child, child_name)
            }
            Op::Unbind(parent, parent_name, child, child_name) => {
                write!(f, "unbind {} {} {} {}", parent, parent_name, child, child_name)
            }
        }
    }
}

/// Operation class a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create,
    Delete,
    Bind,
    Unbind,
    Find,
}

#[derive(Debug, Clone)]
struct Injected {
    call: Call,
    kind: ObjectKind,
    name: String,
}

#[derive(Debug, Clone)]
struct Object {
    kind: ObjectKind,
    name: String,
    attrs: Attrs,
}

#[derive(Debug, Clone)]
struct Binding {
    parent: ObjectKind,
    parent_name: String,
    child: ObjectKind,
    child_name: String,
    attrs: Attrs,
}

#[derive(Default)]
struct State {
    objects: Vec<Object>,
    bindings: Vec<Binding>,
    ops: Vec<Op>,
    failures: Vec<Injected>,
}

impl State {
    fn object(&self, kind: ObjectKind, name: &str) -> Option<&Object> {
        self.objects
            .iter()
            .find(|o| o.kind == kind && o.name == name)
    }

    fn injected(&self, call: Call, kind: ObjectKind, name: &str) -> Option<GatewayError> {
        self.failures
            .iter()
            .any(|f| f.call == call && f.kind == kind && f.name == name)
            .then(|| GatewayError::Rejected {
                status: 500,
                code: 0,
                message: format!("injected {:?} failure on {} {}", call, kind, name),
            })
    }

    /// Why `kind`/`name` cannot be deleted, if anything still refers to it.
    fn in_use(&self, kind: ObjectKind, name: &str) -> Option<String> {
        if let Some(b) = self.bindings.iter().find(|b| {
            (b.parent == kind && b.parent_name == name) || (b.child == kind && b.child_name == name)
        }) {
            return Some(format!(
                "bound: {} {} -> {} {}",
                b.parent, b.parent_name, b.child, b.child_name
            ));
        }

        let referrer = match kind {
            ObjectKind::LoadBalancer => Some((ObjectKind::SwitchAction, "targetlbvserver")),
            ObjectKind::SwitchAction => Some((ObjectKind::SwitchPolicy, "action")),
            _ => None,
        };
        let (referrer_kind, field) = referrer?;
        self.objects
            .iter()
            .find(|o| o.kind == referrer_kind && o.attrs.get(field).and_then(Value::as_str) == Some(name))
            .map(|o| format!("referenced by {} {}", o.kind, o.name))
    }
}

fn not_found(kind: ObjectKind, name: &str) -> GatewayError {
    GatewayError::NotFound {
        kind,
        name: name.to_string(),
    }
}

/// Numbers on binding listings come back as strings, like on the real API.
fn as_listed(attrs: &Attrs) -> Attrs {
    attrs
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Number(n) => Value::String(n.to_string()),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect()
}

#[derive(Default)]
pub struct FakeAppliance {
    state: Mutex<State>,
}

impl FakeAppliance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `call` on `kind`/`name` fail with a rejection.
    pub fn fail_on(&self, call: Call, kind: ObjectKind, name: &str) {
        self.state.lock().failures.push(Injected {
            call,
            kind,
            name: name.to_string(),
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Mutations recorded so far.
    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Index of `op` in the log; panics if it never happened.
    pub fn position(&self, op: &Op) -> usize {
        self.ops()
            .iter()
            .position(|o| o == op)
            .unwrap_or_else(|| panic!("operation never happened: {}", op))
    }

    pub fn has(&self, kind: ObjectKind, name: &str) -> bool {
        self.state.lock().object(kind, name).is_some()
    }

    pub fn attrs(&self, kind: ObjectKind, name: &str) -> Option<Attrs> {
        self.state.lock().object(kind, name).map(|o| o.attrs.clone())
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.state
            .lock()
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .count()
    }

    pub fn is_bound(&self, parent: ObjectKind, parent_name: &str, child: ObjectKind, child_name: &str) -> bool {
        self.state.lock().bindings.iter().any(|b| {
            b.parent == parent && b.parent_name == parent_name && b.child == child && b.child_name == child_name
        })
    }

    /// Total number of objects and bindings left on the appliance.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.objects.len() + state.bindings.len()
    }

    /// Overwrite one attribute of an existing object.
    pub fn set_attr(&self, kind: ObjectKind, name: &str, field: &str, value: Value) {
        let mut state = self.state.lock();
        let object = state
            .objects
            .iter_mut()
            .find(|o| o.kind == kind && o.name == name)
            .unwrap_or_else(|| panic!("no {} {}", kind, name));
        object.attrs.insert(field.to_string(), value);
    }
}

impl Gateway for FakeAppliance {
    fn create(&self, kind: ObjectKind, name: &str, attrs: &Attrs) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if let Some(e) = state.injected(Call::Create, kind, name) {
            return Err(e);
        }
        if state.object(kind, name).is_some() {
            return Err(GatewayError::AlreadyExists {
                kind,
                name: name.to_string(),
            });
        }

        let required = match kind {
            ObjectKind::SwitchAction => Some((ObjectKind::LoadBalancer, "targetlbvserver")),
            ObjectKind::SwitchPolicy => Some((ObjectKind::SwitchAction, "action")),
            _ => None,
        };
        if let Some((target_kind, field)) = required {
            if let Some(target) = attrs.get(field).and_then(Value::as_str) {
                if state.object(target_kind, target).is_none() {
                    return Err(not_found(target_kind, target));
                }
            }
        }

        let mut attrs = attrs.clone();
        attrs
            .entry(kind.name_field().to_string())
            .or_insert_with(|| Value::String(name.to_string()));
        state.objects.push(Object {
            kind,
            name: name.to_string(),
            attrs,
        });
        state.ops.push(Op::Create(kind, name.to_string()));
        Ok(())
    }

    fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if let Some(e) = state.injected(Call::Delete, kind, name) {
            return Err(e);
        }
        if state.object(kind, name).is_none() {
            return Err(not_found(kind, name));
        }
        if let Some(reason) = state.in_use(kind, name) {
            return Err(GatewayError::Rejected {
                status: 409,
                code: 2193,
                message: format!("{} {} is in use ({})", kind, name, reason),
            });
        }

        state.objects.retain(|o| !(o.kind == kind && o.name == name));
        state.ops.push(Op::Delete(kind, name.to_string()));
        Ok(())
    }

    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool, GatewayError> {
        let state = self.state.lock();
        if let Some(e) = state.injected(Call::Find, kind, name) {
            return Err(e);
        }
        Ok(state.object(kind, name).is_some())
    }

    fn bind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        attrs: &Attrs,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if let Some(e) = state.injected(Call::Bind, child, child_name) {
            return Err(e);
        }
        if state.object(parent, parent_name).is_none() {
            return Err(not_found(parent, parent_name));
        }
        if state.object(child, child_name).is_none() {
            return Err(not_found(child, child_name));
        }
        if state.bindings.iter().any(|b| {
            b.parent == parent && b.parent_name == parent_name && b.child == child && b.child_name == child_name
        }) {
            return Err(GatewayError::AlreadyExists {
                kind: child,
                name: child_name.to_string(),
            });
        }

        let mut attrs = attrs.clone();
        attrs.insert("name".to_string(), Value::String(parent_name.to_string()));
        attrs.insert(child.bind_field().to_string(), Value::String(child_name.to_string()));
        state.bindings.push(Binding {
            parent,
            parent_name: parent_name.to_string(),
            child,
            child_name: child_name.to_string(),
            attrs,
        });
        state.ops.push(Op::Bind(parent, parent_name.to_string(), child, child_name.to_string()));
        Ok(())
    }

    fn unbind(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        child_name: &str,
        filter_key: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if let Some(e) = state.injected(Call::Unbind, child, child_name) {
            return Err(e);
        }

        let position = state.bindings.iter().position(|b| {
            b.parent == parent
                && b.parent_name == parent_name
                && b.child == child
                && b.attrs.get(filter_key).and_then(Value::as_str) == Some(child_name)
        });
        let Some(position) = position else {
            return Err(not_found(child, child_name));
        };

        state.bindings.remove(position);
        state.ops.push(Op::Unbind(parent, parent_name.to_string(), child, child_name.to_string()));
        Ok(())
    }

    fn find(&self, kind: ObjectKind, name: &str) -> Result<Attrs, GatewayError> {
        let state = self.state.lock();
        if let Some(e) = state.injected(Call::Find, kind, name) {
            return Err(e);
        }
        state
            .object(kind, name)
            .map(|o| o.attrs.clone())
            .ok_or_else(|| not_found(kind, name))
    }

    fn find_all_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
    ) -> Result<Vec<Attrs>, GatewayError> {
        let state = self.state.lock();
        if let Some(e) = state.injected(Call::Find, parent, parent_name) {
            return Err(e);
        }
        if state.object(parent, parent_name).is_none() {
            return Err(not_found(parent, parent_name));
        }
        Ok(state
            .bindings
            .iter()
            .filter(|b| b.parent == parent && b.parent_name == parent_name && b.child == child)
            .map(|b| as_listed(&b.attrs))
            .collect())
    }

    fn find_bound(
        &self,
        parent: ObjectKind,
        parent_name: &str,
        child: ObjectKind,
        filter_key: &str,
        filter_value: &str,
    ) -> Result<Attrs, GatewayError> {
        self.find_all_bound(parent, parent_name, child)?
            .into_iter()
            .find(|attrs| attrs.get(filter_key).and_then(Value::as_str) == Some(filter_value))
            .ok_or_else(|| not_found(child, filter_value))
    }

    fn find_all(&self, kind: ObjectKind) -> Result<Vec<Attrs>, GatewayError> {
        let state = self.state.lock();
        Ok(state
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.attrs.clone())
            .collect())
    }
}
