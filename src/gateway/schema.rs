//! Typed attribute schemas for each appliance object and binding kind.
//!
//! The appliance reports numeric attributes inconsistently (numbers on
//! some endpoints, decimal strings on binding listings), so numeric fields
//! accept both.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use super::{Attrs, GatewayError, ObjectKind};

/// Request-time bind point for switching policies.
pub const BIND_POINT_REQUEST: &str = "REQUEST";

/// Backend service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub servicetype: String,
    #[serde(deserialize_with = "lenient_u16")]
    pub port: u16,
}

/// Load-balancing vserver fronting one host's services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbVserver {
    pub name: String,
    #[serde(default)]
    pub servicetype: String,
}

/// Content-switching (front) vserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsVserver {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv46: Option<String>,
    #[serde(default)]
    pub servicetype: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_u16",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
}

/// Switching action targeting a load balancer.
///
/// `comment` carries the service the route was provisioned for, so the
/// route's share of the load balancer can be told apart from its siblings'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetlbvserver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Switching policy: a rule plus the action it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsPolicy {
    pub policyname: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// LoadBalancer ↔ Service binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbServiceBinding {
    pub name: String,
    pub servicename: String,
}

/// FrontVserver ↔ SwitchPolicy binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsPolicyBinding {
    pub name: String,
    pub policyname: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindpoint: Option<String>,
}

/// Serialize `value` into an attribute set.
pub fn encode<T: Serialize>(kind: ObjectKind, value: &T) -> Result<Attrs, GatewayError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(attrs)) => Ok(attrs),
        Ok(other) => Err(GatewayError::Protocol {
            kind,
            message: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(GatewayError::Protocol {
            kind,
            message: e.to_string(),
        }),
    }
}

/// Decode an attribute set returned by the appliance.
pub fn decode<T: DeserializeOwned>(kind: ObjectKind, attrs: Attrs) -> Result<T, GatewayError> {
    serde_json::from_value(serde_json::Value::Object(attrs)).map_err(|e| GatewayError::Protocol {
        kind,
        message: e.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    fn into_u64<E: de::Error>(self) -> Result<u64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid number '{}'", s))),
        }
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = NumberOrString::deserialize(deserializer)?.into_u64()?;
    u32::try_from(n).map_err(|_| de::Error::custom(format!("{} out of range", n)))
}

fn lenient_u16<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let n = NumberOrString::deserialize(deserializer)?.into_u64()?;
    u16::try_from(n).map_err(|_| de::Error::custom(format!("{} out of range", n)))
}

fn lenient_opt_u16<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    lenient_u16(deserializer).map(Some)
}
