//! Route lifecycle management for a content-switching appliance.
//!
//! Translates "host + path → backend" routing intents into the appliance's
//! object graph and removes that graph again without leaving orphans:
//!
//! - [`naming`] derives stable object names from `(namespace, host, path)`.
//! - [`gateway`] is the capability boundary over the appliance API, with a
//!   NITRO HTTP implementation in [`gateway::NitroClient`].
//! - [`manager::RouteManager`] provisions, decommissions and inspects routes.
//! - [`ledger::ReferenceLedger`] counts live routes per backend service so
//!   shared services survive until their last route is gone.

pub mod config;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod ledger;
pub mod logging;
pub mod manager;
pub mod naming;

pub use error::{RouteError, Step};
pub use gateway::{Gateway, GatewayError, NitroClient, ObjectKind};
pub use intent::{FrontVserverSpec, RouteRule, RoutingIntent};
pub use ledger::{ReferenceLedger, SharedLedger};
pub use manager::{BoundPolicy, RouteManager};
