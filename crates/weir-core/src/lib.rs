//! # weir-core
//!
//! Per-realm WAMP routing core: realm/session/role lifecycles, message
//! dispatch, and the authorization pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌────────┐
//! │ RouterFactory│────▶│   Router    │────▶│ Broker │
//! └──────────────┘     │ (per realm) │     └────────┘
//!                      │             │     ┌────────┐
//!                      │             │────▶│ Dealer │
//!                      └─────────────┘     └────────┘
//!                             │
//!                             ▼
//!                      ┌─────────────┐
//!                      │    Roles    │
//!                      └─────────────┘
//! ```
//!
//! A transport hands decoded messages to a realm's [`Router`], which
//! dispatches them to the broker or dealer by kind. The sub-engines call
//! back into [`Router::authorize`] before acting and emit replies through
//! [`Router::send`]. When a realm's last session detaches, the router
//! notifies its owning [`RouterFactory`], which destroys it.
//!
//! Broker, dealer, store and authorizer transport are trait seams;
//! [`BasicBroker`], [`BasicDealer`] and the store backends are the built-in
//! implementations.

pub mod authorization;
pub mod broker;
pub mod config;
pub mod dealer;
pub mod error;
pub mod factory;
pub mod role;
pub mod router;
pub mod session;
pub mod store;

pub use authorization::{Action, Authorization};
pub use broker::{BasicBroker, Broker, BrokerFeatures};
pub use config::{ConfigError, MqttPayloadFormat, RealmConfig, RoleConfig, StoreConfig, StoreKind};
pub use dealer::{BasicDealer, Dealer, DealerFeatures};
pub use error::RouterError;
pub use factory::RouterFactory;
pub use role::{
    ActionGrants, AuthorizationRequest, AuthorizerClient, DefaultRole, DiscloseSpec,
    DynamicAuthRole, PermissionRule, Role, StaticAuthRole, TrustedRole,
};
pub use router::{RealmFeatures, RealmObserver, Router, RouterConfig, RESERVED_ROLES};
pub use session::{SessionDetails, SessionHandle, SessionId, SessionTransport, TransportClosed};
pub use store::{MemoryRealmStore, RealmStore, StoreError, StoredEvent};

#[cfg(feature = "lmdb")]
pub use store::LmdbRealmStore;
