//! The realm registry.
//!
//! A [`RouterFactory`] owns one [`Router`] per started realm, selects and
//! wires each realm's store, installs roles, and destroys a router when its
//! last session detaches.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, warn};
use weir_proto::uri::{self, MatchPolicy};

use crate::config::{MqttPayloadFormat, RealmConfig, RoleConfig, StoreConfig, StoreKind};
use crate::error::RouterError;
use crate::role::{AuthorizerClient, DefaultRole, DynamicAuthRole, Role, StaticAuthRole};
use crate::router::{RealmObserver, Router, RouterConfig};
use crate::store::{MemoryRealmStore, RealmStore};

#[cfg(feature = "lmdb")]
use crate::store::LmdbRealmStore;

/// The realm-URI -> router map, shared with routers as their teardown
/// observer. Routers hold only a weak reference, so ownership stays
/// one-directional: the registry owns the routers.
struct RealmRegistry {
    routers: DashMap<String, Arc<Router>>,
}

impl RealmObserver for RealmRegistry {
    fn on_last_detach(&self, router: &Router) {
        if self.routers.remove(router.realm()).is_some() {
            debug!(realm = router.realm(), "router destroyed");
        } else {
            warn!(realm = router.realm(), "last-detach for unregistered realm");
        }
    }
}

/// Creates, registers and destroys realm routers.
pub struct RouterFactory {
    registry: Arc<RealmRegistry>,
    /// Options applied to every router this factory creates.
    options: RouterConfig,
    /// Whether `get` creates missing realms on demand.
    auto_create_realms: bool,
    /// Client used by dynamic roles to reach authorizer procedures.
    authorizer_client: Option<Arc<dyn AuthorizerClient>>,
}

impl RouterFactory {
    /// Create a factory with the given default router options.
    #[must_use]
    pub fn new(options: RouterConfig) -> Self {
        Self {
            registry: Arc::new(RealmRegistry {
                routers: DashMap::new(),
            }),
            options,
            auto_create_realms: false,
            authorizer_client: None,
        }
    }

    /// Enable or disable lazy realm creation in [`get`](Self::get).
    #[must_use]
    pub fn with_auto_create(mut self, auto_create_realms: bool) -> Self {
        self.auto_create_realms = auto_create_realms;
        self
    }

    /// Supply the client dynamic roles use to call authorizer procedures.
    #[must_use]
    pub fn with_authorizer_client(mut self, client: Arc<dyn AuthorizerClient>) -> Self {
        self.authorizer_client = Some(client);
        self
    }

    fn observer_handle(&self) -> Weak<dyn RealmObserver> {
        let registry: Arc<dyn RealmObserver> = self.registry.clone();
        Arc::downgrade(&registry)
    }

    /// Look up the router for a realm, creating it on demand when
    /// auto-creation is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoSuchRealm`] when the realm is not
    /// registered and auto-creation is disabled.
    pub fn get(&self, realm: &str) -> Result<Arc<Router>, RouterError> {
        if self.auto_create_realms {
            let router = self
                .registry
                .routers
                .entry(realm.to_string())
                .or_insert_with(|| {
                    debug!(realm, "router auto-created");
                    Arc::new(Router::new(
                        realm,
                        self.options.clone(),
                        self.observer_handle(),
                    ))
                })
                .clone();
            Ok(router)
        } else {
            self.router(realm)
                .ok_or_else(|| RouterError::NoSuchRealm(realm.to_string()))
        }
    }

    /// Look up a registered realm's router.
    #[must_use]
    pub fn router(&self, realm: &str) -> Option<Arc<Router>> {
        self.registry.routers.get(realm).map(|r| r.value().clone())
    }

    /// Whether a realm is registered.
    #[must_use]
    pub fn has_realm(&self, realm: &str) -> bool {
        self.registry.routers.contains_key(realm)
    }

    /// Number of registered realms.
    #[must_use]
    pub fn realm_count(&self) -> usize {
        self.registry.routers.len()
    }

    fn open_store(config: &StoreConfig) -> Result<Arc<dyn RealmStore>, RouterError> {
        match config.kind {
            StoreKind::Memory => Ok(Arc::new(MemoryRealmStore::new(config.event_limit))),
            #[cfg(feature = "lmdb")]
            StoreKind::Lmdb => {
                let path = config.path.as_ref().ok_or_else(|| {
                    RouterError::InvalidConfig("lmdb store requires a 'path'".into())
                })?;
                Ok(Arc::new(LmdbRealmStore::open(
                    path,
                    config.map_size,
                    config.event_limit,
                )?))
            }
            #[cfg(not(feature = "lmdb"))]
            StoreKind::Lmdb => Err(RouterError::BackendUnavailable("lmdb")),
        }
    }

    /// Start a realm from its configuration and register its router.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::RealmExists`] for an already-registered
    /// realm URI, [`RouterError::BackendUnavailable`] when an `lmdb` store
    /// is requested without the backend compiled in, and
    /// [`RouterError::InvalidConfig`] for a bad `mqtt_payload_format` or
    /// store configuration. On any error the realm is not registered.
    pub fn start_realm(&self, config: RealmConfig) -> Result<Arc<Router>, RouterError> {
        debug!(realm = %config.name, "starting realm");
        let name = config.name;
        if self.registry.routers.contains_key(&name) {
            return Err(RouterError::RealmExists(name));
        }

        let store = match &config.store {
            Some(store_config) => Some(Self::open_store(store_config)?),
            None => None,
        };

        let payload_format = match config.mqtt_payload_format.as_deref() {
            Some(text) => text
                .parse::<MqttPayloadFormat>()
                .map_err(RouterError::InvalidConfig)?,
            None => MqttPayloadFormat::default(),
        };

        let router = Arc::new(Router::with_store(
            name.clone(),
            self.options.clone(),
            self.observer_handle(),
            store,
            payload_format,
        ));
        self.registry.routers.insert(name.clone(), router.clone());
        debug!(realm = %name, "router created");
        Ok(router)
    }

    /// Request a realm stop.
    ///
    /// Teardown itself happens through the last-detach notification once
    /// the realm's sessions drain; this entry point only records the
    /// intent and is the hook for future forced teardown.
    pub fn stop_realm(&self, realm: &str) {
        debug!(realm, "stop requested; realm is torn down when its sessions drain");
    }

    /// Install a role on a registered realm.
    ///
    /// The variant is selected by configuration shape: `permissions`
    /// selects a static role, `authorizer` a dynamic role, neither a
    /// blanket role governed by `allow-by-default`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoSuchRealm`] for an unregistered realm,
    /// [`RouterError::InvalidUri`] for a bad permission URI or pattern,
    /// [`RouterError::InvalidConfig`] for a dynamic role without an
    /// authorizer client, and [`RouterError::ReservedRole`] for the
    /// reserved role URI.
    pub fn add_role(&self, realm: &str, config: RoleConfig) -> Result<bool, RouterError> {
        let router = self
            .router(realm)
            .ok_or_else(|| RouterError::NoSuchRealm(realm.to_string()))?;
        debug!(realm, role = %config.name, "adding role");

        let role: Arc<dyn Role> = if let Some(permissions) = config.permissions {
            for rule in &permissions {
                match rule.policy {
                    MatchPolicy::Wildcard => uri::validate_wildcard(&rule.uri)?,
                    _ => uri::validate_uri(&rule.uri)?,
                }
            }
            Arc::new(StaticAuthRole::new(config.name, permissions))
        } else if let Some(authorizer) = config.authorizer {
            let client = self.authorizer_client.clone().ok_or_else(|| {
                RouterError::InvalidConfig(format!(
                    "role '{}' needs an authorizer client to delegate to '{}'",
                    config.name, authorizer
                ))
            })?;
            Arc::new(DynamicAuthRole::new(
                config.name,
                authorizer,
                client,
                self.options.authorizer_timeout,
            ))
        } else {
            Arc::new(DefaultRole::new(
                config.name,
                config.allow_by_default.unwrap_or(false),
            ))
        };

        router.add_role(role)
    }

    /// Request a role drop. Wiring through to [`Router::drop_role`] is the
    /// expected extension; for now only the intent is recorded.
    pub fn drop_role(&self, realm: &str, role: &str) {
        debug!(realm, role, "role drop requested");
    }

    /// Auto-provisioning entry point; not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`RouterError::Unimplemented`].
    pub fn auto_start_realm(&self, realm: &str) -> Result<Arc<Router>, RouterError> {
        let _ = realm;
        Err(RouterError::Unimplemented("realm auto-activation"))
    }

    /// Auto-provisioning entry point; not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`RouterError::Unimplemented`].
    pub fn auto_add_role(&self, realm: &str, role: &str) -> Result<(), RouterError> {
        let _ = (realm, role);
        Err(RouterError::Unimplemented("role auto-activation"))
    }
}
