//! The per-realm router.
//!
//! One [`Router`] exists per realm. It owns the session and role
//! registries, the realm's broker and dealer, and the authorization
//! pipeline, and dispatches every inbound message to the right sub-engine.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, trace, warn};
use weir_proto::message::{Args, Kwargs};
use weir_proto::uri::{validate_uri, validate_uri_strict, InvalidUri};
use weir_proto::Message;

use crate::authorization::{Action, Authorization};
use crate::broker::{BasicBroker, Broker, BrokerFeatures};
use crate::config::MqttPayloadFormat;
use crate::dealer::{BasicDealer, Dealer, DealerFeatures};
use crate::error::RouterError;
use crate::role::{Role, TrustedRole};
use crate::session::{SessionHandle, SessionId};
use crate::store::RealmStore;

/// Role URIs that are built in and can never be added or dropped.
pub const RESERVED_ROLES: &[&str] = &[TrustedRole::URI];

/// Router options.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Enforce strict URI rules on topics and procedures.
    pub uri_strict: bool,
    /// Force originator disclosure for the `trusted` role on call/publish.
    pub auto_disclose_trusted: bool,
    /// Upper bound on dynamic authorizer calls; elapsing denies.
    pub authorizer_timeout: Option<Duration>,
    /// Log per-message traffic for sessions passing the role filters.
    pub trace_traffic: bool,
    /// When set, only these roles are traced.
    pub trace_roles_include: Option<HashSet<String>>,
    /// Roles never traced; defaults to `trusted`.
    pub trace_roles_exclude: HashSet<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            uri_strict: false,
            auto_disclose_trusted: false,
            authorizer_timeout: Some(Duration::from_secs(10)),
            trace_traffic: false,
            trace_roles_include: None,
            trace_roles_exclude: [TrustedRole::URI.to_string()].into(),
        }
    }
}

/// Observer notified when a router's last session detaches.
///
/// The factory that owns the router implements this; the router only holds
/// a weak capability to notify it, keeping ownership one-directional.
pub trait RealmObserver: Send + Sync {
    /// `router` just went empty and should be torn down.
    fn on_last_detach(&self, router: &Router);
}

/// Feature sets advertised to an attaching session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealmFeatures {
    pub broker: BrokerFeatures,
    pub dealer: DealerFeatures,
}

/// Core router for one realm.
pub struct Router {
    realm: String,
    config: RouterConfig,
    observer: Weak<dyn RealmObserver>,
    /// Attached client sessions by ID.
    sessions: DashMap<SessionId, SessionHandle>,
    /// Installed roles by URI; always contains `trusted`.
    roles: DashMap<String, Arc<dyn Role>>,
    /// Attached sessions, client or not. Reaching zero tears the realm
    /// down, so this counter, not the registry size, is authoritative.
    attached: AtomicUsize,
    broker: Box<dyn Broker>,
    dealer: Box<dyn Dealer>,
    store: Option<Arc<dyn RealmStore>>,
    payload_format: MqttPayloadFormat,
}

impl Router {
    /// Create a router with the built-in broker and dealer and no store.
    #[must_use]
    pub fn new(
        realm: impl Into<String>,
        config: RouterConfig,
        observer: Weak<dyn RealmObserver>,
    ) -> Self {
        Self::with_store(realm, config, observer, None, MqttPayloadFormat::Opaque)
    }

    /// Create a router with the built-in broker and dealer.
    #[must_use]
    pub fn with_store(
        realm: impl Into<String>,
        config: RouterConfig,
        observer: Weak<dyn RealmObserver>,
        store: Option<Arc<dyn RealmStore>>,
        payload_format: MqttPayloadFormat,
    ) -> Self {
        Self::with_engines(
            realm,
            config,
            observer,
            store,
            payload_format,
            Box::new(BasicBroker::new()),
            Box::new(BasicDealer::new()),
        )
    }

    /// Create a router with custom sub-engines.
    #[must_use]
    pub fn with_engines(
        realm: impl Into<String>,
        config: RouterConfig,
        observer: Weak<dyn RealmObserver>,
        store: Option<Arc<dyn RealmStore>>,
        payload_format: MqttPayloadFormat,
        broker: Box<dyn Broker>,
        dealer: Box<dyn Dealer>,
    ) -> Self {
        let realm = realm.into();
        debug!(realm = %realm, "creating router");
        let roles: DashMap<String, Arc<dyn Role>> = DashMap::new();
        roles.insert(TrustedRole::URI.to_string(), Arc::new(TrustedRole));
        Self {
            realm,
            config,
            observer,
            sessions: DashMap::new(),
            roles,
            attached: AtomicUsize::new(0),
            broker,
            dealer,
            store,
            payload_format,
        }
    }

    /// The realm URI this router serves.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Router options.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The realm's store, when configured.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn RealmStore>> {
        self.store.as_ref()
    }

    /// Payload format for MQTT bridges on this realm.
    #[must_use]
    pub fn payload_format(&self) -> MqttPayloadFormat {
        self.payload_format
    }

    /// Number of currently attached sessions (client or not).
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// Look up an attached client session by ID.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.get(&id).map(|s| s.value().clone())
    }

    /// Attach a session to this realm.
    ///
    /// Client sessions are registered by ID; other sessions are only
    /// counted. Both are forwarded to the broker and dealer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateAttach`] if the session ID is
    /// already registered.
    pub fn attach(&self, session: &SessionHandle) -> Result<RealmFeatures, RouterError> {
        if self.sessions.contains_key(&session.id()) {
            return Err(RouterError::DuplicateAttach(session.id()));
        }
        if session.is_client() {
            self.sessions.insert(session.id(), session.clone());
        } else {
            debug!(realm = %self.realm, session = session.id(), "attaching non-client session");
        }

        self.broker.attach(session);
        self.dealer.attach(session);
        self.attached.fetch_add(1, Ordering::SeqCst);
        debug!(
            realm = %self.realm,
            session = session.id(),
            authrole = session.authrole(),
            "session attached"
        );

        Ok(RealmFeatures {
            broker: self.broker.role_features(),
            dealer: self.dealer.role_features(),
        })
    }

    /// Detach a session from this realm.
    ///
    /// The broker and dealer are notified first so they can release
    /// subscriptions and registrations even if registry removal fails.
    /// When the attached count reaches zero the owning factory is notified
    /// and tears the realm down.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotAttached`] for a client session that is
    /// not in the registry; the attached count is left untouched.
    pub fn detach(&self, session: &SessionHandle) -> Result<(), RouterError> {
        self.broker.detach(session);
        self.dealer.detach(self, session);

        if self.sessions.remove(&session.id()).is_none() && session.is_client() {
            return Err(RouterError::NotAttached(session.id()));
        }

        match self
            .attached
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => {
                debug!(realm = %self.realm, "last session detached");
                if let Some(observer) = self.observer.upgrade() {
                    observer.on_last_detach(self);
                }
            }
            Ok(_) => {}
            Err(_) => warn!(realm = %self.realm, "detach with no attached sessions"),
        }
        debug!(realm = %self.realm, session = session.id(), "session detached");
        Ok(())
    }

    /// Dispatch an inbound message to the broker or dealer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnexpectedMessage`] for any message kind
    /// outside the routed set; no sub-engine state is touched.
    pub async fn process(&self, session: &SessionHandle, msg: Message) -> Result<(), RouterError> {
        if self.check_trace(session) {
            debug!(realm = %self.realm, session = session.id(), msg = ?msg, "rx");
        }

        match msg {
            Message::Publish(m) => self.broker.process_publish(self, session, m).await,
            Message::Subscribe(m) => self.broker.process_subscribe(self, session, m).await,
            Message::Unsubscribe(m) => self.broker.process_unsubscribe(self, session, m).await,
            Message::Register(m) => self.dealer.process_register(self, session, m).await,
            Message::Unregister(m) => self.dealer.process_unregister(self, session, m).await,
            Message::Call(m) => self.dealer.process_call(self, session, m).await,
            Message::Cancel(m) => self.dealer.process_cancel(self, session, m).await,
            Message::Yield(m) => self.dealer.process_yield(self, session, m).await,
            Message::Error(m) if m.request_type == weir_proto::MessageKind::Invocation => {
                self.dealer.process_invocation_error(self, session, m).await
            }
            other => Err(RouterError::UnexpectedMessage(other.kind())),
        }
    }

    /// Deliver a message to a session's transport.
    ///
    /// This is the only path by which sub-engines emit messages. A closed
    /// transport drops the message with a warning; flow control and
    /// retries belong to the transport layer.
    pub fn send(&self, session: &SessionHandle, msg: Message) {
        if self.check_trace(session) {
            debug!(realm = %self.realm, session = session.id(), msg = ?msg, "tx");
        }
        if session.transport().send(msg).is_err() {
            warn!(
                realm = %self.realm,
                session = session.id(),
                "transport closed, dropping outbound message"
            );
        }
    }

    /// Authorize `session` to perform `action` on `uri`.
    ///
    /// Resolves the session's authrole in the role registry and delegates
    /// to that role. A missing role (e.g. dropped while the session was
    /// attached) denies without consulting anything — fail closed.
    pub async fn authorize(
        &self,
        session: &SessionHandle,
        uri: &str,
        action: Action,
    ) -> Authorization {
        let role_name = session.authrole().to_string();
        // clone out of the registry so no guard is held across the await
        let role = self.roles.get(&role_name).map(|r| r.value().clone());

        let mut authorization = match role {
            Some(role) => role.authorize(session, uri, action).await,
            None => {
                debug!(
                    realm = %self.realm,
                    authrole = %role_name,
                    "authrole not in registry, denying"
                );
                Authorization::denied()
            }
        };

        if self.config.auto_disclose_trusted
            && role_name == TrustedRole::URI
            && action.discloses_originator()
        {
            authorization.disclose = Some(true);
        }

        debug!(
            realm = %self.realm,
            session = session.id(),
            authid = session.authid(),
            authrole = %role_name,
            uri,
            %action,
            allow = authorization.allow,
            "authorized"
        );
        authorization
    }

    /// Payload validation hook.
    ///
    /// The base router performs no schema validation; it logs and accepts.
    ///
    /// # Errors
    ///
    /// None in the base implementation.
    pub fn validate(
        &self,
        payload_type: &str,
        uri: &str,
        args: Option<&Args>,
        kwargs: Option<&Kwargs>,
    ) -> Result<(), RouterError> {
        trace!(
            realm = %self.realm,
            payload_type,
            uri,
            has_args = args.is_some(),
            has_kwargs = kwargs.is_some(),
            "validate payload"
        );
        Ok(())
    }

    /// Validate a topic/procedure URI under this router's URI rules.
    pub(crate) fn check_uri(&self, uri: &str) -> Result<(), InvalidUri> {
        if self.config.uri_strict {
            validate_uri_strict(uri)
        } else {
            validate_uri(uri)
        }
    }

    /// Whether a role with the given URI is installed.
    #[must_use]
    pub fn has_role(&self, uri: &str) -> bool {
        self.roles.contains_key(uri)
    }

    /// Install a role; returns whether a role under that URI was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ReservedRole`] for reserved URIs.
    pub fn add_role(&self, role: Arc<dyn Role>) -> Result<bool, RouterError> {
        let uri = role.uri().to_string();
        if RESERVED_ROLES.contains(&uri.as_str()) {
            return Err(RouterError::ReservedRole(uri));
        }
        debug!(realm = %self.realm, role = %uri, "adding role");
        Ok(self.roles.insert(uri, role).is_some())
    }

    /// Remove a role; returns whether a role under that URI existed.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ReservedRole`] for reserved URIs.
    pub fn drop_role(&self, uri: &str) -> Result<bool, RouterError> {
        if RESERVED_ROLES.contains(&uri) {
            return Err(RouterError::ReservedRole(uri.to_string()));
        }
        debug!(realm = %self.realm, role = %uri, "dropping role");
        Ok(self.roles.remove(uri).is_some())
    }

    fn check_trace(&self, session: &SessionHandle) -> bool {
        if !self.config.trace_traffic {
            return false;
        }
        if let Some(include) = &self.config.trace_roles_include {
            if !include.contains(session.authrole()) {
                return false;
            }
        }
        !self.config.trace_roles_exclude.contains(session.authrole())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("realm", &self.realm)
            .field("attached", &self.attached_count())
            .field("sessions", &self.sessions.len())
            .field("roles", &self.roles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::DefaultRole;
    use crate::testing::{client_session, internal_session, null_observer};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use weir_proto::message::{Goodbye, Subscribe, SubscribeOptions, Yield, YieldOptions};

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Recording {
        fn push(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }

        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut self.calls.lock().unwrap())
        }
    }

    struct RecordingBroker(Arc<Recording>);

    #[async_trait]
    impl Broker for RecordingBroker {
        fn attach(&self, _: &SessionHandle) {
            self.0.push("broker.attach");
        }
        fn detach(&self, _: &SessionHandle) {
            self.0.push("broker.detach");
        }
        fn role_features(&self) -> BrokerFeatures {
            BrokerFeatures {
                publisher_identification: true,
                publisher_exclusion: true,
                subscriber_blackwhite_listing: false,
                pattern_based_subscription: false,
                event_history: false,
            }
        }
        async fn process_publish(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Publish,
        ) -> Result<(), RouterError> {
            self.0.push("broker.publish");
            Ok(())
        }
        async fn process_subscribe(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: Subscribe,
        ) -> Result<(), RouterError> {
            self.0.push("broker.subscribe");
            Ok(())
        }
        async fn process_unsubscribe(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Unsubscribe,
        ) -> Result<(), RouterError> {
            self.0.push("broker.unsubscribe");
            Ok(())
        }
    }

    struct RecordingDealer(Arc<Recording>);

    #[async_trait]
    impl Dealer for RecordingDealer {
        fn attach(&self, _: &SessionHandle) {
            self.0.push("dealer.attach");
        }
        fn detach(&self, _: &Router, _: &SessionHandle) {
            self.0.push("dealer.detach");
        }
        fn role_features(&self) -> DealerFeatures {
            DealerFeatures {
                caller_identification: true,
                call_canceling: false,
                progressive_call_results: false,
                pattern_based_registration: false,
                shared_registration: false,
            }
        }
        async fn process_register(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Register,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.register");
            Ok(())
        }
        async fn process_unregister(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Unregister,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.unregister");
            Ok(())
        }
        async fn process_call(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Call,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.call");
            Ok(())
        }
        async fn process_cancel(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Cancel,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.cancel");
            Ok(())
        }
        async fn process_yield(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: Yield,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.yield");
            Ok(())
        }
        async fn process_invocation_error(
            &self,
            _: &Router,
            _: &SessionHandle,
            _: weir_proto::message::Error,
        ) -> Result<(), RouterError> {
            self.0.push("dealer.invocation_error");
            Ok(())
        }
    }

    fn recording_router() -> (Router, Arc<Recording>) {
        let recording = Arc::new(Recording::default());
        let router = Router::with_engines(
            "realm1",
            RouterConfig::default(),
            null_observer(),
            None,
            MqttPayloadFormat::Opaque,
            Box::new(RecordingBroker(recording.clone())),
            Box::new(RecordingDealer(recording.clone())),
        );
        (router, recording)
    }

    #[test]
    fn test_attach_duplicate_fails() {
        let (router, _) = recording_router();
        let (session, _) = client_session(7, "frontend");

        router.attach(&session).unwrap();
        let err = router.attach(&session).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateAttach(7)));
        assert!(router.session(7).is_some());
        assert_eq!(router.attached_count(), 1);
    }

    #[test]
    fn test_detach_without_attach_fails() {
        let (router, _) = recording_router();
        let (session, _) = client_session(7, "frontend");

        let err = router.detach(&session).unwrap_err();
        assert!(matches!(err, RouterError::NotAttached(7)));
        assert_eq!(router.attached_count(), 0);
    }

    #[test]
    fn test_non_client_sessions_counted_not_tracked() {
        let (router, _) = recording_router();
        let (client, _) = client_session(1, "frontend");
        let (internal, _) = internal_session(2, "trusted");

        router.attach(&client).unwrap();
        router.attach(&internal).unwrap();
        assert_eq!(router.attached_count(), 2);
        assert!(router.session(1).is_some());
        assert!(router.session(2).is_none());

        router.detach(&internal).unwrap();
        assert_eq!(router.attached_count(), 1);
    }

    struct CountingObserver {
        detached: Mutex<Vec<String>>,
    }

    impl RealmObserver for CountingObserver {
        fn on_last_detach(&self, router: &Router) {
            self.detached.lock().unwrap().push(router.realm().to_string());
        }
    }

    #[test]
    fn test_last_detach_notifies_observer_once() {
        let observer = Arc::new(CountingObserver {
            detached: Mutex::new(Vec::new()),
        });
        let weak: Weak<CountingObserver> = Arc::downgrade(&observer);
        let router = Router::new("realm1", RouterConfig::default(), weak);

        let (a, _) = client_session(1, "frontend");
        let (b, _) = client_session(2, "frontend");
        router.attach(&a).unwrap();
        router.attach(&b).unwrap();

        router.detach(&a).unwrap();
        assert!(observer.detached.lock().unwrap().is_empty());

        router.detach(&b).unwrap();
        assert_eq!(*observer.detached.lock().unwrap(), vec!["realm1"]);
    }

    #[tokio::test]
    async fn test_process_dispatches_by_kind() {
        let (router, recording) = recording_router();
        let (session, _) = client_session(1, "frontend");
        router.attach(&session).unwrap();
        recording.take();

        router
            .process(
                &session,
                Message::Subscribe(Subscribe {
                    request: 1,
                    options: SubscribeOptions::default(),
                    topic: "com.myapp.topic1".into(),
                }),
            )
            .await
            .unwrap();
        router
            .process(
                &session,
                Message::Yield(Yield {
                    request: 2,
                    options: YieldOptions::default(),
                    args: None,
                    kwargs: None,
                }),
            )
            .await
            .unwrap();
        router
            .process(
                &session,
                Message::Error(weir_proto::message::Error::for_request(
                    weir_proto::MessageKind::Invocation,
                    3,
                    "com.myapp.error",
                )),
            )
            .await
            .unwrap();

        assert_eq!(
            recording.take(),
            vec!["broker.subscribe", "dealer.yield", "dealer.invocation_error"]
        );
    }

    #[tokio::test]
    async fn test_process_rejects_unrouted_kinds() {
        let (router, recording) = recording_router();
        let (session, _) = client_session(1, "frontend");
        router.attach(&session).unwrap();
        recording.take();

        let err = router
            .process(
                &session,
                Message::Goodbye(Goodbye {
                    reason: "wamp.close.normal".into(),
                    message: None,
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::UnexpectedMessage(weir_proto::MessageKind::Goodbye)
        ));

        // an ERROR not answering an invocation is rejected too
        let err = router
            .process(
                &session,
                Message::Error(weir_proto::message::Error::for_request(
                    weir_proto::MessageKind::Subscribe,
                    4,
                    "com.myapp.error",
                )),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::UnexpectedMessage(weir_proto::MessageKind::Error)
        ));

        assert!(recording.take().is_empty());
    }

    #[test]
    fn test_trusted_role_is_reserved() {
        let (router, _) = recording_router();
        assert!(router.has_role("trusted"));

        let err = router
            .add_role(Arc::new(DefaultRole::new("trusted", true)))
            .unwrap_err();
        assert!(matches!(err, RouterError::ReservedRole(_)));

        let err = router.drop_role("trusted").unwrap_err();
        assert!(matches!(err, RouterError::ReservedRole(_)));
        assert!(router.has_role("trusted"));
    }

    #[test]
    fn test_add_and_drop_role() {
        let (router, _) = recording_router();

        assert!(!router.add_role(Arc::new(DefaultRole::new("app", true))).unwrap());
        assert!(router.add_role(Arc::new(DefaultRole::new("app", false))).unwrap());
        assert!(router.has_role("app"));

        assert!(router.drop_role("app").unwrap());
        assert!(!router.drop_role("app").unwrap());
    }

    #[tokio::test]
    async fn test_authorize_missing_role_denies() {
        let (router, _) = recording_router();
        let (session, _) = client_session(1, "ghost");

        let auth = router.authorize(&session, "com.myapp.topic1", Action::Publish).await;
        assert_eq!(auth, Authorization::denied());
    }

    #[tokio::test]
    async fn test_authorize_auto_disclose_trusted() {
        let config = RouterConfig {
            auto_disclose_trusted: true,
            ..Default::default()
        };
        let router = Router::new("realm1", config, null_observer());
        let (session, _) = client_session(1, "trusted");

        let auth = router.authorize(&session, "com.myapp.proc", Action::Call).await;
        assert_eq!(auth.disclose, Some(true));

        // subscribe carries no originator, so the policy does not apply
        let auth = router.authorize(&session, "com.myapp.topic1", Action::Subscribe).await;
        assert_eq!(auth.disclose, None);
    }

    #[test]
    fn test_trace_filter() {
        let config = RouterConfig {
            trace_traffic: true,
            ..Default::default()
        };
        let router = Router::new("realm1", config, null_observer());
        let (frontend, _) = client_session(1, "frontend");
        let (trusted, _) = client_session(2, "trusted");

        assert!(router.check_trace(&frontend));
        // trusted is excluded by default
        assert!(!router.check_trace(&trusted));

        let config = RouterConfig {
            trace_traffic: true,
            trace_roles_include: Some(["backend".to_string()].into()),
            ..Default::default()
        };
        let router = Router::new("realm1", config, null_observer());
        let (frontend, _) = client_session(1, "frontend");
        let (backend, _) = client_session(2, "backend");
        assert!(!router.check_trace(&frontend));
        assert!(router.check_trace(&backend));
    }

    #[test]
    fn test_validate_accepts() {
        let (router, _) = recording_router();
        assert!(router.validate("event", "com.myapp.topic1", None, None).is_ok());
    }
}
