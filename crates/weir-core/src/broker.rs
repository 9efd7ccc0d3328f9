//! Publish/subscribe sub-engine.
//!
//! The [`Broker`] trait is the seam the router dispatches Publish,
//! Subscribe and Unsubscribe messages through. [`BasicBroker`] is the
//! built-in exact-match implementation; pattern matching and
//! black/white-listing belong to richer implementations behind the same
//! trait.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace, warn};
use weir_proto::ids;
use weir_proto::message::{
    self, error_uri, Event, EventDetails, MessageKind, Publish, Published, Subscribe, Subscribed,
    Unsubscribe, Unsubscribed,
};
use weir_proto::uri::MatchPolicy;
use weir_proto::Message;

use crate::authorization::Action;
use crate::error::RouterError;
use crate::router::Router;
use crate::session::{SessionHandle, SessionId};
use crate::store::{self, StoredEvent};

/// Broker feature flags advertised to attaching sessions.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerFeatures {
    pub publisher_identification: bool,
    pub publisher_exclusion: bool,
    pub subscriber_blackwhite_listing: bool,
    pub pattern_based_subscription: bool,
    pub event_history: bool,
}

/// Publish/subscribe engine contract used by the router.
#[async_trait]
pub trait Broker: Send + Sync {
    /// A session joined the realm.
    fn attach(&self, session: &SessionHandle);

    /// A session left the realm; release its subscriptions.
    fn detach(&self, session: &SessionHandle);

    /// Feature set advertised under the `broker` role.
    fn role_features(&self) -> BrokerFeatures;

    /// Handle a `PUBLISH` message.
    async fn process_publish(
        &self,
        router: &Router,
        session: &SessionHandle,
        publish: Publish,
    ) -> Result<(), RouterError>;

    /// Handle a `SUBSCRIBE` message.
    async fn process_subscribe(
        &self,
        router: &Router,
        session: &SessionHandle,
        subscribe: Subscribe,
    ) -> Result<(), RouterError>;

    /// Handle an `UNSUBSCRIBE` message.
    async fn process_unsubscribe(
        &self,
        router: &Router,
        session: &SessionHandle,
        unsubscribe: Unsubscribe,
    ) -> Result<(), RouterError>;
}

struct Subscription {
    id: u64,
    subscribers: HashSet<SessionId>,
}

/// Exact-match in-memory broker.
#[derive(Default)]
pub struct BasicBroker {
    /// Topic -> subscription.
    subscriptions: DashMap<String, Subscription>,
    /// Subscription ID -> topic.
    by_id: DashMap<u64, String>,
    /// Session -> subscription IDs, for detach cleanup.
    session_subs: DashMap<SessionId, HashSet<u64>>,
}

impl BasicBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn drop_subscriber(&self, subscription_id: u64, session_id: SessionId) -> bool {
        let Some(topic) = self.by_id.get(&subscription_id).map(|t| t.value().clone()) else {
            return false;
        };
        let mut empty = false;
        let removed = match self.subscriptions.get_mut(&topic) {
            Some(mut sub) => {
                let removed = sub.subscribers.remove(&session_id);
                empty = sub.subscribers.is_empty();
                removed
            }
            None => false,
        };
        if empty {
            self.subscriptions.remove(&topic);
            self.by_id.remove(&subscription_id);
            debug!(topic = %topic, "dropped empty subscription");
        }
        removed
    }
}

#[async_trait]
impl Broker for BasicBroker {
    fn attach(&self, session: &SessionHandle) {
        self.session_subs.insert(session.id(), HashSet::new());
    }

    fn detach(&self, session: &SessionHandle) {
        if let Some((_, subs)) = self.session_subs.remove(&session.id()) {
            for subscription_id in subs {
                self.drop_subscriber(subscription_id, session.id());
            }
        }
    }

    fn role_features(&self) -> BrokerFeatures {
        BrokerFeatures {
            publisher_identification: true,
            publisher_exclusion: true,
            subscriber_blackwhite_listing: false,
            pattern_based_subscription: false,
            event_history: true,
        }
    }

    async fn process_publish(
        &self,
        router: &Router,
        session: &SessionHandle,
        publish: Publish,
    ) -> Result<(), RouterError> {
        let Publish {
            request,
            options,
            topic,
            args,
            kwargs,
        } = publish;

        if router.check_uri(&topic).is_err() {
            if options.acknowledge {
                router.send(
                    session,
                    Message::Error(message::Error::for_request(
                        MessageKind::Publish,
                        request,
                        error_uri::INVALID_URI,
                    )),
                );
            }
            return Ok(());
        }

        let auth = router.authorize(session, &topic, Action::Publish).await;
        if !auth.allow {
            if options.acknowledge {
                router.send(
                    session,
                    Message::Error(message::Error::for_request(
                        MessageKind::Publish,
                        request,
                        error_uri::NOT_AUTHORIZED,
                    )),
                );
            }
            return Ok(());
        }

        let publication = ids::next_id();
        let disclose = auth.disclose.unwrap_or(false) || options.disclose_me;
        let publisher = disclose.then(|| session.id());

        if let Some(realm_store) = router.store() {
            let retained = StoredEvent {
                topic: topic.clone(),
                publication,
                publisher,
                args: args.clone(),
                kwargs: kwargs.clone(),
                timestamp: store::now_millis(),
            };
            if let Err(err) = realm_store.store_event(retained) {
                warn!(topic = %topic, %err, "failed to retain event");
            }
        }

        let exclude_publisher = options.exclude_me.unwrap_or(true);
        let mut receivers = 0usize;
        if let Some(sub) = self.subscriptions.get(&topic) {
            for subscriber_id in &sub.subscribers {
                if exclude_publisher && *subscriber_id == session.id() {
                    continue;
                }
                let Some(subscriber) = router.session(*subscriber_id) else {
                    continue;
                };
                router.send(
                    &subscriber,
                    Message::Event(Event {
                        subscription: sub.id,
                        publication,
                        details: EventDetails {
                            publisher,
                            topic: None,
                        },
                        args: args.clone(),
                        kwargs: kwargs.clone(),
                    }),
                );
                receivers += 1;
            }
        }
        trace!(topic = %topic, publication, receivers, "published");

        if options.acknowledge {
            router.send(
                session,
                Message::Published(Published {
                    request,
                    publication,
                }),
            );
        }
        Ok(())
    }

    async fn process_subscribe(
        &self,
        router: &Router,
        session: &SessionHandle,
        subscribe: Subscribe,
    ) -> Result<(), RouterError> {
        let Subscribe {
            request,
            options,
            topic,
        } = subscribe;

        if router.check_uri(&topic).is_err() {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Subscribe,
                    request,
                    error_uri::INVALID_URI,
                )),
            );
            return Ok(());
        }
        if options.policy != MatchPolicy::Exact {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Subscribe,
                    request,
                    error_uri::INVALID_ARGUMENT,
                )),
            );
            return Ok(());
        }

        let auth = router.authorize(session, &topic, Action::Subscribe).await;
        if !auth.allow {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Subscribe,
                    request,
                    error_uri::NOT_AUTHORIZED,
                )),
            );
            return Ok(());
        }

        let subscription_id = {
            let mut sub = self
                .subscriptions
                .entry(topic.clone())
                .or_insert_with(|| {
                    let id = ids::next_id();
                    debug!(topic = %topic, subscription = id, "created subscription");
                    Subscription {
                        id,
                        subscribers: HashSet::new(),
                    }
                });
            sub.subscribers.insert(session.id());
            sub.id
        };
        self.by_id.insert(subscription_id, topic);
        self.session_subs
            .entry(session.id())
            .or_default()
            .insert(subscription_id);

        router.send(
            session,
            Message::Subscribed(Subscribed {
                request,
                subscription: subscription_id,
            }),
        );
        Ok(())
    }

    async fn process_unsubscribe(
        &self,
        router: &Router,
        session: &SessionHandle,
        unsubscribe: Unsubscribe,
    ) -> Result<(), RouterError> {
        let Unsubscribe {
            request,
            subscription,
        } = unsubscribe;

        let tracked = match self.session_subs.get_mut(&session.id()) {
            Some(mut subs) => subs.remove(&subscription),
            None => false,
        };
        let was_subscribed = tracked && self.drop_subscriber(subscription, session.id());

        if was_subscribed {
            router.send(session, Message::Unsubscribed(Unsubscribed { request }));
        } else {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Unsubscribe,
                    request,
                    error_uri::NO_SUCH_SUBSCRIPTION,
                )),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttPayloadFormat;
    use crate::role::{DefaultRole, DiscloseSpec, PermissionRule, StaticAuthRole};
    use crate::router::{Router, RouterConfig};
    use crate::store::MemoryRealmStore;
    use crate::store::RealmStore;
    use crate::testing::{client_session, null_observer};
    use std::sync::Arc;
    use weir_proto::message::{PublishOptions, SubscribeOptions};

    fn router() -> Router {
        let router = Router::new("realm1", RouterConfig::default(), null_observer());
        router
            .add_role(Arc::new(DefaultRole::new("app", true)))
            .unwrap();
        router
    }

    fn subscribe(request: u64, topic: &str) -> Message {
        Message::Subscribe(Subscribe {
            request,
            options: SubscribeOptions::default(),
            topic: topic.into(),
        })
    }

    fn publish(request: u64, topic: &str, options: PublishOptions) -> Message {
        Message::Publish(Publish {
            request,
            options,
            topic: topic.into(),
            args: Some(vec![serde_json::json!("payload")]),
            kwargs: None,
        })
    }

    #[tokio::test]
    async fn test_subscribe_then_publish_delivers_event() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        let (bob, bob_out) = client_session(2, "app");
        router.attach(&alice).unwrap();
        router.attach(&bob).unwrap();

        router.process(&bob, subscribe(1, "com.myapp.topic1")).await.unwrap();
        let subscription = match bob_out.take().as_slice() {
            [Message::Subscribed(s)] => s.subscription,
            other => panic!("expected Subscribed, got {other:?}"),
        };

        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();

        match bob_out.take().as_slice() {
            [Message::Event(event)] => {
                assert_eq!(event.subscription, subscription);
                // publisher is not disclosed unless asked for
                assert_eq!(event.details.publisher, None);
            }
            other => panic!("expected Event, got {other:?}"),
        }
        // no acknowledge requested, publisher hears nothing
        assert!(alice_out.take().is_empty());
    }

    #[tokio::test]
    async fn test_publisher_excluded_unless_opted_in() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router.process(&alice, subscribe(1, "com.myapp.topic1")).await.unwrap();
        alice_out.take();

        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();
        assert!(alice_out.take().is_empty());

        router
            .process(
                &alice,
                publish(
                    3,
                    "com.myapp.topic1",
                    PublishOptions {
                        exclude_me: Some(false),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        assert!(matches!(alice_out.take().as_slice(), [Message::Event(_)]));
    }

    #[tokio::test]
    async fn test_publish_acknowledge() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router
            .process(
                &alice,
                publish(
                    9,
                    "com.myapp.topic1",
                    PublishOptions {
                        acknowledge: true,
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        match alice_out.take().as_slice() {
            [Message::Published(published)] => assert_eq!(published.request, 9),
            other => panic!("expected Published, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_subscribe_and_publish() {
        let router = Router::new("realm1", RouterConfig::default(), null_observer());
        router
            .add_role(Arc::new(DefaultRole::new("guest", false)))
            .unwrap();
        let (alice, alice_out) = client_session(1, "guest");
        router.attach(&alice).unwrap();

        router.process(&alice, subscribe(1, "com.myapp.topic1")).await.unwrap();
        match alice_out.take().as_slice() {
            [Message::Error(err)] => {
                assert_eq!(err.request_type, MessageKind::Subscribe);
                assert_eq!(err.error, error_uri::NOT_AUTHORIZED);
            }
            other => panic!("expected Error, got {other:?}"),
        }

        // unacknowledged publish fails silently
        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();
        assert!(alice_out.take().is_empty());

        router
            .process(
                &alice,
                publish(
                    3,
                    "com.myapp.topic1",
                    PublishOptions {
                        acknowledge: true,
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        match alice_out.take().as_slice() {
            [Message::Error(err)] => assert_eq!(err.error, error_uri::NOT_AUTHORIZED),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_topic_rejected() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router.process(&alice, subscribe(1, "com..topic1")).await.unwrap();
        match alice_out.take().as_slice() {
            [Message::Error(err)] => assert_eq!(err.error, error_uri::INVALID_URI),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pattern_subscription_not_supported() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router
            .process(
                &alice,
                Message::Subscribe(Subscribe {
                    request: 1,
                    options: SubscribeOptions {
                        policy: MatchPolicy::Prefix,
                    },
                    topic: "com.myapp".into(),
                }),
            )
            .await
            .unwrap();
        match alice_out.take().as_slice() {
            [Message::Error(err)] => assert_eq!(err.error, error_uri::INVALID_ARGUMENT),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_flow() {
        let router = router();
        let (alice, alice_out) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router.process(&alice, subscribe(1, "com.myapp.topic1")).await.unwrap();
        let subscription = match alice_out.take().as_slice() {
            [Message::Subscribed(s)] => s.subscription,
            other => panic!("expected Subscribed, got {other:?}"),
        };

        router
            .process(
                &alice,
                Message::Unsubscribe(Unsubscribe {
                    request: 2,
                    subscription,
                }),
            )
            .await
            .unwrap();
        assert!(matches!(
            alice_out.take().as_slice(),
            [Message::Unsubscribed(_)]
        ));

        // second unsubscribe no longer finds the subscription
        router
            .process(
                &alice,
                Message::Unsubscribe(Unsubscribe {
                    request: 3,
                    subscription,
                }),
            )
            .await
            .unwrap();
        match alice_out.take().as_slice() {
            [Message::Error(err)] => assert_eq!(err.error, error_uri::NO_SUCH_SUBSCRIPTION),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_detach_releases_subscriptions() {
        let router = router();
        let (alice, _) = client_session(1, "app");
        let (bob, bob_out) = client_session(2, "app");
        router.attach(&alice).unwrap();
        router.attach(&bob).unwrap();

        router.process(&bob, subscribe(1, "com.myapp.topic1")).await.unwrap();
        bob_out.take();
        router.detach(&bob).unwrap();

        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();
        assert!(bob_out.take().is_empty());
    }

    #[tokio::test]
    async fn test_publisher_disclosure_via_role() {
        let router = Router::new("realm1", RouterConfig::default(), null_observer());
        router
            .add_role(Arc::new(StaticAuthRole::new(
                "app",
                vec![PermissionRule {
                    uri: "com.myapp".into(),
                    policy: MatchPolicy::Prefix,
                    allow: crate::role::ActionGrants {
                        publish: true,
                        subscribe: true,
                        ..Default::default()
                    },
                    disclose: DiscloseSpec {
                        caller: false,
                        publisher: true,
                    },
                    cache: false,
                }],
            )))
            .unwrap();

        let (alice, _) = client_session(1, "app");
        let (bob, bob_out) = client_session(2, "app");
        router.attach(&alice).unwrap();
        router.attach(&bob).unwrap();

        router.process(&bob, subscribe(1, "com.myapp.topic1")).await.unwrap();
        bob_out.take();

        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();
        match bob_out.take().as_slice() {
            [Message::Event(event)] => assert_eq!(event.details.publisher, Some(1)),
            other => panic!("expected Event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_events_retained_in_store() {
        let store = Arc::new(MemoryRealmStore::new(8));
        let router = Router::with_store(
            "realm1",
            RouterConfig::default(),
            null_observer(),
            Some(store.clone()),
            MqttPayloadFormat::Opaque,
        );
        router
            .add_role(Arc::new(DefaultRole::new("app", true)))
            .unwrap();
        let (alice, _) = client_session(1, "app");
        router.attach(&alice).unwrap();

        router
            .process(&alice, publish(1, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();
        router
            .process(&alice, publish(2, "com.myapp.topic1", PublishOptions::default()))
            .await
            .unwrap();

        let history = store.event_history("com.myapp.topic1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].topic, "com.myapp.topic1");
    }
}
