//! Realm roles and their authorization behavior.
//!
//! A role is a named authorization policy installed on a realm router and
//! consulted on every call/register/publish/subscribe action. Four variants
//! exist: the reserved always-allow [`TrustedRole`], the blanket
//! [`DefaultRole`], the permission-table [`StaticAuthRole`], and the
//! [`DynamicAuthRole`] delegating to an external authorizer procedure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use weir_proto::uri::{self, MatchPolicy};

use crate::authorization::{Action, Authorization};
use crate::session::{SessionHandle, SessionId};

/// A named authorization policy.
#[async_trait]
pub trait Role: Send + Sync {
    /// The role URI this policy is installed under.
    fn uri(&self) -> &str;

    /// Decide whether `session` may perform `action` on `uri`.
    ///
    /// Implementations never fail: anything that prevents a decision (an
    /// unreachable authorizer, a malformed reply) degrades to a deny.
    async fn authorize(&self, session: &SessionHandle, uri: &str, action: Action)
        -> Authorization;
}

/// The reserved `trusted` role: every action is allowed.
#[derive(Debug, Default)]
pub struct TrustedRole;

impl TrustedRole {
    /// The reserved role URI.
    pub const URI: &'static str = "trusted";
}

#[async_trait]
impl Role for TrustedRole {
    fn uri(&self) -> &str {
        Self::URI
    }

    async fn authorize(&self, _: &SessionHandle, _: &str, action: Action) -> Authorization {
        Authorization::from_allow(true, action)
    }
}

/// A blanket allow-or-deny role.
#[derive(Debug)]
pub struct DefaultRole {
    uri: String,
    allow_by_default: bool,
}

impl DefaultRole {
    /// Create a blanket role under `uri`.
    #[must_use]
    pub fn new(uri: impl Into<String>, allow_by_default: bool) -> Self {
        Self {
            uri: uri.into(),
            allow_by_default,
        }
    }
}

#[async_trait]
impl Role for DefaultRole {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn authorize(&self, _: &SessionHandle, _: &str, action: Action) -> Authorization {
        Authorization::from_allow(self.allow_by_default, action)
    }
}

/// Per-action grants in a permission rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionGrants {
    #[serde(default)]
    pub call: bool,
    #[serde(default)]
    pub register: bool,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub subscribe: bool,
}

impl ActionGrants {
    /// Whether the given action is granted.
    #[must_use]
    pub fn grants(&self, action: Action) -> bool {
        match action {
            Action::Call => self.call,
            Action::Register => self.register,
            Action::Publish => self.publish,
            Action::Subscribe => self.subscribe,
        }
    }
}

/// Originator-disclosure settings in a permission rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscloseSpec {
    #[serde(default)]
    pub caller: bool,
    #[serde(default)]
    pub publisher: bool,
}

/// One entry of a static permission table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// URI or pattern the rule applies to.
    pub uri: String,
    #[serde(rename = "match", default)]
    pub policy: MatchPolicy,
    #[serde(default)]
    pub allow: ActionGrants,
    #[serde(default)]
    pub disclose: DiscloseSpec,
    /// Whether decisions from this rule may be cached.
    #[serde(default)]
    pub cache: bool,
}

/// A role backed by a static permission table.
///
/// Rule precedence on lookup: exact match, then the longest matching
/// prefix rule, then the first matching wildcard rule. No matching rule
/// means deny.
#[derive(Debug)]
pub struct StaticAuthRole {
    uri: String,
    rules: Vec<PermissionRule>,
}

impl StaticAuthRole {
    /// Create a static role under `uri` from a permission table.
    #[must_use]
    pub fn new(uri: impl Into<String>, rules: Vec<PermissionRule>) -> Self {
        Self {
            uri: uri.into(),
            rules,
        }
    }

    fn match_rule(&self, target: &str) -> Option<&PermissionRule> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.policy == MatchPolicy::Exact && r.uri == target)
        {
            return Some(rule);
        }
        if let Some(rule) = self
            .rules
            .iter()
            .filter(|r| r.policy == MatchPolicy::Prefix && target.starts_with(r.uri.as_str()))
            .max_by_key(|r| r.uri.len())
        {
            return Some(rule);
        }
        self.rules
            .iter()
            .find(|r| r.policy == MatchPolicy::Wildcard && uri::matches(r.policy, &r.uri, target))
    }
}

#[async_trait]
impl Role for StaticAuthRole {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn authorize(&self, _: &SessionHandle, uri: &str, action: Action) -> Authorization {
        match self.match_rule(uri) {
            Some(rule) => {
                let disclose = action.discloses_originator().then(|| match action {
                    Action::Call => rule.disclose.caller,
                    Action::Publish => rule.disclose.publisher,
                    _ => false,
                });
                Authorization {
                    allow: rule.allow.grants(action),
                    cache: rule.cache,
                    disclose,
                }
            }
            None => Authorization::denied(),
        }
    }
}

/// The request payload handed to an external authorizer procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub session: SessionId,
    pub authid: String,
    pub authrole: String,
    pub uri: String,
    pub action: Action,
}

/// The authorizer procedure could not be reached or failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authorizer call failed: {0}")]
pub struct AuthorizerCallError(pub String);

/// Client capability for invoking external authorizer procedures.
///
/// The routing core does not know how authorizer calls travel (typically a
/// WAMP call on an admin realm); whoever wires up the
/// [`RouterFactory`](crate::factory::RouterFactory) supplies this.
#[async_trait]
pub trait AuthorizerClient: Send + Sync {
    /// Call the named authorizer procedure and return its raw reply.
    async fn call_authorizer(
        &self,
        procedure: &str,
        request: AuthorizationRequest,
    ) -> Result<serde_json::Value, AuthorizerCallError>;
}

/// A role delegating every decision to an external authorizer procedure.
///
/// This is the only role with a suspension point; its call is bounded by
/// `timeout`, and a timeout, transport failure, or malformed reply all
/// resolve to a deny.
pub struct DynamicAuthRole {
    uri: String,
    authorizer: String,
    client: Arc<dyn AuthorizerClient>,
    timeout: Option<Duration>,
}

impl DynamicAuthRole {
    /// Create a dynamic role under `uri`, bound to the `authorizer`
    /// procedure.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        authorizer: impl Into<String>,
        client: Arc<dyn AuthorizerClient>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            uri: uri.into(),
            authorizer: authorizer.into(),
            client,
            timeout,
        }
    }

    /// The authorizer procedure this role delegates to.
    #[must_use]
    pub fn authorizer(&self) -> &str {
        &self.authorizer
    }

    async fn call(&self, request: AuthorizationRequest) -> Result<serde_json::Value, AuthorizerCallError> {
        let fut = self.client.call_authorizer(&self.authorizer, request);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| AuthorizerCallError("timed out".into()))?,
            None => fut.await,
        }
    }
}

#[async_trait]
impl Role for DynamicAuthRole {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn authorize(&self, session: &SessionHandle, uri: &str, action: Action)
        -> Authorization {
        let request = AuthorizationRequest {
            session: session.id(),
            authid: session.authid().to_string(),
            authrole: session.authrole().to_string(),
            uri: uri.to_string(),
            action,
        };

        let raw = match self.call(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    role = %self.uri,
                    authorizer = %self.authorizer,
                    %err,
                    "dynamic authorization failed, denying"
                );
                return Authorization::denied();
            }
        };

        match Authorization::from_value(&raw, action) {
            Ok(auth) => auth,
            Err(err) => {
                warn!(
                    role = %self.uri,
                    authorizer = %self.authorizer,
                    %err,
                    "dynamic authorizer reply malformed, denying"
                );
                Authorization::denied()
            }
        }
    }
}
