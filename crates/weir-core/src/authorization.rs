//! Authorization actions and decisions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The four routable actions a session can be authorized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Call,
    Register,
    Publish,
    Subscribe,
}

impl Action {
    /// Whether this action carries an originator identity that a role may
    /// choose to disclose (caller for `call`, publisher for `publish`).
    #[must_use]
    pub fn discloses_originator(self) -> bool {
        matches!(self, Action::Call | Action::Publish)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Call => "call",
            Action::Register => "register",
            Action::Publish => "publish",
            Action::Subscribe => "subscribe",
        };
        f.write_str(name)
    }
}

/// A normalized authorization decision.
///
/// `disclose` is populated only for actions with an originator identity
/// ([`Action::discloses_originator`]); for `register`/`subscribe` it stays
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Whether the action is allowed.
    pub allow: bool,
    /// Whether the decision may be cached by callers.
    #[serde(default)]
    pub cache: bool,
    /// Whether the originator identity may be revealed to receivers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclose: Option<bool>,
}

/// A dynamic authorizer replied with something that is neither a boolean
/// nor a decision object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed authorization result: {0}")]
pub struct MalformedAuthorization(pub String);

impl Authorization {
    /// The fail-closed decision.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            allow: false,
            cache: false,
            disclose: None,
        }
    }

    /// Build a non-cacheable decision from a bare allow/deny for the given
    /// action, defaulting disclosure to off where the action carries one.
    #[must_use]
    pub fn from_allow(allow: bool, action: Action) -> Self {
        Self {
            allow,
            cache: false,
            disclose: action.discloses_originator().then_some(false),
        }
    }

    /// Normalize a loosely-typed authorizer reply.
    ///
    /// External authorizer procedures may answer with a bare boolean or with
    /// a decision object (`{"allow": true, "cache": true, "disclose": false}`).
    /// This is the only place loose values enter the pipeline; everything
    /// downstream works with the typed record.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedAuthorization`] for any other shape.
    pub fn from_value(value: &Value, action: Action) -> Result<Self, MalformedAuthorization> {
        match value {
            Value::Bool(allow) => Ok(Self::from_allow(*allow, action)),
            Value::Object(map) => {
                let allow = map
                    .get("allow")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| MalformedAuthorization("missing 'allow' bool".into()))?;
                let cache = map.get("cache").and_then(Value::as_bool).unwrap_or(false);
                let disclose = if action.discloses_originator() {
                    Some(map.get("disclose").and_then(Value::as_bool).unwrap_or(false))
                } else {
                    None
                };
                Ok(Self {
                    allow,
                    cache,
                    disclose,
                })
            }
            other => Err(MalformedAuthorization(format!(
                "expected bool or object, got {other}"
            ))),
        }
    }
}
