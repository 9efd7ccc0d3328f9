//! Decoded WAMP message types.
//!
//! One struct per message kind, collected into the closed [`Message`] union
//! the router dispatches on. Application payloads travel as opaque
//! `serde_json` values; this crate never inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::uri::MatchPolicy;

/// Positional call/event arguments.
pub type Args = Vec<Value>;

/// Keyword call/event arguments.
pub type Kwargs = serde_json::Map<String, Value>;

/// WAMP message kind tags, carrying the protocol's numeric message codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessageKind {
    Hello = 1,
    Welcome = 2,
    Abort = 3,
    Goodbye = 6,
    Error = 8,
    Publish = 16,
    Published = 17,
    Subscribe = 32,
    Subscribed = 33,
    Unsubscribe = 34,
    Unsubscribed = 35,
    Event = 36,
    Call = 48,
    Cancel = 49,
    Result = 50,
    Register = 64,
    Registered = 65,
    Unregister = 66,
    Unregistered = 67,
    Invocation = 68,
    Interrupt = 69,
    Yield = 70,
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> u8 {
        kind as u8
    }
}

/// Error for unknown numeric message codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown WAMP message code {0}")]
pub struct UnknownMessageCode(pub u8);

impl TryFrom<u8> for MessageKind {
    type Error = UnknownMessageCode;

    fn try_from(value: u8) -> Result<Self, UnknownMessageCode> {
        use MessageKind::*;
        Ok(match value {
            1 => Hello,
            2 => Welcome,
            3 => Abort,
            6 => Goodbye,
            8 => Error,
            16 => Publish,
            17 => Published,
            32 => Subscribe,
            33 => Subscribed,
            34 => Unsubscribe,
            35 => Unsubscribed,
            36 => Event,
            48 => Call,
            49 => Cancel,
            50 => Result,
            64 => Register,
            65 => Registered,
            66 => Unregister,
            67 => Unregistered,
            68 => Invocation,
            69 => Interrupt,
            70 => Yield,
            other => return Err(UnknownMessageCode(other)),
        })
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Hello => "HELLO",
            MessageKind::Welcome => "WELCOME",
            MessageKind::Abort => "ABORT",
            MessageKind::Goodbye => "GOODBYE",
            MessageKind::Error => "ERROR",
            MessageKind::Publish => "PUBLISH",
            MessageKind::Published => "PUBLISHED",
            MessageKind::Subscribe => "SUBSCRIBE",
            MessageKind::Subscribed => "SUBSCRIBED",
            MessageKind::Unsubscribe => "UNSUBSCRIBE",
            MessageKind::Unsubscribed => "UNSUBSCRIBED",
            MessageKind::Event => "EVENT",
            MessageKind::Call => "CALL",
            MessageKind::Cancel => "CANCEL",
            MessageKind::Result => "RESULT",
            MessageKind::Register => "REGISTER",
            MessageKind::Registered => "REGISTERED",
            MessageKind::Unregister => "UNREGISTER",
            MessageKind::Unregistered => "UNREGISTERED",
            MessageKind::Invocation => "INVOCATION",
            MessageKind::Interrupt => "INTERRUPT",
            MessageKind::Yield => "YIELD",
        };
        f.write_str(name)
    }
}

/// Session opening request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    pub realm: String,
    #[serde(default)]
    pub details: Kwargs,
}

/// Session opening confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub session: u64,
    #[serde(default)]
    pub details: Kwargs,
}

/// Session opening rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abort {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Session close announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goodbye {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Failure reply correlated to an earlier request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Kind of the request this error answers.
    pub request_type: MessageKind,
    pub request: u64,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

impl Error {
    /// Build an error reply for a request, without payload.
    #[must_use]
    pub fn for_request(request_type: MessageKind, request: u64, error: impl Into<String>) -> Self {
        Self {
            request_type,
            request,
            error: error.into(),
            args: None,
            kwargs: None,
        }
    }
}

/// Publish request options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Request a `PUBLISHED` acknowledgement.
    #[serde(default)]
    pub acknowledge: bool,
    /// Exclude the publisher from event delivery (defaults to `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_me: Option<bool>,
    /// Ask the router to disclose the publisher to subscribers.
    #[serde(default)]
    pub disclose_me: bool,
}

/// Publish an event to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publish {
    pub request: u64,
    #[serde(default)]
    pub options: PublishOptions,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Publish acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Published {
    pub request: u64,
    pub publication: u64,
}

/// Subscribe request options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubscribeOptions {
    #[serde(rename = "match", default)]
    pub policy: MatchPolicy,
}

/// Subscribe to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    pub request: u64,
    #[serde(default)]
    pub options: SubscribeOptions,
    pub topic: String,
}

/// Subscribe acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribed {
    pub request: u64,
    pub subscription: u64,
}

/// Unsubscribe from a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unsubscribe {
    pub request: u64,
    pub subscription: u64,
}

/// Unsubscribe acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unsubscribed {
    pub request: u64,
}

/// Event delivery details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDetails {
    /// Publisher session ID, when disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<u64>,
    /// Concrete topic, for pattern subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Event delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub subscription: u64,
    pub publication: u64,
    #[serde(default)]
    pub details: EventDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Call request options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallOptions {
    /// Ask the router to disclose the caller to the callee.
    #[serde(default)]
    pub disclose_me: bool,
    /// Call timeout hint in milliseconds (passed through, not enforced here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Call a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub request: u64,
    #[serde(default)]
    pub options: CallOptions,
    pub procedure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Cancellation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelMode {
    /// Drop the call without interrupting the callee.
    Skip,
    /// Interrupt the callee and wait for its error.
    #[default]
    Kill,
    /// Interrupt the callee and fail the call immediately.
    #[serde(rename = "killnowait")]
    KillNoWait,
}

/// Cancel request options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CancelOptions {
    #[serde(default)]
    pub mode: CancelMode,
}

/// Cancel a pending call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub request: u64,
    #[serde(default)]
    pub options: CancelOptions,
}

/// Call result delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub request: u64,
    #[serde(default)]
    pub details: Kwargs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Register request options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegisterOptions {
    #[serde(rename = "match", default)]
    pub policy: MatchPolicy,
}

/// Register a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub request: u64,
    #[serde(default)]
    pub options: RegisterOptions,
    pub procedure: String,
}

/// Register acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registered {
    pub request: u64,
    pub registration: u64,
}

/// Unregister a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unregister {
    pub request: u64,
    pub registration: u64,
}

/// Unregister acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unregistered {
    pub request: u64,
}

/// Invocation details passed to the callee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvocationDetails {
    /// Caller session ID, when disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<u64>,
    /// Concrete procedure, for pattern registrations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
}

/// Invocation delivered to a callee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub request: u64,
    pub registration: u64,
    #[serde(default)]
    pub details: InvocationDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Interrupt a running invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    pub request: u64,
    #[serde(default)]
    pub options: CancelOptions,
}

/// Yield options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YieldOptions {
    #[serde(default)]
    pub progress: bool,
}

/// Invocation result yielded by a callee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Yield {
    pub request: u64,
    #[serde(default)]
    pub options: YieldOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
}

/// Standard WAMP error URIs emitted by the router and its sub-engines.
pub mod error_uri {
    pub const NOT_AUTHORIZED: &str = "wamp.error.not_authorized";
    pub const INVALID_URI: &str = "wamp.error.invalid_uri";
    pub const INVALID_ARGUMENT: &str = "wamp.error.invalid_argument";
    pub const NO_SUCH_SUBSCRIPTION: &str = "wamp.error.no_such_subscription";
    pub const NO_SUCH_REGISTRATION: &str = "wamp.error.no_such_registration";
    pub const NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
    pub const PROCEDURE_ALREADY_EXISTS: &str = "wamp.error.procedure_already_exists";
    pub const CANCELED: &str = "wamp.error.canceled";
}

/// The closed union of WAMP messages flowing through the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Hello(Hello),
    Welcome(Welcome),
    Abort(Abort),
    Goodbye(Goodbye),
    Error(Error),
    Publish(Publish),
    Published(Published),
    Subscribe(Subscribe),
    Subscribed(Subscribed),
    Unsubscribe(Unsubscribe),
    Unsubscribed(Unsubscribed),
    Event(Event),
    Call(Call),
    Cancel(Cancel),
    Result(CallResult),
    Register(Register),
    Registered(Registered),
    Unregister(Unregister),
    Unregistered(Unregistered),
    Invocation(Invocation),
    Interrupt(Interrupt),
    Yield(Yield),
}

impl Message {
    /// The kind tag of this message.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello(_) => MessageKind::Hello,
            Message::Welcome(_) => MessageKind::Welcome,
            Message::Abort(_) => MessageKind::Abort,
            Message::Goodbye(_) => MessageKind::Goodbye,
            Message::Error(_) => MessageKind::Error,
            Message::Publish(_) => MessageKind::Publish,
            Message::Published(_) => MessageKind::Published,
            Message::Subscribe(_) => MessageKind::Subscribe,
            Message::Subscribed(_) => MessageKind::Subscribed,
            Message::Unsubscribe(_) => MessageKind::Unsubscribe,
            Message::Unsubscribed(_) => MessageKind::Unsubscribed,
            Message::Event(_) => MessageKind::Event,
            Message::Call(_) => MessageKind::Call,
            Message::Cancel(_) => MessageKind::Cancel,
            Message::Result(_) => MessageKind::Result,
            Message::Register(_) => MessageKind::Register,
            Message::Registered(_) => MessageKind::Registered,
            Message::Unregister(_) => MessageKind::Unregister,
            Message::Unregistered(_) => MessageKind::Unregistered,
            Message::Invocation(_) => MessageKind::Invocation,
            Message::Interrupt(_) => MessageKind::Interrupt,
            Message::Yield(_) => MessageKind::Yield,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in [
            MessageKind::Hello,
            MessageKind::Error,
            MessageKind::Publish,
            MessageKind::Invocation,
            MessageKind::Yield,
        ] {
            let code: u8 = kind.into();
            assert_eq!(MessageKind::try_from(code).unwrap(), kind);
        }
        assert!(MessageKind::try_from(0).is_err());
        assert!(MessageKind::try_from(99).is_err());
    }

    #[test]
    fn test_message_kind_tags() {
        let msg = Message::Subscribe(Subscribe {
            request: 1,
            options: SubscribeOptions::default(),
            topic: "com.myapp.topic1".into(),
        });
        assert_eq!(msg.kind(), MessageKind::Subscribe);
    }

    #[test]
    fn test_message_serde_tagging() {
        let msg = Message::Publish(Publish {
            request: 7,
            options: PublishOptions {
                acknowledge: true,
                ..Default::default()
            },
            topic: "com.myapp.topic1".into(),
            args: Some(vec![serde_json::json!("hello")]),
            kwargs: None,
        });

        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded["type"], "publish");
        assert_eq!(encoded["topic"], "com.myapp.topic1");

        let decoded: Message = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_error_for_request() {
        let err = Error::for_request(MessageKind::Call, 42, "wamp.error.no_such_procedure");
        assert_eq!(err.request_type, MessageKind::Call);
        assert_eq!(err.request, 42);
        assert!(err.args.is_none());
    }
}
