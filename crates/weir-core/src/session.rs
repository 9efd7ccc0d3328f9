//! Session handles as seen by the router.
//!
//! The router never owns a connection; it holds a [`SessionHandle`] that
//! carries the authenticated identity and a [`SessionTransport`] sink for
//! outbound messages. Client sessions (those opened by remote peers) carry
//! [`SessionDetails`] and are tracked in the session registry; internal
//! sessions without details are attached but not tracked by ID.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weir_proto::Message;

/// Unique session identifier within a router node.
pub type SessionId = u64;

/// The transport lost its peer; outbound messages are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session transport closed")]
pub struct TransportClosed;

/// Outbound message sink for a session.
///
/// Implementations wrap whatever carries the connection (a websocket writer,
/// an in-process channel, a test recorder). `send` must not block.
pub trait SessionTransport: Send + Sync {
    /// Hand a message to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportClosed`] if the peer is gone.
    fn send(&self, msg: Message) -> Result<(), TransportClosed>;
}

/// Details carried by client sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    /// Authentication method that established the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authmethod: Option<String>,
    /// Authentication provider that vouched for the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authprovider: Option<String>,
}

/// A session attached (or attachable) to a realm router.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    authid: String,
    authrole: String,
    details: Option<SessionDetails>,
    transport: Arc<dyn SessionTransport>,
}

impl SessionHandle {
    /// Create a client session handle.
    #[must_use]
    pub fn client(
        id: SessionId,
        authid: impl Into<String>,
        authrole: impl Into<String>,
        details: SessionDetails,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        Self {
            id,
            authid: authid.into(),
            authrole: authrole.into(),
            details: Some(details),
            transport,
        }
    }

    /// Create an internal (non-client) session handle.
    ///
    /// Internal sessions are forwarded to the broker and dealer on attach
    /// but are exempt from registry tracking and its duplicate checks.
    #[must_use]
    pub fn internal(
        id: SessionId,
        authid: impl Into<String>,
        authrole: impl Into<String>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        Self {
            id,
            authid: authid.into(),
            authrole: authrole.into(),
            details: None,
            transport,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Authenticated identity string.
    #[must_use]
    pub fn authid(&self) -> &str {
        &self.authid
    }

    /// Authenticated role name.
    #[must_use]
    pub fn authrole(&self) -> &str {
        &self.authrole
    }

    /// Client session details, when present.
    #[must_use]
    pub fn details(&self) -> Option<&SessionDetails> {
        self.details.as_ref()
    }

    /// Whether this is a client session subject to registry tracking.
    #[must_use]
    pub fn is_client(&self) -> bool {
        self.details.is_some()
    }

    /// The outbound transport sink.
    #[must_use]
    pub fn transport(&self) -> &dyn SessionTransport {
        self.transport.as_ref()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("authid", &self.authid)
            .field("authrole", &self.authrole)
            .field("client", &self.is_client())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;

    #[test]
    fn test_client_vs_internal() {
        let transport = Arc::new(RecordingTransport::default());
        let client = SessionHandle::client(
            1,
            "alice",
            "frontend",
            SessionDetails::default(),
            transport.clone(),
        );
        let internal = SessionHandle::internal(2, "router", "trusted", transport);

        assert!(client.is_client());
        assert!(!internal.is_client());
        assert_eq!(client.authrole(), "frontend");
        assert_eq!(internal.id(), 2);
    }
}
