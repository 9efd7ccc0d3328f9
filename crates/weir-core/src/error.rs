//! Router error types.

use thiserror::Error;
use weir_proto::MessageKind;

use crate::session::SessionId;
use crate::store::StoreError;

/// Errors raised by the routing core.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A session with this ID is already attached to the realm.
    #[error("session {0} already attached")]
    DuplicateAttach(SessionId),

    /// Detach for a client session that is not in the registry.
    #[error("session {0} not attached")]
    NotAttached(SessionId),

    /// Add/drop targeting a reserved role URI.
    #[error("cannot add or drop reserved role '{0}'")]
    ReservedRole(String),

    /// `process` received a message kind outside the dispatch table.
    #[error("unexpected message {0}")]
    UnexpectedMessage(MessageKind),

    /// Realm lookup failed and auto-creation is disabled.
    #[error("no such realm '{0}'")]
    NoSuchRealm(String),

    /// `start_realm` for a realm URI that is already registered.
    #[error("realm '{0}' already started")]
    RealmExists(String),

    /// A requested store backend is not compiled into this build.
    #[error("store backend '{0}' is not available in this build")]
    BackendUnavailable(&'static str),

    /// Realm or role configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Placeholder entry points for auto-provisioning.
    #[error("{0} not implemented")]
    Unimplemented(&'static str),

    /// Realm store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// URI validation failure.
    #[error(transparent)]
    InvalidUri(#[from] weir_proto::InvalidUri),
}
