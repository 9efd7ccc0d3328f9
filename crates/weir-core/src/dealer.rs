//! RPC sub-engine.
//!
//! The [`Dealer`] trait is the seam the router dispatches Register,
//! Unregister, Call, Cancel, Yield and invocation-error messages through.
//! [`BasicDealer`] is the built-in single-callee implementation; shared and
//! pattern registrations belong to richer implementations behind the same
//! trait.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace, warn};
use weir_proto::ids;
use weir_proto::message::{
    self, error_uri, Call, CallResult, Cancel, CancelMode, Interrupt, Invocation,
    InvocationDetails, MessageKind, Register, Registered, Unregister, Unregistered, Yield,
};
use weir_proto::uri::MatchPolicy;
use weir_proto::Message;

use crate::authorization::Action;
use crate::error::RouterError;
use crate::router::Router;
use crate::session::{SessionHandle, SessionId};

/// Dealer feature flags advertised to attaching sessions.
#[derive(Debug, Clone, Serialize)]
pub struct DealerFeatures {
    pub caller_identification: bool,
    pub call_canceling: bool,
    pub progressive_call_results: bool,
    pub pattern_based_registration: bool,
    pub shared_registration: bool,
}

/// RPC engine contract used by the router.
#[async_trait]
pub trait Dealer: Send + Sync {
    /// A session joined the realm.
    fn attach(&self, session: &SessionHandle);

    /// A session left the realm; release its registrations and fail its
    /// pending calls.
    fn detach(&self, router: &Router, session: &SessionHandle);

    /// Feature set advertised under the `dealer` role.
    fn role_features(&self) -> DealerFeatures;

    /// Handle a `REGISTER` message.
    async fn process_register(
        &self,
        router: &Router,
        session: &SessionHandle,
        register: Register,
    ) -> Result<(), RouterError>;

    /// Handle an `UNREGISTER` message.
    async fn process_unregister(
        &self,
        router: &Router,
        session: &SessionHandle,
        unregister: Unregister,
    ) -> Result<(), RouterError>;

    /// Handle a `CALL` message.
    async fn process_call(
        &self,
        router: &Router,
        session: &SessionHandle,
        call: Call,
    ) -> Result<(), RouterError>;

    /// Handle a `CANCEL` message.
    async fn process_cancel(
        &self,
        router: &Router,
        session: &SessionHandle,
        cancel: Cancel,
    ) -> Result<(), RouterError>;

    /// Handle a `YIELD` message.
    async fn process_yield(
        &self,
        router: &Router,
        session: &SessionHandle,
        yield_: Yield,
    ) -> Result<(), RouterError>;

    /// Handle an `ERROR` answering an invocation.
    async fn process_invocation_error(
        &self,
        router: &Router,
        session: &SessionHandle,
        error: message::Error,
    ) -> Result<(), RouterError>;
}

struct Registration {
    id: u64,
    callee: SessionId,
}

#[derive(Clone, Copy)]
struct PendingCall {
    caller: SessionId,
    callee: SessionId,
    call_request: u64,
}

/// Single-callee in-memory dealer.
#[derive(Default)]
pub struct BasicDealer {
    /// Procedure -> registration.
    procedures: DashMap<String, Registration>,
    /// Registration ID -> procedure.
    by_id: DashMap<u64, String>,
    /// Session -> registration IDs, for detach cleanup.
    session_regs: DashMap<SessionId, HashSet<u64>>,
    /// Invocation ID -> pending call.
    pending: DashMap<u64, PendingCall>,
    /// (caller, call request) -> invocation ID, for cancellation.
    call_index: DashMap<(SessionId, u64), u64>,
}

impl BasicDealer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_pending(&self, invocation_id: u64) -> Option<PendingCall> {
        let (_, pending) = self.pending.remove(&invocation_id)?;
        self.call_index
            .remove(&(pending.caller, pending.call_request));
        Some(pending)
    }

    fn fail_call(&self, router: &Router, pending: PendingCall, error: &str) {
        if let Some(caller) = router.session(pending.caller) {
            router.send(
                &caller,
                Message::Error(message::Error::for_request(
                    MessageKind::Call,
                    pending.call_request,
                    error,
                )),
            );
        }
    }
}

#[async_trait]
impl Dealer for BasicDealer {
    fn attach(&self, session: &SessionHandle) {
        self.session_regs.insert(session.id(), HashSet::new());
    }

    fn detach(&self, router: &Router, session: &SessionHandle) {
        if let Some((_, regs)) = self.session_regs.remove(&session.id()) {
            for registration_id in regs {
                if let Some((_, procedure)) = self.by_id.remove(&registration_id) {
                    self.procedures.remove(&procedure);
                    debug!(procedure = %procedure, "registration dropped on detach");
                }
            }
        }

        // Fail calls the detached session participates in, either side.
        let affected: Vec<u64> = self
            .pending
            .iter()
            .filter(|entry| {
                entry.caller == session.id() || entry.callee == session.id()
            })
            .map(|entry| *entry.key())
            .collect();
        for invocation_id in affected {
            if let Some(pending) = self.remove_pending(invocation_id) {
                if pending.caller != session.id() {
                    self.fail_call(router, pending, error_uri::CANCELED);
                }
            }
        }
    }

    fn role_features(&self) -> DealerFeatures {
        DealerFeatures {
            caller_identification: true,
            call_canceling: true,
            progressive_call_results: false,
            pattern_based_registration: false,
            shared_registration: false,
        }
    }

    async fn process_register(
        &self,
        router: &Router,
        session: &SessionHandle,
        register: Register,
    ) -> Result<(), RouterError> {
        let Register {
            request,
            options,
            procedure,
        } = register;

        if router.check_uri(&procedure).is_err() {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Register,
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
                    MessageKind::Register,
                    request,
                    error_uri::INVALID_ARGUMENT,
                )),
            );
            return Ok(());
        }

        let auth = router.authorize(session, &procedure, Action::Register).await;
        if !auth.allow {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Register,
                    request,
                    error_uri::NOT_AUTHORIZED,
                )),
            );
            return Ok(());
        }

        if self.procedures.contains_key(&procedure) {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Register,
                    request,
                    error_uri::PROCEDURE_ALREADY_EXISTS,
                )),
            );
            return Ok(());
        }

        let registration_id = ids::next_id();
        self.procedures.insert(
            procedure.clone(),
            Registration {
                id: registration_id,
                callee: session.id(),
            },
        );
        self.by_id.insert(registration_id, procedure.clone());
        self.session_regs
            .entry(session.id())
            .or_default()
            .insert(registration_id);
        debug!(procedure = %procedure, registration = registration_id, "registered");

        router.send(
            session,
            Message::Registered(Registered {
                request,
                registration: registration_id,
            }),
        );
        Ok(())
    }

    async fn process_unregister(
        &self,
        router: &Router,
        session: &SessionHandle,
        unregister: Unregister,
    ) -> Result<(), RouterError> {
        let Unregister {
            request,
            registration,
        } = unregister;

        let owned = match self.session_regs.get_mut(&session.id()) {
            Some(mut regs) => regs.remove(&registration),
            None => false,
        };
        if !owned {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Unregister,
                    request,
                    error_uri::NO_SUCH_REGISTRATION,
                )),
            );
            return Ok(());
        }

        if let Some((_, procedure)) = self.by_id.remove(&registration) {
            self.procedures.remove(&procedure);
            debug!(procedure = %procedure, registration, "unregistered");
        }
        router.send(session, Message::Unregistered(Unregistered { request }));
        Ok(())
    }

    async fn process_call(
        &self,
        router: &Router,
        session: &SessionHandle,
        call: Call,
    ) -> Result<(), RouterError> {
        let Call {
            request,
            options,
            procedure,
            args,
            kwargs,
        } = call;

        if router.check_uri(&procedure).is_err() {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Call,
                    request,
                    error_uri::INVALID_URI,
                )),
            );
            return Ok(());
        }

        let auth = router.authorize(session, &procedure, Action::Call).await;
        if !auth.allow {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Call,
                    request,
                    error_uri::NOT_AUTHORIZED,
                )),
            );
            return Ok(());
        }

        let Some((registration_id, callee_id)) = self
            .procedures
            .get(&procedure)
            .map(|reg| (reg.id, reg.callee))
        else {
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Call,
                    request,
                    error_uri::NO_SUCH_PROCEDURE,
                )),
            );
            return Ok(());
        };

        let Some(callee) = router.session(callee_id) else {
            // stale registration, the callee is gone
            self.procedures.remove(&procedure);
            self.by_id.remove(&registration_id);
            router.send(
                session,
                Message::Error(message::Error::for_request(
                    MessageKind::Call,
                    request,
                    error_uri::NO_SUCH_PROCEDURE,
                )),
            );
            return Ok(());
        };

        let invocation_id = ids::next_id();
        self.pending.insert(
            invocation_id,
            PendingCall {
                caller: session.id(),
                callee: callee_id,
                call_request: request,
            },
        );
        self.call_index
            .insert((session.id(), request), invocation_id);

        let disclose = auth.disclose.unwrap_or(false) || options.disclose_me;
        trace!(procedure = %procedure, invocation = invocation_id, "call routed");
        router.send(
            &callee,
            Message::Invocation(Invocation {
                request: invocation_id,
                registration: registration_id,
                details: InvocationDetails {
                    caller: disclose.then(|| session.id()),
                    procedure: None,
                },
                args,
                kwargs,
            }),
        );
        Ok(())
    }

    async fn process_cancel(
        &self,
        router: &Router,
        session: &SessionHandle,
        cancel: Cancel,
    ) -> Result<(), RouterError> {
        let Cancel { request, options } = cancel;

        let Some(invocation_id) = self
            .call_index
            .get(&(session.id(), request))
            .map(|entry| *entry.value())
        else {
            // nothing pending under that request; cancel is best-effort
            trace!(request, "cancel for unknown call ignored");
            return Ok(());
        };

        match options.mode {
            CancelMode::Kill => {
                // interrupt the callee; the final error arrives as an
                // invocation error and is forwarded to the caller then
                if let Some(pending) = self.pending.get(&invocation_id) {
                    if let Some(callee) = router.session(pending.callee) {
                        router.send(
                            &callee,
                            Message::Interrupt(Interrupt {
                                request: invocation_id,
                                options: options.clone(),
                            }),
                        );
                    }
                }
            }
            CancelMode::Skip | CancelMode::KillNoWait => {
                if let Some(pending) = self.remove_pending(invocation_id) {
                    if options.mode == CancelMode::KillNoWait {
                        if let Some(callee) = router.session(pending.callee) {
                            router.send(
                                &callee,
                                Message::Interrupt(Interrupt {
                                    request: invocation_id,
                                    options: options.clone(),
                                }),
                            );
                        }
                    }
                    self.fail_call(router, pending, error_uri::CANCELED);
                }
            }
        }
        Ok(())
    }

    async fn process_yield(
        &self,
        router: &Router,
        session: &SessionHandle,
        yield_: Yield,
    ) -> Result<(), RouterError> {
        let Yield {
            request,
            options: _,
            args,
            kwargs,
        } = yield_;

        let callee_matches = self
            .pending
            .get(&request)
            .map(|pending| pending.callee == session.id())
            .unwrap_or(false);
        if !callee_matches {
            // the call may have been canceled already, or the yield is bogus
            warn!(invocation = request, "yield for unknown invocation dropped");
            return Ok(());
        }

        if let Some(pending) = self.remove_pending(request) {
            if let Some(caller) = router.session(pending.caller) {
                router.send(
                    &caller,
                    Message::Result(CallResult {
                        request: pending.call_request,
                        details: Default::default(),
                        args,
                        kwargs,
                    }),
                );
            }
        }
        Ok(())
    }

    async fn process_invocation_error(
        &self,
        router: &Router,
        session: &SessionHandle,
        error: message::Error,
    ) -> Result<(), RouterError> {
        let callee_matches = self
            .pending
            .get(&error.request)
            .map(|pending| pending.callee == session.id())
            .unwrap_or(false);
        if !callee_matches {
            warn!(invocation = error.request, "invocation error for unknown invocation dropped");
            return Ok(());
        }

        if let Some(pending) = self.remove_pending(error.request) {
            if let Some(caller) = router.session(pending.caller) {
                router.send(
                    &caller,
                    Message::Error(message::Error {
                        request_type: MessageKind::Call,
                        request: pending.call_request,
                        error: error.error,
                        args: error.args,
                        kwargs: error.kwargs,
                    }),
                );
            }
        }
        Ok(())
    }
}
