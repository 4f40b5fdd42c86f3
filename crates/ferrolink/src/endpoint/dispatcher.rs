// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Endpoint lifecycle scan.
//!
//! One [`EndpointDispatcher`] drives one connection. After every burst of
//! I/O that may have changed engine state, the application calls
//! [`process`](EndpointDispatcher::process), which performs a single
//! non-blocking pass over the endpoint tree:
//!
//! 1. Gate on the negotiation phase (nothing is dispatched until the
//!    handshake passes or fails; the outcome is reported exactly once).
//! 2. Pending scans: connection, then sessions, then links whose local
//!    end is UNINIT.
//! 3. Optional active notifications (opt-in, see
//!    [`with_active_callbacks`](EndpointDispatcher::with_active_callbacks)).
//! 4. The delivery work queue, in FIFO order.
//! 5. Close scans: links, then sessions the remote has closed, then the
//!    connection itself.
//!
//! The scan is evaluated lazily against live engine state: a callback that
//! transitions the current endpoint (the defaults do) immediately affects
//! which endpoints the rest of the pass visits, and a repeated scan with
//! no intervening state change fires no duplicate callbacks.

use crate::endpoint::handler::EndpointHandler;
use crate::endpoint::state::EndpointState;
use crate::engine::{EngineConnection, Negotiation};

/// Endpoints whose local end has not been opened yet.
pub const NEED_INIT: EndpointState = EndpointState::LOCAL_UNINIT;

/// Endpoints the remote has closed while the local end is still open.
pub const NEED_CLOSE: EndpointState =
    EndpointState::LOCAL_ACTIVE.or(EndpointState::REMOTE_CLOSED);

/// Both ends open.
const BOTH_ACTIVE: EndpointState =
    EndpointState::LOCAL_ACTIVE.or(EndpointState::REMOTE_ACTIVE);

/// Per-connection endpoint scan state.
///
/// Holds only what must survive between passes: whether the negotiation
/// outcome has been reported, whether it failed, and whether active
/// notifications are enabled. Everything else is read fresh from the
/// engine on every pass.
#[derive(Debug, Default)]
pub struct EndpointDispatcher {
    negotiated: bool,
    failed: bool,
    notify_active: bool,
}

impl EndpointDispatcher {
    /// Dispatcher with default behavior (no active notifications).
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher that additionally fires `*_active` callbacks whenever an
    /// endpoint has both ends open.
    ///
    /// Active notifications are level-triggered: they fire on every pass
    /// for as long as the endpoint stays fully open, which is why they are
    /// off by default.
    pub fn with_active_callbacks() -> Self {
        Self {
            notify_active: true,
            ..Self::default()
        }
    }

    /// True once the negotiation phase has reported a failure; every
    /// subsequent pass is a no-op for this connection.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Run one scan pass over `conn`, invoking `handler` callbacks for
    /// every endpoint in a state of interest.
    ///
    /// Never blocks and never loops waiting for state: if an I/O burst may
    /// have changed engine state, call this again.
    pub fn process(&mut self, conn: &mut dyn EngineConnection, handler: &mut dyn EndpointHandler) {
        if self.failed {
            return;
        }

        if !self.negotiated {
            match conn.negotiation() {
                Negotiation::InProgress => {
                    log::trace!("endpoint scan deferred: negotiation in progress");
                    return;
                }
                outcome => {
                    log::debug!("negotiation finished: {:?}", outcome);
                    handler.negotiation_done(conn, outcome);
                    self.negotiated = true;
                    if outcome == Negotiation::Failed {
                        self.failed = true;
                        return;
                    }
                }
            }
        }

        if conn.state().contains(NEED_INIT) {
            handler.connection_pending(conn);
        }

        let mut session = conn.session_head(NEED_INIT);
        while let Some(id) = session {
            handler.session_pending(conn, id);
            session = conn.session_next(id, NEED_INIT);
        }

        let mut link = conn.link_head(NEED_INIT);
        while let Some(id) = link {
            handler.link_pending(conn, id);
            link = conn.link_next(id, NEED_INIT);
        }

        if self.notify_active {
            if conn.state().contains(BOTH_ACTIVE) {
                handler.connection_active(conn);
            }
            let mut session = conn.session_head(BOTH_ACTIVE);
            while let Some(id) = session {
                handler.session_active(conn, id);
                session = conn.session_next(id, BOTH_ACTIVE);
            }
            let mut link = conn.link_head(BOTH_ACTIVE);
            while let Some(id) = link {
                handler.link_active(conn, id);
                link = conn.link_next(id, BOTH_ACTIVE);
            }
        }

        let mut work = conn.work_head();
        while let Some(id) = work {
            let delivery = conn.delivery(id);
            handler.delivery_update(conn, delivery);
            work = conn.work_next(id);
        }

        // Close whatever the remotes have closed, leaves first.
        let mut link = conn.link_head(NEED_CLOSE);
        while let Some(id) = link {
            handler.link_closed(conn, id);
            link = conn.link_next(id, NEED_CLOSE);
        }

        let mut session = conn.session_head(NEED_CLOSE);
        while let Some(id) = session {
            handler.session_remote_closed(conn, id);
            session = conn.session_next(id, NEED_CLOSE);
        }

        if conn.state().contains(NEED_CLOSE) {
            handler.connection_remote_closed(conn);
        }
    }
}
