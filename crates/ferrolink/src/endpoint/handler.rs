// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Application-facing endpoint lifecycle callbacks.

use crate::engine::{Delivery, EngineConnection, LinkId, Negotiation, SessionId};

/// Callbacks invoked by the [`EndpointDispatcher`] as endpoints move
/// through their lifecycle.
///
/// All methods have default implementations, so a handler only overrides
/// the events it cares about. The defaults implement the conventional
/// protocol choreography: open whatever the remote is waiting on, close
/// whatever the remote has closed. Every callback receives the connection
/// so overrides (and the defaults) can act on the engine directly.
///
/// One handler instance belongs to one connection; per-connection state
/// (credit windows, pending sends) lives in the implementing type.
///
/// [`EndpointDispatcher`]: crate::EndpointDispatcher
#[allow(unused_variables)]
pub trait EndpointHandler {
    /// The authentication/handshake phase finished with `outcome`
    /// (either [`Negotiation::Passed`] or [`Negotiation::Failed`]).
    /// Fired exactly once per connection, before any endpoint callback.
    fn negotiation_done(&mut self, conn: &mut dyn EngineConnection, outcome: Negotiation) {}

    /// The connection's local end has not been opened yet.
    fn connection_pending(&mut self, conn: &mut dyn EngineConnection) {
        conn.open();
    }

    /// Both ends of the connection are open. Only fired when active
    /// notifications are enabled on the dispatcher.
    fn connection_active(&mut self, conn: &mut dyn EngineConnection) {}

    /// The remote closed the connection while our end is still open.
    fn connection_remote_closed(&mut self, conn: &mut dyn EngineConnection) {
        conn.close();
    }

    /// A session's local end has not been opened yet.
    fn session_pending(&mut self, conn: &mut dyn EngineConnection, session: SessionId) {
        conn.session_open(session);
    }

    /// Both ends of a session are open. Only fired when active
    /// notifications are enabled on the dispatcher.
    fn session_active(&mut self, conn: &mut dyn EngineConnection, session: SessionId) {}

    /// The remote closed a session while our end is still open.
    fn session_remote_closed(&mut self, conn: &mut dyn EngineConnection, session: SessionId) {
        conn.session_close(session);
    }

    /// A link's local end has not been opened yet.
    fn link_pending(&mut self, conn: &mut dyn EngineConnection, link: LinkId) {
        conn.link_open(link);
    }

    /// Both ends of a link are open. Only fired when active notifications
    /// are enabled on the dispatcher.
    fn link_active(&mut self, conn: &mut dyn EngineConnection, link: LinkId) {}

    /// The remote closed a link while our end is still open.
    fn link_closed(&mut self, conn: &mut dyn EngineConnection, link: LinkId) {
        conn.link_close(link);
    }

    /// A delivery on the work queue needs attention. The handler tells
    /// sender-side from receiver-side work via [`Delivery::role`].
    fn delivery_update(&mut self, conn: &mut dyn EngineConnection, delivery: Delivery) {}
}
