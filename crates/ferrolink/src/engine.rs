// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Protocol engine contracts.
//!
//! The reactor core is engine-agnostic: it never encodes or decodes a wire
//! protocol itself. Instead every [`Transport`](crate::Transport) owns one
//! [`ProtocolEngine`] and exchanges raw bytes with it, and the
//! [`EndpointDispatcher`](crate::EndpointDispatcher) walks the engine-owned
//! endpoint tree through [`EngineConnection`].
//!
//! Two traits, two concerns:
//!
//! - [`ProtocolEngine`] is the byte-buffer and timer face consumed by the
//!   transport layer: ingress capacity, egress pending bytes, half-close
//!   notifications, and a periodic tick.
//! - [`EngineConnection`] is the endpoint-tree face consumed by the
//!   dispatcher: connection/session/link lifecycle states, the delivery
//!   work queue, and open/close mutations. Traversal is handle-based and
//!   lazy: the dispatcher re-queries between callbacks so each step sees
//!   the tree as the previous callback left it.
//!
//! Endpoint and delivery state is owned and mutated exclusively by the
//! engine (in response to incoming data or open/close calls); the core only
//! reads it.

use crate::clock::Timestamp;
use crate::endpoint::EndpointState;

// ============================================================================
// Handles
// ============================================================================

/// Handle to a session within one connection.
///
/// Handles are assigned by the engine in creation order and stay valid for
/// the lifetime of the connection, even after the endpoint closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub usize);

/// Handle to a link within one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// Handle to a delivery within one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryId(pub usize);

// ============================================================================
// Delivery
// ============================================================================

/// Direction of the link a delivery travels on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkRole {
    /// Local end sends message transfers.
    Sender,
    /// Local end receives message transfers.
    Receiver,
}

/// Snapshot of an in-flight message transfer.
///
/// Handed to [`EndpointHandler::delivery_update`] for every entry on the
/// connection's work queue. The handler tells sender-side from
/// receiver-side deliveries via [`role`](Delivery::role).
///
/// [`EndpointHandler::delivery_update`]: crate::EndpointHandler::delivery_update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Handle of this delivery.
    pub id: DeliveryId,
    /// Link this delivery travels on.
    pub link: LinkId,
    /// Direction of the owning link.
    pub role: LinkRole,
    /// Credit and buffer space allow writing message data.
    pub writable: bool,
    /// Received message data is available to read.
    pub readable: bool,
    /// The remote updated the delivery's disposition.
    pub updated: bool,
    /// Transfer has started but not all frames have been sent/received.
    pub pending: bool,
    /// Only part of the message has arrived so far.
    pub partial: bool,
    /// The delivery has been settled.
    pub settled: bool,
}

// ============================================================================
// Negotiation
// ============================================================================

/// Outcome of the engine's authentication/handshake phase.
///
/// Endpoint dispatching is gated on this phase: while `InProgress` no
/// endpoint callbacks fire, and a `Failed` outcome permanently stops
/// endpoint work for the connection (the handler decides whether to drop
/// or retry the transport).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Negotiation {
    /// Handshake still exchanging frames.
    InProgress,
    /// Peer authenticated; endpoint traffic may proceed.
    Passed,
    /// Handshake rejected by either side.
    Failed,
}

// ============================================================================
// ProtocolEngine
// ============================================================================

/// Byte-buffer and timer interface of a per-connection protocol engine.
///
/// The transport never pushes more than [`capacity`](Self::capacity) bytes
/// and never pops more than it peeked. Negative returns from `capacity`
/// and `pending` mean the engine is finished with that direction for good.
pub trait ProtocolEngine {
    /// Bytes of network input the engine can accept right now.
    ///
    /// `0` means "temporarily full, ask again later"; a negative value
    /// means the engine will accept no more input ever (e.g. it has seen a
    /// protocol-level close).
    fn capacity(&self) -> isize;

    /// Hand received bytes to the engine. `data` is never larger than the
    /// most recent [`capacity`](Self::capacity) answer.
    fn push(&mut self, data: &[u8]);

    /// Bytes of network output waiting to be sent.
    ///
    /// `0` means "nothing right now"; a negative value means egress is
    /// finished for good.
    fn pending(&self) -> isize;

    /// Contiguous view of up to `n` pending output bytes.
    fn peek(&self, n: usize) -> &[u8];

    /// Discard `n` output bytes after they were written to the socket.
    fn pop(&mut self, n: usize);

    /// The ingress direction terminated (peer closed or read failed).
    fn close_tail(&mut self);

    /// The egress direction terminated (peer closed or write failed).
    fn close_head(&mut self);

    /// Periodic maintenance. Returns the absolute time of the next
    /// required tick, or `0` if none is pending.
    fn tick(&mut self, now: Timestamp) -> Timestamp;
}

// ============================================================================
// EngineConnection
// ============================================================================

/// Endpoint-tree interface of a protocol connection.
///
/// A connection owns sessions, sessions own links, links own deliveries.
/// Traversal is handle-based: `*_head(filter)` returns the first endpoint
/// whose state [`contains`](EndpointState::contains) every bit of
/// `filter`, and `*_next(prev, filter)` returns the first *matching*
/// endpoint after `prev` in creation order; `prev` itself need not still
/// match, so a callback may transition the current endpoint without
/// breaking the walk.
pub trait EngineConnection {
    /// Combined local/remote lifecycle state of the connection.
    fn state(&self) -> EndpointState;

    /// Open the local end of the connection.
    fn open(&mut self);

    /// Close the local end of the connection.
    fn close(&mut self);

    /// State of the authentication/handshake phase.
    fn negotiation(&self) -> Negotiation;

    /// First session matching `filter`.
    fn session_head(&self, filter: EndpointState) -> Option<SessionId>;

    /// First session after `prev` (in creation order) matching `filter`.
    fn session_next(&self, prev: SessionId, filter: EndpointState) -> Option<SessionId>;

    /// Lifecycle state of a session.
    fn session_state(&self, id: SessionId) -> EndpointState;

    /// Open the local end of a session.
    fn session_open(&mut self, id: SessionId);

    /// Close the local end of a session.
    fn session_close(&mut self, id: SessionId);

    /// First link matching `filter`.
    fn link_head(&self, filter: EndpointState) -> Option<LinkId>;

    /// First link after `prev` (in creation order) matching `filter`.
    fn link_next(&self, prev: LinkId, filter: EndpointState) -> Option<LinkId>;

    /// Lifecycle state of a link.
    fn link_state(&self, id: LinkId) -> EndpointState;

    /// Open the local end of a link.
    fn link_open(&mut self, id: LinkId);

    /// Close the local end of a link.
    fn link_close(&mut self, id: LinkId);

    /// First delivery on the connection's work queue.
    ///
    /// The work queue holds deliveries with pending application work, in
    /// FIFO order.
    fn work_head(&self) -> Option<DeliveryId>;

    /// Next delivery on the work queue after `prev`.
    fn work_next(&self, prev: DeliveryId) -> Option<DeliveryId>;

    /// Snapshot of a delivery. `id` must have been obtained from this
    /// connection's work queue.
    fn delivery(&self, id: DeliveryId) -> Delivery;
}

// ============================================================================
// Test mock engine
// ============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, Debug)]
    struct MockSession {
        state: EndpointState,
    }

    #[derive(Clone, Copy, Debug)]
    struct MockLink {
        state: EndpointState,
        role: LinkRole,
    }

    #[derive(Clone, Copy, Debug)]
    struct MockDelivery {
        link: LinkId,
        in_work: bool,
        writable: bool,
        readable: bool,
        updated: bool,
        pending: bool,
        partial: bool,
        settled: bool,
    }

    /// Side effects recorded by a [`MockEngine`], observable through a
    /// [`MockProbe`] after the engine has been boxed into a transport.
    #[derive(Default)]
    struct Observations {
        pushed: Vec<u8>,
        popped: usize,
        tail_closed: bool,
        head_closed: bool,
        tick_calls: Vec<Timestamp>,
    }

    /// Shared view into a boxed [`MockEngine`]'s recorded side effects.
    #[derive(Clone)]
    pub struct MockProbe {
        obs: Arc<Mutex<Observations>>,
    }

    impl MockProbe {
        pub fn pushed(&self) -> Vec<u8> {
            self.obs.lock().unwrap().pushed.clone()
        }

        pub fn popped(&self) -> usize {
            self.obs.lock().unwrap().popped
        }

        pub fn tail_closed(&self) -> bool {
            self.obs.lock().unwrap().tail_closed
        }

        pub fn head_closed(&self) -> bool {
            self.obs.lock().unwrap().head_closed
        }

        pub fn tick_calls(&self) -> Vec<Timestamp> {
            self.obs.lock().unwrap().tick_calls.clone()
        }
    }

    /// Scriptable engine implementing both engine traits.
    ///
    /// Transport-side behavior (capacity, pending, tick results) is set by
    /// the test before the engine is boxed; side effects are recorded and
    /// stay observable through [`MockEngine::probe`]. Endpoint-tree state
    /// is mutated through the `EngineConnection` impl exactly as a real
    /// engine would do it.
    pub struct MockEngine {
        capacity: isize,
        out: Vec<u8>,
        pending_override: Option<isize>,
        tick_queue: VecDeque<Timestamp>,
        obs: Arc<Mutex<Observations>>,

        state: EndpointState,
        negotiation: Negotiation,
        sessions: Vec<MockSession>,
        links: Vec<MockLink>,
        deliveries: Vec<MockDelivery>,
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self {
                capacity: 0,
                out: Vec::new(),
                pending_override: None,
                tick_queue: VecDeque::new(),
                obs: Arc::new(Mutex::new(Observations::default())),
                state: EndpointState::LOCAL_UNINIT.or(EndpointState::REMOTE_UNINIT),
                negotiation: Negotiation::Passed,
                sessions: Vec::new(),
                links: Vec::new(),
                deliveries: Vec::new(),
            }
        }

        /// Observation handle that survives boxing the engine.
        pub fn probe(&self) -> MockProbe {
            MockProbe {
                obs: self.obs.clone(),
            }
        }

        // --- transport-side scripting ---

        pub fn set_capacity(&mut self, c: isize) {
            self.capacity = c;
        }

        pub fn queue_output(&mut self, data: &[u8]) {
            self.out.extend_from_slice(data);
        }

        pub fn set_pending_override(&mut self, p: isize) {
            self.pending_override = Some(p);
        }

        /// Queue the next `tick` return value. Unqueued ticks return 0.
        pub fn push_tick(&mut self, deadline: Timestamp) {
            self.tick_queue.push_back(deadline);
        }

        // --- endpoint-tree scripting ---

        pub fn set_state(&mut self, state: EndpointState) {
            self.state = state;
        }

        pub fn set_negotiation(&mut self, n: Negotiation) {
            self.negotiation = n;
        }

        pub fn add_session(&mut self, state: EndpointState) -> SessionId {
            self.sessions.push(MockSession { state });
            SessionId(self.sessions.len() - 1)
        }

        pub fn set_session_state(&mut self, id: SessionId, state: EndpointState) {
            self.sessions[id.0].state = state;
        }

        pub fn add_link(&mut self, state: EndpointState, role: LinkRole) -> LinkId {
            self.links.push(MockLink { state, role });
            LinkId(self.links.len() - 1)
        }

        pub fn set_link_state(&mut self, id: LinkId, state: EndpointState) {
            self.links[id.0].state = state;
        }

        pub fn add_work_delivery(&mut self, link: LinkId) -> DeliveryId {
            self.deliveries.push(MockDelivery {
                link,
                in_work: true,
                writable: false,
                readable: true,
                updated: true,
                pending: false,
                partial: false,
                settled: false,
            });
            DeliveryId(self.deliveries.len() - 1)
        }
    }

    impl ProtocolEngine for MockEngine {
        fn capacity(&self) -> isize {
            self.capacity
        }

        fn push(&mut self, data: &[u8]) {
            self.obs.lock().unwrap().pushed.extend_from_slice(data);
        }

        fn pending(&self) -> isize {
            self.pending_override.unwrap_or(self.out.len() as isize)
        }

        fn peek(&self, n: usize) -> &[u8] {
            &self.out[..n.min(self.out.len())]
        }

        fn pop(&mut self, n: usize) {
            let n = n.min(self.out.len());
            self.out.drain(..n);
            self.obs.lock().unwrap().popped += n;
        }

        fn close_tail(&mut self) {
            self.obs.lock().unwrap().tail_closed = true;
        }

        fn close_head(&mut self) {
            self.obs.lock().unwrap().head_closed = true;
        }

        fn tick(&mut self, now: Timestamp) -> Timestamp {
            self.obs.lock().unwrap().tick_calls.push(now);
            self.tick_queue.pop_front().unwrap_or(0)
        }
    }

    fn set_local(state: EndpointState, local: EndpointState) -> EndpointState {
        state.and(EndpointState::REMOTE_MASK).or(local)
    }

    impl EngineConnection for MockEngine {
        fn state(&self) -> EndpointState {
            self.state
        }

        fn open(&mut self) {
            self.state = set_local(self.state, EndpointState::LOCAL_ACTIVE);
        }

        fn close(&mut self) {
            self.state = set_local(self.state, EndpointState::LOCAL_CLOSED);
        }

        fn negotiation(&self) -> Negotiation {
            self.negotiation
        }

        fn session_head(&self, filter: EndpointState) -> Option<SessionId> {
            self.sessions
                .iter()
                .position(|s| s.state.contains(filter))
                .map(SessionId)
        }

        fn session_next(&self, prev: SessionId, filter: EndpointState) -> Option<SessionId> {
            self.sessions
                .iter()
                .enumerate()
                .skip(prev.0 + 1)
                .find(|(_, s)| s.state.contains(filter))
                .map(|(i, _)| SessionId(i))
        }

        fn session_state(&self, id: SessionId) -> EndpointState {
            self.sessions[id.0].state
        }

        fn session_open(&mut self, id: SessionId) {
            let s = &mut self.sessions[id.0];
            s.state = set_local(s.state, EndpointState::LOCAL_ACTIVE);
        }

        fn session_close(&mut self, id: SessionId) {
            let s = &mut self.sessions[id.0];
            s.state = set_local(s.state, EndpointState::LOCAL_CLOSED);
        }

        fn link_head(&self, filter: EndpointState) -> Option<LinkId> {
            self.links
                .iter()
                .position(|l| l.state.contains(filter))
                .map(LinkId)
        }

        fn link_next(&self, prev: LinkId, filter: EndpointState) -> Option<LinkId> {
            self.links
                .iter()
                .enumerate()
                .skip(prev.0 + 1)
                .find(|(_, l)| l.state.contains(filter))
                .map(|(i, _)| LinkId(i))
        }

        fn link_state(&self, id: LinkId) -> EndpointState {
            self.links[id.0].state
        }

        fn link_open(&mut self, id: LinkId) {
            let l = &mut self.links[id.0];
            l.state = set_local(l.state, EndpointState::LOCAL_ACTIVE);
        }

        fn link_close(&mut self, id: LinkId) {
            let l = &mut self.links[id.0];
            l.state = set_local(l.state, EndpointState::LOCAL_CLOSED);
        }

        fn work_head(&self) -> Option<DeliveryId> {
            self.deliveries
                .iter()
                .position(|d| d.in_work)
                .map(DeliveryId)
        }

        fn work_next(&self, prev: DeliveryId) -> Option<DeliveryId> {
            self.deliveries
                .iter()
                .enumerate()
                .skip(prev.0 + 1)
                .find(|(_, d)| d.in_work)
                .map(|(i, _)| DeliveryId(i))
        }

        fn delivery(&self, id: DeliveryId) -> Delivery {
            let d = &self.deliveries[id.0];
            Delivery {
                id,
                link: d.link,
                role: self.links[d.link.0].role,
                writable: d.writable,
                readable: d.readable,
                updated: d.updated,
                pending: d.pending,
                partial: d.partial,
                settled: d.settled,
            }
        }
    }
}
