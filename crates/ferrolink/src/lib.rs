// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! # ferrolink: reactor and endpoint dispatcher for protocol engines
//!
//! A single-threaded reactor that drives many concurrent protocol
//! connections over non-blocking sockets, paired with a dispatcher that
//! walks each connection's endpoint tree (connection → sessions → links →
//! deliveries) and notifies an application handler of lifecycle
//! transitions.
//!
//! ferrolink owns no wire protocol: every connection plugs in a
//! [`ProtocolEngine`] (frame encoding/decoding, handshakes, flow control
//! live there) and the core restricts itself to the hard plumbing:
//! readiness multiplexing, per-connection tick scheduling, and a generic
//! state-transition scan that stays correct regardless of which engine
//! sits underneath.
//!
//! ## Driving loop
//!
//! ```ignore
//! use ferrolink::{EndpointDispatcher, Reactor, Transport};
//!
//! let mut reactor = Reactor::new()?;
//! let stream = ferrolink::connect(addr)?;
//! reactor.add(Transport::new("broker", Box::new(stream), engine)?)?;
//!
//! let mut dispatcher = EndpointDispatcher::new();
//! while !reactor.all_done() {
//!     // Sole blocking point: waits for socket readiness or the next
//!     // engine tick deadline.
//!     let touched = reactor.wait_and_process(None)?;
//!     for name in touched {
//!         // Ask the engine for its endpoint tree and scan it.
//!         dispatcher.process(&mut connection_of(&name), &mut handler);
//!     }
//! }
//! # Ok::<(), ferrolink::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Application                           |
//! |        EndpointHandler callbacks (open/close/delivery)       |
//! +--------------------------------------------------------------+
//! |  EndpointDispatcher   | scans engine endpoint trees          |
//! +--------------------------------------------------------------+
//! |  Reactor              | readiness wait, tick heap, touch set |
//! |  Transport            | socket <-> engine byte plumbing      |
//! +--------------------------------------------------------------+
//! |  ProtocolEngine (external: framing, SASL, AMQP semantics)    |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Reactor`] | Named transport registry, readiness wait, timers |
//! | [`Transport`] | One socket plus one protocol engine |
//! | [`EndpointDispatcher`] | Per-connection lifecycle scan |
//! | [`EndpointHandler`] | Application callbacks with default choreography |
//! | [`ProtocolEngine`] / [`EngineConnection`] | Contracts an engine implements |
//!
//! ## Scope
//!
//! Single-threaded and cooperative: no internal locking, no async runtime,
//! one blocking point. TLS, wire formats and message construction belong
//! to the engine or the application, not to this crate.

mod clock;
/// Endpoint lifecycle dispatching.
pub mod endpoint;
/// Contracts implemented by protocol engines.
pub mod engine;
mod error;
/// Transport registry and readiness loop.
pub mod reactor;
/// Socket-to-engine plumbing.
pub mod transport;

pub use clock::{now_ms, Timestamp};
pub use endpoint::{EndpointDispatcher, EndpointHandler, EndpointState, NEED_CLOSE, NEED_INIT};
pub use engine::{
    Delivery, DeliveryId, EngineConnection, LinkId, LinkRole, Negotiation, ProtocolEngine,
    SessionId,
};
pub use error::{Error, Result};
pub use reactor::{Reactor, ReactorConfig};
pub use transport::{connect, BoxedByteStream, ByteStream, Transport};
