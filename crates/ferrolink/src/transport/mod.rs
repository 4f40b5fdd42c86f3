// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Socket-to-engine plumbing for one connection.
//!
//! A [`Transport`] pairs one non-blocking [`ByteStream`] with one
//! [`ProtocolEngine`] and moves bytes between them on demand:
//! [`read_input`](Transport::read_input) feeds received bytes into the
//! engine, [`write_output`](Transport::write_output) drains the engine's
//! pending output to the socket. The two directions close independently
//! (the reactor keeps flushing buffered egress after the peer half-closes
//! its write side, and vice versa), and the transport is `done` only once
//! both halves have closed.
//!
//! Error policy: `WouldBlock`/`Interrupted` are not failures, just "no
//! progress this call". A zero-byte read (or a zero-byte write acceptance)
//! means the peer closed that direction. Anything else is unrecoverable:
//! the engine is notified and the direction marked closed *before* the
//! error propagates, so observable state stays consistent.

mod stream;

#[cfg(test)]
pub(crate) use stream::mock;
pub use stream::{connect, BoxedByteStream, ByteStream};

use std::net::Shutdown;
use std::os::unix::io::RawFd;

use crate::clock::Timestamp;
use crate::engine::ProtocolEngine;
use crate::error::{Error, Result};

/// Upper bound on a single receive, even when the engine advertises a
/// larger ingress window.
const MAX_RECV_CHUNK: usize = 64 * 1024;

/// One named connection: socket plus protocol engine.
///
/// Created from an already-connected (or still-connecting) stream; the
/// stream is switched to non-blocking mode on construction. Register the
/// transport with a [`Reactor`](crate::Reactor) to have its I/O and timers
/// driven.
pub struct Transport {
    name: String,
    stream: BoxedByteStream,
    engine: Box<dyn ProtocolEngine>,
    read_done: bool,
    write_done: bool,
    next_tick: Timestamp,
    recv_buf: Vec<u8>,
}

impl Transport {
    /// Wrap `stream` and `engine` under `name`.
    ///
    /// Names identify transports inside a reactor and must be unique and
    /// non-empty there; uniqueness is checked at
    /// [`Reactor::add`](crate::Reactor::add) time, not here.
    pub fn new(
        name: impl Into<String>,
        stream: BoxedByteStream,
        engine: Box<dyn ProtocolEngine>,
    ) -> Result<Transport> {
        let name = name.into();
        stream.set_nonblocking(true).map_err(|source| Error::Io {
            transport: name.clone(),
            source,
        })?;
        Ok(Transport {
            name,
            stream,
            engine,
            read_done: false,
            write_done: false,
            next_tick: 0,
            recv_buf: Vec::new(),
        })
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Name this transport was created under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The protocol engine driving this connection.
    pub fn engine(&self) -> &dyn ProtocolEngine {
        &*self.engine
    }

    /// Mutable access to the protocol engine.
    pub fn engine_mut(&mut self) -> &mut dyn ProtocolEngine {
        &mut *self.engine
    }

    /// The underlying byte stream.
    pub fn stream(&self) -> &dyn ByteStream {
        &*self.stream
    }

    /// True once the read side has closed (peer EOF, engine refusal, or
    /// read failure).
    pub fn read_closed(&self) -> bool {
        self.read_done
    }

    /// True once the write side has closed.
    pub fn write_closed(&self) -> bool {
        self.write_done
    }

    /// True exactly when both directions have closed.
    pub fn done(&self) -> bool {
        self.read_done && self.write_done
    }

    /// Deadline cached by the last [`tick`](Transport::tick), `0` if none.
    pub fn next_tick(&self) -> Timestamp {
        self.next_tick
    }

    /// True when the engine wants more input and the read side is open.
    pub fn need_read(&self) -> bool {
        !self.read_done && self.engine.capacity() > 0
    }

    /// True when the engine has output pending and the write side is open.
    pub fn need_write(&self) -> bool {
        !self.write_done && self.engine.pending() > 0
    }

    /// Raw descriptor for poll registration.
    pub fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    // ========================================================================
    // I/O
    // ========================================================================

    /// Read from the socket and feed the engine.
    ///
    /// Returns `Ok(Some(n))` with the number of bytes pushed (`0` when the
    /// engine had no capacity or the read would block), `Ok(None)` when the
    /// read side is (now) closed, and `Err` on an unrecoverable socket
    /// failure, by which point the engine's tail has been closed and the
    /// read side marked done.
    pub fn read_input(&mut self) -> Result<Option<usize>> {
        if self.read_done {
            return Ok(None);
        }

        let capacity = self.engine.capacity();
        if capacity < 0 {
            // Engine is done taking input; half-close is best-effort.
            let _ = self.stream.shutdown(Shutdown::Read);
            self.read_done = true;
            log::debug!("{}: engine closed ingress, read side shut down", self.name);
            return Ok(None);
        }
        if capacity == 0 {
            return Ok(Some(0));
        }

        let want = (capacity as usize).min(MAX_RECV_CHUNK);
        self.recv_buf.resize(want, 0);
        match self.stream.read(&mut self.recv_buf) {
            Ok(0) => {
                // Peer closed the connection.
                log::debug!("{}: peer closed ingress", self.name);
                self.engine.close_tail();
                self.read_done = true;
                Ok(None)
            }
            Ok(n) => {
                self.engine.push(&self.recv_buf[..n]);
                log::trace!("{}: read {} bytes", self.name, n);
                Ok(Some(n))
            }
            Err(e) if is_transient(&e) => Ok(Some(0)),
            Err(e) => {
                // Unrecoverable: leave the engine consistent, then report.
                self.engine.close_tail();
                self.read_done = true;
                Err(Error::Io {
                    transport: self.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Drain the engine's pending output to the socket.
    ///
    /// Returns `Ok(Some(n))` with the number of bytes written (`0` when
    /// nothing was pending or the write would block), `Ok(None)` when the
    /// write side is (now) closed, and `Err` on an unrecoverable socket
    /// failure, by which point the engine's head has been closed and the
    /// write side marked done.
    pub fn write_output(&mut self) -> Result<Option<usize>> {
        if self.write_done {
            return Ok(None);
        }

        let pending = self.engine.pending();
        if pending < 0 {
            // Engine egress finished; half-close is best-effort.
            let _ = self.stream.shutdown(Shutdown::Write);
            self.write_done = true;
            log::debug!("{}: engine egress done, write side shut down", self.name);
            return Ok(None);
        }
        if pending == 0 {
            return Ok(Some(0));
        }

        let result = self.stream.write(self.engine.peek(pending as usize));
        match result {
            Ok(0) => {
                // Peer stopped accepting output.
                log::debug!("{}: peer closed egress", self.name);
                self.engine.close_head();
                self.write_done = true;
                Ok(None)
            }
            Ok(n) => {
                self.engine.pop(n);
                log::trace!("{}: wrote {} bytes", self.name, n);
                Ok(Some(n))
            }
            Err(e) if is_transient(&e) => Ok(Some(0)),
            Err(e) => {
                self.engine.close_head();
                self.write_done = true;
                Err(Error::Io {
                    transport: self.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Run the engine's periodic maintenance and cache the returned
    /// deadline (`0` = none pending).
    pub fn tick(&mut self, now: Timestamp) -> Timestamp {
        self.next_tick = self.engine.tick(now);
        self.next_tick
    }
}

/// Would-block and interrupted conditions are "no progress", not errors.
fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}

// ============================================================================
// Tests
// ============================================================================
