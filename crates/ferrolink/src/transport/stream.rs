// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Byte-stream abstraction over the socket.
//!
//! The [`Transport`](crate::Transport) never touches `std::net` types
//! directly; it drives a [`ByteStream`], which unifies plain TCP with test
//! doubles (and leaves room for wrapped streams downstream). The trait is
//! designed for non-blocking I/O: reads and writes surface `WouldBlock`
//! rather than parking the thread, and the raw descriptor is exposed for
//! registration with `mio::Poll`.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use std::os::unix::io::{AsRawFd, RawFd};

use socket2::{Domain, Protocol, Socket, Type};

/// Abstraction over byte-oriented streams.
///
/// Implementations must be non-blocking once
/// [`set_nonblocking`](Self::set_nonblocking) has been applied; the
/// transport layer relies on `WouldBlock` to mean "no progress", never
/// "wait".
pub trait ByteStream: Read + Write + Send {
    /// Shut down one or both directions of the stream.
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()>;

    /// Local address of this stream.
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Peer address of this stream.
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Switch non-blocking mode.
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Take a pending error from the socket (e.g. a failed non-blocking
    /// connect).
    fn take_error(&self) -> io::Result<Option<io::Error>>;

    /// Raw file descriptor, used for registering with `mio::Poll`.
    fn as_raw_fd(&self) -> RawFd;
}

// ============================================================================
// TcpStream implementation
// ============================================================================

impl ByteStream for TcpStream {
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        TcpStream::shutdown(self, how)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }

    fn take_error(&self) -> io::Result<Option<io::Error>> {
        TcpStream::take_error(self)
    }

    fn as_raw_fd(&self) -> RawFd {
        AsRawFd::as_raw_fd(self)
    }
}

// ============================================================================
// Boxed ByteStream
// ============================================================================

/// Type alias for a boxed ByteStream.
pub type BoxedByteStream = Box<dyn ByteStream>;

impl ByteStream for BoxedByteStream {
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        (**self).shutdown(how)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        (**self).peer_addr()
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        (**self).set_nonblocking(nonblocking)
    }

    fn take_error(&self) -> io::Result<Option<io::Error>> {
        (**self).take_error()
    }

    fn as_raw_fd(&self) -> RawFd {
        (**self).as_raw_fd()
    }
}

// ============================================================================
// Non-blocking connect
// ============================================================================

/// Start a non-blocking TCP connect to `addr`.
///
/// Returns a stream whose connect may still be in progress; hand it to
/// [`Transport::new`](crate::Transport::new) and let the reactor drive it.
/// The connect outcome surfaces through the first read/write readiness
/// (check [`ByteStream::take_error`] on failure suspicion).
pub fn connect(addr: SocketAddr) -> io::Result<TcpStream> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;

    match socket.connect(&addr.into()) {
        Ok(()) => {}
        // Non-blocking connect in progress; completion arrives via poll.
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {}
        Err(e) => return Err(e),
    }

    Ok(socket.into())
}

// ============================================================================
// Test mock stream
// ============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        read_data: VecDeque<u8>,
        write_data: Vec<u8>,
        disconnected: bool,
        shutdown_read: bool,
        shutdown_write: bool,
        read_error: Option<io::ErrorKind>,
        write_error: Option<io::ErrorKind>,
        write_zero: bool,
    }

    /// Mock byte stream for testing.
    ///
    /// All state lives behind a shared handle, so a clone kept by the test
    /// still observes (and scripts) a stream that has been boxed into a
    /// transport. Provides buffered read data, write capture, per-direction
    /// shutdown tracking, and error injection.
    #[derive(Clone)]
    pub struct MockStream {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockStream {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner::default())),
            }
        }

        /// Add data to the read buffer.
        pub fn feed_read_data(&self, data: &[u8]) {
            self.inner.lock().unwrap().read_data.extend(data);
        }

        /// Get all data written to this stream.
        pub fn written_data(&self) -> Vec<u8> {
            self.inner.lock().unwrap().write_data.clone()
        }

        /// Inject an error on the next read.
        pub fn inject_read_error(&self, kind: io::ErrorKind) {
            self.inner.lock().unwrap().read_error = Some(kind);
        }

        /// Inject an error on the next write.
        pub fn inject_write_error(&self, kind: io::ErrorKind) {
            self.inner.lock().unwrap().write_error = Some(kind);
        }

        /// Make the next write report zero bytes accepted.
        pub fn inject_write_zero(&self) {
            self.inner.lock().unwrap().write_zero = true;
        }

        /// Simulate the peer closing the connection (reads return EOF).
        pub fn disconnect(&self) {
            self.inner.lock().unwrap().disconnected = true;
        }

        pub fn read_is_shutdown(&self) -> bool {
            self.inner.lock().unwrap().shutdown_read
        }

        pub fn write_is_shutdown(&self) -> bool {
            self.inner.lock().unwrap().shutdown_write
        }
    }

    impl Default for MockStream {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(kind) = inner.read_error.take() {
                return Err(io::Error::new(kind, "injected error"));
            }
            if inner.disconnected {
                return Ok(0); // EOF
            }
            if inner.read_data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "would block"));
            }

            let to_read = buf.len().min(inner.read_data.len());
            for (i, byte) in inner.read_data.drain(..to_read).enumerate() {
                buf[i] = byte;
            }
            Ok(to_read)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(kind) = inner.write_error.take() {
                return Err(io::Error::new(kind, "injected error"));
            }
            if inner.write_zero {
                inner.write_zero = false;
                return Ok(0);
            }
            if inner.disconnected {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "not connected"));
            }
            inner.write_data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteStream for MockStream {
        fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
            let mut inner = self.inner.lock().unwrap();
            match how {
                Shutdown::Read => inner.shutdown_read = true,
                Shutdown::Write => inner.shutdown_write = true,
                Shutdown::Both => {
                    inner.shutdown_read = true;
                    inner.shutdown_write = true;
                }
            }
            Ok(())
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:12345".parse().unwrap())
        }

        fn peer_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:54321".parse().unwrap())
        }

        fn set_nonblocking(&self, _nonblocking: bool) -> io::Result<()> {
            Ok(())
        }

        fn take_error(&self) -> io::Result<Option<io::Error>> {
            Ok(None)
        }

        fn as_raw_fd(&self) -> RawFd {
            -1 // Invalid FD for mock
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
