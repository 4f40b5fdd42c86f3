// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Errors returned by ferrolink operations.

use std::io;

/// Errors returned by reactor and transport operations.
///
/// Registration problems (`UnnamedTransport`, `DuplicateTransport`,
/// `UnknownTransport`) are synchronous failures at the call site.
/// `Io` carries the name of the transport whose socket failed; by the time
/// it is returned the transport has already notified its engine and marked
/// the affected direction closed, so the caller only has to decide whether
/// to remove the transport.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// A transport with an empty name was passed to [`Reactor::add`].
    ///
    /// [`Reactor::add`]: crate::Reactor::add
    UnnamedTransport,
    /// A transport with this name is already registered.
    DuplicateTransport(String),
    /// No transport is registered under this name.
    UnknownTransport(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// Unrecoverable socket failure on a transport.
    Io {
        /// Name of the transport whose socket failed.
        transport: String,
        /// The underlying OS error.
        source: io::Error,
    },
    /// The readiness poll itself failed (registration or wait).
    Poll(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnnamedTransport => write!(f, "transport has no name"),
            Error::DuplicateTransport(name) => {
                write!(f, "transport name already registered: {}", name)
            }
            Error::UnknownTransport(name) => {
                write!(f, "no transport registered under name: {}", name)
            }
            Error::Io { transport, source } => {
                write!(f, "I/O failure on transport {}: {}", transport, source)
            }
            Error::Poll(e) => write!(f, "readiness poll failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            Error::Poll(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
