// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Endpoint lifecycle state bitmask.
//!
//! Every endpoint (connection, session, link) carries one local and one
//! remote lifecycle state, each independently UNINIT, ACTIVE or CLOSED.
//! The six states are represented as bits so scan filters can express
//! conjunctions like "local ACTIVE and remote CLOSED" as a single mask.

use std::fmt;
use std::ops::BitOr;

/// Combined local/remote lifecycle state of an endpoint.
///
/// A well-formed endpoint state is exactly one `LOCAL_*` bit or-ed with
/// exactly one `REMOTE_*` bit. Filters may combine any number of bits; an
/// endpoint matches a filter when its state [`contains`](Self::contains)
/// every filter bit.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EndpointState(u8);

impl EndpointState {
    /// Local end has not been opened.
    pub const LOCAL_UNINIT: EndpointState = EndpointState(0b00_0001);
    /// Local end is open.
    pub const LOCAL_ACTIVE: EndpointState = EndpointState(0b00_0010);
    /// Local end has been closed.
    pub const LOCAL_CLOSED: EndpointState = EndpointState(0b00_0100);
    /// Remote end has not been opened.
    pub const REMOTE_UNINIT: EndpointState = EndpointState(0b00_1000);
    /// Remote end is open.
    pub const REMOTE_ACTIVE: EndpointState = EndpointState(0b01_0000);
    /// Remote end has been closed.
    pub const REMOTE_CLOSED: EndpointState = EndpointState(0b10_0000);

    /// All local bits.
    pub const LOCAL_MASK: EndpointState = EndpointState(0b00_0111);
    /// All remote bits.
    pub const REMOTE_MASK: EndpointState = EndpointState(0b11_1000);

    /// Union of two masks, usable in const context.
    pub const fn or(self, other: EndpointState) -> EndpointState {
        EndpointState(self.0 | other.0)
    }

    /// Intersection of two masks, usable in const context.
    pub const fn and(self, other: EndpointState) -> EndpointState {
        EndpointState(self.0 & other.0)
    }

    /// True when every bit of `filter` is present in `self`.
    pub const fn contains(self, filter: EndpointState) -> bool {
        self.0 & filter.0 == filter.0
    }

    /// True when no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EndpointState {
    type Output = EndpointState;

    fn bitor(self, rhs: EndpointState) -> EndpointState {
        self.or(rhs)
    }
}

impl fmt::Debug for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(EndpointState, &str); 6] = [
            (EndpointState::LOCAL_UNINIT, "LOCAL_UNINIT"),
            (EndpointState::LOCAL_ACTIVE, "LOCAL_ACTIVE"),
            (EndpointState::LOCAL_CLOSED, "LOCAL_CLOSED"),
            (EndpointState::REMOTE_UNINIT, "REMOTE_UNINIT"),
            (EndpointState::REMOTE_ACTIVE, "REMOTE_ACTIVE"),
            (EndpointState::REMOTE_CLOSED, "REMOTE_CLOSED"),
        ];

        if self.is_empty() {
            return write!(f, "EndpointState()");
        }
        write!(f, "EndpointState(")?;
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
