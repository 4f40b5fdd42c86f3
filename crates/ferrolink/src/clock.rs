// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Wall-clock timestamps for engine tick scheduling.
//!
//! Deadlines are absolute milliseconds since the Unix epoch, with `0`
//! reserved to mean "no deadline". Engines receive and return these values
//! through [`ProtocolEngine::tick`](crate::ProtocolEngine::tick).

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. `0` means "none".
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> Timestamp {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as Timestamp,
        // Clock set before the epoch; treat as the epoch rather than panic.
        Err(_) => 0,
    }
}
