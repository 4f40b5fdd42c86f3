// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Transport registry and readiness loop.
//!
//! The [`Reactor`] owns a named collection of [`Transport`]s, works out
//! which of them want socket I/O, maintains the tick deadline heap, and
//! performs the single blocking wait of the whole system. One iteration of
//! the driving loop is [`wait_and_process`](Reactor::wait_and_process):
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                     wait_and_process                          |
//! |                                                               |
//! |  need_io() -------> interest sets (read / write)              |
//! |  tick heap min ---> wait bound                                |
//! |  mio::Poll::poll(bound)            <- sole blocking point     |
//! |  process_io(readable, writable):                              |
//! |      pass 1: read_input per readable transport                |
//! |      pass 2: pop + revalidate due tick entries, tick()        |
//! |      pass 3: write_output per writable transport              |
//! |  -> set of touched transports                                 |
//! +--------------------------------------------------------------+
//! ```
//!
//! The touched set is what the caller feeds through the
//! [`EndpointDispatcher`](crate::EndpointDispatcher) before looping again.
//!
//! Timer bookkeeping tolerates stale heap entries: re-arming a transport
//! never removes the old entry, it just outdates it. Every popped entry is
//! revalidated against the transport's live `next_tick` and discarded when
//! they disagree; per-transport "armed" tracking additionally keeps one
//! logical deadline from being pushed (and therefore dispatched) twice.

mod timers;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};

use crate::clock::{self, Timestamp};
use crate::error::{Error, Result};
use crate::transport::Transport;
use timers::TickHeap;

// ============================================================================
// Configuration
// ============================================================================

/// Reactor tuning knobs.
#[derive(Clone, Debug)]
pub struct ReactorConfig {
    /// Capacity of the readiness event buffer per poll call.
    pub max_events: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self { max_events: 128 }
    }
}

// ============================================================================
// Reactor
// ============================================================================

/// Per-transport registry bookkeeping.
struct Slot {
    transport: Transport,
    token: Token,
    /// Interest currently registered with the poller, if any.
    interest: Option<Interest>,
    /// Deadline currently armed on the tick heap for this transport,
    /// `0` = none. Guards against pushing one logical deadline twice.
    armed: Timestamp,
}

/// Registry of named transports plus the readiness/timer loop.
///
/// Single-threaded by design: every method runs on the caller's thread and
/// only [`wait_and_process`](Reactor::wait_and_process) blocks, bounded by
/// the earliest tick deadline (and an optional caller deadline).
pub struct Reactor {
    poll: Poll,
    events: Events,
    slots: HashMap<String, Slot>,
    names: HashMap<Token, String>,
    timers: TickHeap,
    next_token: usize,
}

impl Reactor {
    /// Reactor with default configuration.
    pub fn new() -> Result<Reactor> {
        Self::with_config(ReactorConfig::default())
    }

    /// Reactor with explicit configuration.
    pub fn with_config(config: ReactorConfig) -> Result<Reactor> {
        Ok(Reactor {
            poll: Poll::new().map_err(Error::Poll)?,
            events: Events::with_capacity(config.max_events),
            slots: HashMap::new(),
            names: HashMap::new(),
            timers: TickHeap::new(),
            next_token: 0,
        })
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register a transport under its name.
    ///
    /// Fails synchronously when the name is empty or already taken.
    pub fn add(&mut self, transport: Transport) -> Result<()> {
        if transport.name().is_empty() {
            return Err(Error::UnnamedTransport);
        }
        if self.slots.contains_key(transport.name()) {
            return Err(Error::DuplicateTransport(transport.name().to_string()));
        }

        let token = Token(self.next_token);
        self.next_token += 1;
        let name = transport.name().to_string();
        log::debug!("registered transport {:?}", name);
        self.names.insert(token, name.clone());
        self.slots.insert(
            name,
            Slot {
                transport,
                token,
                interest: None,
                armed: 0,
            },
        );
        Ok(())
    }

    /// Deregister and return the named transport.
    ///
    /// The socket is handed back untouched; removal never closes it.
    /// Tick-heap entries left behind go stale and are discarded on pop.
    pub fn remove(&mut self, name: &str) -> Result<Transport> {
        let slot = self
            .slots
            .remove(name)
            .ok_or_else(|| Error::UnknownTransport(name.to_string()))?;
        if slot.interest.is_some() {
            let fd = slot.transport.raw_fd();
            let _ = self.poll.registry().deregister(&mut SourceFd(&fd));
        }
        self.names.remove(&slot.token);
        log::debug!("removed transport {:?}", name);
        Ok(slot.transport)
    }

    /// Number of registered transports.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no transports are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when a transport is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Mutable access to a registered transport.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Transport> {
        self.slots.get_mut(name).map(|s| &mut s.transport)
    }

    /// Iterate over all registered transports (unspecified order).
    pub fn transports(&self) -> impl Iterator<Item = &Transport> {
        self.slots.values().map(|s| &s.transport)
    }

    /// True when every registered transport is [`done`](Transport::done)
    /// (vacuously true when empty). The usual loop-exit condition.
    pub fn all_done(&self) -> bool {
        self.slots.values().all(|s| s.transport.done())
    }

    // ========================================================================
    // Readiness and timers
    // ========================================================================

    /// Partition registered transports into those wanting reads and those
    /// wanting writes. A transport may appear in both lists, or neither.
    pub fn need_io(&self) -> (Vec<String>, Vec<String>) {
        let mut readable = Vec::new();
        let mut writable = Vec::new();
        for (name, slot) in &self.slots {
            if slot.transport.need_read() {
                readable.push(name.clone());
            }
            if slot.transport.need_write() {
                writable.push(name.clone());
            }
        }
        (readable, writable)
    }

    /// Earliest live tick deadline across all registered transports, or
    /// `0` when none is pending.
    ///
    /// Callers must re-enter [`process_io`](Reactor::process_io) no later
    /// than this timestamp even without socket activity. Stale heap roots
    /// (removed or re-armed transports) are discarded on the way.
    pub fn next_tick_deadline(&mut self) -> Timestamp {
        loop {
            match self.timers.peek() {
                None => return 0,
                Some(entry) => {
                    let live = self
                        .slots
                        .get(&entry.name)
                        .is_some_and(|s| s.transport.next_tick() == entry.deadline);
                    if live {
                        return entry.deadline;
                    }
                }
            }
            // Stale root: drop it and fix up the armed bookkeeping.
            if let Some(entry) = self.timers.pop() {
                if let Some(slot) = self.slots.get_mut(&entry.name) {
                    if slot.armed == entry.deadline {
                        slot.armed = 0;
                    }
                }
            }
        }
    }

    /// I/O and timer processing with the current wall clock.
    ///
    /// See [`process_io_at`](Reactor::process_io_at).
    pub fn process_io(
        &mut self,
        readable: &[String],
        writable: &[String],
    ) -> Result<BTreeSet<String>> {
        self.process_io_at(readable, writable, clock::now_ms())
    }

    /// I/O and timer processing with an explicit clock (deterministic
    /// tests, custom time sources).
    ///
    /// Three ordered passes: `read_input` for every readable transport,
    /// a sweep of due tick entries, `write_output` for every writable
    /// transport. After each read/write the transport is ticked if it has
    /// no pending deadline, and any resulting deadline is armed on the
    /// heap. Returns the de-duplicated set of transports that saw I/O or a
    /// timer fire; names not (or no longer) registered are skipped.
    ///
    /// An unrecoverable transport failure aborts the call with
    /// [`Error::Io`] naming the transport; its engine has already been
    /// notified, so the usual reaction is to [`remove`](Reactor::remove)
    /// it and re-enter the loop.
    pub fn process_io_at(
        &mut self,
        readable: &[String],
        writable: &[String],
        now: Timestamp,
    ) -> Result<BTreeSet<String>> {
        let mut touched = BTreeSet::new();

        for name in readable {
            let Some(slot) = self.slots.get_mut(name) else {
                log::debug!("process_io: unknown transport {:?}", name);
                continue;
            };
            slot.transport.read_input()?;
            if slot.transport.next_tick() == 0 {
                // The read may not have scheduled anything; let the engine
                // compute its next deadline now.
                slot.transport.tick(now);
            }
            arm_tick(&mut self.timers, slot, name);
            touched.insert(name.clone());
        }

        // Expired transport ticks.
        while let Some(entry) = self.timers.pop_due(now) {
            let Some(slot) = self.slots.get_mut(&entry.name) else {
                log::trace!("discarding tick for removed transport {:?}", entry.name);
                continue;
            };
            if slot.transport.next_tick() != entry.deadline {
                // Stale entry: the transport re-armed since this was
                // pushed. Skip without side effect.
                if slot.armed == entry.deadline {
                    slot.armed = 0;
                }
                continue;
            }
            if slot.armed == entry.deadline {
                slot.armed = 0;
            }
            slot.transport.tick(now);
            arm_tick(&mut self.timers, slot, &entry.name);
            touched.insert(entry.name);
        }

        for name in writable {
            let Some(slot) = self.slots.get_mut(name) else {
                log::debug!("process_io: unknown transport {:?}", name);
                continue;
            };
            slot.transport.write_output()?;
            if slot.transport.next_tick() == 0 {
                slot.transport.tick(now);
            }
            arm_tick(&mut self.timers, slot, name);
            touched.insert(name.clone());
        }

        Ok(touched)
    }

    /// One full reactor iteration: compute interest, block until I/O or
    /// the earliest deadline (or `deadline`, whichever comes first), then
    /// process everything that became ready.
    ///
    /// With no interest, no pending tick and no caller deadline this
    /// blocks indefinitely. Transports with neither read nor write
    /// interest and no timer are invisible to the wait until something
    /// re-arms them.
    pub fn wait_and_process(&mut self, deadline: Option<Timestamp>) -> Result<BTreeSet<String>> {
        let (readable, writable) = self.need_io();
        let read_set: HashSet<&str> = readable.iter().map(String::as_str).collect();
        let write_set: HashSet<&str> = writable.iter().map(String::as_str).collect();

        // Fold the earliest tick into the wait bound.
        let next_tick = self.next_tick_deadline();
        let mut bound = deadline;
        if next_tick != 0 {
            bound = Some(match bound {
                Some(d) => d.min(next_tick),
                None => next_tick,
            });
        }

        // Sync poller registrations with current interest.
        let registry = self.poll.registry();
        for (name, slot) in self.slots.iter_mut() {
            let wants_read = read_set.contains(name.as_str());
            let wants_write = write_set.contains(name.as_str());
            let desired = match (wants_read, wants_write) {
                (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
                (true, false) => Some(Interest::READABLE),
                (false, true) => Some(Interest::WRITABLE),
                (false, false) => None,
            };

            let fd = slot.transport.raw_fd();
            match (slot.interest, desired) {
                (None, Some(interest)) => {
                    registry
                        .register(&mut SourceFd(&fd), slot.token, interest)
                        .map_err(Error::Poll)?;
                    slot.interest = Some(interest);
                }
                (Some(_), Some(interest)) => {
                    // Reregister even when the interest is unchanged: the
                    // poller delivers edges, and a MOD re-arms them, so a
                    // partial read bounded by engine capacity cannot strand
                    // bytes in the kernel buffer until the next peer send.
                    registry
                        .reregister(&mut SourceFd(&fd), slot.token, interest)
                        .map_err(Error::Poll)?;
                    slot.interest = Some(interest);
                }
                (Some(_), None) => {
                    registry.deregister(&mut SourceFd(&fd)).map_err(Error::Poll)?;
                    slot.interest = None;
                }
                (None, None) => {}
            }
        }

        let timeout = bound.map(|d| Duration::from_millis(d.saturating_sub(clock::now_ms())));

        self.events.clear();
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                // Spurious wake; fall through with an empty readiness set
                // so due timers still fire.
                log::trace!("poll interrupted");
            }
            Err(e) => return Err(Error::Poll(e)),
        }

        let mut ready_read = Vec::new();
        let mut ready_write = Vec::new();
        for event in self.events.iter() {
            let Some(name) = self.names.get(&event.token()) else {
                continue;
            };
            let Some(slot) = self.slots.get(name) else {
                continue;
            };
            let Some(interest) = slot.interest else {
                continue;
            };
            // Hangup and error conditions fold into whichever direction we
            // were interested in, so EOF and socket failures surface
            // through the normal read/write paths.
            let failed = event.is_error();
            if interest.is_readable() && (event.is_readable() || event.is_read_closed() || failed) {
                ready_read.push(name.clone());
            }
            if interest.is_writable() && (event.is_writable() || event.is_write_closed() || failed) {
                ready_write.push(name.clone());
            }
        }

        self.process_io(&ready_read, &ready_write)
    }
}

/// Arm the transport's pending deadline on the heap, unless that exact
/// deadline is already armed.
fn arm_tick(timers: &mut TickHeap, slot: &mut Slot, name: &str) {
    let next = slot.transport.next_tick();
    if next != 0 && slot.armed != next {
        timers.push(next, name.to_string());
        slot.armed = next;
    }
}

// ============================================================================
// Tests
// ============================================================================
