// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 ferrolink contributors

//! Endpoint lifecycle dispatching.
//!
//! After the reactor reports a transport as touched, the application runs
//! the [`EndpointDispatcher`] over that connection's endpoint tree. The
//! dispatcher compares each endpoint's local/remote state against a small
//! set of filters and invokes the matching [`EndpointHandler`] callback;
//! the default handler behaviors open pending endpoints and close ones the
//! remote has closed.

mod dispatcher;
mod handler;
mod state;

pub use dispatcher::{EndpointDispatcher, NEED_CLOSE, NEED_INIT};
pub use handler::EndpointHandler;
pub use state::EndpointState;
