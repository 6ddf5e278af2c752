//! A minimal multicast DNS / DNS-Service-Discovery client: browse a service
//! type on the local network and get back live `Service` snapshots as
//! responders advertise, update and expire.
//!
//! Grounded on `original_source/mdnssd-min.c`, restructured around an
//! `Arc<Handle>` instead of the original's `init`/`close` pointer pair —
//! `init` returns the handle, `close` marks it inert, and the socket is
//! actually freed once the last clone drops.
pub mod correlator;
pub mod engine;
pub mod error;
mod macros;
pub mod message;
pub mod network_order;
pub mod query;
pub mod rfc1035;
pub mod rr;
pub mod util;

use std::net::Ipv4Addr;
use std::sync::Arc;

pub use correlator::{Service, TxtAttribute};
pub use engine::{Control, Handle};
pub use error::{DnsSdError, Result};

/// `init_mDNS`: opens and binds the multicast socket on `interface_addr`.
pub fn init(interface_addr: Ipv4Addr, debug: bool) -> Result<Arc<Handle>> {
    engine::init(interface_addr, debug)
}

/// `query_mDNS`: browses `service_type` (a `_service._proto.local`-style
/// name) until `runtime_seconds` elapses (0 = forever), the loop is
/// suspended or the handle is closed. `ttl_cap` (0 = no cap) bounds how long
/// an advertisement is believed past its actual TTL. `callback` receives
/// each non-empty delta of [`Service`] snapshots and returns `true` to stop
/// the loop early.
///
/// Unlike the original's `void *cookie` parameter, the callback closure
/// captures whatever state it needs directly. There is also no `free_list`
/// counterpart: the `&[Service]` slice is owned by the loop for the
/// duration of the call and dropped normally afterward.
pub fn query(
    handle: &Handle,
    service_type: &str,
    ttl_cap: u32,
    runtime_seconds: u32,
    callback: impl FnMut(&[Service]) -> bool,
) -> Result<bool> {
    handle.query(service_type, ttl_cap, runtime_seconds, callback)
}

/// `control_mDNS`.
pub fn control(handle: &Handle, request: Control) {
    handle.control(request)
}

/// `close_mDNS`.
pub fn close(handle: &Handle) {
    handle.close()
}

/// `get_list_mDNS`: a snapshot of currently complete services, without
/// disturbing whatever `query` loop may or may not be running.
pub fn get_list(handle: &Handle) -> Vec<Service> {
    handle.get_list()
}
