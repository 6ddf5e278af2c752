//! The running mDNS query loop: socket setup, periodic re-query, receive
//! loop and the Idle/Running state machine. Grounded on
//! `original_source/mdnssd-min.c`'s `init_mDNS`/`query_mDNS`/`control_mDNS`/
//! `close_mDNS`.
//!
//! Rust's `Arc`/`Drop` already give safe reference-counted teardown, so
//! unlike the original's manual `free(handle)`, `close` here only signals
//! the loop and resets the correlator; the socket itself is freed when the
//! last `Handle` clone is dropped.
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;
use socket2::{Domain, Protocol, Socket, Type};

use crate::correlator::{Correlator, Service};
use crate::error::{DnsSdError, Result};
use crate::message::parse_message;
use crate::query::DnsQuery;

pub const MDNS_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_PORT: u16 = 5353;
pub const MULTICAST_TTL: u32 = 32;
const REQUERY_INTERVAL_SECS: u32 = 20;
const SELECT_TICK: Duration = Duration::from_millis(50);
const RECV_BUFFER_SIZE: usize = 32 * 1024;

/// `control_mDNS`'s three requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    None,
    Reset,
    Suspend,
}

/// Mirrors the original's single `state` field: it is the only thing
/// `close` and the running loop's tail both read and write, and that single
/// shared flag is what lets them agree on which side performs cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
}

struct Shared {
    state: RunState,
    control: Control,
    correlator: Correlator,
}

/// A handle returned by [`init`]. Cloning it (via `Arc`) is how `control`
/// and `close` reach a `query` loop running on another thread.
pub struct Handle {
    socket: UdpSocket,
    debug: bool,
    /// Fixed at `init` time so every `now` value — inside `query`'s loop or
    /// from a standalone `get_list` call — shares one clock basis.
    epoch: Instant,
    shared: Mutex<Shared>,
    /// Set once `close` has run; further `query`/`control` calls become
    /// no-ops. Checked outside the `Mutex` so a closed handle never even
    /// takes the lock.
    closed: AtomicBool,
}

/// `init_mDNS`: opens and configures the multicast socket. Returns `Err`
/// instead of a null handle on any setup failure.
pub fn init(interface_addr: Ipv4Addr, debug: bool) -> Result<Arc<Handle>> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    // not available on every platform; best-effort only.
    let _ = socket.set_reuse_port(true);
    socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
    socket.set_multicast_loop_v4(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT);
    socket.bind(&bind_addr.into())?;
    socket.set_multicast_if_v4(&interface_addr)?;
    socket.join_multicast_v4(&MDNS_ADDR, &interface_addr)?;
    socket.set_read_timeout(Some(SELECT_TICK))?;

    let socket: UdpSocket = socket.into();
    debug!("mdns socket bound on {:?}, interface {}", bind_addr, interface_addr);

    Ok(Arc::new(Handle {
        socket,
        debug,
        epoch: Instant::now(),
        shared: Mutex::new(Shared {
            state: RunState::Idle,
            control: Control::None,
            correlator: Correlator::new("", 0),
        }),
        closed: AtomicBool::new(false),
    }))
}

fn now_secs(epoch: Instant) -> u32 {
    epoch.elapsed().as_secs() as u32
}

impl Handle {
    /// `query_mDNS`: runs the receive loop for `service_type` until
    /// `runtime_seconds` elapses (0 = forever), `control(Suspend)` or
    /// `close` is called, or the socket errors. Invokes `callback` with
    /// each non-empty delta; if `callback` returns `true` the loop stops.
    pub fn query(
        &self,
        service_type: &str,
        ttl_cap: u32,
        runtime_seconds: u32,
        mut callback: impl FnMut(&[Service]) -> bool,
    ) -> Result<bool> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(false);
        }

        if !service_type.starts_with('_') {
            return Ok(false);
        }

        {
            let mut shared = self.shared.lock().unwrap();
            shared.correlator = Correlator::new(service_type, ttl_cap);
            shared.state = RunState::Running;
            shared.control = Control::None;
        }

        let query = DnsQuery::new(service_type)?;
        let query_bytes = query.to_network_bytes()?;
        let dest = SocketAddrV4::new(MDNS_ADDR, MDNS_PORT);

        let start = now_secs(self.epoch);
        let deadline = if runtime_seconds == 0 { None } else { Some(start.wrapping_add(runtime_seconds)) };
        // forces an immediate send on the first iteration.
        let mut last_query_sent: u32 = start.wrapping_sub(REQUERY_INTERVAL_SECS + 1);
        let mut recv_buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let now = now_secs(self.epoch);

            if now.wrapping_sub(last_query_sent) >= REQUERY_INTERVAL_SECS {
                self.socket.send_to(&query_bytes, dest)?;
                last_query_sent = now;
                debug!("sent mdns query for {}", service_type);
            }

            // step 3: wait for readability with a 50ms timeout (the socket's
            // read timeout, set in `init`).
            let recv_result = self.socket.recv_from(&mut recv_buf);

            // step 4: re-check exit conditions with whatever state a
            // concurrent `control`/`close` call may have set while we waited.
            let runtime_elapsed = deadline.map(|d| now > d).unwrap_or(false);
            let (was_idle, suspend_requested) = {
                let shared = self.shared.lock().unwrap();
                (shared.state == RunState::Idle, shared.control == Control::Suspend)
            };
            if was_idle || suspend_requested || runtime_elapsed {
                let mut shared = self.shared.lock().unwrap();
                if !was_idle {
                    shared.state = RunState::Idle;
                }
                shared.control = Control::None;
                return Ok(true);
            }

            // step 5: a pending Reset clears the context and forces a
            // re-query next iteration.
            {
                let mut shared = self.shared.lock().unwrap();
                if shared.control == Control::Reset {
                    shared.correlator.reset();
                    shared.control = Control::None;
                    last_query_sent = now.wrapping_sub(REQUERY_INTERVAL_SECS + 3600);
                }
            }

            match recv_result {
                Ok((len, std::net::SocketAddr::V4(from))) => {
                    let host = *from.ip();
                    let mut cursor = std::io::Cursor::new(&recv_buf[..len]);
                    while (cursor.position() as usize) < len {
                        let mut shared = self.shared.lock().unwrap();
                        if parse_message(&mut cursor, host, &mut shared.correlator, now).is_err() {
                            break;
                        }
                    }

                    let delta = {
                        let mut shared = self.shared.lock().unwrap();
                        shared.correlator.build_update(now, true)
                    };
                    if !delta.is_empty() {
                        let stop = callback(&delta);
                        if stop {
                            let mut shared = self.shared.lock().unwrap();
                            shared.state = RunState::Idle;
                            shared.control = Control::None;
                            return Ok(true);
                        }
                    }
                }
                Ok((_, std::net::SocketAddr::V6(_))) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    let mut shared = self.shared.lock().unwrap();
                    shared.state = RunState::Idle;
                    shared.control = Control::None;
                    return Err(DnsSdError::from(e));
                }
            }
        }
    }

    /// `control_mDNS`: outside `Running`, `Reset` clears the context in
    /// place and `Suspend` is a no-op.
    pub fn control(&self, request: Control) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut shared = self.shared.lock().unwrap();
        match (shared.state, request) {
            (RunState::Running, _) => shared.control = request,
            (RunState::Idle, Control::Reset) => shared.correlator.reset(),
            (RunState::Idle, _) => {}
        }
    }

    /// `close_mDNS`: if Idle, cleans up immediately; if Running, signals
    /// Idle and lets the loop's own tail perform the cleanup.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut shared = self.shared.lock().unwrap();
        if shared.state == RunState::Idle {
            shared.correlator.reset();
        } else {
            shared.state = RunState::Idle;
        }
    }

    /// `get_list_mDNS`: a non-destructive snapshot of currently complete
    /// services.
    pub fn get_list(&self) -> Vec<Service> {
        if self.closed.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let shared = self.shared.lock().unwrap();
        shared.correlator.get_list(now_secs(self.epoch))
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}
