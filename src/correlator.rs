//! Maintains the address list and service list described in
//! `mdnssd-min.c` (`store_a`/`store_other`/`build_update`), correlating
//! inbound PTR/SRV/TXT/A records into composite service snapshots aged by
//! TTL.
use std::net::Ipv4Addr;

/// `(eol - now) > 0x7fffffff` detects expiry across the unsigned-32-bit
/// rollover without needing a monotonic clock wider than a `u32`.
const WRAP_THRESHOLD: u32 = 0x7fff_ffff;

fn is_expired(eol: u32, now: u32) -> bool {
    eol.wrapping_sub(now) > WRAP_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Current,
    Updated,
}

#[derive(Debug, Clone)]
struct AddrEntry {
    hostname: String,
    addr: Ipv4Addr,
    eol: u32,
}

#[derive(Debug, Clone)]
struct ServiceEntry {
    host: Ipv4Addr,
    name: String,
    hostname: Option<String>,
    port: u16,
    txt: Option<Vec<u8>>,
    addr: Ipv4Addr,
    /// Per-record-type expiry: [PTR, SRV, TXT].
    eol: [u32; 3],
    seen: u32,
    status: Status,
}

impl ServiceEntry {
    /// A `ServiceEntry` is considered complete iff it has a resolved
    /// address, a hostname, a nonzero port and a TXT blob.
    fn is_complete(&self) -> bool {
        self.addr != Ipv4Addr::UNSPECIFIED
            && self.hostname.is_some()
            && self.port != 0
            && self.txt.is_some()
    }

    /// hostname/port/txt present, regardless of whether the address has
    /// been joined in yet — used to decide whether an `AddrEntry` lookup
    /// is worth attempting.
    fn is_resolvable(&self) -> bool {
        self.hostname.is_some() && self.port != 0 && self.txt.is_some()
    }
}

/// A single name/value attribute parsed out of a TXT record's rdata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtAttribute {
    pub name: String,
    pub value: Option<String>,
}

/// Parses the length-prefixed-strings TXT rdata blob into attributes,
/// splitting each string on its first `=` (`mdns_parse_txt`). A string with
/// no `=` is a bare attribute with no value.
pub fn parse_txt_attributes(txt: &[u8]) -> Vec<TxtAttribute> {
    let mut attrs = Vec::new();
    let mut pos = 0usize;

    while pos < txt.len() {
        let len = txt[pos] as usize;
        pos += 1;
        if pos + len > txt.len() {
            break;
        }
        let entry = &txt[pos..pos + len];
        pos += len;

        match entry.iter().position(|&b| b == b'=') {
            Some(eq) => attrs.push(TxtAttribute {
                name: String::from_utf8_lossy(&entry[..eq]).into_owned(),
                value: Some(String::from_utf8_lossy(&entry[eq + 1..]).into_owned()),
            }),
            None => attrs.push(TxtAttribute {
                name: String::from_utf8_lossy(entry).into_owned(),
                value: None,
            }),
        }
    }

    attrs
}

/// A service snapshot handed to the caller: either a fresh/changed
/// advertisement (`expired = false`) or a tombstone for one that has timed
/// out (`expired = true`).
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub host: Ipv4Addr,
    pub name: String,
    pub hostname: String,
    pub addr: Ipv4Addr,
    pub port: u16,
    pub since: u32,
    pub expired: bool,
    pub attributes: Vec<TxtAttribute>,
}

/// The parsed rdata for a non-A record, already filtered down to the types
/// the correlator understands (`store_other`'s three cases).
#[derive(Debug, Clone)]
pub enum OtherRecord {
    Ptr { target: String },
    Srv { hostname: String, port: u16 },
    Txt { data: Vec<u8> },
}

/// Per-query correlation state (`struct context_s` in the original):
/// the active query string, the caller's TTL cap, and the address/service
/// lists.
#[derive(Debug, Default)]
pub struct Correlator {
    query: String,
    ttl_cap: u32,
    addrs: Vec<AddrEntry>,
    services: Vec<ServiceEntry>,
}

impl Correlator {
    pub fn new(query: impl Into<String>, ttl_cap: u32) -> Self {
        Correlator {
            query: query.into(),
            ttl_cap,
            addrs: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Drops both lists, as `MDNS_RESET` does via `clear_context`.
    pub fn reset(&mut self) {
        self.addrs.clear();
        self.services.clear();
    }

    fn effective_ttl(&self, record_ttl: u32) -> u32 {
        if self.ttl_cap != 0 && self.ttl_cap < record_ttl {
            self.ttl_cap
        } else {
            record_ttl
        }
    }

    fn find_service(&self, host: Ipv4Addr, name: &str) -> Option<usize> {
        self.services
            .iter()
            .position(|s| s.host == host && s.name == name)
    }

    fn find_addr(&self, hostname: &str) -> Option<usize> {
        self.addrs.iter().position(|a| a.hostname == hostname)
    }

    /// `store_a`: A records are unconditionally accepted, with no query
    /// filter, and identified by hostname alone (no responder component).
    pub fn ingest_a(&mut self, hostname: &str, addr: Ipv4Addr, ttl: u32, now: u32) {
        let eol = now.wrapping_add(self.effective_ttl(ttl));

        if let Some(i) = self.find_addr(hostname) {
            let a = &mut self.addrs[i];
            if addr != Ipv4Addr::UNSPECIFIED {
                a.addr = addr;
            }
            a.eol = eol;
            return;
        }

        self.addrs.push(AddrEntry {
            hostname: hostname.to_string(),
            addr,
            eol,
        });
    }

    /// `store_other`: PTR/SRV/TXT. `owner` is the RR's own name; for PTR
    /// records it must equal the active query exactly, for everything else
    /// it need only contain the query as a substring — a real behavior of
    /// the original matcher, not an oversight.
    pub fn ingest_other(&mut self, host: Ipv4Addr, owner: &str, record: OtherRecord, ttl: u32, now: u32) {
        let is_ptr = matches!(record, OtherRecord::Ptr { .. });
        if (is_ptr && owner != self.query) || !owner.contains(self.query.as_str()) {
            return;
        }

        let eol = now.wrapping_add(self.effective_ttl(ttl));
        let key: &str = match &record {
            OtherRecord::Ptr { target } => target.as_str(),
            OtherRecord::Srv { .. } | OtherRecord::Txt { .. } => owner,
        };

        let idx = match self.find_service(host, key) {
            Some(i) => Some(i),
            None if ttl != 0 => {
                self.services.push(ServiceEntry {
                    host,
                    name: key.to_string(),
                    hostname: None,
                    port: 0,
                    txt: None,
                    addr: Ipv4Addr::UNSPECIFIED,
                    eol: [0; 3],
                    seen: now,
                    status: Status::Current,
                });
                Some(self.services.len() - 1)
            }
            None => None,
        };

        let Some(i) = idx else { return };
        let s = &mut self.services[i];

        match record {
            OtherRecord::Ptr { .. } => {
                s.eol[0] = eol;
            }
            OtherRecord::Srv { hostname, port } => {
                if port != 0 && s.port != port {
                    s.port = port;
                    s.status = Status::Updated;
                }
                if s.hostname.as_deref() != Some(hostname.as_str()) {
                    s.hostname = Some(hostname);
                    s.status = Status::Updated;
                }
                s.eol[1] = eol;
            }
            OtherRecord::Txt { data } => {
                if s.txt.as_deref() != Some(data.as_slice()) {
                    s.txt = Some(data);
                    s.status = Status::Updated;
                }
                s.eol[2] = eol;
            }
        }

        if ttl != 0 {
            s.seen = now;
        }
    }

    /// `build_update`: ages both lists, joins resolved addresses into
    /// resolvable services, and — when `build` is true (a callback is
    /// actually registered) — returns the delta snapshots. Expired
    /// snapshots are computed before updated ones for a given entry, but
    /// the whole batch is reversed at the end to reproduce the original's
    /// head-insertion ordering, so a single entry that is both updated and
    /// expired in the same pass yields Updated before Expired.
    pub fn build_update(&mut self, now: u32, build: bool) -> Vec<Service> {
        self.addrs.retain(|a| !is_expired(a.eol, now));

        let mut snapshots = Vec::new();
        let mut i = 0;
        while i < self.services.len() {
            if self.services[i].is_resolvable() {
                if let Some(addr_idx) = self.find_addr(self.services[i].hostname.as_ref().unwrap()) {
                    let resolved = self.addrs[addr_idx].addr;
                    let s = &mut self.services[i];
                    if s.addr != resolved {
                        s.addr = resolved;
                        s.status = Status::Updated;
                    }
                }
            }

            let s = &self.services[i];
            let expired = s.eol.iter().any(|&eol| is_expired(eol, now));

            if build && expired && s.is_complete() {
                snapshots.push(snapshot(s, now, true));
            }

            if build && s.is_complete() && s.status != Status::Current {
                snapshots.push(snapshot(s, now, false));
                self.services[i].status = Status::Current;
            }

            if expired {
                self.services.remove(i);
            } else {
                i += 1;
            }
        }

        snapshots.reverse();
        snapshots
    }

    /// `get_list_mDNS`: a non-destructive read of every complete service,
    /// never marked expired, without mutating `status` or removing
    /// anything. It does not join against the address list — `addr` only
    /// reflects whatever `build_update` last resolved, so it can
    /// legitimately still be unspecified if no A record has arrived yet.
    pub fn get_list(&self, now: u32) -> Vec<Service> {
        self.services
            .iter()
            .filter(|s| s.is_complete())
            .map(|s| snapshot(s, now, false))
            .collect()
    }
}

fn snapshot(s: &ServiceEntry, now: u32, expired: bool) -> Service {
    Service {
        host: s.host,
        name: s.name.clone(),
        hostname: s.hostname.clone().unwrap_or_default(),
        addr: s.addr,
        port: s.port,
        since: now.wrapping_sub(s.seen),
        expired,
        attributes: parse_txt_attributes(s.txt.as_deref().unwrap_or(&[])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new(a, b, c, d)
    }

    fn advertise(c: &mut Correlator, host: Ipv4Addr, now: u32) {
        c.ingest_other(
            host,
            "_http._tcp.local",
            OtherRecord::Ptr { target: "foo._http._tcp.local".into() },
            120,
            now,
        );
        c.ingest_other(
            host,
            "foo._http._tcp.local",
            OtherRecord::Srv { hostname: "host1.local".into(), port: 80 },
            120,
            now,
        );
        c.ingest_other(
            host,
            "foo._http._tcp.local",
            OtherRecord::Txt { data: vec![6, b'p', b'a', b't', b'h', b'=', b'/'] },
            120,
            now,
        );
    }

    #[test]
    fn happy_path_across_two_packets() {
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host = ip(192, 0, 2, 1);

        advertise(&mut c, host, 1_000);
        assert!(c.build_update(1_000, true).is_empty());

        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);
        let delta = c.build_update(1_000, true);

        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].name, "foo._http._tcp.local");
        assert_eq!(delta[0].hostname, "host1.local");
        assert_eq!(delta[0].addr, ip(192, 0, 2, 10));
        assert_eq!(delta[0].port, 80);
        assert!(!delta[0].expired);
        assert_eq!(
            delta[0].attributes,
            vec![TxtAttribute { name: "path".into(), value: Some("/".into()) }]
        );
    }

    #[test]
    fn link_local_a_is_rejected_upstream_leaves_service_unresolved() {
        // the codec is responsible for turning a link-local A address into
        // 0.0.0.0 before it ever reaches the correlator; verify the
        // correlator still treats a 0.0.0.0 address as "not yet resolved".
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host = ip(192, 0, 2, 1);
        advertise(&mut c, host, 1_000);
        c.ingest_a("host1.local", Ipv4Addr::UNSPECIFIED, 120, 1_000);
        assert!(c.build_update(1_000, true).is_empty());
    }

    #[test]
    fn ttl_cap_expires_early() {
        let mut c = Correlator::new("_http._tcp.local", 5);
        let host = ip(192, 0, 2, 1);
        advertise(&mut c, host, 1_000);
        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);
        c.build_update(1_000, true);

        let delta = c.build_update(1_006, true);
        assert_eq!(delta.len(), 1);
        assert!(delta[0].expired);
    }

    #[test]
    fn multi_responder_independence() {
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host_a = ip(192, 0, 2, 1);
        let host_b = ip(192, 0, 2, 2);

        advertise(&mut c, host_a, 1_000);
        advertise(&mut c, host_b, 1_000);
        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);

        let delta = c.build_update(1_000, true);
        assert_eq!(delta.len(), 2);
        assert!(delta.iter().any(|s| s.host == host_a));
        assert!(delta.iter().any(|s| s.host == host_b));
    }

    #[test]
    fn ptr_filter_requires_exact_match_others_require_substring() {
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host = ip(192, 0, 2, 1);

        // PTR owner name does not equal the query exactly: rejected
        c.ingest_other(
            host,
            "_printer._http._tcp.local",
            OtherRecord::Ptr { target: "foo._http._tcp.local".into() },
            120,
            1_000,
        );
        assert!(c.get_list(1_000).is_empty());

        // SRV owner merely contains the query: accepted
        advertise(&mut c, host, 1_000);
        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);
        c.build_update(1_000, true);
        assert_eq!(c.get_list(1_000).len(), 1);
    }

    #[test]
    fn reset_drops_both_lists() {
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host = ip(192, 0, 2, 1);
        advertise(&mut c, host, 1_000);
        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);
        c.build_update(1_000, true);
        assert_eq!(c.get_list(1_000).len(), 1);

        c.reset();
        assert!(c.get_list(1_000).is_empty());
    }

    #[test]
    fn ownership_every_expired_was_previously_seen_alive() {
        let mut c = Correlator::new("_http._tcp.local", 5);
        let host = ip(192, 0, 2, 1);
        advertise(&mut c, host, 1_000);
        c.ingest_a("host1.local", ip(192, 0, 2, 10), 120, 1_000);

        let mut seen_alive = false;
        for d in c.build_update(1_000, true) {
            if !d.expired {
                seen_alive = true;
            }
        }
        assert!(seen_alive);

        for d in c.build_update(1_006, true) {
            assert!(d.expired);
            assert!(seen_alive);
        }
    }

    #[test]
    fn get_list_can_report_unresolved_address() {
        let mut c = Correlator::new("_http._tcp.local", 0);
        let host = ip(192, 0, 2, 1);
        advertise(&mut c, host, 1_000);
        // no A record ever arrives: the service is never "complete" so it
        // never surfaces via get_list either.
        assert!(c.get_list(1_000).is_empty());
    }
}
