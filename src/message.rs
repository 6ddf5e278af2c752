//! Parses one complete mDNS message (header, questions, answer/authority/
//! additional sections) and feeds answer and additional records to a
//! [`Correlator`]. Grounded on `original_source/mdnssd-min.c`'s
//! `mdns_parse_message_net`: authority-section (NS) records are parsed only
//! far enough to keep the cursor in sync, never correlated.
use std::io::Cursor;
use std::net::Ipv4Addr;

use crate::correlator::{Correlator, OtherRecord};
use crate::error::Result;
use crate::network_order::ToFromNetworkOrder;
use crate::rfc1035::{DNSPacketHeader, DNSQuestion};
use crate::rr::{RData, ResourceRecord};

/// Parses the single mDNS message at `buffer`'s current position, advancing
/// it past the message. A UDP datagram may carry several concatenated mDNS
/// messages; call this repeatedly while bytes remain, exactly as
/// `query_mDNS`'s receive loop does.
pub fn parse_message(buffer: &mut Cursor<&[u8]>, host: Ipv4Addr, correlator: &mut Correlator, now: u32) -> Result<()> {
    let mut header = DNSPacketHeader::default();
    header.from_network_bytes(buffer)?;

    for _ in 0..header.qd_count {
        let mut question = DNSQuestion::default();
        question.from_network_bytes(buffer)?;
    }

    for _ in 0..header.an_count {
        let rr = ResourceRecord::from_network_bytes(buffer)?;
        ingest(correlator, host, rr, now);
    }

    // authority/NS records: parsed for cursor accounting only, never
    // handed to the correlator.
    for _ in 0..header.ns_count {
        ResourceRecord::from_network_bytes(buffer)?;
    }

    for _ in 0..header.ar_count {
        let rr = ResourceRecord::from_network_bytes(buffer)?;
        ingest(correlator, host, rr, now);
    }

    Ok(())
}

fn ingest(correlator: &mut Correlator, host: Ipv4Addr, rr: ResourceRecord, now: u32) {
    match rr.rdata {
        RData::A(addr) => correlator.ingest_a(&rr.name.as_name(), addr, rr.ttl, now),
        RData::Ptr(target) => correlator.ingest_other(
            host,
            &rr.name.as_name(),
            OtherRecord::Ptr { target: target.as_name() },
            rr.ttl,
            now,
        ),
        RData::Srv { port, target } => correlator.ingest_other(
            host,
            &rr.name.as_name(),
            OtherRecord::Srv { hostname: target.as_name(), port },
            rr.ttl,
            now,
        ),
        RData::Txt(data) => {
            correlator.ingest_other(host, &rr.name.as_name(), OtherRecord::Txt { data }, rr.ttl, now)
        }
        RData::Other => {}
    }
}
