//! Builds the outbound PTR query this crate ever sends. Grounded on
//! `original_source/mdnssd-min.c`'s `mdns_build_query_message`/`send_query`:
//! unlike the teacher's `DnsQuery`, the id is always 0 (mDNS responders
//! don't echo it back in any way this crate relies on) and there is always
//! exactly one question.
use crate::error::Result;
use crate::network_order::ToFromNetworkOrder;
use crate::rfc1035::{DNSPacketHeader, DNSQuestion, QType};

#[derive(Debug)]
pub struct DnsQuery {
    header: DNSPacketHeader,
    question: DNSQuestion,
}

impl DnsQuery {
    /// `service_type` is a `_service._proto.local`-style name, e.g.
    /// `_airplay._tcp.local`.
    pub fn new(service_type: &str) -> Result<Self> {
        let header = DNSPacketHeader { qd_count: 1, ..Default::default() };
        let question = DNSQuestion::new(service_type, QType::PTR)?;
        Ok(DnsQuery { header, question })
    }

    pub fn to_network_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.header.to_network_bytes(&mut buffer)?;
        self.question.to_network_bytes(&mut buffer)?;
        Ok(buffer)
    }
}
