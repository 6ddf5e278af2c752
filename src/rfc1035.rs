//! Base structures for DNS messages, restricted to what mDNS/DNS-SD discovery
//! needs: https://datatracker.ietf.org/doc/html/rfc1035
//!
//! Wire (de)serialization for these structures lives in `network_order::dns`.
use std::convert::TryFrom;
use std::fmt;

use crate::error::{DnsSdError, Result};

/// Matches the original mdnssd-min.h `MAX_DEREFERENCE_COUNT`: an upper bound
/// on compression-pointer chasing so a malformed or looping message can
/// never hang the parser.
pub const MAX_DEREFERENCE_COUNT: u32 = 40;

/// Matches `DNS_MAX_HOSTNAME_LENGTH`: the outbound query-build limit. A
/// `service_type` assembled into a question name longer than this fails the
/// query build (`mdns_pack_question`).
pub const DNS_MAX_HOSTNAME_LENGTH: usize = 253;

/// Matches `MAX_RR_NAME_SIZE` (`mdnssd-min.h`): the inbound decompressed
/// RR-name limit enforced by `parse_rr_name`, distinct from and larger than
/// [`DNS_MAX_HOSTNAME_LENGTH`].
pub const MAX_RR_NAME_SIZE: usize = 256;

// DNS packet header: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Debug, Default, Clone, Copy)]
pub struct DNSPacketHeader {
    pub id: u16,
    pub flags: DNSPacketFlags,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

// Flags: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
//                               1  1  1  1  1  1
// 0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
#[derive(Debug, Default, Clone, Copy)]
pub struct DNSPacketFlags {
    pub packet_type: PacketType,
    pub op_code: OpCode,
    pub authorative_answer: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub response_code: ResponseCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PacketType {
    #[default]
    Query = 0,
    Response = 1,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PacketType::Query => write!(f, "QUERY"),
            PacketType::Response => write!(f, "RESPONSE"),
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ();
    fn try_from(v: u8) -> std::result::Result<Self, ()> {
        match v {
            0 => Ok(PacketType::Query),
            1 => Ok(PacketType::Response),
            _ => Err(()),
        }
    }
}

// op codes: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OpCode {
    #[default]
    Query = 0,
    IQuery = 1,
    Status = 2,
}

impl TryFrom<u8> for OpCode {
    type Error = ();
    fn try_from(v: u8) -> std::result::Result<Self, ()> {
        match v {
            0 => Ok(OpCode::Query),
            1 => Ok(OpCode::IQuery),
            2 => Ok(OpCode::Status),
            _ => Err(()),
        }
    }
}

// response codes: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ResponseCode {
    #[default]
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NXDomain = 3,
    NotImp = 4,
    Refused = 5,
}

impl TryFrom<u8> for ResponseCode {
    type Error = ();
    fn try_from(v: u8) -> std::result::Result<Self, ()> {
        match v {
            0 => Ok(ResponseCode::NoError),
            1 => Ok(ResponseCode::FormErr),
            2 => Ok(ResponseCode::ServFail),
            3 => Ok(ResponseCode::NXDomain),
            4 => Ok(ResponseCode::NotImp),
            5 => Ok(ResponseCode::Refused),
            _ => Err(()),
        }
    }
}

// RR type codes: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
// trimmed to the types mDNS/DNS-SD discovery actually consumes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum QType {
    #[default]
    A = 1,
    CNAME = 5,
    PTR = 12,
    TXT = 16,
    SRV = 33,
    /// anything else observed on the wire: consumed for cursor accounting,
    /// never handed to the correlator.
    Other(u16),
}

impl TryFrom<u16> for QType {
    type Error = ();
    fn try_from(v: u16) -> std::result::Result<Self, ()> {
        Ok(match v {
            1 => QType::A,
            5 => QType::CNAME,
            12 => QType::PTR,
            16 => QType::TXT,
            33 => QType::SRV,
            other => QType::Other(other),
        })
    }
}

impl From<QType> for u16 {
    fn from(t: QType) -> u16 {
        match t {
            QType::A => 1,
            QType::CNAME => 5,
            QType::PTR => 12,
            QType::TXT => 16,
            QType::SRV => 33,
            QType::Other(v) => v,
        }
    }
}

// RR Class values: https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.4
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum QClass {
    #[default]
    IN = 1,
    Any = 255,
}

impl TryFrom<u16> for QClass {
    type Error = ();
    fn try_from(v: u16) -> std::result::Result<Self, ()> {
        // RFC6762 section 18.12: the top bit of qclass is repurposed as the
        // "unicast response requested" flag on questions, and as the
        // "cache-flush" bit on records; mask it off before matching.
        match v & 0x7FFF {
            1 => Ok(QClass::IN),
            255 => Ok(QClass::Any),
            _ => Err(()),
        }
    }
}

impl From<QClass> for u16 {
    fn from(c: QClass) -> u16 {
        match c {
            QClass::IN => 1,
            QClass::Any => 255,
        }
    }
}

// Domain name: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct DomainName {
    pub labels: Vec<String>,
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{}.", label)?;
        }
        if self.labels.is_empty() {
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl DomainName {
    /// Joins labels with `.` and no trailing dot, matching
    /// `parse_rr_name`'s output format. The correlator keys and compares
    /// owner/instance names in this form, not `Display`'s zone-file style.
    pub fn as_name(&self) -> String {
        self.labels.join(".")
    }
}

/// ```
/// use mdns_sd::rfc1035::DomainName;
/// use std::convert::TryFrom;
///
/// let dn = DomainName::try_from("www.example.com").unwrap();
/// assert_eq!(dn.to_string(), "www.example.com.");
/// assert!(DomainName::try_from("").is_err());
/// ```
impl TryFrom<&str> for DomainName {
    type Error = DnsSdError;

    fn try_from(domain: &str) -> Result<Self> {
        if domain.is_empty() {
            return Err(DnsSdError::protocol("empty domain name"));
        }

        if domain.len() + 1 > DNS_MAX_HOSTNAME_LENGTH {
            return Err(DnsSdError::protocol("domain name exceeds DNS_MAX_HOSTNAME_LENGTH"));
        }

        let labels: Vec<String> = domain
            .split('.')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(DomainName { labels })
    }
}

//--------------------------------------------------------------------------------
// Question structure: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
//--------------------------------------------------------------------------------
#[derive(Debug, Default, Clone)]
pub struct DNSQuestion {
    pub name: DomainName,
    pub r#type: QType,
    pub class: QClass,
    /// RFC6762 section 5.4: set on outbound PTR queries to ask for a
    /// unicast reply; this crate never honors it on its own received
    /// questions, it only shapes what this crate asks for.
    pub prefer_unicast_response: bool,
}

impl DNSQuestion {
    pub fn new(domain: &str, qtype: QType) -> Result<Self> {
        Ok(DNSQuestion {
            name: DomainName::try_from(domain)?,
            r#type: qtype,
            class: QClass::IN,
            prefer_unicast_response: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_name_over_dns_max_hostname_length_is_rejected() {
        let long = "_".to_string() + &"x".repeat(DNS_MAX_HOSTNAME_LENGTH) + "._tcp.local";
        assert!(DomainName::try_from(long.as_str()).is_err());
    }

    #[test]
    fn domain_name_at_dns_max_hostname_length_is_accepted() {
        let name = "x".repeat(DNS_MAX_HOSTNAME_LENGTH - 1);
        assert!(DomainName::try_from(name.as_str()).is_ok());
    }
}
