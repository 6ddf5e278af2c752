//! Resource record parsing, restricted to the RFC1035/RFC6762 shapes
//! mDNS/DNS-SD discovery needs: A, PTR, SRV, TXT. Grounded on
//! `original_source/mdnssd-min.c`'s `mdns_parse_rr`/`mdns_parse_rr_a`/
//! `mdns_parse_rr_ptr`/`mdns_parse_rr_srv`.
//!
//! A record is never built and sent by this crate, only received, so unlike
//! the header/question/domain-name types in `network_order::dns` it does not
//! implement the symmetric `ToFromNetworkOrder` trait — only parsing.
use std::convert::TryFrom;
use std::io::{Cursor, Read};
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{DnsSdError, Result};
use crate::network_order::ToFromNetworkOrder;
use crate::rfc1035::{DomainName, QClass, QType};

/// The decoded rdata for a record type this crate understands. Anything
/// else is parsed only far enough to know how many bytes to skip.
#[derive(Debug, Clone)]
pub enum RData {
    A(Ipv4Addr),
    Ptr(DomainName),
    Srv { port: u16, target: DomainName },
    Txt(Vec<u8>),
    Other,
}

#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype: QType,
    pub class: QClass,
    /// RFC6762 section 10.2: the top bit of a record's class is the
    /// cache-flush bit, not part of the class value itself.
    pub cache_flush: bool,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    /// Parses one resource record starting at `buffer`'s current position.
    /// `buffer` must be positioned within the full DNS message, since
    /// embedded domain names may compression-point anywhere in it.
    ///
    /// The cursor is always left exactly `10 + rdata_length` bytes past the
    /// end of `name`, regardless of whether `rdata` was understood — this
    /// mirrors the original's unconditional `parsed += rr.rdata_length`, so
    /// a record this crate can't interpret still doesn't desynchronize the
    /// parse of whatever record follows it.
    pub fn from_network_bytes(buffer: &mut Cursor<&[u8]>) -> Result<Self> {
        let mut name = DomainName::default();
        name.from_network_bytes(buffer)?;

        let raw_type = buffer.read_u16::<BigEndian>()?;
        let rtype = QType::try_from(raw_type).unwrap_or(QType::Other(raw_type));

        let raw_class = buffer.read_u16::<BigEndian>()?;
        let cache_flush = raw_class & 0x8000 != 0;
        let class =
            QClass::try_from(raw_class).map_err(|_| DnsSdError::protocol("unknown record class"))?;

        let ttl = buffer.read_u32::<BigEndian>()?;
        let rdata_length = buffer.read_u16::<BigEndian>()? as u64;

        let rdata_start = buffer.position();
        let rdata_end = rdata_start + rdata_length;
        if rdata_end > buffer.get_ref().len() as u64 {
            return Err(DnsSdError::protocol("resource record rdata runs past end of message"));
        }

        let rdata = match rtype {
            QType::A => parse_a(buffer, rdata_length)?,
            QType::PTR => parse_ptr(buffer)?,
            QType::SRV => parse_srv(buffer)?,
            QType::TXT => parse_txt(buffer, rdata_length)?,
            _ => RData::Other,
        };

        buffer.set_position(rdata_end);

        Ok(ResourceRecord { name, rtype, class, cache_flush, ttl, rdata })
    }
}

/// `mdns_parse_rr_a`: a link-local (169.254/16) address is treated as
/// absent rather than rejecting the record outright.
fn parse_a(buffer: &mut Cursor<&[u8]>, rdata_length: u64) -> Result<RData> {
    if rdata_length != 4 {
        return Err(DnsSdError::protocol("A record rdata is not 4 bytes"));
    }
    let mut octets = [0u8; 4];
    buffer.read_exact(&mut octets)?;

    if octets[0] == 0xA9 && octets[1] == 0xFE {
        return Ok(RData::A(Ipv4Addr::UNSPECIFIED));
    }
    Ok(RData::A(Ipv4Addr::from(octets)))
}

fn parse_ptr(buffer: &mut Cursor<&[u8]>) -> Result<RData> {
    let mut target = DomainName::default();
    target.from_network_bytes(buffer)?;
    Ok(RData::Ptr(target))
}

/// `mdns_parse_rr_srv`: priority and weight are parsed and discarded.
fn parse_srv(buffer: &mut Cursor<&[u8]>) -> Result<RData> {
    let _priority = buffer.read_u16::<BigEndian>()?;
    let _weight = buffer.read_u16::<BigEndian>()?;
    let port = buffer.read_u16::<BigEndian>()?;

    let mut target = DomainName::default();
    target.from_network_bytes(buffer)?;
    Ok(RData::Srv { port, target })
}

fn parse_txt(buffer: &mut Cursor<&[u8]>, rdata_length: u64) -> Result<RData> {
    let mut data = vec![0u8; rdata_length as usize];
    buffer.read_exact(&mut data)?;
    Ok(RData::Txt(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::get_sample_slice;

    #[test]
    fn a_record_link_local_is_absent() {
        const PACKET: &str = r#"
0000   04 68 6f 73 74 05 6c 6f 63 61 6c 00 00 01 00 01
0010   00 00 00 78 00 04 a9 fe 00 01
"#;
        let v = get_sample_slice(PACKET);
        let mut cursor = Cursor::new(v.as_slice());
        let rr = ResourceRecord::from_network_bytes(&mut cursor).unwrap();
        assert_eq!(rr.rtype, QType::A);
        assert_eq!(rr.ttl, 120);
        match rr.rdata {
            RData::A(addr) => assert_eq!(addr, Ipv4Addr::UNSPECIFIED),
            other => panic!("unexpected rdata {:?}", other),
        }
        assert_eq!(cursor.position(), v.len() as u64);
    }

    #[test]
    fn a_record_ordinary_address() {
        const PACKET: &str = r#"
0000   04 68 6f 73 74 05 6c 6f 63 61 6c 00 00 01 00 01
0010   00 00 00 78 00 04 c0 00 02 0a
"#;
        let v = get_sample_slice(PACKET);
        let mut cursor = Cursor::new(v.as_slice());
        let rr = ResourceRecord::from_network_bytes(&mut cursor).unwrap();
        match rr.rdata {
            RData::A(addr) => assert_eq!(addr, Ipv4Addr::new(192, 0, 2, 10)),
            other => panic!("unexpected rdata {:?}", other),
        }
    }

    #[test]
    fn srv_record_skips_priority_and_weight() {
        const PACKET: &str = r#"
0000   03 66 6f 6f 05 6c 6f 63 61 6c 00 00 21 00 01 00
0010   00 00 78 00 13 00 00 00 00 00 50 05 68 6f 73 74
0020   31 05 6c 6f 63 61 6c 00
"#;
        let v = get_sample_slice(PACKET);
        let mut cursor = Cursor::new(v.as_slice());
        let rr = ResourceRecord::from_network_bytes(&mut cursor).unwrap();
        assert_eq!(rr.rtype, QType::SRV);
        match rr.rdata {
            RData::Srv { port, target } => {
                assert_eq!(port, 80);
                assert_eq!(target.to_string(), "host1.local.");
            }
            other => panic!("unexpected rdata {:?}", other),
        }
    }

    #[test]
    fn unknown_type_still_advances_cursor_by_rdata_length() {
        // CNAME (type 5) rdata is not parsed by this crate but the cursor
        // still must land exactly after it so the next record in the same
        // message can be located.
        const PACKET: &str = r#"
0000   03 66 6f 6f 05 6c 6f 63 61 6c 00 00 05 00 01
0010   00 00 00 78 00 02 ff ff 00 01 02 03
"#;
        let v = get_sample_slice(PACKET);
        let mut cursor = Cursor::new(v.as_slice());
        let rr = ResourceRecord::from_network_bytes(&mut cursor).unwrap();
        assert!(matches!(rr.rdata, RData::Other));
        assert_eq!(cursor.position(), 23);
    }
}
