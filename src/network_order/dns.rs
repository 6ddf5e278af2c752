//! Network-order (de)serialization for the RFC1035 structures in `crate::rfc1035`.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::io::Cursor;

use crate::derive_enum;
use crate::error::{DnsSdError, Result};
use crate::network_order::ToFromNetworkOrder;
use crate::rfc1035::{
    DomainName, DNSPacketFlags, DNSPacketHeader, DNSQuestion, OpCode, PacketType, QClass, QType,
    ResponseCode, MAX_DEREFERENCE_COUNT, MAX_RR_NAME_SIZE,
};
use crate::util::is_pointer;

/// RFC1035 4.1.4: a compression pointer's OFFSET field is only 14 bits.
const POINTER_OFFSET_MASK: u16 = 0x3FFF;

derive_enum!(QType, u16);
derive_enum!(QClass, u16);

impl<'a> ToFromNetworkOrder<'a> for DomainName {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    /// use mdns_sd::rfc1035::DomainName;
    /// use std::convert::TryFrom;
    ///
    /// let dn = DomainName::try_from("aaa.bb.c").unwrap();
    /// let mut buffer: Vec<u8> = Vec::new();
    /// let length = dn.to_network_bytes(&mut buffer).unwrap();
    /// assert_eq!(length, 10);
    /// assert_eq!(buffer, &[3, 97, 97, 97, 2, 98, 98, 1, 99, 0]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut length = 0usize;
        for label in &self.labels {
            buffer.write_u8(label.len() as u8)?;
            buffer.extend_from_slice(label.as_bytes());
            length += 1 + label.len();
        }
        buffer.write_u8(0)?;
        length += 1;
        Ok(length)
    }

    /// Decompresses a domain name starting at the cursor's current position,
    /// bounded by [`MAX_DEREFERENCE_COUNT`] pointer jumps. Bytes consumed
    /// before the first jump advance the cursor for the caller; bytes
    /// consumed while following a pointer chain do not.
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        let data: &[u8] = buffer.get_ref();
        let mut pos = buffer.position() as usize;
        let mut labels = Vec::new();
        let mut jumps = 0u32;
        let mut cursor_end: Option<usize> = None;

        loop {
            if pos >= data.len() {
                return Err(DnsSdError::protocol("truncated domain name"));
            }

            let byte = data[pos];

            if byte == 0 {
                if cursor_end.is_none() {
                    cursor_end = Some(pos + 1);
                }
                break;
            }

            if is_pointer(byte) {
                if pos + 1 >= data.len() {
                    return Err(DnsSdError::protocol("truncated compression pointer"));
                }
                if cursor_end.is_none() {
                    cursor_end = Some(pos + 2);
                }

                jumps += 1;
                if jumps > MAX_DEREFERENCE_COUNT {
                    return Err(DnsSdError::protocol(
                        "too many compression pointer jumps (likely a pointer loop)",
                    ));
                }

                let offset = (((byte as u16) << 8) | data[pos + 1] as u16) & POINTER_OFFSET_MASK;
                pos = offset as usize;
                continue;
            }

            let len = byte as usize;
            if pos + 1 + len > data.len() {
                return Err(DnsSdError::protocol("truncated label"));
            }

            let label = std::str::from_utf8(&data[pos + 1..pos + 1 + len])?;
            labels.push(label.to_string());
            pos += 1 + len;
        }

        let assembled_len: usize = labels.iter().map(|l| l.len() + 1).sum();
        if assembled_len > MAX_RR_NAME_SIZE {
            return Err(DnsSdError::protocol("domain name too long"));
        }

        self.labels = labels;
        buffer.set_position(cursor_end.unwrap() as u64);
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for DNSPacketFlags {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    /// use mdns_sd::rfc1035::{DNSPacketFlags, PacketType, OpCode, ResponseCode};
    ///
    /// let flags = DNSPacketFlags {
    ///     packet_type: PacketType::Response,
    ///     op_code: OpCode::IQuery,
    ///     authorative_answer: true,
    ///     truncated: true,
    ///     recursion_desired: true,
    ///     recursion_available: true,
    ///     z: false,
    ///     authentic_data: false,
    ///     checking_disabled: false,
    ///     response_code: ResponseCode::NoError,
    /// };
    ///
    /// let mut buffer: Vec<u8> = Vec::new();
    /// assert!(flags.to_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(buffer, &[0b1000_1111, 0b1000_0000]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut flags = (self.packet_type as u16) << 15;
        flags |= (self.op_code as u16) << 11;
        flags |= (self.authorative_answer as u16) << 10;
        flags |= (self.truncated as u16) << 9;
        flags |= (self.recursion_desired as u16) << 8;
        flags |= (self.recursion_available as u16) << 7;
        flags |= (self.z as u16) << 6;
        flags |= (self.authentic_data as u16) << 5;
        flags |= (self.checking_disabled as u16) << 4;
        flags |= self.response_code as u16;

        buffer.write_u16::<BigEndian>(flags)?;
        Ok(2)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        let flags = buffer.read_u16::<BigEndian>()?;

        self.packet_type = PacketType::try_from(((flags >> 15) & 1) as u8)
            .map_err(|_| DnsSdError::protocol("invalid packet type bit"))?;
        self.op_code = OpCode::try_from(((flags >> 11) & 0b1111) as u8).unwrap_or(OpCode::Query);
        self.authorative_answer = (flags >> 10) & 1 == 1;
        self.truncated = (flags >> 9) & 1 == 1;
        self.recursion_desired = (flags >> 8) & 1 == 1;
        self.recursion_available = (flags >> 7) & 1 == 1;
        self.z = (flags >> 6) & 1 == 1;
        self.authentic_data = (flags >> 5) & 1 == 1;
        self.checking_disabled = (flags >> 4) & 1 == 1;
        self.response_code = ResponseCode::try_from((flags & 0b1111) as u8).unwrap_or_default();

        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for DNSPacketHeader {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    /// use mdns_sd::rfc1035::DNSPacketHeader;
    ///
    /// let mut header = DNSPacketHeader::default();
    /// header.id = 0x1234;
    /// header.qd_count = 1;
    ///
    /// let mut buffer: Vec<u8> = Vec::new();
    /// assert_eq!(header.to_network_bytes(&mut buffer).unwrap(), 12);
    /// assert_eq!(buffer.len(), 12);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        self.id.to_network_bytes(buffer)?;
        self.flags.to_network_bytes(buffer)?;
        self.qd_count.to_network_bytes(buffer)?;
        self.an_count.to_network_bytes(buffer)?;
        self.ns_count.to_network_bytes(buffer)?;
        self.ar_count.to_network_bytes(buffer)?;
        Ok(12)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        self.id.from_network_bytes(buffer)?;
        self.flags.from_network_bytes(buffer)?;
        self.qd_count.from_network_bytes(buffer)?;
        self.an_count.from_network_bytes(buffer)?;
        self.ns_count.from_network_bytes(buffer)?;
        self.ar_count.from_network_bytes(buffer)?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for DNSQuestion {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut length = self.name.to_network_bytes(buffer)?;
        length += self.r#type.to_network_bytes(buffer)?;

        let mut class: u16 = self.class.into();
        if self.prefer_unicast_response {
            class |= 0x8000;
        }
        buffer.write_u16::<BigEndian>(class)?;
        length += 2;

        Ok(length)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        self.name.from_network_bytes(buffer)?;
        self.r#type.from_network_bytes(buffer)?;
        self.class.from_network_bytes(buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::get_sample_slice;
    use crate::{test_from_network, test_to_network};
    use crate::rfc1035::PacketType;

    #[test]
    fn dns_packet_header() {
        const PACKET: &str = r#"
0000   76 86 81 a0 00 01 00 08 00 00 00 01
        "#;

        let dns_packet_header = test_from_network!(PACKET, DNSPacketHeader);
        assert_eq!(dns_packet_header.id, 0x7686);
        assert_eq!(dns_packet_header.flags.packet_type, PacketType::Response);
        assert_eq!(dns_packet_header.flags.op_code, OpCode::Query);
        assert!(!dns_packet_header.flags.authorative_answer);
        assert!(!dns_packet_header.flags.truncated);
        assert!(dns_packet_header.flags.recursion_desired);
        assert!(dns_packet_header.flags.recursion_available);
        assert_eq!(dns_packet_header.qd_count, 1);
        assert_eq!(dns_packet_header.an_count, 8);
        assert_eq!(dns_packet_header.ns_count, 0);
        assert_eq!(dns_packet_header.ar_count, 1);

        let values = test_to_network!(dns_packet_header);
        assert_eq!(values.0, get_sample_slice(PACKET));
        assert_eq!(values.1, 12);
    }

    #[test]
    fn domain_name_decompression() {
        const PACKET: &str = r#"
0000   76 86 81 a0 00 01 00 08 00 00 00 01 02 68 6b 00
0010   00 02 00 01 c0 0c 00 02 00 01 00 00 54 60 00 0e
0020   01 7a 05 68 6b 69 72 63 03 6e 65 74 c0 0c c0 0c
"#;
        let v = get_sample_slice(PACKET);
        let s = v.as_slice();

        let mut cursor = Cursor::new(s);
        cursor.set_position(12);
        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 16);
        assert_eq!(dn.labels, vec!["hk".to_string()]);
        assert_eq!(dn.to_string(), "hk.");

        let mut cursor = Cursor::new(s);
        cursor.set_position(20);
        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 22);
        assert_eq!(dn.labels, vec!["hk".to_string()]);

        let mut cursor = Cursor::new(s);
        cursor.set_position(32);
        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 46);
        assert_eq!(
            dn.labels,
            vec![
                "z".to_string(),
                "hkirc".to_string(),
                "net".to_string(),
                "hk".to_string()
            ]
        );
    }

    #[test]
    fn domain_name_pointer_loop_is_rejected() {
        // a pointer at offset 12 that points right back to offset 12
        let mut bytes = vec![0u8; 12];
        bytes.push(0xC0);
        bytes.push(12);

        let mut cursor = Cursor::new(bytes.as_slice());
        cursor.set_position(12);
        let mut dn = DomainName::default();
        assert!(dn.from_network_bytes(&mut cursor).is_err());
    }

    #[test]
    fn domain_name_between_outbound_and_inbound_limits_is_accepted() {
        // four labels assembling to 255 bytes: over DNS_MAX_HOSTNAME_LENGTH
        // (253, the outbound query-build limit) but within MAX_RR_NAME_SIZE
        // (256, the inbound decompression limit) — must succeed here.
        let label_lens = [63usize, 63, 63, 62];
        let mut bytes = Vec::new();
        for len in label_lens {
            bytes.push(len as u8);
            bytes.extend(std::iter::repeat_n(b'a', len));
        }
        bytes.push(0);

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut cursor).unwrap();
        let assembled_len: usize = dn.labels.iter().map(|l| l.len() + 1).sum();
        assert_eq!(assembled_len, 255);
    }

    #[test]
    fn domain_name_over_max_rr_name_size_is_rejected() {
        let label_lens = [63usize, 63, 63, 63, 6];
        let mut bytes = Vec::new();
        for len in label_lens {
            bytes.push(len as u8);
            bytes.extend(std::iter::repeat_n(b'a', len));
        }
        bytes.push(0);

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut dn = DomainName::default();
        assert!(dn.from_network_bytes(&mut cursor).is_err());
    }

    #[test]
    fn domain_name_roundtrip() {
        let dn = DomainName::try_from("_airplay._tcp.local").unwrap();
        let mut buffer = Vec::new();
        dn.to_network_bytes(&mut buffer).unwrap();

        let mut cursor = Cursor::new(buffer.as_slice());
        let mut parsed = DomainName::default();
        parsed.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(parsed, dn);
        assert_eq!(parsed.to_string(), "_airplay._tcp.local.");
    }
}
