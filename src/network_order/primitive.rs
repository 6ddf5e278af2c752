//! Network-order conversions for the primitive integer types the codec needs.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::Result;
use crate::network_order::ToFromNetworkOrder;

impl<'a> ToFromNetworkOrder<'a> for u8 {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let mut buffer: Vec<u8> = Vec::new();
    /// assert!(255_u8.to_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(buffer, &[0xFF]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        buffer.write_u8(*self)?;
        Ok(1)
    }

    /// ```
    /// use std::io::Cursor;
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let b = vec![0xFF];
    /// let mut buffer = Cursor::new(b.as_slice());
    /// let mut v = 0u8;
    /// assert!(v.from_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(v, 255);
    /// ```
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        *self = buffer.read_u8()?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for u16 {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let mut buffer: Vec<u8> = Vec::new();
    /// assert!(0x1234_u16.to_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(buffer, &[0x12, 0x34]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        buffer.write_u16::<BigEndian>(*self)?;
        Ok(2)
    }

    /// ```
    /// use std::io::Cursor;
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let b = vec![0x12, 0x34];
    /// let mut buffer = Cursor::new(b.as_slice());
    /// let mut v = 0u16;
    /// assert!(v.from_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(v, 0x1234);
    /// ```
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        *self = buffer.read_u16::<BigEndian>()?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for u32 {
    /// ```
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let mut buffer: Vec<u8> = Vec::new();
    /// assert!(0x12345678_u32.to_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(buffer, &[0x12, 0x34, 0x56, 0x78]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        buffer.write_u32::<BigEndian>(*self)?;
        Ok(4)
    }

    /// ```
    /// use std::io::Cursor;
    /// use mdns_sd::network_order::ToFromNetworkOrder;
    ///
    /// let b = vec![0x12, 0x34, 0x56, 0x78];
    /// let mut buffer = Cursor::new(b.as_slice());
    /// let mut v = 0u32;
    /// assert!(v.from_network_bytes(&mut buffer).is_ok());
    /// assert_eq!(v, 0x12345678);
    /// ```
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()> {
        *self = buffer.read_u32::<BigEndian>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_roundtrip() {
        let mut buffer = Vec::new();
        assert_eq!(200u8.to_network_bytes(&mut buffer).unwrap(), 1);
        let mut cursor = Cursor::new(buffer.as_slice());
        let mut v = 0u8;
        v.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(v, 200);
    }

    #[test]
    fn u32_roundtrip() {
        let mut buffer = Vec::new();
        assert_eq!(0x12345678u32.to_network_bytes(&mut buffer).unwrap(), 4);
        assert_eq!(buffer, &[0x12, 0x34, 0x56, 0x78]);
        let mut cursor = Cursor::new(buffer.as_slice());
        let mut v = 0u32;
        v.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(v, 0x12345678);
    }
}
