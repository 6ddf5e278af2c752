//! The wire (de)serialization trait shared by every DNS structure.
use std::io::Cursor;

use crate::error::Result;

/// Converts a structure to and from RFC1035 network-order bytes.
pub trait ToFromNetworkOrder<'a>: std::fmt::Debug {
    /// Appends `self`'s network-order representation to `buffer`, returning
    /// the number of bytes written.
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize>;

    /// Reads `self`'s network-order representation from `buffer`, advancing
    /// the cursor past the bytes consumed.
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> Result<()>;
}

pub mod dns;
pub mod primitive;
