// auto-implement the ToFromNetworkOrder trait for fieldless discriminant enums
#[macro_export]
macro_rules! derive_enum {
    ($t:ty, u8) => {
        impl<'a> $crate::network_order::ToFromNetworkOrder<'a> for $t {
            fn to_network_bytes(&self, v: &mut Vec<u8>) -> std::io::Result<usize> {
                use byteorder::WriteBytesExt;
                v.write_u8(*self as u8)?;
                Ok(1)
            }

            fn from_network_bytes(
                &mut self,
                v: &mut std::io::Cursor<&'a [u8]>,
            ) -> $crate::error::Result<()> {
                use byteorder::ReadBytesExt;
                let value = v.read_u8()?;
                *self = <$t>::try_from(value)
                    .map_err(|_| $crate::error::DnsSdError::protocol(format!(
                        "unknown {} value {}",
                        stringify!($t),
                        value
                    )))?;
                Ok(())
            }
        }
    };

    ($t:ty, u16) => {
        impl<'a> $crate::network_order::ToFromNetworkOrder<'a> for $t {
            fn to_network_bytes(&self, v: &mut Vec<u8>) -> std::io::Result<usize> {
                use byteorder::{BigEndian, WriteBytesExt};
                v.write_u16::<BigEndian>(u16::from(*self))?;
                Ok(2)
            }

            fn from_network_bytes(
                &mut self,
                v: &mut std::io::Cursor<&'a [u8]>,
            ) -> $crate::error::Result<()> {
                use byteorder::{BigEndian, ReadBytesExt};
                let value = v.read_u16::<BigEndian>()?;
                *self = <$t>::try_from(value)
                    .map_err(|_| $crate::error::DnsSdError::protocol(format!(
                        "unknown {} value {}",
                        stringify!($t),
                        value
                    )))?;
                Ok(())
            }
        }
    };
}

// useful helpers for tests
#[macro_export]
macro_rules! test_from_network {
    ($slice:ident, $t:ty) => {{
        let s = crate::util::get_sample_slice($slice);
        let mut buffer = std::io::Cursor::new(s.as_slice());
        let mut v = <$t>::default();
        assert!(v.from_network_bytes(&mut buffer).is_ok());
        v
    }};
}

#[macro_export]
macro_rules! test_to_network {
    ($data:ident) => {{
        let mut buffer: Vec<u8> = Vec::new();
        let bytes_written = $data.to_network_bytes(&mut buffer).unwrap();

        (buffer, bytes_written)
    }};
}

/// Formats a byte buffer for `debug!` logging: `"X"` for a hex dump,
/// anything else for a comma-separated decimal list.
#[macro_export]
macro_rules! format_buffer {
    ("X", $buffer:expr) => {{
        $buffer
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<String>>()
            .join(" ")
    }};
    ("C", $buffer:expr) => {{
        $buffer
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<String>>()
            .join(",")
    }};
}
