//! Utility functions shared across the codec, including debug helpers.
use std::char;
use std::io::Cursor;

/// A domain name label is terminated either by the root sentinel (length 0)
/// or by a compression pointer, whose first byte has its top two bits set
/// (RFC1035 section 4.1.4).
pub fn is_sentinel(x: u8) -> bool {
    x == 0 || is_pointer(x)
}

/// A compression pointer is distinguished from a label length by its top two
/// bits: labels are capped at 63 bytes, so a length byte can never set both.
pub fn is_pointer(x: u8) -> bool {
    x & 0b1100_0000 == 0b1100_0000
}

// Debug utility: dumps a cursor's whole backing buffer as index/hex/ascii rows.
pub fn pretty_cursor(buffer: &Cursor<&[u8]>) {
    let reference = buffer.get_ref();

    eprintln!("position={}", buffer.position());

    let mut i = 0usize;
    eprint!("index:");
    for _ in *reference {
        eprint!("{:02} ", i);
        i += 1;
    }
    eprintln!();

    eprint!("byte :");
    for x in *reference {
        eprint!("{:02X} ", x);
    }
    eprintln!();

    eprint!("ascii:");
    for x in *reference {
        let c = char::from_u32(*x as u32).unwrap();
        if c.is_ascii_alphanumeric() {
            eprint!("{:>2} ", c);
        } else {
            eprint!("   ");
        }
    }
    eprintln!();
}

/// Parses a `tcpdump`/`xxd`-style hex dump (offset, hex bytes, trailing ascii
/// ignored) into the raw bytes it represents. Used to build literal wire
/// captures for tests.
#[cfg(test)]
pub fn get_sample_slice(dump: &str) -> Vec<u8> {
    let mut bytes = Vec::new();

    for line in dump.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // first whitespace-separated token is the offset, skip it
        let mut tokens = line.split_whitespace();
        tokens.next();

        for tok in tokens {
            if tok.len() == 2 && tok.chars().all(|c| c.is_ascii_hexdigit()) {
                bytes.push(u8::from_str_radix(tok, 16).unwrap());
            } else {
                break;
            }
        }
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_detection() {
        assert!(is_pointer(0xC0));
        assert!(is_pointer(0xFF));
        assert!(!is_pointer(0x3F));
        assert!(!is_pointer(0x00));
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_sentinel(0x00));
        assert!(is_sentinel(0xC0));
        assert!(!is_sentinel(0x03));
    }

    #[test]
    fn sample_slice_parses_hexdump() {
        const PACKET: &str = r#"
0000   03 77 77 77 06 67 6f 6f 67 6c 65 02 69 65 00
"#;
        assert_eq!(
            get_sample_slice(PACKET),
            vec![0x03, 0x77, 0x77, 0x77, 0x06, 0x67, 0x6f, 0x6f, 0x67, 0x6c, 0x65, 0x02, 0x69, 0x65, 0x00]
        );
    }
}
