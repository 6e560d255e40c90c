//! Printable rendering of raw terminal bytes
//!
//! Bytes in the printable ASCII range pass through; everything else, and the
//! backslash that introduces an escape, becomes a four-character `\xHH` token.

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Append the escaped form of `bytes` to `out`
pub fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    out.reserve(bytes.len());
    for &b in bytes {
        if (0x20..=0x7e).contains(&b) && b != b'\\' {
            out.push(b);
        } else {
            out.extend_from_slice(&[b'\\', b'x', HEX[(b >> 4) as usize], HEX[(b & 0x0f) as usize]]);
        }
    }
}

/// Escape `bytes` into a new string
pub fn escape(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    escape_into(bytes, &mut out);
    // Only printable ASCII is ever pushed
    String::from_utf8(out).unwrap_or_default()
}

/// Reverse [`escape`]
///
/// Returns `None` if `text` contains a malformed escape or a byte that
/// [`escape`] would never emit verbatim.
pub fn unescape(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if bytes.get(i + 1) != Some(&b'x') {
                    return None;
                }
                let hi = hex_value(*bytes.get(i + 2)?)?;
                let lo = hex_value(*bytes.get(i + 3)?)?;
                out.push((hi << 4) | lo);
                i += 4;
            }
            b @ 0x20..=0x7e => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    Some(out)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
