use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::error::SerialError;

// -----------------------------------------------------------------------------
// Lexer

/// Splits a text stream into whitespace-separated tokens.
///
/// Quoted strings (`"..."` and `x"..."`) are single tokens and may contain
/// whitespace. Escapes are left in place, see [`unescape`].
#[derive(Debug)]
pub(super) struct Lexer {
    input: String,
    pos: usize,
}

impl Lexer {
    pub(super) fn new(input: Vec<u8>) -> Result<Self, SerialError> {
        let input = String::from_utf8(input).map_err(|_| SerialError::InvalidUtf8)?;
        Ok(Self { input, pos: 0 })
    }

    /// Returns the next token, or `None` at the end of the input.
    pub(super) fn next_token(&mut self) -> Result<Option<&str>, SerialError> {
        let bytes = self.input.as_bytes();
        let mut start = self.pos;
        while start < bytes.len() && bytes[start].is_ascii_whitespace() {
            start += 1;
        }
        if start == bytes.len() {
            self.pos = start;
            return Ok(None);
        }

        let quote = match bytes[start] {
            b'"' => Some(start),
            b'x' if bytes.get(start + 1) == Some(&b'"') => Some(start + 1),
            _ => None,
        };

        let end = match quote {
            Some(open) => {
                let mut at = open + 1;
                loop {
                    match bytes.get(at) {
                        None => return Err(SerialError::malformed("unterminated string")),
                        Some(b'\\') => at += 2,
                        Some(b'"') => break at + 1,
                        Some(_) => at += 1,
                    }
                }
            }
            None => {
                let mut at = start;
                while at < bytes.len() && !bytes[at].is_ascii_whitespace() {
                    at += 1;
                }
                at
            }
        };

        self.pos = end;
        Ok(Some(&self.input[start..end]))
    }

    /// Like [`next_token`](Self::next_token), but the end of input is an error.
    pub(super) fn expect_token(&mut self) -> Result<&str, SerialError> {
        self.next_token()?
            .ok_or_else(|| SerialError::malformed("unexpected end of text"))
    }
}

// -----------------------------------------------------------------------------
// Escaping

/// Appends `bytes` as a double-quoted string.
///
/// Printable ASCII is kept, everything else becomes an escape so the
/// output stays ASCII.
pub(super) fn escape_into(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('"');
}

/// Decodes a token produced by [`escape_into`] into `out`.
pub(super) fn unescape(token: &str, out: &mut Vec<u8>) -> Result<(), SerialError> {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| SerialError::malformed(format!("expected a string, found `{token}`")))?;

    out.clear();
    let mut bytes = inner.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let decoded = match bytes.next() {
            Some(b'"') => b'"',
            Some(b'\\') => b'\\',
            Some(b'n') => b'\n',
            Some(b'r') => b'\r',
            Some(b't') => b'\t',
            Some(b'x') => {
                let hi = bytes.next().and_then(hex_digit);
                let lo = bytes.next().and_then(hex_digit);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => (hi << 4) | lo,
                    _ => return Err(SerialError::malformed("invalid `\\x` escape")),
                }
            }
            _ => return Err(SerialError::malformed(format!("invalid escape in `{token}`"))),
        };
        out.push(decoded);
    }
    Ok(())
}

/// Appends `bytes` as an `x"..."` hex token.
pub(super) fn hex_into(out: &mut String, bytes: &[u8]) {
    out.push_str("x\"");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.push('"');
}

/// Decodes an `x"..."` hex token into `out`.
pub(super) fn unhex(token: &str, out: &mut Vec<u8>) -> Result<(), SerialError> {
    let inner = token
        .strip_prefix("x\"")
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| SerialError::malformed(format!("expected a byte string, found `{token}`")))?;
    if inner.len() % 2 != 0 {
        return Err(SerialError::malformed("odd number of hex digits"));
    }

    out.clear();
    for pair in inner.as_bytes().chunks_exact(2) {
        match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
            _ => return Err(SerialError::malformed(format!("invalid hex in `{token}`"))),
        }
    }
    Ok(())
}

#[inline]
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
