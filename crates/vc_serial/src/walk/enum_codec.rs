//! Text encoding of enum values.
//!
//! Binary streams carry enums as their underlying integer. Text streams
//! carry names:
//!
//! - Plain enums write the name of the constant with exactly that value,
//!   or the decimal value when no constant matches.
//! - Flag enums write every nonzero constant whose bits are all set,
//!   joined with `" | "`. Bits no constant covers follow as a decimal term.
//!   An empty value is written as the name of a zero constant, or `0`.
//!
//! Reading resolves each token by name hash first and parses it as an
//! integer otherwise. Tokens that are neither contribute `0` and log a
//! warning.
//!
//! # Examples
//!
//! ```
//! use vc_serial::info::{EnumType, FundamentalKind};
//! use vc_serial::walk::enum_codec;
//!
//! let access = EnumType::new("Access", FundamentalKind::U8)
//!     .flags()
//!     .with_constant("Read", 1)
//!     .with_constant("Write", 2)
//!     .with_constant("Exec", 4);
//!
//! let mut text = String::new();
//! enum_codec::format_value(&access, 5 | 16, &mut text).unwrap();
//! assert_eq!(text, "Read | Exec | 16");
//!
//! assert_eq!(enum_codec::parse_value(&access, "Exec | Read"), 5);
//! ```

use core::fmt;

use vc_utils::hash::fnv1a_32;

use crate::info::{EnumType, FundamentalKind};

// -----------------------------------------------------------------------------
// Bit patterns

/// Mask of the value bits of an enum's underlying kind.
#[inline]
const fn value_mask(kind: FundamentalKind) -> u64 {
    match kind.size() {
        1 => 0xff,
        2 => 0xffff,
        4 => 0xffff_ffff,
        _ => u64::MAX,
    }
}

/// Reads an enum value of `kind` from native-order bytes.
///
/// Signed kinds are sign-extended, unsigned kinds zero-extended, so the
/// result compares equal to the constants as declared.
pub fn load(kind: FundamentalKind, bytes: &[u8]) -> Option<i64> {
    let value = match kind {
        FundamentalKind::I8 => i64::from(i8::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::U8 => i64::from(u8::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::I16 => i64::from(i16::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::U16 => i64::from(u16::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::I32 => i64::from(i32::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::U32 => i64::from(u32::from_ne_bytes(*bytes.first_chunk()?)),
        FundamentalKind::I64 => i64::from_ne_bytes(*bytes.first_chunk()?),
        FundamentalKind::U64 => u64::from_ne_bytes(*bytes.first_chunk()?) as i64,
        _ => return None,
    };
    Some(value)
}

/// Stores `value` as `kind` in native-order bytes, truncating to its width.
///
/// Returns `None` if `kind` is not an enum kind or `bytes` is too short.
pub fn store(kind: FundamentalKind, value: i64, bytes: &mut [u8]) -> Option<()> {
    let size = kind.size();
    if !kind.is_enum_compatible() || bytes.len() < size {
        return None;
    }
    let raw = value.to_ne_bytes();
    #[cfg(target_endian = "little")]
    let src = &raw[..size];
    #[cfg(target_endian = "big")]
    let src = &raw[raw.len() - size..];
    bytes[..size].copy_from_slice(src);
    Some(())
}

fn write_integer<W: fmt::Write>(kind: FundamentalKind, value: i64, out: &mut W) -> fmt::Result {
    if kind.is_signed() {
        write!(out, "{value}")
    } else {
        write!(out, "{}", value as u64 & value_mask(kind))
    }
}

fn parse_integer(token: &str) -> Option<i64> {
    token
        .parse::<i64>()
        .ok()
        .or_else(|| token.parse::<u64>().ok().map(|v| v as i64))
}

// -----------------------------------------------------------------------------
// Format

/// Writes the text form of `value`.
pub fn format_value<W: fmt::Write>(ty: &EnumType, value: i64, out: &mut W) -> fmt::Result {
    if ty.is_flags() {
        return format_flags(ty, value, out);
    }
    match ty.find_by_value(value) {
        Some(constant) => out.write_str(constant.name().as_str()),
        None => write_integer(ty.underlying(), value, out),
    }
}

fn format_flags<W: fmt::Write>(ty: &EnumType, value: i64, out: &mut W) -> fmt::Result {
    let mask = value_mask(ty.underlying());
    let bits = value as u64 & mask;

    if bits == 0 {
        return match ty.find_by_value(0) {
            Some(constant) => out.write_str(constant.name().as_str()),
            None => out.write_str("0"),
        };
    }

    let mut covered = 0_u64;
    let mut first = true;
    for constant in ty.constants() {
        let c = constant.value() as u64 & mask;
        if c != 0 && bits & c == c {
            if !first {
                out.write_str(" | ")?;
            }
            out.write_str(constant.name().as_str())?;
            covered |= c;
            first = false;
        }
    }

    let rest = bits & !covered;
    if rest != 0 {
        if !first {
            out.write_str(" | ")?;
        }
        write!(out, "{rest}")?;
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Parse

/// Resolves one token to a value, `0` if it is neither a name nor an integer.
fn resolve_token(ty: &EnumType, token: &str) -> i64 {
    if let Some(constant) = ty.find_by_name_hash(fnv1a_32(token)) {
        return constant.value();
    }
    match parse_integer(token) {
        Some(value) => value,
        None => {
            log::warn!(
                "unknown constant `{token}` for enum `{}`, using 0",
                ty.header().name()
            );
            0
        }
    }
}

/// Parses the text form of a value of `ty`.
pub fn parse_value(ty: &EnumType, text: &str) -> i64 {
    let text = text.trim();
    if !ty.is_flags() {
        return resolve_token(ty, text);
    }

    let mask = value_mask(ty.underlying());
    let bits = text
        .split(|c: char| c == '|' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .fold(0_u64, |acc, token| acc | (resolve_token(ty, token) as u64 & mask));
    bits as i64
}
