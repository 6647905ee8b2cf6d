use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Display;
use core::str::FromStr;

use crate::error::SerialError;
use crate::info::SerializationFlags;
use crate::ser::serializer::Session;
use crate::ser::{FieldHeader, Format, FundamentalMut, Mode, Serializer, StreamFlags};
use crate::stream::Stream;

mod lexer;

use lexer::Lexer;

// -----------------------------------------------------------------------------
// TextSerializer

/// Human-readable backend producing a whitespace-separated token stream.
///
/// | value        | text                |
/// |--------------|---------------------|
/// | record       | `{ ... }`           |
/// | array        | `[ #N ... ]`        |
/// | object       | `{ #N k => v ... }` |
/// | version      | `@N`                |
/// | flags        | `%N`                |
/// | field        | `name:`             |
/// | bool         | `true` / `false`    |
/// | numbers      | Rust `Display` form |
/// | text         | `"escaped"`         |
/// | bytes        | `x"hex"`            |
///
/// The reader loads the rest of the stream at [`begin`](Serializer::begin)
/// and checks structure tokens and field names as it goes. Field headers
/// are not supported, so records always use the packed encoding here.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use vc_serial::ser::{FundamentalMut, Serializer, TextSerializer};
///
/// let mut ser = TextSerializer::writer(Cursor::new(Vec::new()));
/// ser.begin().unwrap();
/// ser.begin_record("Point").unwrap();
/// ser.serialize_field("x").unwrap();
/// ser.serialize_fundamental(FundamentalMut::I32(&mut -4)).unwrap();
/// ser.end_record().unwrap();
/// ser.end().unwrap();
///
/// let text = String::from_utf8(ser.into_inner().into_inner()).unwrap();
/// assert_eq!(text, "{ x: -4 }\n");
/// ```
#[derive(Debug)]
pub struct TextSerializer<S> {
    stream: S,
    mode: Mode,
    flags: StreamFlags,
    session: Session,
    lexer: Option<Lexer>,
    /// Payload of the open text or bytes scope when reading.
    pending: Vec<u8>,
    line_start: bool,
}

impl<S: Stream> TextSerializer<S> {
    /// Creates a serializer that writes into `stream`.
    pub const fn writer(stream: S) -> Self {
        Self::new(stream, Mode::Writing)
    }

    /// Creates a serializer that reads from `stream`.
    pub const fn reader(stream: S) -> Self {
        Self::new(stream, Mode::Reading)
    }

    const fn new(stream: S, mode: Mode) -> Self {
        Self {
            stream,
            mode,
            flags: StreamFlags::empty(),
            session: Session::Idle,
            lexer: None,
            pending: Vec::new(),
            line_start: true,
        }
    }

    /// Sets the stream options, see [`StreamFlags`].
    pub const fn with_flags(mut self, flags: StreamFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn emit(&mut self, token: &str) -> Result<(), SerialError> {
        self.session.check_active()?;
        if !self.line_start {
            self.stream.write_all_bytes(b" ")?;
        }
        self.stream.write_all_bytes(token.as_bytes())?;
        self.line_start = false;
        Ok(())
    }

    fn lexer(&mut self) -> Result<&mut Lexer, SerialError> {
        self.session.check_active()?;
        self.lexer.as_mut().ok_or(SerialError::NotBegun)
    }

    fn expect(&mut self, expected: &str) -> Result<(), SerialError> {
        let token = self.lexer()?.expect_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(SerialError::malformed(format!(
                "expected `{expected}`, found `{token}`"
            )))
        }
    }

    /// Transfers a number written with a one-character prefix, e.g. `#3`.
    fn prefixed(&mut self, prefix: char, value: &mut u32) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit(&format!("{prefix}{value}")),
            Mode::Reading => {
                let token = self.lexer()?.expect_token()?;
                *value = token
                    .strip_prefix(prefix)
                    .and_then(|digits| digits.parse().ok())
                    .ok_or_else(|| {
                        SerialError::malformed(format!(
                            "expected `{prefix}<number>`, found `{token}`"
                        ))
                    })?;
                Ok(())
            }
        }
    }

    /// Decodes a quoted token into the pending payload of a text or bytes scope.
    fn read_pending(
        &mut self,
        len: &mut u32,
        decode: fn(&str, &mut Vec<u8>) -> Result<(), SerialError>,
    ) -> Result<(), SerialError> {
        self.session.check_active()?;
        let lex = self.lexer.as_mut().ok_or(SerialError::NotBegun)?;
        let token = lex.expect_token()?;
        decode(token, &mut self.pending)?;
        *len = u32::try_from(self.pending.len()).map_err(|_| SerialError::Capacity {
            needed: self.pending.len(),
            capacity: u32::MAX as usize,
        })?;
        Ok(())
    }

    fn scalar<T: Display + FromStr>(&mut self, value: &mut T) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit(&value.to_string()),
            Mode::Reading => {
                let token = self.lexer()?.expect_token()?;
                *value = token
                    .parse()
                    .map_err(|_| SerialError::malformed(format!("invalid number `{token}`")))?;
                Ok(())
            }
        }
    }

    fn boolean(&mut self, value: &mut bool) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit(if *value { "true" } else { "false" }),
            Mode::Reading => {
                let token = self.lexer()?.expect_token()?;
                *value = match token {
                    "true" => true,
                    "false" => false,
                    other => other
                        .parse::<i64>()
                        .map(|n| n != 0)
                        .map_err(|_| SerialError::malformed(format!("invalid bool `{other}`")))?,
                };
                Ok(())
            }
        }
    }
}

impl<S: Stream> Serializer for TextSerializer<S> {
    #[inline]
    fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    fn format(&self) -> Format {
        Format::Text
    }

    #[inline]
    fn flags(&self) -> StreamFlags {
        self.flags
    }

    fn begin(&mut self) -> Result<(), SerialError> {
        self.session.begin()?;
        if self.mode == Mode::Reading {
            let input = self.stream.read_remaining()?;
            self.lexer = Some(Lexer::new(input)?);
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), SerialError> {
        if self.mode == Mode::Writing && !self.line_start {
            self.session.check_active()?;
            self.stream.write_all_bytes(b"\n")?;
            self.line_start = true;
        }
        self.session.end()
    }

    fn begin_record(&mut self, _name: &str) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit("{"),
            Mode::Reading => self.expect("{"),
        }
    }

    fn end_record(&mut self) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit("}"),
            Mode::Reading => self.expect("}"),
        }
    }

    fn begin_array(&mut self, count: &mut u32) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit("[")?,
            Mode::Reading => self.expect("[")?,
        }
        self.prefixed('#', count)
    }

    fn end_array(&mut self) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit("]"),
            Mode::Reading => self.expect("]"),
        }
    }

    fn begin_object(&mut self, count: &mut u32) -> Result<(), SerialError> {
        self.begin_record("")?;
        self.prefixed('#', count)
    }

    fn end_object(&mut self) -> Result<(), SerialError> {
        self.end_record()
    }

    fn begin_text(&mut self, len: &mut u32) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.session.check_active(),
            Mode::Reading => self.read_pending(len, lexer::unescape),
        }
    }

    fn end_text(&mut self, buf: &mut [u8], len: u32) -> Result<(), SerialError> {
        let len = len as usize;
        if len > buf.len() {
            return Err(SerialError::Capacity {
                needed: len,
                capacity: buf.len(),
            });
        }
        match self.mode {
            Mode::Writing => {
                let mut token = String::with_capacity(len + 2);
                lexer::escape_into(&mut token, &buf[..len]);
                self.emit(&token)
            }
            Mode::Reading => {
                let src = self.pending.get(..len).ok_or_else(|| {
                    SerialError::malformed(format!(
                        "text of {} bytes read as {len}",
                        self.pending.len()
                    ))
                })?;
                buf[..len].copy_from_slice(src);
                Ok(())
            }
        }
    }

    fn begin_bytes(&mut self, len: &mut u32) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.session.check_active(),
            Mode::Reading => self.read_pending(len, lexer::unhex),
        }
    }

    fn end_bytes(&mut self, buf: &mut [u8]) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => {
                let mut token = String::with_capacity(buf.len() * 2 + 3);
                lexer::hex_into(&mut token, buf);
                self.emit(&token)
            }
            Mode::Reading => {
                if self.pending.len() != buf.len() {
                    return Err(SerialError::malformed(format!(
                        "expected {} bytes, found {}",
                        buf.len(),
                        self.pending.len()
                    )));
                }
                buf.copy_from_slice(&self.pending);
                Ok(())
            }
        }
    }

    fn serialize_field(&mut self, name: &str) -> Result<(), SerialError> {
        let marker = format!("{name}:");
        match self.mode {
            Mode::Writing => self.emit(&marker),
            Mode::Reading => self.expect(&marker),
        }
    }

    fn serialize_key(&mut self) -> Result<(), SerialError> {
        match self.mode {
            Mode::Writing => self.emit("=>"),
            Mode::Reading => self.expect("=>"),
        }
    }

    fn serialize_version(&mut self, version: &mut u32) -> Result<(), SerialError> {
        self.prefixed('@', version)
    }

    fn serialize_flags(&mut self, flags: &mut SerializationFlags) -> Result<(), SerialError> {
        let mut bits = flags.bits();
        self.prefixed('%', &mut bits)?;
        *flags = SerializationFlags::from_bits_retain(bits);
        Ok(())
    }

    fn serialize_field_header(&mut self, _header: &mut FieldHeader) -> Result<(), SerialError> {
        Err(SerialError::Unsupported("field headers in text format"))
    }

    fn serialize_fundamental(&mut self, value: FundamentalMut<'_>) -> Result<(), SerialError> {
        match value {
            FundamentalMut::Bool(v) => self.boolean(v),
            FundamentalMut::I8(v) => self.scalar(v),
            FundamentalMut::U8(v) => self.scalar(v),
            FundamentalMut::I16(v) => self.scalar(v),
            FundamentalMut::U16(v) => self.scalar(v),
            FundamentalMut::I32(v) => self.scalar(v),
            FundamentalMut::U32(v) => self.scalar(v),
            FundamentalMut::I64(v) => self.scalar(v),
            FundamentalMut::U64(v) => self.scalar(v),
            FundamentalMut::I128(v) => self.scalar(v),
            FundamentalMut::U128(v) => self.scalar(v),
            FundamentalMut::F32(v) => self.scalar(v),
            FundamentalMut::F64(v) => self.scalar(v),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
