//! Decoded primitive values.
//!
//! A value is produced on demand from one `Encoding` token and the bytes it
//! covers. Byte arrays (`char[n]`, `uint8[n]`, `int8[n]`) stay as zero-copy
//! slices into the message buffer.

use std::fmt;

use memchr::memchr;

/// A single decoded primitive.
///
/// The lifetime `'a` refers to the message buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveValue<'a> {
    Char(u8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    /// Fixed-length byte array, including any NUL padding.
    Bytes(&'a [u8]),
}

impl<'a> PrimitiveValue<'a> {
    /// Unsigned view of an integral value. None for negatives, floats and arrays.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Char(v) | Self::Uint8(v) => Some(v as u64),
            Self::Uint16(v) => Some(v as u64),
            Self::Uint32(v) => Some(v as u64),
            Self::Uint64(v) => Some(v),
            Self::Int8(v) => u64::try_from(v).ok(),
            Self::Int16(v) => u64::try_from(v).ok(),
            Self::Int32(v) => u64::try_from(v).ok(),
            Self::Int64(v) => u64::try_from(v).ok(),
            Self::Float(_) | Self::Double(_) | Self::Bytes(_) => None,
        }
    }

    /// Signed view of an integral value. None if it does not fit in i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Char(v) | Self::Uint8(v) => Some(v as i64),
            Self::Uint16(v) => Some(v as i64),
            Self::Uint32(v) => Some(v as i64),
            Self::Uint64(v) => i64::try_from(v).ok(),
            Self::Int8(v) => Some(v as i64),
            Self::Int16(v) => Some(v as i64),
            Self::Int32(v) => Some(v as i64),
            Self::Int64(v) => Some(v),
            Self::Float(_) | Self::Double(_) | Self::Bytes(_) => None,
        }
    }

    /// Floating-point view. Integers convert (possibly lossily for 64-bit).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            Self::Bytes(_) => None,
            _ => self.as_i64().map(|v| v as f64).or_else(|| self.as_u64().map(|v| v as f64)),
        }
    }

    /// Raw bytes of an array value.
    #[inline]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text of a char array, cut at the first NUL pad byte.
    ///
    /// None if the value is not an array or is not valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        let bytes = self.as_bytes()?;
        let end = memchr(0, bytes).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..end]).ok()
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

impl fmt::Display for PrimitiveValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Char(c) => write!(f, "{}", c as char),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint8(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bytes(_) => match self.as_str() {
                Some(s) => write!(f, "{s:?}"),
                None => write!(f, "{:02x?}", self.as_bytes().unwrap_or_default()),
            },
        }
    }
}
