//! Bounds-checked primitive decoding.
//!
//! All buffer access in the decoder goes through here. A read that would
//! leave the buffer becomes `Error::BufferUnderrun`; nothing indexes past
//! the end.

use crate::error::{Error, Result};
use crate::token::{ByteOrder, PrimitiveType, Token};
use crate::value::PrimitiveValue;

/// Bytes `offset..offset + len`, or an underrun error.
#[inline]
pub fn bytes_at(buffer: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(Error::BufferUnderrun {
            offset,
            needed: len,
            length: buffer.len(),
        })
}

#[inline]
fn array_at<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N]> {
    let bytes = bytes_at(buffer, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

macro_rules! read_fn {
    ($name:ident, $ty:ty, $n:literal) => {
        #[inline]
        pub fn $name(buffer: &[u8], offset: usize, order: ByteOrder) -> Result<$ty> {
            let raw = array_at::<$n>(buffer, offset)?;
            Ok(match order {
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
            })
        }
    };
}

read_fn!(read_u16, u16, 2);
read_fn!(read_u32, u32, 4);
read_fn!(read_u64, u64, 8);
read_fn!(read_i16, i16, 2);
read_fn!(read_i32, i32, 4);
read_fn!(read_i64, i64, 8);
read_fn!(read_f32, f32, 4);
read_fn!(read_f64, f64, 8);

#[inline]
pub fn read_u8(buffer: &[u8], offset: usize) -> Result<u8> {
    Ok(array_at::<1>(buffer, offset)?[0])
}

/// Decode the primitive described by `token` at `offset`.
///
/// `index` is the token's position in its stream, used for error reporting.
/// Single-byte types with a size greater than one decode as a byte array.
pub fn decode_primitive<'a>(
    buffer: &'a [u8],
    offset: usize,
    token: &Token,
    index: usize,
) -> Result<PrimitiveValue<'a>> {
    let ty = token.primitive_type;
    let unsupported = || Error::UnsupportedPrimitiveType {
        index,
        primitive_type: ty,
        size: token.size as usize,
    };
    let width = ty.width().ok_or_else(unsupported)?;
    let size = token.fixed_size().ok_or_else(unsupported)?;
    let order = token.byte_order;

    if size != width {
        return match ty {
            PrimitiveType::Char | PrimitiveType::Uint8 | PrimitiveType::Int8 if size > 1 => {
                bytes_at(buffer, offset, size).map(PrimitiveValue::Bytes)
            }
            _ => Err(unsupported()),
        };
    }

    Ok(match ty {
        PrimitiveType::Char => PrimitiveValue::Char(read_u8(buffer, offset)?),
        PrimitiveType::Uint8 => PrimitiveValue::Uint8(read_u8(buffer, offset)?),
        PrimitiveType::Int8 => PrimitiveValue::Int8(read_u8(buffer, offset)? as i8),
        PrimitiveType::Uint16 => PrimitiveValue::Uint16(read_u16(buffer, offset, order)?),
        PrimitiveType::Int16 => PrimitiveValue::Int16(read_i16(buffer, offset, order)?),
        PrimitiveType::Uint32 => PrimitiveValue::Uint32(read_u32(buffer, offset, order)?),
        PrimitiveType::Int32 => PrimitiveValue::Int32(read_i32(buffer, offset, order)?),
        PrimitiveType::Uint64 => PrimitiveValue::Uint64(read_u64(buffer, offset, order)?),
        PrimitiveType::Int64 => PrimitiveValue::Int64(read_i64(buffer, offset, order)?),
        PrimitiveType::Float => PrimitiveValue::Float(read_f32(buffer, offset, order)?),
        PrimitiveType::Double => PrimitiveValue::Double(read_f64(buffer, offset, order)?),
        PrimitiveType::None => return Err(unsupported()),
    })
}
