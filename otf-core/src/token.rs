//! Schema tokens - the self-describing input that drives the decoder.
//!
//! A message schema is flattened into a linear run of tokens. Containers
//! (messages, fields, groups, composites) are represented by BEGIN/END pairs;
//! leaf primitives are `Encoding` tokens carrying size, byte order and type.
//!
//! The group from the reference layout flattens to:
//! ```text
//! BeginGroup      "GroupName"
//! BeginComposite  "groupSizeEncoding"
//! Encoding        "blockLength"  uint16  offset 0
//! Encoding        "numInGroup"   uint8   offset 2
//! EndComposite    "groupSizeEncoding"
//! BeginField      "FieldName"
//! Encoding        "uint32"       uint32  offset 0
//! EndField        "FieldName"
//! EndGroup        "GroupName"
//! ```

use std::fmt;
use std::str::FromStr;

use phf::phf_map;

/// Offset/size sentinel for container tokens whose extent is not fixed.
pub const VARIABLE_SIZE: u32 = 0xFFFF_FFFF;

/// Schema id carried by tokens that have no meaningful identifier.
pub const INVALID_ID: u16 = 0xFFFF;

// ============================================================================
// Signal
// ============================================================================

/// Role of a token within the flattened schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    BeginMessage,
    EndMessage,
    BeginComposite,
    EndComposite,
    BeginField,
    EndField,
    BeginGroup,
    EndGroup,
    Encoding,
    None,
}

/// Container families. A BEGIN and END token match when their families agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Message,
    Composite,
    Field,
    Group,
}

static SIGNAL_NAMES: phf::Map<&'static str, Signal> = phf_map! {
    "BEGIN_MESSAGE" => Signal::BeginMessage,
    "END_MESSAGE" => Signal::EndMessage,
    "BEGIN_COMPOSITE" => Signal::BeginComposite,
    "END_COMPOSITE" => Signal::EndComposite,
    "BEGIN_FIELD" => Signal::BeginField,
    "END_FIELD" => Signal::EndField,
    "BEGIN_GROUP" => Signal::BeginGroup,
    "END_GROUP" => Signal::EndGroup,
    "ENCODING" => Signal::Encoding,
    "NONE" => Signal::None,
};

impl Signal {
    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::BeginMessage => "BEGIN_MESSAGE",
            Self::EndMessage => "END_MESSAGE",
            Self::BeginComposite => "BEGIN_COMPOSITE",
            Self::EndComposite => "END_COMPOSITE",
            Self::BeginField => "BEGIN_FIELD",
            Self::EndField => "END_FIELD",
            Self::BeginGroup => "BEGIN_GROUP",
            Self::EndGroup => "END_GROUP",
            Self::Encoding => "ENCODING",
            Self::None => "NONE",
        }
    }

    /// Look up a signal by its canonical name.
    pub fn from_name(name: &str) -> Option<Signal> {
        SIGNAL_NAMES.get(name).copied()
    }

    /// Check if this opens a container (has a matching end).
    #[inline]
    pub fn is_begin(self) -> bool {
        matches!(
            self,
            Self::BeginMessage | Self::BeginComposite | Self::BeginField | Self::BeginGroup
        )
    }

    /// Check if this closes a container.
    #[inline]
    pub fn is_end(self) -> bool {
        matches!(
            self,
            Self::EndMessage | Self::EndComposite | Self::EndField | Self::EndGroup
        )
    }

    /// Container family, or None for `Encoding`/`None`.
    pub fn family(self) -> Option<Family> {
        match self {
            Self::BeginMessage | Self::EndMessage => Some(Family::Message),
            Self::BeginComposite | Self::EndComposite => Some(Family::Composite),
            Self::BeginField | Self::EndField => Some(Family::Field),
            Self::BeginGroup | Self::EndGroup => Some(Family::Group),
            Self::Encoding | Self::None => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::from_name(s).ok_or_else(|| format!("unknown signal '{s}'"))
    }
}

// ============================================================================
// Byte order
// ============================================================================

/// Byte order of a multi-byte primitive. Declared per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

static BYTE_ORDER_NAMES: phf::Map<&'static str, ByteOrder> = phf_map! {
    "littleEndian" => ByteOrder::LittleEndian,
    "LITTLE_ENDIAN" => ByteOrder::LittleEndian,
    "le" => ByteOrder::LittleEndian,
    "bigEndian" => ByteOrder::BigEndian,
    "BIG_ENDIAN" => ByteOrder::BigEndian,
    "be" => ByteOrder::BigEndian,
};

impl ByteOrder {
    pub fn from_name(name: &str) -> Option<ByteOrder> {
        BYTE_ORDER_NAMES.get(name).copied()
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ByteOrder::from_name(s).ok_or_else(|| format!("unknown byte order '{s}'"))
    }
}

// ============================================================================
// Primitive type
// ============================================================================

/// Primitive encoding of an `Encoding` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PrimitiveType {
    #[default]
    None,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
}

static PRIMITIVE_NAMES: phf::Map<&'static str, PrimitiveType> = phf_map! {
    "none" => PrimitiveType::None,
    "char" => PrimitiveType::Char,
    "int8" => PrimitiveType::Int8,
    "int16" => PrimitiveType::Int16,
    "int32" => PrimitiveType::Int32,
    "int64" => PrimitiveType::Int64,
    "uint8" => PrimitiveType::Uint8,
    "uint16" => PrimitiveType::Uint16,
    "uint32" => PrimitiveType::Uint32,
    "uint64" => PrimitiveType::Uint64,
    "float" => PrimitiveType::Float,
    "double" => PrimitiveType::Double,
};

impl PrimitiveType {
    /// Lower-case schema name (`uint16`, `char`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Char => "char",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Look up a primitive type by name. Case-insensitive.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        PRIMITIVE_NAMES
            .get(name)
            .or_else(|| PRIMITIVE_NAMES.get(name.to_ascii_lowercase().as_str()))
            .copied()
    }

    /// Width in bytes of a single element, None for `None`.
    #[inline]
    pub fn width(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Char | Self::Int8 | Self::Uint8 => Some(1),
            Self::Int16 | Self::Uint16 => Some(2),
            Self::Int32 | Self::Uint32 | Self::Float => Some(4),
            Self::Int64 | Self::Uint64 | Self::Double => Some(8),
        }
    }

    /// Check if values of this type are integers (usable as counts or ids).
    #[inline]
    pub fn is_integral(self) -> bool {
        !matches!(self, Self::None | Self::Float | Self::Double)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::from_name(s).ok_or_else(|| format!("unknown primitive type '{s}'"))
    }
}

// ============================================================================
// Token
// ============================================================================

/// One schema element descriptor.
///
/// Tokens are produced by a schema compiler and never mutated by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub signal: Signal,
    /// Byte offset within the enclosing field or composite, or `VARIABLE_SIZE`.
    pub offset: u32,
    /// Encoded width in bytes. Zero or `VARIABLE_SIZE` on most containers.
    pub size: u32,
    pub byte_order: ByteOrder,
    pub primitive_type: PrimitiveType,
    /// Template id, group id or field id depending on `signal`.
    pub schema_id: u16,
    pub name: String,
}

impl Token {
    pub fn new(
        offset: u32,
        size: u32,
        signal: Signal,
        byte_order: ByteOrder,
        primitive_type: PrimitiveType,
        schema_id: u16,
        name: impl Into<String>,
    ) -> Self {
        Self {
            signal,
            offset,
            size,
            byte_order,
            primitive_type,
            schema_id,
            name: name.into(),
        }
    }

    /// Fixed offset, None when the token carries the sentinel.
    #[inline]
    pub fn fixed_offset(&self) -> Option<usize> {
        (self.offset != VARIABLE_SIZE).then_some(self.offset as usize)
    }

    /// Fixed size, None when the token carries the sentinel.
    #[inline]
    pub fn fixed_size(&self) -> Option<usize> {
        (self.size != VARIABLE_SIZE).then_some(self.size as usize)
    }

    /// Check if `end` closes the container this token opens.
    pub fn matches_end(&self, end: &Token) -> bool {
        self.signal.is_begin()
            && end.signal.is_end()
            && self.signal.family() == end.signal.family()
            && self.schema_id == end.schema_id
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' (id {})", self.signal, self.name, self.schema_id)?;
        if self.signal == Signal::Encoding {
            write!(f, " {} {}@{}", self.primitive_type, self.size, self.offset)?;
        }
        Ok(())
    }
}
