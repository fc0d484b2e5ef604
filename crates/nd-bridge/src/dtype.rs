//! Element Kinds
//!
//! The bridge supports a closed set of numeric element kinds. Anything else
//! (complex numbers, half floats, strings, objects, datetimes) is rejected with
//! [`BridgeError::UnsupportedDtype`] at creation time instead of failing later.
//!
//! Two spellings are understood:
//! - dtype names and single-character codes (`"float64"`, `"f8"`, `"d"`)
//! - array-interface typestrs (`"<f8"`, `"|b1"`, `">i4"`)

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::{BridgeError, BridgeResult};

/// Supported element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean stored as one byte
    Bool,

    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,

    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,

    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
}

impl DType {
    /// Every supported dtype, in declaration order
    pub const ALL: [DType; 11] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    /// Get the size in bytes for this dtype
    pub fn size(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 => 8,
        }
    }

    /// Get the kind character used in typestrs
    pub fn kind(&self) -> char {
        match self {
            DType::Bool => 'b',
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 => 'i',
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64 => 'u',
            DType::Float32 | DType::Float64 => 'f',
        }
    }

    /// Get the dtype name (e.g., "float64")
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), 'i' | 'u')
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        self.kind() == 'f'
    }

    /// Check if this is a signed type
    pub fn is_signed(&self) -> bool {
        matches!(self.kind(), 'i' | 'f')
    }

    /// Look up a dtype by kind character and byte size
    pub fn from_kind(kind: char, size: usize) -> Option<Self> {
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.kind() == kind && dtype.size() == size)
    }

    /// Parse an array-interface typestr such as `"<f8"`.
    ///
    /// The first character is the byte order, the second the kind, the rest
    /// the item size in bytes.
    pub fn parse_typestr(typestr: &str) -> BridgeResult<(Self, Endian)> {
        let unsupported = || BridgeError::unsupported_dtype(typestr);

        let mut chars = typestr.chars();
        let endian = chars.next().and_then(Endian::from_char).ok_or_else(unsupported)?;
        let kind = chars.next().ok_or_else(unsupported)?;
        let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;

        let dtype = DType::from_kind(kind, size).ok_or_else(unsupported)?;
        Ok((dtype, endian))
    }

    /// Render the native-endian typestr for this dtype
    pub fn typestr(&self) -> SmolStr {
        let endian = if self.size() == 1 {
            Endian::NotApplicable
        } else {
            Endian::native()
        };
        SmolStr::new(format!("{}{}{}", endian.as_char(), self.kind(), self.size()))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" | "bool_" | "?" | "b1" => Ok(DType::Bool),
            "int8" | "i1" | "b" => Ok(DType::Int8),
            "int16" | "i2" | "h" => Ok(DType::Int16),
            "int32" | "i4" | "i" => Ok(DType::Int32),
            "int64" | "i8" | "l" => Ok(DType::Int64),
            "uint8" | "u1" | "B" => Ok(DType::UInt8),
            "uint16" | "u2" | "H" => Ok(DType::UInt16),
            "uint32" | "u4" | "I" => Ok(DType::UInt32),
            "uint64" | "u8" | "L" => Ok(DType::UInt64),
            "float32" | "f4" | "f" => Ok(DType::Float32),
            "float64" | "f8" | "d" | "float" => Ok(DType::Float64),
            other => Err(BridgeError::unsupported_dtype(other)),
        }
    }
}

/// Byte order of multi-byte elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// `<`
    Little,
    /// `>`
    Big,
    /// `|`, single-byte elements
    NotApplicable,
}

impl Endian {
    /// Byte order of the running target
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Endian::Little),
            '>' => Some(Endian::Big),
            '|' => Some(Endian::NotApplicable),
            '=' => Some(Endian::native()),
            _ => None,
        }
    }

    /// Typestr prefix character
    pub fn as_char(&self) -> char {
        match self {
            Endian::Little => '<',
            Endian::Big => '>',
            Endian::NotApplicable => '|',
        }
    }

    /// Whether bytes in this order must be swapped to read them natively
    pub fn needs_swap(&self) -> bool {
        *self != Endian::NotApplicable && *self != Endian::native()
    }
}

// ============================================================================
// Element - Rust scalar types that map onto a DType
// ============================================================================

/// Rust scalar types that can be stored in an array handle.
///
/// Elements are encoded in native byte order.
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The dtype this type maps to
    const DTYPE: DType;

    /// Decode one element from the first `DTYPE.size()` bytes
    fn read_ne(bytes: &[u8]) -> Self;

    /// Append the native-endian encoding of this element
    fn write_ne(&self, out: &mut Vec<u8>);
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn read_ne(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_ne(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                fn read_ne(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_ne_bytes(buf)
                }

                fn write_ne(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}
