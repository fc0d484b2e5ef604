//! Native Arrays
//!
//! A [`NativeArray`] is a value of the external numeric array library
//! (`ndarray`) whose element type is one of the supported [`DType`]s. The
//! closed enum lets callers hand over arrays whose dtype is only known at
//! runtime while keeping every variant statically typed.
//!
//! Element order is always observed through `ndarray`'s logical iteration, so
//! C-ordered, Fortran-ordered and strided arrays flatten identically.

use ndarray::{ArrayD, IxDyn};

use crate::dtype::{DType, Element};
use crate::error::{BridgeError, BridgeResult};

/// An `ndarray` array of one of the supported element types.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeArray {
    /// `bool` elements
    Bool(ArrayD<bool>),
    /// `i8` elements
    Int8(ArrayD<i8>),
    /// `i16` elements
    Int16(ArrayD<i16>),
    /// `i32` elements
    Int32(ArrayD<i32>),
    /// `i64` elements
    Int64(ArrayD<i64>),
    /// `u8` elements
    UInt8(ArrayD<u8>),
    /// `u16` elements
    UInt16(ArrayD<u16>),
    /// `u32` elements
    UInt32(ArrayD<u32>),
    /// `u64` elements
    UInt64(ArrayD<u64>),
    /// `f32` elements
    Float32(ArrayD<f32>),
    /// `f64` elements
    Float64(ArrayD<f64>),
}

macro_rules! dispatch {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            NativeArray::Bool($arr) => $body,
            NativeArray::Int8($arr) => $body,
            NativeArray::Int16($arr) => $body,
            NativeArray::Int32($arr) => $body,
            NativeArray::Int64($arr) => $body,
            NativeArray::UInt8($arr) => $body,
            NativeArray::UInt16($arr) => $body,
            NativeArray::UInt32($arr) => $body,
            NativeArray::UInt64($arr) => $body,
            NativeArray::Float32($arr) => $body,
            NativeArray::Float64($arr) => $body,
        }
    };
}

fn encode<T: Element>(arr: &ArrayD<T>) -> Vec<u8> {
    let mut out = Vec::with_capacity(arr.len() * T::DTYPE.size());
    for value in arr.iter() {
        value.write_ne(&mut out);
    }
    out
}

pub(crate) fn decode<T: Element>(shape: &[usize], bytes: &[u8]) -> BridgeResult<ArrayD<T>> {
    let values: Vec<T> = bytes.chunks_exact(T::DTYPE.size()).map(T::read_ne).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

impl NativeArray {
    /// Element kind of this array
    pub fn dtype(&self) -> DType {
        match self {
            NativeArray::Bool(_) => DType::Bool,
            NativeArray::Int8(_) => DType::Int8,
            NativeArray::Int16(_) => DType::Int16,
            NativeArray::Int32(_) => DType::Int32,
            NativeArray::Int64(_) => DType::Int64,
            NativeArray::UInt8(_) => DType::UInt8,
            NativeArray::UInt16(_) => DType::UInt16,
            NativeArray::UInt32(_) => DType::UInt32,
            NativeArray::UInt64(_) => DType::UInt64,
            NativeArray::Float32(_) => DType::Float32,
            NativeArray::Float64(_) => DType::Float64,
        }
    }

    /// Shape of the array
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, arr => arr.shape())
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        dispatch!(self, arr => arr.ndim())
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        dispatch!(self, arr => arr.len())
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the array is stored in C order without gaps
    pub fn is_standard_layout(&self) -> bool {
        dispatch!(self, arr => arr.is_standard_layout())
    }

    /// Native-endian element bytes in row-major order
    pub fn to_row_major_bytes(&self) -> Vec<u8> {
        dispatch!(self, arr => encode(arr))
    }

    /// Build an array from native-endian, row-major element bytes
    pub fn from_row_major_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> BridgeResult<Self> {
        let expected = shape.iter().product::<usize>() * dtype.size();
        if bytes.len() != expected {
            return Err(BridgeError::conversion(format!(
                "{} bytes cannot fill shape {:?} of {}",
                bytes.len(),
                shape,
                dtype
            )));
        }

        Ok(match dtype {
            DType::Bool => NativeArray::Bool(decode(shape, bytes)?),
            DType::Int8 => NativeArray::Int8(decode(shape, bytes)?),
            DType::Int16 => NativeArray::Int16(decode(shape, bytes)?),
            DType::Int32 => NativeArray::Int32(decode(shape, bytes)?),
            DType::Int64 => NativeArray::Int64(decode(shape, bytes)?),
            DType::UInt8 => NativeArray::UInt8(decode(shape, bytes)?),
            DType::UInt16 => NativeArray::UInt16(decode(shape, bytes)?),
            DType::UInt32 => NativeArray::UInt32(decode(shape, bytes)?),
            DType::UInt64 => NativeArray::UInt64(decode(shape, bytes)?),
            DType::Float32 => NativeArray::Float32(decode(shape, bytes)?),
            DType::Float64 => NativeArray::Float64(decode(shape, bytes)?),
        })
    }

    /// Build an array from a shape and row-major values
    pub fn from_shape_vec<T: NativeElement>(shape: &[usize], values: Vec<T>) -> BridgeResult<Self> {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|err| BridgeError::invalid_shape(err.to_string()))?;
        Ok(T::wrap(arr))
    }

    /// Borrow the typed array, failing if the element type differs
    pub fn as_typed<T: NativeElement>(&self) -> BridgeResult<&ArrayD<T>> {
        T::peek(self).ok_or_else(|| BridgeError::dtype_mismatch(T::DTYPE, self.dtype()))
    }

    /// Take the typed array, failing if the element type differs
    pub fn into_typed<T: NativeElement>(self) -> BridgeResult<ArrayD<T>> {
        let actual = self.dtype();
        T::take(self).ok_or_else(|| BridgeError::dtype_mismatch(T::DTYPE, actual))
    }

    /// Row-major values as a typed vector
    pub fn to_flat_vec<T: NativeElement>(&self) -> BridgeResult<Vec<T>> {
        Ok(self.as_typed::<T>()?.iter().copied().collect())
    }
}

/// Element types with a [`NativeArray`] variant.
pub trait NativeElement: Element {
    /// Wrap a typed array in its variant
    fn wrap(arr: ArrayD<Self>) -> NativeArray;

    /// Borrow the typed array if the variant matches
    fn peek(native: &NativeArray) -> Option<&ArrayD<Self>>;

    /// Take the typed array if the variant matches
    fn take(native: NativeArray) -> Option<ArrayD<Self>>;
}

macro_rules! impl_native_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl NativeElement for $ty {
                fn wrap(arr: ArrayD<Self>) -> NativeArray {
                    NativeArray::$variant(arr)
                }

                fn peek(native: &NativeArray) -> Option<&ArrayD<Self>> {
                    match native {
                        NativeArray::$variant(arr) => Some(arr),
                        _ => None,
                    }
                }

                fn take(native: NativeArray) -> Option<ArrayD<Self>> {
                    match native {
                        NativeArray::$variant(arr) => Some(arr),
                        _ => None,
                    }
                }
            }

            impl From<ArrayD<$ty>> for NativeArray {
                fn from(arr: ArrayD<$ty>) -> Self {
                    NativeArray::$variant(arr)
                }
            }
        )*
    };
}

impl_native_element! {
    bool => Bool,
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
