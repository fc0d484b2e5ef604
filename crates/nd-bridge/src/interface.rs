//! Array Interface Documents
//!
//! [`ArrayInterface`] is a raw, self-describing description of an array,
//! modeled on NumPy's `__array_interface__` protocol:
//!
//! | Field     | Meaning                                              |
//! |-----------|------------------------------------------------------|
//! | `shape`   | dimension sizes, signed so malformed input survives  |
//! | `typestr` | byte order + kind + item size, e.g. `"<f8"`          |
//! | `strides` | optional byte strides; absent means C-contiguous     |
//! | `offset`  | byte offset of the first element inside `data`       |
//! | `data`    | the raw buffer                                       |
//! | `version` | protocol version, always 3                           |
//!
//! This is the boundary where untrusted metadata enters, so it is where
//! `InvalidShape` and `UnsupportedDtype` are raised.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::dtype::{DType, Endian};
use crate::error::{BridgeError, BridgeResult};
use crate::layout::ArrayLayout;

/// Protocol version written into every document
pub const INTERFACE_VERSION: u32 = 3;

fn default_version() -> u32 {
    INTERFACE_VERSION
}

/// Raw array description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayInterface {
    /// Dimension sizes
    pub shape: Vec<i64>,
    /// Byte order, kind and item size
    pub typestr: SmolStr,
    /// Byte strides per dimension, `None` for C-contiguous data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strides: Option<Vec<isize>>,
    /// Byte offset of the first element
    #[serde(default)]
    pub offset: usize,
    /// Raw element bytes
    pub data: Vec<u8>,
    /// Protocol version
    #[serde(default = "default_version")]
    pub version: u32,
}

impl ArrayInterface {
    /// Describe a C-contiguous buffer
    pub fn new(shape: Vec<i64>, typestr: impl Into<SmolStr>, data: Vec<u8>) -> Self {
        Self {
            shape,
            typestr: typestr.into(),
            strides: None,
            offset: 0,
            data,
            version: INTERFACE_VERSION,
        }
    }

    /// Set explicit byte strides
    pub fn with_strides(mut self, strides: Vec<isize>) -> Self {
        self.strides = Some(strides);
        self
    }

    /// Set the byte offset of the first element
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Parse the typestr
    pub fn dtype(&self) -> BridgeResult<(DType, Endian)> {
        DType::parse_typestr(&self.typestr)
    }

    /// Validate and convert the shape to unsigned dimensions
    pub fn dims(&self) -> BridgeResult<Vec<usize>> {
        let mut dims = Vec::with_capacity(self.shape.len());
        let mut elements: usize = 1;

        for (axis, &dim) in self.shape.iter().enumerate() {
            let dim = usize::try_from(dim).map_err(|_| {
                BridgeError::invalid_shape(format!("dimension {axis} is negative ({dim})"))
            })?;
            elements = elements.checked_mul(dim).ok_or_else(|| {
                BridgeError::invalid_shape(format!("shape {:?} overflows", self.shape))
            })?;
            dims.push(dim);
        }

        Ok(dims)
    }

    /// Validate the whole document and return its layout and byte order.
    ///
    /// The dtype is checked first, then the shape, then the strides and
    /// finally that every addressed element lies inside `data`.
    pub fn layout(&self) -> BridgeResult<(ArrayLayout, Endian)> {
        let (dtype, endian) = self.dtype()?;
        let dims = self.dims()?;

        let elements = dims.iter().product::<usize>();
        let addressable = elements
            .checked_mul(dtype.size())
            .map_or(false, |nbytes| isize::try_from(nbytes).is_ok());
        if !addressable {
            return Err(BridgeError::invalid_shape(format!(
                "shape {:?} of {dtype} exceeds the addressable byte range",
                self.shape
            )));
        }

        let layout = match &self.strides {
            Some(strides) => ArrayLayout::strided(dims, strides.clone(), dtype, self.offset)?,
            None => {
                let mut layout = ArrayLayout::c_contiguous(dims, dtype);
                layout.offset = self.offset;
                layout
            }
        };

        if !layout.fits(self.data.len()) {
            return Err(BridgeError::invalid_shape(format!(
                "shape {:?} addresses {} but the buffer holds {}",
                self.shape,
                layout.describe_span(),
                self.data.len()
            )));
        }

        Ok((layout, endian))
    }

    /// Validate and copy the elements into native-endian row-major order
    pub fn to_row_major(&self) -> BridgeResult<(ArrayLayout, Vec<u8>)> {
        let (layout, endian) = self.layout()?;
        let bytes = layout.gather(&self.data, endian.needs_swap())?;
        let row_major = ArrayLayout::c_contiguous(layout.shape, layout.dtype);
        Ok((row_major, bytes))
    }

    /// Decode a JSON document
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as a JSON document
    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
