//! Memory Layout
//!
//! An [`ArrayLayout`] describes how the elements of an n-dimensional array sit
//! in a flat byte buffer: shape, byte strides, element dtype and the byte
//! offset of element `[0, 0, ...]`.
//!
//! Logical element order is always row-major (last dimension varies fastest),
//! whatever the physical order of the buffer. [`RowMajorIndices`] walks that
//! logical order and [`ArrayLayout::gather`] produces a C-contiguous copy of
//! any layout in it.

use crate::dtype::DType;
use crate::error::{BridgeError, BridgeResult};

/// Memory layout order for multi-dimensional arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOrder {
    /// C-contiguous (row-major): last dimension varies fastest
    C,
    /// Fortran-contiguous (column-major): first dimension varies fastest
    Fortran,
    /// Neither C nor Fortran contiguous
    Neither,
}

/// Complete memory layout description for an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLayout {
    /// Shape of the array (dimensions)
    pub shape: Vec<usize>,
    /// Strides in bytes for each dimension
    pub strides: Vec<isize>,
    /// Data type
    pub dtype: DType,
    /// Memory order
    pub order: ArrayOrder,
    /// Byte offset of the first element
    pub offset: usize,
}

// Strides saturate at isize::MAX; such layouts then fail `span`.
fn contiguous_strides<'a>(dims: impl Iterator<Item = &'a usize>, itemsize: usize) -> Vec<isize> {
    let mut strides = Vec::new();
    let mut stride = isize::try_from(itemsize).unwrap_or(isize::MAX);

    for &dim in dims {
        strides.push(stride);
        stride = stride.saturating_mul(isize::try_from(dim.max(1)).unwrap_or(isize::MAX));
    }
    strides
}

fn c_strides(shape: &[usize], itemsize: usize) -> Vec<isize> {
    let mut strides = contiguous_strides(shape.iter().rev(), itemsize);
    strides.reverse();
    strides
}

fn fortran_strides(shape: &[usize], itemsize: usize) -> Vec<isize> {
    contiguous_strides(shape.iter(), itemsize)
}

impl ArrayLayout {
    /// Create a new C-contiguous layout for the given shape and dtype
    pub fn c_contiguous(shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            strides: c_strides(&shape, dtype.size()),
            shape,
            dtype,
            order: ArrayOrder::C,
            offset: 0,
        }
    }

    /// Create a new Fortran-contiguous layout for the given shape and dtype
    pub fn fortran_contiguous(shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            strides: fortran_strides(&shape, dtype.size()),
            shape,
            dtype,
            order: ArrayOrder::Fortran,
            offset: 0,
        }
    }

    /// Create a layout from explicit byte strides, classifying its order.
    ///
    /// Fails if the number of strides differs from the number of dimensions.
    pub fn strided(
        shape: Vec<usize>,
        strides: Vec<isize>,
        dtype: DType,
        offset: usize,
    ) -> BridgeResult<Self> {
        if strides.len() != shape.len() {
            return Err(BridgeError::invalid_shape(format!(
                "{} strides given for {} dimensions",
                strides.len(),
                shape.len()
            )));
        }

        let order = if strides == c_strides(&shape, dtype.size()) {
            ArrayOrder::C
        } else if strides == fortran_strides(&shape, dtype.size()) {
            ArrayOrder::Fortran
        } else {
            ArrayOrder::Neither
        };

        Ok(Self {
            shape,
            strides,
            dtype,
            order,
            offset,
        })
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements, saturating at `usize::MAX`
    pub fn size(&self) -> usize {
        self.shape.iter().fold(1usize, |acc, &dim| acc.saturating_mul(dim))
    }

    /// Get the total size in bytes, saturating at `usize::MAX`
    pub fn nbytes(&self) -> usize {
        self.size().saturating_mul(self.dtype.size())
    }

    /// Check if layout is C-contiguous
    pub fn is_c_contiguous(&self) -> bool {
        self.order == ArrayOrder::C
    }

    /// Check if layout is Fortran-contiguous
    pub fn is_fortran_contiguous(&self) -> bool {
        self.order == ArrayOrder::Fortran
    }

    /// Byte offset of the element at `indices`, or `None` if out of bounds
    pub fn byte_offset(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }

        if indices.iter().zip(&self.shape).any(|(idx, dim)| idx >= dim) {
            return None;
        }

        let mut position = isize::try_from(self.offset).ok()?;
        for (&idx, &stride) in indices.iter().zip(&self.strides) {
            let step = isize::try_from(idx).ok()?.checked_mul(stride)?;
            position = position.checked_add(step)?;
        }

        usize::try_from(position).ok()
    }

    /// Calculate flat element index from multi-dimensional indices
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        self.byte_offset(indices)
            .map(|offset| offset / self.dtype.size())
    }

    /// Byte range `[lo, hi)` touched by this layout.
    ///
    /// Empty arrays touch nothing and report `(offset, offset)`. Negative
    /// strides can make `lo` negative, which no buffer can satisfy. Returns
    /// `None` when the range is not representable in `isize`.
    pub fn span(&self) -> Option<(isize, isize)> {
        let offset = isize::try_from(self.offset).ok()?;
        if self.size() == 0 {
            return Some((offset, offset));
        }

        let mut lo = offset;
        let mut hi = offset.checked_add(isize::try_from(self.dtype.size()).ok()?)?;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides) {
            let extent = isize::try_from(dim - 1).ok()?.checked_mul(stride)?;
            if extent < 0 {
                lo = lo.checked_add(extent)?;
            } else {
                hi = hi.checked_add(extent)?;
            }
        }
        Some((lo, hi))
    }

    /// Check that every element lies inside a buffer of `len` bytes
    pub fn fits(&self, len: usize) -> bool {
        match self.span() {
            Some((lo, hi)) => lo >= 0 && usize::try_from(hi).map_or(false, |hi| hi <= len),
            None => false,
        }
    }

    pub(crate) fn describe_span(&self) -> String {
        match self.span() {
            Some((lo, hi)) => format!("bytes {lo}..{hi}"),
            None => "a byte range beyond isize::MAX".to_string(),
        }
    }

    /// Iterate over all multi-indices in row-major order
    pub fn indices(&self) -> RowMajorIndices {
        RowMajorIndices::new(&self.shape)
    }

    /// Copy the elements addressed by this layout into a C-contiguous buffer.
    ///
    /// When `swap` is set every element's bytes are reversed, converting a
    /// foreign byte order to the native one.
    pub fn gather(&self, data: &[u8], swap: bool) -> BridgeResult<Vec<u8>> {
        if !self.fits(data.len()) {
            return Err(BridgeError::conversion(format!(
                "layout addresses {} but the buffer holds {}",
                self.describe_span(),
                data.len()
            )));
        }

        let itemsize = self.dtype.size();

        let mut out = if self.is_c_contiguous() {
            data[self.offset..self.offset + self.nbytes()].to_vec()
        } else {
            self.gather_strided(data)
        };

        if swap && itemsize > 1 {
            for element in out.chunks_exact_mut(itemsize) {
                element.reverse();
            }
        }

        Ok(out)
    }

    // Caller has checked `fits`, so every position lies inside `data` and
    // every `index * stride` is representable.
    fn gather_strided(&self, data: &[u8]) -> Vec<u8> {
        let itemsize = self.dtype.size();
        let mut out = Vec::with_capacity(self.nbytes());
        if self.size() == 0 {
            return out;
        }

        let mut index = vec![0usize; self.ndim()];
        let mut position = self.offset as isize;

        'elements: loop {
            let start = position as usize;
            out.extend_from_slice(&data[start..start + itemsize]);

            for axis in (0..index.len()).rev() {
                let stride = self.strides[axis];
                if index[axis] + 1 < self.shape[axis] {
                    index[axis] += 1;
                    position += stride;
                    continue 'elements;
                }
                position -= index[axis] as isize * stride;
                index[axis] = 0;
            }
            break;
        }

        out
    }

    /// Create a view with a slice
    pub fn slice_view(&self, start: &[usize], end: &[usize]) -> BridgeResult<Self> {
        if start.len() != self.ndim() || end.len() != self.ndim() {
            return Err(BridgeError::invalid_shape(
                "slice dimensions don't match array dimensions",
            ));
        }

        let mut new_shape = Vec::with_capacity(self.ndim());
        let mut new_offset = self.offset as isize;

        for (((&s, &e), &stride), &dim) in start
            .iter()
            .zip(end)
            .zip(&self.strides)
            .zip(&self.shape)
        {
            if s > e || e > dim {
                return Err(BridgeError::invalid_shape(format!(
                    "invalid slice {}:{} for dimension of size {}",
                    s, e, dim
                )));
            }
            new_shape.push(e - s);
            if e > s {
                new_offset += s as isize * stride;
            }
        }

        let offset = usize::try_from(new_offset)
            .map_err(|_| BridgeError::invalid_shape("slice starts before the buffer"))?;
        Self::strided(new_shape, self.strides.clone(), self.dtype, offset)
    }

    /// Reshape to new shape (must have same total size)
    pub fn reshape(&self, new_shape: Vec<usize>) -> BridgeResult<Self> {
        let new_size: usize = new_shape.iter().product();
        if new_size != self.size() {
            return Err(BridgeError::invalid_shape(format!(
                "cannot reshape array of size {} to shape {:?}",
                self.size(),
                new_shape
            )));
        }

        if !self.is_c_contiguous() {
            return Err(BridgeError::invalid_shape(
                "cannot reshape a non C-contiguous array without copying",
            ));
        }

        let mut layout = Self::c_contiguous(new_shape, self.dtype);
        layout.offset = self.offset;
        Ok(layout)
    }

    /// Transpose the array (reverse dimensions and strides)
    pub fn transpose(&self) -> Self {
        let mut new_shape = self.shape.clone();
        let mut new_strides = self.strides.clone();
        new_shape.reverse();
        new_strides.reverse();

        let new_order = match self.order {
            ArrayOrder::C if self.ndim() > 1 => ArrayOrder::Fortran,
            ArrayOrder::Fortran if self.ndim() > 1 => ArrayOrder::C,
            order => order,
        };

        Self {
            shape: new_shape,
            strides: new_strides,
            dtype: self.dtype,
            order: new_order,
            offset: self.offset,
        }
    }
}

// ============================================================================
// RowMajorIndices
// ============================================================================

/// Iterator over the multi-indices of a shape, last dimension fastest.
///
/// A zero-dimensional shape yields exactly one empty index; a shape with any
/// zero-length dimension yields nothing.
#[derive(Debug, Clone)]
pub struct RowMajorIndices {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl RowMajorIndices {
    /// Start iterating over `shape`
    pub fn new(shape: &[usize]) -> Self {
        let next = if shape.contains(&0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for RowMajorIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        let mut successor = current.clone();
        for axis in (0..successor.len()).rev() {
            successor[axis] += 1;
            if successor[axis] < self.shape[axis] {
                self.next = Some(successor);
                break;
            }
            successor[axis] = 0;
        }

        Some(current)
    }
}
