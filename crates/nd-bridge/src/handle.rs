//! Array Handles
//!
//! An [`ArrayHandle`] is the bridge's own representation of an array: a
//! layout plus an immutable, reference-counted byte buffer.
//!
//! ## Ownership
//!
//! Creating a handle from a native array or an array-interface document
//! always copies the elements into a fresh C-contiguous buffer owned by the
//! handle. Mutating the source afterwards cannot affect the handle.
//!
//! Views (`reshape`, `transpose`, `slice`, `clone`) share the buffer of the
//! handle they were derived from. Buffers are never written after creation,
//! so sharing is always safe across threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use tracing::trace;

use crate::dtype::{DType, Element};
use crate::error::{BridgeError, BridgeResult};
use crate::interface::ArrayInterface;
use crate::layout::ArrayLayout;
use crate::native::{self, NativeArray};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Ownership state of a handle's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The handle allocated the buffer
    Owned,
    /// The buffer belongs to another handle
    View,
}

/// Immutable array handle.
#[derive(Debug)]
pub struct ArrayHandle {
    /// Unique identifier for this handle
    id: u64,
    /// Memory layout
    layout: ArrayLayout,
    /// Element bytes, native byte order
    data: Arc<[u8]>,
    /// Ownership state
    ownership: Ownership,
    /// Handle this one was derived from (views only)
    base_id: Option<u64>,
}

impl ArrayHandle {
    fn owned(layout: ArrayLayout, data: Vec<u8>) -> Self {
        let handle = Self {
            id: next_id(),
            layout,
            data: Arc::from(data),
            ownership: Ownership::Owned,
            base_id: None,
        };
        trace!(
            id = handle.id,
            shape = ?handle.shape(),
            dtype = %handle.dtype(),
            "array handle created"
        );
        handle
    }

    fn view_of(&self, layout: ArrayLayout) -> Self {
        Self {
            id: next_id(),
            layout,
            data: Arc::clone(&self.data),
            ownership: Ownership::View,
            base_id: Some(self.id),
        }
    }

    /// Copy any `ndarray` array or view into a new handle.
    ///
    /// Elements are taken in logical row-major order, so Fortran-ordered and
    /// strided inputs are linearized correctly.
    pub fn from_array<S, D>(arr: &ArrayBase<S, D>) -> Self
    where
        S: Data,
        S::Elem: Element,
        D: Dimension,
    {
        let dtype = <S::Elem as Element>::DTYPE;
        let mut data = Vec::with_capacity(arr.len() * dtype.size());
        for value in arr.iter() {
            value.write_ne(&mut data);
        }
        Self::owned(ArrayLayout::c_contiguous(arr.shape().to_vec(), dtype), data)
    }

    /// Copy a native array into a new handle
    pub fn from_native(native: &NativeArray) -> Self {
        let layout = ArrayLayout::c_contiguous(native.shape().to_vec(), native.dtype());
        Self::owned(layout, native.to_row_major_bytes())
    }

    /// Create from native-endian, row-major bytes.
    ///
    /// Fails with `InvalidShape` if the byte count does not match the shape.
    pub fn from_bytes(data: Vec<u8>, shape: Vec<usize>, dtype: DType) -> BridgeResult<Self> {
        let layout = ArrayLayout::c_contiguous(shape, dtype);

        if data.len() != layout.nbytes() {
            return Err(BridgeError::invalid_shape(format!(
                "data size {} doesn't match expected size {}",
                data.len(),
                layout.nbytes()
            )));
        }

        Ok(Self::owned(layout, data))
    }

    /// Assemble a handle without checking the buffer against the layout.
    ///
    /// Inconsistencies surface as `ConversionError` when the handle is exported.
    pub fn from_raw_parts(data: Vec<u8>, layout: ArrayLayout) -> Self {
        Self::owned(layout, data)
    }

    /// Validate an array-interface document and copy its elements
    pub fn from_interface(iface: &ArrayInterface) -> BridgeResult<Self> {
        let (layout, data) = iface.to_row_major()?;
        Ok(Self::owned(layout, data))
    }

    /// Get the handle ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the layout
    pub fn layout(&self) -> &ArrayLayout {
        &self.layout
    }

    /// Get the shape
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    /// Get the dtype
    pub fn dtype(&self) -> DType {
        self.layout.dtype
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Get the total number of elements
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Get the total size in bytes
    pub fn nbytes(&self) -> usize {
        self.layout.nbytes()
    }

    /// Check if this is a view
    pub fn is_view(&self) -> bool {
        self.base_id.is_some()
    }

    /// ID of the handle this view was derived from
    pub fn base_id(&self) -> Option<u64> {
        self.base_id
    }

    /// Get ownership state
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Check whether two handles share one buffer
    pub fn shares_buffer_with(&self, other: &ArrayHandle) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Check that the buffer covers every element of the layout
    pub fn validate(&self) -> BridgeResult<()> {
        let exact = self.ownership == Ownership::Owned
            && self.layout.is_c_contiguous()
            && self.layout.offset == 0;

        let consistent = if exact {
            self.data.len() == self.layout.nbytes()
        } else {
            self.layout.fits(self.data.len())
        };

        if consistent {
            Ok(())
        } else {
            Err(BridgeError::conversion(format!(
                "buffer of {} bytes does not match shape {:?} of {}",
                self.data.len(),
                self.shape(),
                self.dtype()
            )))
        }
    }

    /// Element bytes in row-major order
    pub fn to_row_major_bytes(&self) -> BridgeResult<Vec<u8>> {
        self.validate()?;
        self.layout.gather(&self.data, false)
    }

    /// Materialize a native array with the same shape and elements
    pub fn to_native(&self) -> BridgeResult<NativeArray> {
        let bytes = self.to_row_major_bytes()?;
        NativeArray::from_row_major_bytes(self.dtype(), self.shape(), &bytes)
    }

    /// Materialize a typed `ndarray` array
    pub fn to_ndarray<T: Element>(&self) -> BridgeResult<ArrayD<T>> {
        self.expect_dtype::<T>()?;
        let bytes = self.to_row_major_bytes()?;
        native::decode(self.shape(), &bytes)
    }

    /// Describe the handle as a C-contiguous array-interface document
    pub fn to_interface(&self) -> BridgeResult<ArrayInterface> {
        let shape = self
            .shape()
            .iter()
            .map(|&dim| {
                i64::try_from(dim)
                    .map_err(|_| BridgeError::conversion(format!("dimension {dim} exceeds i64")))
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        Ok(ArrayInterface::new(
            shape,
            self.dtype().typestr(),
            self.to_row_major_bytes()?,
        ))
    }

    fn expect_dtype<T: Element>(&self) -> BridgeResult<()> {
        if T::DTYPE == self.dtype() {
            Ok(())
        } else {
            Err(BridgeError::dtype_mismatch(T::DTYPE, self.dtype()))
        }
    }

    /// Read the element at a multi-dimensional index
    pub fn get<T: Element>(&self, index: &[usize]) -> BridgeResult<T> {
        self.expect_dtype::<T>()?;

        let start = self
            .layout
            .byte_offset(index)
            .ok_or_else(|| BridgeError::index_out_of_bounds(index, self.shape()))?;

        self.data
            .get(start..start + self.dtype().size())
            .map(T::read_ne)
            .ok_or_else(|| BridgeError::conversion(format!("element {index:?} lies outside the buffer")))
    }

    /// Read the element at a position in row-major order
    pub fn get_flat<T: Element>(&self, index: usize) -> BridgeResult<T> {
        if index >= self.size() {
            return Err(BridgeError::index_out_of_bounds(&[index], &[self.size()]));
        }

        let mut multi = vec![0; self.ndim()];
        let mut rest = index;
        for (slot, &dim) in multi.iter_mut().zip(self.shape()).rev() {
            *slot = rest % dim;
            rest /= dim;
        }

        self.get(&multi)
    }

    /// Create a view with a slice
    pub fn slice(&self, start: &[usize], end: &[usize]) -> BridgeResult<Self> {
        Ok(self.view_of(self.layout.slice_view(start, end)?))
    }

    /// Reshape the array (a view; only C-contiguous handles can be reshaped)
    pub fn reshape(&self, new_shape: Vec<usize>) -> BridgeResult<Self> {
        Ok(self.view_of(self.layout.reshape(new_shape)?))
    }

    /// Transpose the array (creates a view)
    pub fn transpose(&self) -> Self {
        self.view_of(self.layout.transpose())
    }

    /// Copy the elements into a new, owned, C-contiguous handle
    pub fn copy(&self) -> BridgeResult<Self> {
        let data = self.to_row_major_bytes()?;
        let layout = ArrayLayout::c_contiguous(self.shape().to_vec(), self.dtype());
        Ok(Self::owned(layout, data))
    }
}

impl Clone for ArrayHandle {
    fn clone(&self) -> Self {
        // Clone creates a view, not a copy
        self.view_of(self.layout.clone())
    }
}

impl From<&NativeArray> for ArrayHandle {
    fn from(native: &NativeArray) -> Self {
        ArrayHandle::from_native(native)
    }
}
