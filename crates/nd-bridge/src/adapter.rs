//! Array Interop Adapter
//!
//! [`ArrayAdapter`] is the entry point for moving arrays across the bridge:
//!
//! ```text
//! NativeArray --create--> ArrayHandle --to_native--> NativeArray
//! ArrayInterface --create_from_interface--> ArrayHandle --to_interface--> ArrayInterface
//! ```
//!
//! Both directions are synchronous, copy-based and leave their input
//! untouched. For any native array `a`, `to_native(create(a))` has the same
//! shape and the same row-major element sequence as `a`.

use ndarray::{ArrayBase, Data, Dimension};
use tracing::{debug, instrument, warn};

use crate::config::AdapterConfig;
use crate::dtype::Element;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::ArrayHandle;
use crate::interface::ArrayInterface;
use crate::native::NativeArray;

/// Creates handles from native arrays and exports them back.
#[derive(Debug, Clone, Default)]
pub struct ArrayAdapter {
    config: AdapterConfig,
}

impl ArrayAdapter {
    /// Adapter without limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter with explicit settings
    pub fn with_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Active settings
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn check_limit(&self, elements: usize) -> BridgeResult<()> {
        match self.config.max_elements {
            Some(limit) if elements > limit => {
                warn!(elements, limit, "array rejected by element limit");
                Err(BridgeError::LimitExceeded { elements, limit })
            }
            _ => Ok(()),
        }
    }

    /// Wrap a native array in a new handle.
    ///
    /// The handle's shape equals the source shape and its row-major elements
    /// equal the source's row-major elements. The source is copied, never
    /// borrowed.
    #[instrument(skip_all, fields(shape = ?source.shape(), dtype = %source.dtype()))]
    pub fn create(&self, source: &NativeArray) -> BridgeResult<ArrayHandle> {
        self.check_limit(source.len())?;
        let handle = ArrayHandle::from_native(source);
        debug!(id = handle.id(), "created handle from native array");
        Ok(handle)
    }

    /// Wrap any typed `ndarray` array or view in a new handle
    #[instrument(skip_all, fields(shape = ?source.shape(), dtype = %<S::Elem as Element>::DTYPE))]
    pub fn create_from_array<S, D>(&self, source: &ArrayBase<S, D>) -> BridgeResult<ArrayHandle>
    where
        S: Data,
        S::Elem: Element,
        D: Dimension,
    {
        self.check_limit(source.len())?;
        let handle = ArrayHandle::from_array(source);
        debug!(id = handle.id(), "created handle from typed array");
        Ok(handle)
    }

    /// Validate an array-interface document and wrap its elements.
    ///
    /// Fails with `UnsupportedDtype` for typestrs outside the supported set and
    /// with `InvalidShape` for negative dimensions, mismatched strides or a
    /// buffer too small for the declared shape.
    #[instrument(skip_all, fields(typestr = %iface.typestr, shape = ?iface.shape))]
    pub fn create_from_interface(&self, iface: &ArrayInterface) -> BridgeResult<ArrayHandle> {
        let (layout, endian) = iface.layout().map_err(|err| {
            warn!(%err, "rejected array interface");
            err
        })?;
        self.check_limit(layout.size())?;

        let data = layout.gather(&iface.data, endian.needs_swap())?;
        let handle = ArrayHandle::from_bytes(data, layout.shape, layout.dtype)?;
        debug!(id = handle.id(), swapped = endian.needs_swap(), "created handle from array interface");
        Ok(handle)
    }

    /// Materialize a native array from a handle.
    ///
    /// Fails with `ConversionError` if the handle's buffer does not cover its
    /// declared layout. Repeated calls return equal arrays.
    #[instrument(skip_all, fields(id = handle.id()))]
    pub fn to_native(&self, handle: &ArrayHandle) -> BridgeResult<NativeArray> {
        handle.to_native().map_err(|err| {
            warn!(%err, "handle export failed");
            err
        })
    }

    /// Describe a handle as a C-contiguous array-interface document
    #[instrument(skip_all, fields(id = handle.id()))]
    pub fn to_interface(&self, handle: &ArrayHandle) -> BridgeResult<ArrayInterface> {
        handle.to_interface()
    }
}

/// Wrap a native array using an adapter without limits
pub fn create(source: &NativeArray) -> BridgeResult<ArrayHandle> {
    ArrayAdapter::new().create(source)
}

/// Materialize a native array from a handle
pub fn to_native(handle: &ArrayHandle) -> BridgeResult<NativeArray> {
    ArrayAdapter::new().to_native(handle)
}
