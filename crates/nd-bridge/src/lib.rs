//! # nd-bridge
//!
//! Array interop bridge between `ndarray` arrays and a self-contained,
//! immutable array handle.
//!
//! ## Overview
//!
//! - [`NativeArray`]: an `ndarray` array whose dtype is one of a closed set
//! - [`ArrayHandle`]: the bridge's representation (layout + shared buffer)
//! - [`ArrayAdapter`]: `create` and `to_native`, the two directions
//! - [`ArrayInterface`]: raw, serializable array description for foreign input
//!
//! ## Guarantees
//!
//! 1. **Shape round-trip**: `to_native(create(a)).shape() == a.shape()`
//! 2. **Value round-trip**: row-major element sequences are equal
//! 3. **Copy on create**: a handle never aliases its source
//! 4. **Fail fast**: unsupported dtypes and malformed shapes are rejected
//!    when the handle is created
//!
//! ## Example
//!
//! ```
//! use nd_bridge::{ArrayAdapter, NativeArray};
//!
//! let source = NativeArray::from_shape_vec(&[2, 2], vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
//! let adapter = ArrayAdapter::new();
//!
//! let handle = adapter.create(&source).unwrap();
//! let exported = adapter.to_native(&handle).unwrap();
//!
//! assert_eq!(exported.shape(), &[2, 2]);
//! assert_eq!(exported, source);
//! ```
//!
//! ## Module Structure
//!
//! - [`adapter`]: the create/export entry points
//! - [`handle`]: array handles and views
//! - [`native`]: the `ndarray`-backed native array enum
//! - [`interface`]: array-interface documents
//! - [`layout`]: shapes, strides and row-major traversal
//! - [`dtype`]: supported element kinds
//! - [`reclaim`]: test-environment reclamation policy
//! - [`config`]: TOML and environment configuration
//! - [`error`]: error types

pub mod adapter;
pub mod config;
pub mod dtype;
pub mod error;
pub mod handle;
pub mod interface;
pub mod layout;
pub mod native;
pub mod reclaim;

// Re-export main types for convenience
pub use adapter::{create, to_native, ArrayAdapter};
pub use config::{AdapterConfig, BridgeConfig, ReclaimConfig};
pub use dtype::{DType, Element, Endian};
pub use error::{BridgeError, BridgeResult};
pub use handle::{ArrayHandle, Ownership};
pub use interface::ArrayInterface;
pub use layout::{ArrayLayout, ArrayOrder, RowMajorIndices};
pub use native::{NativeArray, NativeElement};
pub use reclaim::{HandlePool, ReclaimMode, ReclaimScope, ReclaimStats};
