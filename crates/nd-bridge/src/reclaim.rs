//! Memory Reclamation Policy
//!
//! Test suites that exercise the bridge sometimes want to control when
//! retired handles are actually freed, e.g. to keep every buffer alive for
//! the duration of a test and release them all at teardown.
//!
//! This is a process-wide setting owned by the embedding environment. The
//! adapter never reads it; only [`HandlePool`] does.
//!
//! ## Pieces
//!
//! - [`init_reclaim`] / [`teardown_reclaim`]: explicit setup and teardown
//! - [`ReclaimScope`]: RAII guard that switches the mode and restores it
//! - [`HandlePool`]: retires handles according to a mode

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeError;
use crate::handle::ArrayHandle;

/// Default number of deferred handles a pool holds before collecting
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

// ============================================================================
// Process-wide mode
// ============================================================================

static RECLAIM_MODE: AtomicU8 = AtomicU8::new(ReclaimMode::Automatic as u8);

static RECLAIM_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// When retired handles are freed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReclaimMode {
    /// Free as soon as a handle is retired
    #[default]
    Automatic = 0,
    /// Keep retired handles until an explicit collection
    Deferred = 1,
}

impl ReclaimMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ReclaimMode::Deferred,
            _ => ReclaimMode::Automatic,
        }
    }

    /// Lowercase name as used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            ReclaimMode::Automatic => "automatic",
            ReclaimMode::Deferred => "deferred",
        }
    }
}

impl fmt::Display for ReclaimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ReclaimMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(ReclaimMode::Automatic),
            "deferred" | "manual" => Ok(ReclaimMode::Deferred),
            other => Err(BridgeError::config(format!("unknown reclaim mode '{other}'"))),
        }
    }
}

/// Current process-wide mode
pub fn reclaim_mode() -> ReclaimMode {
    ReclaimMode::from_u8(RECLAIM_MODE.load(Ordering::Acquire))
}

fn set_reclaim_mode(mode: ReclaimMode) {
    RECLAIM_MODE.store(mode as u8, Ordering::Release);
}

/// Install the process-wide mode. Calling it again replaces the mode.
pub fn init_reclaim(mode: ReclaimMode) {
    set_reclaim_mode(mode);
    RECLAIM_INITIALIZED.store(true, Ordering::Release);
    debug!(%mode, "reclaim policy initialized");
}

/// Check if [`init_reclaim`] has run since the last teardown
pub fn is_reclaim_initialized() -> bool {
    RECLAIM_INITIALIZED.load(Ordering::Acquire)
}

/// Restore the default mode
pub fn teardown_reclaim() {
    if !RECLAIM_INITIALIZED.swap(false, Ordering::AcqRel) {
        return;
    }
    set_reclaim_mode(ReclaimMode::Automatic);
    debug!("reclaim policy torn down");
}

// ============================================================================
// ReclaimScope - RAII mode switch
// ============================================================================

/// Switches the process-wide mode for its lifetime.
///
/// # Example
///
/// ```ignore
/// let _scope = ReclaimScope::enter(ReclaimMode::Deferred);
/// // pools created here defer reclamation
/// // the previous mode is restored when _scope is dropped
/// ```
#[derive(Debug)]
#[must_use = "the previous mode is restored as soon as the scope is dropped"]
pub struct ReclaimScope {
    previous: ReclaimMode,
}

impl ReclaimScope {
    /// Enter a scope with `mode`
    pub fn enter(mode: ReclaimMode) -> Self {
        let previous = reclaim_mode();
        set_reclaim_mode(mode);
        Self { previous }
    }

    /// Mode that will be restored on drop
    pub fn previous(&self) -> ReclaimMode {
        self.previous
    }
}

impl Drop for ReclaimScope {
    fn drop(&mut self) {
        set_reclaim_mode(self.previous);
    }
}

// ============================================================================
// HandlePool
// ============================================================================

/// Retires handles according to a reclamation mode.
///
/// In `Automatic` mode a retired handle is dropped immediately. In `Deferred`
/// mode it is kept until [`HandlePool::collect`] runs, the pool reaches its
/// capacity, or the pool itself is dropped.
#[derive(Debug)]
pub struct HandlePool {
    mode: ReclaimMode,
    pending: Vec<ArrayHandle>,
    capacity: usize,
    retired_total: u64,
    collected_total: u64,
}

impl HandlePool {
    /// Create a pool using the current process-wide mode
    pub fn new() -> Self {
        Self::with_mode(reclaim_mode(), DEFAULT_POOL_CAPACITY)
    }

    /// Create a pool with an explicit mode and capacity
    pub fn with_mode(mode: ReclaimMode, capacity: usize) -> Self {
        Self {
            mode,
            pending: Vec::new(),
            capacity: capacity.max(1),
            retired_total: 0,
            collected_total: 0,
        }
    }

    /// Mode this pool was created with
    pub fn mode(&self) -> ReclaimMode {
        self.mode
    }

    /// Retire a handle
    pub fn retire(&mut self, handle: ArrayHandle) {
        self.retired_total += 1;

        match self.mode {
            ReclaimMode::Automatic => {
                drop(handle);
                self.collected_total += 1;
            }
            ReclaimMode::Deferred => {
                self.pending.push(handle);
                if self.is_full() {
                    self.collect();
                }
            }
        }
    }

    /// Free every deferred handle, returning how many were freed
    pub fn collect(&mut self) -> usize {
        let freed = self.pending.len();
        self.pending.clear();
        self.collected_total += freed as u64;
        if freed > 0 {
            debug!(freed, "collected retired array handles");
        }
        freed
    }

    /// Number of handles waiting for collection
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Check if the pool has reached its capacity
    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    /// Usage statistics
    pub fn stats(&self) -> ReclaimStats {
        ReclaimStats {
            mode: self.mode,
            pending: self.pending.len(),
            retired_total: self.retired_total,
            collected_total: self.collected_total,
        }
    }
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HandlePool {
    fn drop(&mut self) {
        self.collect();
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimStats {
    /// Mode of the pool
    pub mode: ReclaimMode,
    /// Handles waiting for collection
    pub pending: usize,
    /// Handles ever retired
    pub retired_total: u64,
    /// Handles ever freed
    pub collected_total: u64,
}

impl fmt::Display for ReclaimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reclaim Stats: mode={}, pending={}, retired={}, collected={}",
            self.mode, self.pending, self.retired_total, self.collected_total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use pretty_assertions::assert_eq;

    fn handle() -> ArrayHandle {
        ArrayHandle::from_bytes(vec![0u8; 8], vec![2], DType::Float32).unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("deferred".parse::<ReclaimMode>(), Ok(ReclaimMode::Deferred));
        assert_eq!(" Automatic ".parse::<ReclaimMode>(), Ok(ReclaimMode::Automatic));
        assert_eq!("manual".parse::<ReclaimMode>(), Ok(ReclaimMode::Deferred));
        assert!("sometimes".parse::<ReclaimMode>().is_err());
        assert_eq!(ReclaimMode::default(), ReclaimMode::Automatic);
    }

    // The only test in this module that touches the process-wide mode.
    #[test]
    fn test_init_scope_teardown() {
        init_reclaim(ReclaimMode::Deferred);
        assert!(is_reclaim_initialized());
        assert_eq!(reclaim_mode(), ReclaimMode::Deferred);
        assert_eq!(HandlePool::new().mode(), ReclaimMode::Deferred);

        {
            let scope = ReclaimScope::enter(ReclaimMode::Automatic);
            assert_eq!(scope.previous(), ReclaimMode::Deferred);
            assert_eq!(reclaim_mode(), ReclaimMode::Automatic);
        }
        assert_eq!(reclaim_mode(), ReclaimMode::Deferred);

        teardown_reclaim();
        assert!(!is_reclaim_initialized());
        assert_eq!(reclaim_mode(), ReclaimMode::Automatic);

        // Teardown without init is a no-op.
        teardown_reclaim();
        assert_eq!(reclaim_mode(), ReclaimMode::Automatic);
    }

    #[test]
    fn test_automatic_pool_frees_immediately() {
        let mut pool = HandlePool::with_mode(ReclaimMode::Automatic, 4);
        pool.retire(handle());
        pool.retire(handle());

        assert_eq!(pool.pending(), 0);
        let stats = pool.stats();
        assert_eq!(stats.retired_total, 2);
        assert_eq!(stats.collected_total, 2);
    }

    #[test]
    fn test_deferred_pool_holds_until_collect() {
        let mut pool = HandlePool::with_mode(ReclaimMode::Deferred, 10);
        for _ in 0..3 {
            pool.retire(handle());
        }

        assert_eq!(pool.pending(), 3);
        assert!(!pool.is_full());
        assert_eq!(pool.collect(), 3);
        assert_eq!(pool.pending(), 0);
        assert_eq!(pool.stats().collected_total, 3);
    }

    #[test]
    fn test_deferred_pool_collects_at_capacity() {
        let mut pool = HandlePool::with_mode(ReclaimMode::Deferred, 2);
        pool.retire(handle());
        assert_eq!(pool.pending(), 1);

        pool.retire(handle());
        assert_eq!(pool.pending(), 0);
        assert_eq!(pool.stats().collected_total, 2);
    }

    #[test]
    fn test_views_survive_retired_base() {
        let mut pool = HandlePool::with_mode(ReclaimMode::Automatic, 1);
        let base = handle();
        let view = base.reshape(vec![1, 2]).unwrap();

        pool.retire(base);
        assert_eq!(view.to_ndarray::<f32>().unwrap().shape(), &[1, 2]);
    }

    #[test]
    fn test_stats_display() {
        let pool = HandlePool::with_mode(ReclaimMode::Deferred, 8);
        let s = pool.stats().to_string();
        assert!(s.contains("mode=deferred"));
        assert!(s.contains("pending=0"));
    }
}
