//! Logical clock supplied by the execution environment.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Monotonic logical height (block or sequence number).
pub trait LogicalClock {
    /// Current height.
    fn height(&self) -> u64;
}

/// Manually driven clock.
///
/// Clones share the same height, so a driver can keep a handle while
/// the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    height: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at `height`.
    pub fn at(height: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(height)),
        }
    }

    /// Moves the clock forward and returns the new height.
    #[instrument(skip(self))]
    pub fn advance(&self, blocks: u64) -> u64 {
        let height = self.height.fetch_add(blocks, Ordering::SeqCst) + blocks;
        debug!(height, "Clock advanced");
        height
    }

    /// Sets the height. Heights never go backwards.
    pub fn set(&self, height: u64) {
        self.height.fetch_max(height, Ordering::SeqCst);
    }
}

impl LogicalClock for ManualClock {
    fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
