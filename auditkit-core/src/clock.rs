//! Ambient time and ordering values supplied to the store at write time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::BlockNumber;
use serde::{Deserialize, Serialize};

use crate::config::AuditConfig;

/// Timestamp and ordering position current at the moment of a write.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockContext {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Global ordering position, e.g. a block number.
    pub block_number: BlockNumber,
}

impl BlockContext {
    /// Returns a context that is never behind either `self` or `floor`.
    #[must_use]
    pub fn at_least(self, floor: Self) -> Self {
        Self {
            timestamp: self.timestamp.max(floor.timestamp),
            block_number: self.block_number.max(floor.block_number),
        }
    }
}

/// Source of the ambient [`BlockContext`].
pub trait Clock: Send + Sync {
    /// Returns the context current at the time of the call.
    fn block_context(&self) -> BlockContext;
}

/// Wall-clock source; the block number advances once per `block_interval_secs`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    block_interval_secs: u64,
}

impl SystemClock {
    /// Default spacing between ordering positions, in seconds.
    pub const DEFAULT_BLOCK_INTERVAL_SECS: u64 = 12;

    /// Creates a clock with the given block interval. An interval of zero is
    /// treated as one second.
    #[must_use]
    pub fn new(block_interval_secs: u64) -> Self {
        Self {
            block_interval_secs: block_interval_secs.max(1),
        }
    }

    /// Creates a clock using the interval from `config`.
    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.block_interval_secs)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_INTERVAL_SECS)
    }
}

impl Clock for SystemClock {
    fn block_context(&self) -> BlockContext {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        BlockContext {
            timestamp,
            block_number: timestamp / self.block_interval_secs,
        }
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    timestamp: AtomicU64,
    block_number: AtomicU64,
}

impl ManualClock {
    /// Creates a clock fixed at `context`.
    #[must_use]
    pub const fn new(context: BlockContext) -> Self {
        Self {
            timestamp: AtomicU64::new(context.timestamp),
            block_number: AtomicU64::new(context.block_number),
        }
    }

    /// Moves the clock to `context`, including backwards.
    pub fn set(&self, context: BlockContext) {
        self.timestamp.store(context.timestamp, Ordering::SeqCst);
        self.block_number
            .store(context.block_number, Ordering::SeqCst);
    }

    /// Advances the clock by `secs` seconds and `blocks` positions.
    pub fn advance(&self, secs: u64, blocks: u64) {
        self.timestamp.fetch_add(secs, Ordering::SeqCst);
        self.block_number.fetch_add(blocks, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn block_context(&self) -> BlockContext {
        BlockContext {
            timestamp: self.timestamp.load(Ordering::SeqCst),
            block_number: self.block_number.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(BlockContext {
            timestamp: 100,
            block_number: 7,
        });
        clock.advance(12, 1);
        assert_eq!(
            clock.block_context(),
            BlockContext {
                timestamp: 112,
                block_number: 8,
            }
        );

        clock.set(BlockContext::default());
        assert_eq!(clock.block_context(), BlockContext::default());
    }

    #[test]
    fn test_system_clock_block_number_follows_interval() {
        let clock = SystemClock::new(10);
        let context = clock.block_context();
        assert!(context.timestamp > 0);
        assert_eq!(context.block_number, context.timestamp / 10);
    }

    #[test]
    fn test_system_clock_zero_interval() {
        let context = SystemClock::new(0).block_context();
        assert_eq!(context.block_number, context.timestamp);
    }

    #[test]
    fn test_at_least_clamps_each_field() {
        let current = BlockContext {
            timestamp: 50,
            block_number: 9,
        };
        let floor = BlockContext {
            timestamp: 60,
            block_number: 5,
        };
        assert_eq!(
            current.at_least(floor),
            BlockContext {
                timestamp: 60,
                block_number: 9,
            }
        );
    }
}
