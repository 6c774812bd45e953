//! Kernel-wide configuration, with sensible defaults.
//!
//! Follows the teacher's `SystemConfig` shape (`system/config.rs`):
//! named constants for the defaults, a plain `serde`-derived struct, and a
//! `Default` impl that reads from those constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bounded-mailbox capacity (§4.1).
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Default enqueue timeout, `T_full` in the design notes (§4.1).
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default upper bound on how long cascade termination waits for a
/// descendant's runloop to exit before the kernel stops tracking it anyway.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Kernel-wide configuration (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Capacity used for mailboxes created without an explicit override.
    pub default_mailbox_capacity: usize,

    /// `T_full`: how long `Enqueue` blocks before returning `Busy`.
    pub enqueue_timeout: Duration,

    /// How long cascade termination waits for descendants to exit.
    pub shutdown_grace: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl KernelConfig {
    /// Convenience builder-style setter; kept minimal (no separate builder
    /// type) since `KernelConfig` only has three fields, unlike the
    /// teacher's `SystemConfigBuilder`.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.default_mailbox_capacity = capacity;
        self
    }

    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
