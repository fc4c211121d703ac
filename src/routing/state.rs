//! Routing state.
//!
//! Process-wide flags live in [`RoutingFlags`], shared between sessions via
//! `Arc`. The forced-primary flag is per session and lives in
//! [`RoutingState`], owned by the router, so one session forcing the primary
//! never affects another.

use crate::config::RoutingConfig;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide routing configuration.
///
/// These are configuration-like switches, normally set once at startup.
/// Changing them at runtime is allowed but takes effect for every session at
/// its next call.
#[derive(Debug)]
pub struct RoutingFlags {
    block_transactions: AtomicBool,
    skip_transactions: AtomicBool,
    ignore_open_transactions: AtomicBool,
}

impl RoutingFlags {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            block_transactions: AtomicBool::new(config.block_transactions),
            skip_transactions: AtomicBool::new(config.skip_transactions),
            ignore_open_transactions: AtomicBool::new(config.ignore_open_transactions),
        }
    }

    /// Whether transaction operations on the read-only connection fail.
    pub fn transactions_blocked(&self) -> bool {
        self.block_transactions.load(Ordering::Acquire)
    }

    /// Whether the transaction guard is bypassed entirely.
    pub fn guard_skipped(&self) -> bool {
        self.skip_transactions.load(Ordering::Acquire)
    }

    /// Whether an open transaction no longer forces reads to the primary.
    pub fn open_transactions_ignored(&self) -> bool {
        self.ignore_open_transactions.load(Ordering::Acquire)
    }

    pub fn set_block_transactions(&self, value: bool) {
        self.block_transactions.store(value, Ordering::Release);
    }

    pub fn set_skip_transactions(&self, value: bool) {
        self.skip_transactions.store(value, Ordering::Release);
    }

    pub fn set_ignore_open_transactions(&self, value: bool) {
        self.ignore_open_transactions.store(value, Ordering::Release);
    }

    /// Current values as a config snapshot.
    pub fn snapshot(&self) -> RoutingConfig {
        RoutingConfig {
            block_transactions: self.transactions_blocked(),
            skip_transactions: self.guard_skipped(),
            ignore_open_transactions: self.open_transactions_ignored(),
        }
    }
}

impl Default for RoutingFlags {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

/// Why a statement was routed where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingReason {
    /// A primary scope is active.
    ForcedPrimary,
    /// The primary has an open transaction.
    OpenTransaction,
    /// Nothing requires the primary.
    DefaultReplica,
}

impl std::fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ForcedPrimary => "forced_primary",
            Self::OpenTransaction => "open_transaction",
            Self::DefaultReplica => "default_replica",
        };
        f.write_str(s)
    }
}

/// Routing decision for a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub use_primary: bool,
    pub reason: RoutingReason,
}

impl RoutingDecision {
    fn primary(reason: RoutingReason) -> Self {
        Self {
            use_primary: true,
            reason,
        }
    }

    fn replica() -> Self {
        Self {
            use_primary: false,
            reason: RoutingReason::DefaultReplica,
        }
    }
}

/// Routing state of one session: its forced-primary flag plus the shared flags.
#[derive(Debug, Clone)]
pub struct RoutingState {
    flags: Arc<RoutingFlags>,
    force_primary: bool,
}

impl RoutingState {
    pub fn new(flags: Arc<RoutingFlags>) -> Self {
        Self {
            flags,
            force_primary: false,
        }
    }

    pub fn flags(&self) -> &Arc<RoutingFlags> {
        &self.flags
    }

    pub fn is_forced_to_primary(&self) -> bool {
        self.force_primary
    }

    pub fn transactions_blocked(&self) -> bool {
        self.flags.transactions_blocked()
    }

    pub fn guard_skipped(&self) -> bool {
        self.flags.guard_skipped()
    }

    pub fn open_transactions_ignored(&self) -> bool {
        self.flags.open_transactions_ignored()
    }

    /// Only [`PrimaryScope`](crate::routing::PrimaryScope) flips this.
    pub(crate) fn set_force_primary(&mut self, value: bool) {
        self.force_primary = value;
    }

    /// Decide where a statement goes given the current transaction depth.
    pub fn decide(&self, open_transactions: u32) -> RoutingDecision {
        if self.force_primary {
            RoutingDecision::primary(RoutingReason::ForcedPrimary)
        } else if open_transactions > 0 && !self.open_transactions_ignored() {
            RoutingDecision::primary(RoutingReason::OpenTransaction)
        } else {
            RoutingDecision::replica()
        }
    }
}

impl Default for RoutingState {
    fn default() -> Self {
        Self::new(Arc::new(RoutingFlags::default()))
    }
}
