//! Per-device synchronization state.
//!
//! [`DeviceState`] tracks the last value the physical device confirmed and
//! the apply currently in flight. Every apply is issued a sequence token;
//! a commit only lands if its token is still the latest, so results that
//! arrive out of order or after being superseded are discarded instead of
//! overwriting newer state.

use devsync_core::DeviceValue;

use crate::executor::{ExecutionError, ExecutionResult};

/// Observable phase of a device's sync cycle.
///
/// `Applied` and `Failed` are momentary transitions, visible only through
/// the emitted `ValueChanged`/`ActionFailed` events; between requests a
/// device is always `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Applying,
}

/// Token identifying one issued apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyToken {
    seq: u64,
}

impl ApplyToken {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What a commit did.
#[derive(Debug)]
pub enum CommitOutcome {
    /// The result was accepted; this is the newly acknowledged value.
    Applied(DeviceValue),
    /// The executor failed; acknowledged state is untouched.
    Failed(ExecutionError),
    /// The token was superseded or the device detached; result discarded.
    Stale,
}

struct PendingApply {
    seq: u64,
    target: DeviceValue,
}

/// State of one device: acknowledged value plus the in-flight apply.
///
/// Invariants: at most one apply is pending at any time, and
/// `last_acknowledged` is only mutated by a successful, non-stale commit.
pub struct DeviceState {
    last_acknowledged: Option<DeviceValue>,
    pending: Option<PendingApply>,
    next_seq: u64,
    detached: bool,
}

impl DeviceState {
    pub fn new() -> Self {
        Self {
            last_acknowledged: None,
            pending: None,
            next_seq: 0,
            detached: false,
        }
    }

    /// Last value confirmed applied to the physical device.
    pub fn current_value(&self) -> Option<&DeviceValue> {
        self.last_acknowledged.as_ref()
    }

    pub fn phase(&self) -> SyncPhase {
        if self.pending.is_some() {
            SyncPhase::Applying
        } else {
            SyncPhase::Idle
        }
    }

    pub fn is_applying(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Begin applying a target value.
    ///
    /// Always succeeds: a previous in-flight apply is superseded, its token
    /// invalidated. Whether overlap is allowed at all is the controller's
    /// policy decision, made before calling this.
    pub fn begin_apply(&mut self, target: DeviceValue) -> ApplyToken {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(PendingApply { seq, target });
        ApplyToken { seq }
    }

    /// Commit an executor result.
    ///
    /// Only the latest issued token lands; older tokens and commits after
    /// [`detach`](Self::detach) are discarded as [`CommitOutcome::Stale`].
    pub fn commit(&mut self, token: ApplyToken, result: ExecutionResult) -> CommitOutcome {
        if self.detached {
            return CommitOutcome::Stale;
        }
        let Some(pending) = self.pending.take() else {
            return CommitOutcome::Stale;
        };
        if token.seq != pending.seq {
            // A newer request superseded this one; put it back untouched
            self.pending = Some(pending);
            return CommitOutcome::Stale;
        }

        if result.success {
            // The actuator may have adjusted the value; trust its report
            let value = result.reported_value.unwrap_or(pending.target);
            self.last_acknowledged = Some(value.clone());
            CommitOutcome::Applied(value)
        } else {
            CommitOutcome::Failed(
                result
                    .error
                    .unwrap_or_else(|| ExecutionError::Other("unspecified failure".to_string())),
            )
        }
    }

    /// Invalidate all outstanding tokens; called at unregistration.
    ///
    /// A still-running executor is allowed to finish, but its commit will
    /// be stale.
    pub fn detach(&mut self) {
        self.detached = true;
        self.pending = None;
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}
