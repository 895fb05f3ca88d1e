//! Strict two-phase-locking scheduler.
//!
//! The scheduler consumes a [`History`] from front to back and emits a
//! [`Schedule`]. Every operation goes through the same checks, in order:
//!
//! 1. its transaction was restarted: park it in the restart queue;
//! 2. an earlier request of its transaction is still blocked (same page, or
//!    any page for a commit): park it in the wait queue;
//! 3. commit: release every lock of the transaction, replay both queues
//!    right after the commit, emit the commit;
//! 4. read/write on a page no other transaction holds: take the lock if
//!    needed, emit the access;
//! 5. read/write on a page another transaction holds: emit a pending lock
//!    request and let the [`Policy`] decide whether the requester waits or
//!    restarts.
//!
//! Locks are only released on commit. A restarted transaction is dropped for
//! good, it is never retried.

use alloc::vec::Vec;

use crate::history::{History, Schedule};
use crate::lock_table::LockTable;
use crate::operation::{LockMode, Operation, OperationKind, TransactionId};
use crate::pending::PendingQueues;

pub mod policy;

pub use policy::{Policy, Resolution, UnknownPolicy};

/// Scheduler settings.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub policy: Policy,
    /// Emit `wait_T` after a request resolved to wait, and `restart_T` when
    /// a transaction is restarted.
    pub annotate: bool,
}

impl SchedulerConfig {
    #[must_use]
    pub const fn new(policy: Policy) -> Self {
        Self {
            policy,
            annotate: false,
        }
    }

    #[must_use]
    pub const fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }
}

impl From<Policy> for SchedulerConfig {
    fn from(policy: Policy) -> Self {
        Self::new(policy)
    }
}

/// Result of scheduling a history.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOutcome {
    pub schedule: Schedule,
    /// Operations still blocked at the end of the input.
    pub waiting: Vec<Operation>,
    /// Operations of restarted transactions.
    pub restarting: Vec<Operation>,
    /// Restarted transactions, oldest first.
    pub restarted: Vec<TransactionId>,
}

/// Mutable state of one scheduler run.
#[derive(Debug)]
pub struct SchedulerState {
    config: SchedulerConfig,
    history: History,
    locks: LockTable,
    pending: PendingQueues,
    schedule: Schedule,
}

impl SchedulerState {
    #[must_use]
    pub fn new(history: History, config: SchedulerConfig) -> Self {
        Self {
            config,
            history,
            locks: LockTable::new(),
            pending: PendingQueues::new(),
            schedule: Schedule::new(),
        }
    }

    /// Processes the next operation of the remaining history.
    ///
    /// Returns `false` once the history is exhausted.
    pub fn step(&mut self) -> bool {
        let Some(operation) = self.history.pop_front() else {
            return false;
        };
        tracing::trace!(%operation, remaining = self.history.len(), "scheduling");

        if self.pending.is_transaction_restarted(operation.transaction()) {
            self.pending.enqueue_restart(operation);
            return true;
        }
        if self.pending.is_transaction_waiting(&operation) {
            self.pending.enqueue_wait(operation);
            return true;
        }

        match operation.kind() {
            OperationKind::Commit => self.commit(operation),
            OperationKind::Read => self.access(operation, LockMode::Read),
            OperationKind::Write => self.access(operation, LockMode::Write),
            // Anything else is not part of an input history; it is passed
            // through untouched.
            _ => self.schedule.push(operation),
        }
        true
    }

    /// Runs until the history is exhausted.
    #[must_use]
    pub fn run(mut self) -> SchedulerOutcome {
        while self.step() {}
        self.finish()
    }

    fn finish(self) -> SchedulerOutcome {
        let (waiting, restarting, restarted) = self.pending.into_parts();
        tracing::debug!(
            policy = %self.config.policy,
            events = self.schedule.len(),
            waiting = waiting.len(),
            restarting = restarting.len(),
            ?restarted,
            "schedule complete"
        );
        SchedulerOutcome {
            schedule: self.schedule,
            waiting,
            restarting,
            restarted,
        }
    }

    fn commit(&mut self, operation: Operation) {
        let transaction = operation.transaction();
        self.schedule.extend(self.locks.release_all(transaction));

        // Deferred work is replayed right after this commit, ahead of later
        // input; restarted operations end up in front of waiting ones.
        let waits = self.pending.drain_waits_into(&mut self.history, 0);
        let restarts = self.pending.drain_restarts_into(&mut self.history, 0);
        if waits + restarts > 0 {
            tracing::debug!(%transaction, waits, restarts, "replaying deferred operations");
        }

        self.schedule.push(operation);
    }

    fn access(&mut self, operation: Operation, mode: LockMode) {
        let transaction = operation.transaction();
        let page = operation.page();

        if self.locks.is_held_by_other(page, transaction) {
            self.conflict(operation, mode);
            return;
        }

        if self.locks.grant(transaction, page, mode) {
            tracing::debug!(%transaction, page, ?mode, "lock granted");
            self.schedule.push(Operation::lock(transaction, page, mode));
        }
        self.schedule.push(operation);
    }

    fn conflict(&mut self, operation: Operation, mode: LockMode) {
        let transaction = operation.transaction();
        let holder_is_older = self
            .locks
            .holder_is_older_than(operation.page(), transaction);
        let resolution = self.config.policy.resolve(holder_is_older);
        tracing::debug!(
            %transaction,
            page = operation.page(),
            holder_is_older,
            ?resolution,
            "lock conflict"
        );

        self.schedule
            .push(Operation::pending(transaction, operation.page(), mode));
        match resolution {
            Resolution::Wait => {
                self.pending.enqueue_wait(operation);
                if self.config.annotate {
                    self.schedule.push(Operation::wait(transaction));
                }
            }
            Resolution::Restart => {
                let first = self.pending.enqueue_restart(operation);
                if first && self.config.annotate {
                    self.schedule.push(Operation::restart(transaction));
                }
            }
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub const fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingQueues {
        &self.pending
    }

    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

/// Schedule `history` under `config`, keeping the leftover queues.
pub fn schedule(
    history: impl Into<History>,
    config: impl Into<SchedulerConfig>,
) -> SchedulerOutcome {
    let config = config.into();
    let history = history.into();
    tracing::debug!(policy = %config.policy, operations = history.len(), "scheduling history");
    SchedulerState::new(history, config).run()
}

/// Schedule `history` with immediate restart: every conflicting requester
/// aborts.
pub fn schedule_immediate_restart(history: impl Into<History>) -> Schedule {
    schedule(history, Policy::ImmediateRestart).schedule
}

/// Schedule `history` with wait-die: a requester younger than the holder
/// aborts, an older one waits.
pub fn schedule_wait_die(history: impl Into<History>) -> Schedule {
    schedule(history, Policy::WaitDie).schedule
}

/// Schedule `history` with wound-wait: a requester younger than the holder
/// waits, an older one aborts.
pub fn schedule_wound_wait(history: impl Into<History>) -> Schedule {
    schedule(history, Policy::WoundWait).schedule
}
