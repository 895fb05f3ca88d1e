//! Strict two-phase-locking schedules with deadlock prevention.
//!
//! `twopl_core` turns a *history* -- a fixed interleaving of read, write and
//! commit operations of several transactions -- into the *schedule* a strict
//! 2PL scheduler would produce: lock grants, the accesses themselves, lock
//! releases at commit, and markers for denied lock requests.
//!
//! When a request conflicts with a lock held by another transaction, one of
//! three deadlock-prevention policies decides what happens to the requester,
//! using the transaction id as its age (smaller id = older):
//!
//! 1. **Immediate restart** -- the requester always aborts.
//! 2. **Wait-die** -- a requester younger than the holder aborts, otherwise
//!    it waits for the holder to commit.
//! 3. **Wound-wait** -- the comparison is reversed: a younger requester
//!    waits, an older one aborts. The holder itself is never wounded.
//!
//! Waiting operations are replayed right after the next commit. Aborted
//! transactions are not retried; all of their remaining operations are
//! dropped.
//!
//! # Entry points
//!
//! [`schedule_immediate_restart()`], [`schedule_wait_die()`] and
//! [`schedule_wound_wait()`] return the schedule only. [`schedule()`] takes a
//! [`SchedulerConfig`] and also returns what was left in the wait and restart
//! queues at the end of the input.
//!
//! ```rust
//! use twopl_core::{schedule_wait_die, Operation};
//!
//! let history = vec![
//!     Operation::write(1, "x"),
//!     Operation::read(2, "x"),
//!     Operation::commit(1),
//!     Operation::commit(2),
//! ];
//! let schedule = schedule_wait_die(history);
//! assert_eq!(schedule.to_string(), "wl_1(x) w_1(x) rl_2(x)* wu_1(x) c_1");
//! ```
//!
//! The [`validation`] module audits any schedule for lock safety and the
//! strict two-phase discipline.
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the public
//!   data types.
//! - **`schemars`** -- enables `JsonSchema` derives (requires `std`).
//!
//! This crate is `no_std` compatible (requires `alloc`). Text parsing lives
//! in the separate `twopl_parser` crate.

#![cfg_attr(not(any(test, feature = "schemars")), no_std)]
extern crate alloc;

pub mod history;
pub mod lock_table;
pub mod operation;
pub mod pending;
pub mod scheduler;
pub mod validation;

pub use history::{History, Schedule};
pub use operation::{LockMode, Operation, OperationKind, PageId, TransactionId};
pub use scheduler::{
    schedule, schedule_immediate_restart, schedule_wait_die, schedule_wound_wait, Policy,
    SchedulerConfig, SchedulerOutcome,
};
