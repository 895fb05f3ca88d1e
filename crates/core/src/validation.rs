//! Auditing of produced schedules.
//!
//! These checks replay a schedule and verify the guarantees of strict
//! two-phase locking independently of the scheduler that produced it. They
//! accept any schedule, including ones parsed from text.

use alloc::vec::Vec;

use derive_more::{Display, From};
use hashbrown::{HashMap, HashSet};

use crate::operation::{LockMode, Operation, OperationKind, TransactionId};
use crate::scheduler::SchedulerOutcome;

/// A lock was granted or released illegally.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum LockViolation {
    /// The lock conflicts with a lock another transaction holds on the page.
    #[display("event {index} `{event}` conflicts with a lock of transaction {holder}")]
    Incompatible {
        index: usize,
        event: Operation,
        holder: TransactionId,
    },
    /// The released lock is not held.
    #[display("event {index} `{event}` releases a lock that is not held")]
    UnlockWithoutLock { index: usize, event: Operation },
}

/// A transaction broke the strict two-phase discipline.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProtocolViolation {
    /// A read or write ran without a lock on its page.
    #[display("event {index} `{event}` accesses a page without holding a lock on it")]
    UnprotectedAccess { index: usize, event: Operation },
    /// Locks were released and the transaction did not commit right away.
    #[display("event {index} `{event}` interrupts the release phase of transaction {releasing}")]
    UnlockBeforeCommit {
        index: usize,
        event: Operation,
        releasing: TransactionId,
    },
    /// A lock was acquired after the transaction released one.
    #[display("event {index} `{event}` acquires a lock after the release phase")]
    LockAfterUnlock { index: usize, event: Operation },
}

/// Input and output do not account for each other.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AccountingViolation {
    /// An input operation was lost (`surplus < 0`) or duplicated
    /// (`surplus > 0`) across the schedule and the leftover queues.
    #[display("`{operation}` is accounted {surplus:+} times too often")]
    Mismatch { operation: Operation, surplus: i64 },
    /// A restarted transaction still committed.
    #[display("restarted transaction {transaction} committed")]
    RestartedCommitted { transaction: TransactionId },
}

/// Any failed audit.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Display, From)]
pub enum Violation {
    Lock(LockViolation),
    Protocol(ProtocolViolation),
    Accounting(AccountingViolation),
}

impl core::error::Error for Violation {}

/// Replays lock and unlock events and checks them against the shared /
/// exclusive compatibility matrix.
///
/// # Errors
///
/// Returns the first [`LockViolation`] found.
pub fn check_lock_safety(schedule: &[Operation]) -> Result<(), LockViolation> {
    let mut held: HashMap<&str, Vec<(TransactionId, LockMode)>> = HashMap::new();

    for (index, event) in schedule.iter().enumerate() {
        let Some(mode) = event.kind().lock_mode() else {
            continue;
        };
        let holders = held.entry(event.page()).or_default();
        let transaction = event.transaction();

        match event.kind() {
            OperationKind::ReadLock | OperationKind::WriteLock => {
                if let Some(&(holder, _)) = holders
                    .iter()
                    .find(|&&(holder, other)| holder != transaction && !mode.is_compatible(other))
                {
                    return Err(LockViolation::Incompatible {
                        index,
                        event: event.clone(),
                        holder,
                    });
                }
                holders.push((transaction, mode));
            }
            _ => {
                let Some(position) = holders.iter().position(|&lock| lock == (transaction, mode))
                else {
                    return Err(LockViolation::UnlockWithoutLock {
                        index,
                        event: event.clone(),
                    });
                };
                holders.swap_remove(position);
            }
        }
    }
    Ok(())
}

/// Checks that every access is covered by a lock and that each transaction
/// releases its locks only as part of its commit, acquiring none afterwards.
///
/// # Errors
///
/// Returns the first [`ProtocolViolation`] found.
pub fn check_strict_two_phase(schedule: &[Operation]) -> Result<(), ProtocolViolation> {
    let mut held: HashSet<(TransactionId, &str)> = HashSet::new();
    let mut shrinking: HashSet<TransactionId> = HashSet::new();
    let mut releasing: Option<(TransactionId, usize)> = None;

    for (index, event) in schedule.iter().enumerate() {
        let transaction = event.transaction();

        if let Some((releaser, _)) = releasing {
            let continues = releaser == transaction
                && matches!(
                    event.kind(),
                    OperationKind::ReadUnlock | OperationKind::WriteUnlock | OperationKind::Commit
                );
            if !continues {
                return Err(ProtocolViolation::UnlockBeforeCommit {
                    index,
                    event: event.clone(),
                    releasing: releaser,
                });
            }
        }

        match event.kind() {
            OperationKind::ReadLock | OperationKind::WriteLock => {
                if shrinking.contains(&transaction) {
                    return Err(ProtocolViolation::LockAfterUnlock {
                        index,
                        event: event.clone(),
                    });
                }
                held.insert((transaction, event.page()));
            }
            OperationKind::ReadUnlock | OperationKind::WriteUnlock => {
                held.remove(&(transaction, event.page()));
                shrinking.insert(transaction);
                releasing = Some((transaction, index));
            }
            OperationKind::Read | OperationKind::Write => {
                if !held.contains(&(transaction, event.page())) {
                    return Err(ProtocolViolation::UnprotectedAccess {
                        index,
                        event: event.clone(),
                    });
                }
            }
            OperationKind::Commit => {
                shrinking.insert(transaction);
                releasing = None;
            }
            _ => {}
        }
    }

    match releasing {
        Some((releaser, index)) => Err(ProtocolViolation::UnlockBeforeCommit {
            index,
            event: schedule[index].clone(),
            releasing: releaser,
        }),
        None => Ok(()),
    }
}

/// Runs [`check_lock_safety`] and [`check_strict_two_phase`].
///
/// # Errors
///
/// Returns the first [`Violation`] found.
pub fn check_schedule(schedule: &[Operation]) -> Result<(), Violation> {
    check_lock_safety(schedule)?;
    check_strict_two_phase(schedule)?;
    Ok(())
}

/// Checks that every input operation ends up exactly once in the schedule or
/// in one of the leftover queues, and that no restarted transaction commits.
///
/// # Errors
///
/// Returns the first [`AccountingViolation`] found.
pub fn check_accounting(
    input: &[Operation],
    outcome: &SchedulerOutcome,
) -> Result<(), AccountingViolation> {
    let mut balance: HashMap<&Operation, i64> = HashMap::new();
    for operation in input.iter().filter(|op| op.kind().is_input()) {
        *balance.entry(operation).or_default() -= 1;
    }
    let accounted = outcome
        .schedule
        .iter()
        .filter(|event| event.kind().is_input())
        .chain(&outcome.waiting)
        .chain(&outcome.restarting);
    for operation in accounted {
        *balance.entry(operation).or_default() += 1;
    }

    let mut mismatches: Vec<_> = balance
        .into_iter()
        .filter(|&(_, surplus)| surplus != 0)
        .collect();
    mismatches.sort_unstable();
    if let Some((operation, surplus)) = mismatches.into_iter().next() {
        return Err(AccountingViolation::Mismatch {
            operation: operation.clone(),
            surplus,
        });
    }

    if let Some(commit) = outcome
        .schedule
        .iter()
        .find(|event| event.is_commit() && outcome.restarted.contains(&event.transaction()))
    {
        return Err(AccountingViolation::RestartedCommitted {
            transaction: commit.transaction(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;
    use crate::scheduler::{schedule, Policy};

    const T1: TransactionId = TransactionId(1);
    const T2: TransactionId = TransactionId(2);

    #[test]
    fn test_shared_locks_coexist() {
        let events = vec![
            Operation::lock(T1, "x", LockMode::Read),
            Operation::lock(T2, "x", LockMode::Read),
            Operation::unlock(T1, "x", LockMode::Read),
            Operation::unlock(T2, "x", LockMode::Read),
        ];
        assert!(check_lock_safety(&events).is_ok());
    }

    #[test]
    fn test_write_lock_conflict() {
        let events = vec![
            Operation::lock(T1, "x", LockMode::Read),
            Operation::lock(T2, "x", LockMode::Write),
        ];
        assert_eq!(
            check_lock_safety(&events),
            Err(LockViolation::Incompatible {
                index: 1,
                event: Operation::lock(T2, "x", LockMode::Write),
                holder: T1,
            })
        );
    }

    #[test]
    fn test_unlock_without_lock() {
        let events = vec![
            Operation::lock(T1, "x", LockMode::Read),
            Operation::unlock(T1, "x", LockMode::Write),
        ];
        assert!(matches!(
            check_lock_safety(&events),
            Err(LockViolation::UnlockWithoutLock { index: 1, .. })
        ));
    }

    #[test]
    fn test_unprotected_access() {
        let events = vec![Operation::write(1, "x")];
        assert!(matches!(
            check_strict_two_phase(&events),
            Err(ProtocolViolation::UnprotectedAccess { index: 0, .. })
        ));
    }

    #[test]
    fn test_unlock_must_lead_to_commit() {
        let events = vec![
            Operation::lock(T1, "x", LockMode::Write),
            Operation::write(1, "x"),
            Operation::unlock(T1, "x", LockMode::Write),
            Operation::lock(T2, "x", LockMode::Write),
            Operation::commit(1),
        ];
        assert_eq!(
            check_strict_two_phase(&events),
            Err(ProtocolViolation::UnlockBeforeCommit {
                index: 3,
                event: Operation::lock(T2, "x", LockMode::Write),
                releasing: T1,
            })
        );
    }

    #[test]
    fn test_dangling_release_phase() {
        let events = vec![
            Operation::lock(T1, "x", LockMode::Write),
            Operation::unlock(T1, "x", LockMode::Write),
        ];
        assert!(matches!(
            check_strict_two_phase(&events),
            Err(ProtocolViolation::UnlockBeforeCommit { index: 1, .. })
        ));
    }

    #[test]
    fn test_lock_after_commit() {
        let events = vec![
            Operation::commit(1),
            Operation::lock(T1, "x", LockMode::Read),
        ];
        assert!(matches!(
            check_strict_two_phase(&events),
            Err(ProtocolViolation::LockAfterUnlock { index: 1, .. })
        ));
    }

    #[test]
    fn test_accounting_of_scheduled_history() {
        let input = vec![
            Operation::write(1, "x"),
            Operation::read(2, "x"),
            Operation::commit(2),
            Operation::commit(1),
        ];
        for policy in Policy::ALL {
            let outcome = schedule(input.clone(), policy);
            assert_eq!(check_accounting(&input, &outcome), Ok(()));
            assert_eq!(check_schedule(outcome.schedule.events()), Ok(()));
        }
    }

    #[test]
    fn test_accounting_detects_loss() {
        let input = vec![Operation::write(1, "x"), Operation::commit(1)];
        let mut outcome = schedule(input.clone(), Policy::WaitDie);
        outcome.restarting.push(Operation::commit(1));
        outcome.restarted.push(T1);

        let err = check_accounting(&input, &outcome).unwrap_err();
        assert_eq!(
            err,
            AccountingViolation::Mismatch {
                operation: Operation::commit(1),
                surplus: 1,
            }
        );
        assert_eq!(err.to_string(), "`c_1` is accounted +1 times too often");
    }

    #[test]
    fn test_restarted_commit_detected() {
        let input = vec![Operation::commit(1)];
        let mut outcome = schedule(input.clone(), Policy::WaitDie);
        outcome.restarted.push(T1);
        assert_eq!(
            check_accounting(&input, &outcome),
            Err(AccountingViolation::RestartedCommitted { transaction: T1 })
        );
    }

    #[test]
    fn test_violation_from() {
        let violation: Violation = LockViolation::UnlockWithoutLock {
            index: 0,
            event: Operation::unlock(T1, "x", LockMode::Read),
        }
        .into();
        assert_eq!(
            violation.to_string(),
            "event 0 `ru_1(x)` releases a lock that is not held"
        );
    }
}
