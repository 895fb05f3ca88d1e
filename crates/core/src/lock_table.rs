use alloc::vec::Vec;

use crate::operation::{LockMode, Operation, PageId, TransactionId};

/// A lock held by a transaction on a page.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockRecord {
    pub transaction: TransactionId,
    pub page: PageId,
    pub mode: LockMode,
}

/// Locks currently granted by the scheduler, in grant order.
///
/// A transaction holds at most one record per page; re-requesting a page it
/// already holds is a no-op, so a read lock is never upgraded.
///
/// Conflicts are decided per page and ignore the lock mode: any lock of
/// another transaction on the page blocks the request, including two reads.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockTable {
    records: Vec<LockRecord>,
}

impl LockTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Returns `true` if a transaction other than `transaction` holds any
    /// lock on `page`.
    #[must_use]
    pub fn is_held_by_other(&self, page: &str, transaction: TransactionId) -> bool {
        self.holders(page)
            .any(|record| record.transaction != transaction)
    }

    /// Returns `true` if `transaction` already holds a lock on `page`.
    #[must_use]
    pub fn is_held_by_same(&self, page: &str, transaction: TransactionId) -> bool {
        self.holders(page)
            .any(|record| record.transaction == transaction)
    }

    /// Returns `true` if some lock on `page` belongs to a transaction older
    /// than `transaction`.
    #[must_use]
    pub fn holder_is_older_than(&self, page: &str, transaction: TransactionId) -> bool {
        self.holders(page)
            .any(|record| record.transaction.is_older_than(transaction))
    }

    /// Records a lock of `mode` on `page` for `transaction`.
    ///
    /// Returns `false` without touching the table if the transaction already
    /// holds a lock on the page.
    pub fn grant(&mut self, transaction: TransactionId, page: &str, mode: LockMode) -> bool {
        if self.is_held_by_same(page, transaction) {
            return false;
        }
        self.records.push(LockRecord {
            transaction,
            page: page.into(),
            mode,
        });
        true
    }

    /// Removes every lock of `transaction` and returns the matching unlock
    /// operations in table order.
    pub fn release_all(&mut self, transaction: TransactionId) -> Vec<Operation> {
        let mut unlocks = Vec::new();
        self.records.retain(|record| {
            if record.transaction == transaction {
                unlocks.push(Operation::unlock(
                    record.transaction,
                    record.page.clone(),
                    record.mode,
                ));
                false
            } else {
                true
            }
        });
        unlocks
    }

    /// Locks held on `page`, in grant order.
    pub fn holders<'a>(&'a self, page: &'a str) -> impl Iterator<Item = &'a LockRecord> + 'a {
        self.records.iter().filter(move |record| record.page == page)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
