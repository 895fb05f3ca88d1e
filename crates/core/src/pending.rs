//! Deferred operations.
//!
//! The scheduler parks operations it cannot run yet in one of two FIFO
//! queues:
//!
//! - the *wait* queue, for operations blocked on a lock held by another
//!   transaction;
//! - the *restart* queue, for operations of aborted transactions.
//!
//! Both queues are flushed back into the remaining history at every commit.
//! Once a transaction is aborted its id stays in the restart set, so its
//! replayed operations land in the restart queue again and never run.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::history::History;
use crate::operation::{Operation, TransactionId};

#[derive(Debug, Default, Clone)]
pub struct PendingQueues {
    waiting: Vec<Operation>,
    restarting: Vec<Operation>,
    restarted: HashSet<TransactionId>,
}

impl PendingQueues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_wait(&mut self, operation: Operation) {
        self.waiting.push(operation);
    }

    /// Parks `operation` in the restart queue and marks its transaction as
    /// restarted.
    ///
    /// Returns `true` if the transaction was not restarted before.
    pub fn enqueue_restart(&mut self, operation: Operation) -> bool {
        let first = self.restarted.insert(operation.transaction());
        self.restarting.push(operation);
        first
    }

    /// Moves every waiting operation into `history` at `index` and returns
    /// how many were moved.
    pub fn drain_waits_into(&mut self, history: &mut History, index: usize) -> usize {
        let drained = self.waiting.len();
        history.insert_all(index, self.waiting.drain(..));
        drained
    }

    /// Moves every restarted operation into `history` at `index` and returns
    /// how many were moved. The restart set is kept.
    pub fn drain_restarts_into(&mut self, history: &mut History, index: usize) -> usize {
        let drained = self.restarting.len();
        history.insert_all(index, self.restarting.drain(..));
        drained
    }

    #[must_use]
    pub fn is_transaction_restarted(&self, transaction: TransactionId) -> bool {
        self.restarted.contains(&transaction)
    }

    /// Returns `true` if `operation` has to queue behind an earlier blocked
    /// request of its transaction.
    ///
    /// Reads and writes queue behind a request on the same page. A commit
    /// queues behind any request of its transaction.
    #[must_use]
    pub fn is_transaction_waiting(&self, operation: &Operation) -> bool {
        self.waiting.iter().any(|waiting| {
            waiting.transaction() == operation.transaction()
                && (operation.is_commit() || waiting.page() == operation.page())
        })
    }

    #[must_use]
    pub fn waiting(&self) -> &[Operation] {
        &self.waiting
    }

    #[must_use]
    pub fn restarting(&self) -> &[Operation] {
        &self.restarting
    }

    /// Restarted transactions, oldest first.
    #[must_use]
    pub fn restarted_transactions(&self) -> Vec<TransactionId> {
        let mut transactions: Vec<_> = self.restarted.iter().copied().collect();
        transactions.sort_unstable();
        transactions
    }

    /// Splits the queues into the leftover waiting and restarted operations.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Operation>, Vec<Operation>, Vec<TransactionId>) {
        let restarted = self.restarted_transactions();
        (self.waiting, self.restarting, restarted)
    }
}
