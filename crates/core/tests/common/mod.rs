#![allow(dead_code)]

use std::collections::HashMap;

use twopl_core::operation::{Operation, OperationKind, TransactionId};
use twopl_core::scheduler::Resolution;

/// DSL macro for building test histories.
///
/// Produces `Vec<Operation>`.
///
/// # Syntax
///
/// ```ignore
/// history![w(1, x), r(2, x), c(1), c(2)]
/// ```
///
/// - `r(txn, page)` → `Operation::read(txn, "page")`
/// - `w(txn, page)` → `Operation::write(txn, "page")`
/// - `c(txn)`       → `Operation::commit(txn)`
#[macro_export]
macro_rules! op {
    (r($txn:expr, $page:ident)) => {
        twopl_core::operation::Operation::read($txn, stringify!($page))
    };
    (w($txn:expr, $page:ident)) => {
        twopl_core::operation::Operation::write($txn, stringify!($page))
    };
    (c($txn:expr)) => {
        twopl_core::operation::Operation::commit($txn)
    };
}

#[macro_export]
macro_rules! history {
    ($($kind:ident($($args:tt)*)),* $(,)?) => {
        vec![$($crate::op!($kind($($args)*))),*]
    };
}

/// A conflict decision recovered from an annotated schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub requester: TransactionId,
    pub page: String,
    pub holders: Vec<TransactionId>,
    pub resolution: Resolution,
}

/// Replays an annotated schedule and returns, for every pending lock
/// request, who held the page and how the request was resolved.
///
/// # Panics
///
/// Panics if a pending request is not directly followed by its `wait_T` or
/// `restart_T` marker.
pub fn decisions(schedule: &[Operation]) -> Vec<Decision> {
    let mut held: HashMap<String, Vec<TransactionId>> = HashMap::new();
    let mut restarted = Vec::new();
    let mut result = Vec::new();

    for (index, event) in schedule.iter().enumerate() {
        let holders = held.entry(event.page().to_string()).or_default();
        match event.kind() {
            OperationKind::ReadLock | OperationKind::WriteLock => {
                holders.push(event.transaction());
            }
            OperationKind::ReadUnlock | OperationKind::WriteUnlock => {
                holders.retain(|&holder| holder != event.transaction());
            }
            OperationKind::PendingLockRequest(_) => {
                let marker = &schedule[index + 1];
                assert_eq!(marker.transaction(), event.transaction(), "{event}");
                let resolution = match marker.kind() {
                    OperationKind::Wait => Resolution::Wait,
                    OperationKind::Restart => Resolution::Restart,
                    other => panic!("{event} followed by {other:?}"),
                };
                if resolution == Resolution::Restart {
                    assert!(!restarted.contains(&event.transaction()));
                    restarted.push(event.transaction());
                }
                result.push(Decision {
                    requester: event.transaction(),
                    page: event.page().to_string(),
                    holders: holders.clone(),
                    resolution,
                });
            }
            _ => {}
        }
    }
    result
}
