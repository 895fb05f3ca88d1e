//! Operations that make up histories and schedules.
//!
//! Every event the scheduler consumes or emits is an [`Operation`]: a
//! transaction id, a page and an [`OperationKind`]. Input histories only use
//! [`OperationKind::Read`], [`OperationKind::Write`] and
//! [`OperationKind::Commit`]; the remaining kinds are produced by the
//! scheduler.
//!
//! Operations render as the short tokens used in textbook schedules:
//!
//! ```text
//! r_1(x) w_1(x) c_1 rl_2(y) wl_2(y) ru_2(y) wu_2(y) rl_3(z)* a_4 wait_5 restart_6
//! ```

use alloc::string::String;
use core::fmt::{Display, Formatter, Result};

/// Identifier of a transaction.
///
/// The id doubles as the transaction's age: a smaller id is an older
/// transaction.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ::derive_more::From)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Returns `true` if `self` started before `other`.
    #[must_use]
    pub const fn is_older_than(self, other: Self) -> bool {
        self.0 < other.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a page. Transaction-wide operations use the empty page.
pub type PageId = String;

/// Mode of a lock on a page.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Shared lock, taken for reads.
    Read,
    /// Exclusive lock, taken for writes.
    Write,
}

impl LockMode {
    /// Shared/exclusive compatibility matrix: only two read locks coexist.
    #[must_use]
    pub const fn is_compatible(self, other: Self) -> bool {
        matches!((self, other), (Self::Read, Self::Read))
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
        }
    }
}

/// The kind of an [`Operation`].
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Read,
    Write,
    Commit,
    Abort,
    ReadLock,
    WriteLock,
    ReadUnlock,
    WriteUnlock,
    /// A lock request that was denied because of a conflict.
    PendingLockRequest(LockMode),
    /// The transaction was put to wait.
    Wait,
    /// The transaction was aborted and will not be scheduled any further.
    Restart,
}

impl OperationKind {
    /// Returns `true` for kinds that make up an input history.
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::Commit)
    }

    /// The lock mode an I/O kind needs, `None` for every other kind.
    #[must_use]
    pub const fn access_mode(self) -> Option<LockMode> {
        match self {
            Self::Read => Some(LockMode::Read),
            Self::Write => Some(LockMode::Write),
            _ => None,
        }
    }

    /// The lock mode a lock grant or lock release refers to.
    #[must_use]
    pub const fn lock_mode(self) -> Option<LockMode> {
        match self {
            Self::ReadLock | Self::ReadUnlock => Some(LockMode::Read),
            Self::WriteLock | Self::WriteUnlock => Some(LockMode::Write),
            _ => None,
        }
    }

    /// `true` for operations that only make sense without a page.
    #[must_use]
    pub const fn is_transaction_wide(self) -> bool {
        matches!(
            self,
            Self::Commit | Self::Abort | Self::Wait | Self::Restart
        )
    }
}

/// Maps an I/O kind to the lock it needs: `Read` to `ReadLock`, `Write` to
/// `WriteLock`. Every other kind has no lock.
#[must_use]
pub const fn lock_kind_for(kind: OperationKind) -> Option<OperationKind> {
    match kind.access_mode() {
        Some(LockMode::Read) => Some(OperationKind::ReadLock),
        Some(LockMode::Write) => Some(OperationKind::WriteLock),
        None => None,
    }
}

/// Maps a held lock to the operation releasing it.
#[must_use]
pub const fn unlock_kind_for(mode: LockMode) -> OperationKind {
    match mode {
        LockMode::Read => OperationKind::ReadUnlock,
        LockMode::Write => OperationKind::WriteUnlock,
    }
}

/// A single event of a history or a schedule. Immutable once created.
///
/// Input operations are built from raw ids ([`Operation::read`],
/// [`Operation::write`], [`Operation::commit`]); the scheduler builds the
/// rest from the [`TransactionId`] of the operation it is handling.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Operation {
    transaction: TransactionId,
    #[cfg_attr(feature = "serde", serde(default))]
    page: PageId,
    kind: OperationKind,
}

impl Operation {
    #[must_use]
    pub fn new(transaction: TransactionId, page: impl Into<PageId>, kind: OperationKind) -> Self {
        Self {
            transaction,
            page: page.into(),
            kind,
        }
    }

    #[must_use]
    pub fn read(transaction: u64, page: impl Into<PageId>) -> Self {
        Self::new(TransactionId(transaction), page, OperationKind::Read)
    }

    #[must_use]
    pub fn write(transaction: u64, page: impl Into<PageId>) -> Self {
        Self::new(TransactionId(transaction), page, OperationKind::Write)
    }

    #[must_use]
    pub fn commit(transaction: u64) -> Self {
        Self::new(TransactionId(transaction), PageId::new(), OperationKind::Commit)
    }

    #[must_use]
    pub fn abort(transaction: u64) -> Self {
        Self::new(TransactionId(transaction), PageId::new(), OperationKind::Abort)
    }

    /// A granted lock of `mode` on `page`.
    #[must_use]
    pub fn lock(
        transaction: TransactionId,
        page: impl Into<PageId>,
        mode: LockMode,
    ) -> Self {
        let kind = match mode {
            LockMode::Read => OperationKind::ReadLock,
            LockMode::Write => OperationKind::WriteLock,
        };
        Self::new(transaction, page, kind)
    }

    /// The release of a lock of `mode` on `page`.
    #[must_use]
    pub fn unlock(
        transaction: TransactionId,
        page: impl Into<PageId>,
        mode: LockMode,
    ) -> Self {
        Self::new(transaction, page, unlock_kind_for(mode))
    }

    /// A denied lock request of `mode` on `page`.
    #[must_use]
    pub fn pending(
        transaction: TransactionId,
        page: impl Into<PageId>,
        mode: LockMode,
    ) -> Self {
        Self::new(transaction, page, OperationKind::PendingLockRequest(mode))
    }

    #[must_use]
    pub fn wait(transaction: TransactionId) -> Self {
        Self::new(transaction, PageId::new(), OperationKind::Wait)
    }

    #[must_use]
    pub fn restart(transaction: TransactionId) -> Self {
        Self::new(transaction, PageId::new(), OperationKind::Restart)
    }

    #[must_use]
    pub const fn transaction(&self) -> TransactionId {
        self.transaction
    }

    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(self.kind, OperationKind::Commit)
    }

    /// The lock operation this I/O operation needs before it can run.
    #[must_use]
    pub fn lock_operation(&self) -> Option<Self> {
        lock_kind_for(self.kind).map(|kind| Self::new(self.transaction, self.page.clone(), kind))
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let (txn, page) = (self.transaction, &self.page);
        match self.kind {
            OperationKind::Read => write!(f, "r_{txn}({page})"),
            OperationKind::Write => write!(f, "w_{txn}({page})"),
            OperationKind::Commit => write!(f, "c_{txn}"),
            OperationKind::Abort => write!(f, "a_{txn}"),
            OperationKind::ReadLock => write!(f, "rl_{txn}({page})"),
            OperationKind::WriteLock => write!(f, "wl_{txn}({page})"),
            OperationKind::ReadUnlock => write!(f, "ru_{txn}({page})"),
            OperationKind::WriteUnlock => write!(f, "wu_{txn}({page})"),
            OperationKind::PendingLockRequest(mode) => {
                write!(f, "{}l_{txn}({page})*", mode.prefix())
            }
            OperationKind::Wait => write!(f, "wait_{txn}"),
            OperationKind::Restart => write!(f, "restart_{txn}"),
        }
    }
}
