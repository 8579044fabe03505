//! Transaction isolation levels understood by MySQL.

use std::fmt;

/// Controls which changes made by concurrent transactions a transaction can see.
///
/// Levels are listed from weakest to strongest. SERIALIZABLE is not used by
/// any demonstration and is left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Dirty reads are allowed: uncommitted writes of other transactions are visible.
    ReadUncommitted,

    /// Every statement sees data committed before that statement began, so two
    /// reads in one transaction can disagree.
    ReadCommitted,

    /// Every read sees the snapshot taken by the transaction's first read.
    /// This is InnoDB's default.
    RepeatableRead,
}

impl IsolationLevel {
    /// Keyword form used in SQL and in narration.
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
        }
    }

    /// Statement that applies this level to the next transaction started on the session.
    ///
    /// MySQL rejects it while a transaction is already open.
    pub fn set_transaction_statement(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
