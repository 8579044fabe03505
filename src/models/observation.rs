//! A single narrated balance reading.

use crate::models::{account::Balance, isolation::IsolationLevel};
use std::fmt;

/// One balance read by one transaction at a known isolation level.
///
/// Displays as `<label> (<LEVEL>): <account>'s balance = <balance>`, for example
/// `Dirty Read (READ UNCOMMITTED): Alice's balance = 9999`.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// What the reading illustrates ("First read", "After commit", ...)
    pub label: &'a str,

    /// Isolation level of the transaction that performed the read
    pub level: IsolationLevel,

    /// Name of the account that was read
    pub account: &'a str,

    pub balance: Balance,
}

impl fmt::Display for Observation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}'s balance = {}",
            self.label, self.level, self.account, self.balance
        )
    }
}
