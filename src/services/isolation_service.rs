//! Isolation service - scripted demonstrations of transaction anomalies.
//!
//! Each demonstration:
//! - Opens a fresh pair of connections
//! - Starts one transaction per connection at a chosen isolation level
//! - Interleaves a few fixed statements between the two transactions
//! - Prints what each read observed
//! - Closes both connections, whether or not the script succeeded
//!
//! The anomalies themselves are produced by the server's concurrency
//! control. Statements are issued in program order except for the crossed
//! updates of the deadlock demonstration, which must run concurrently for
//! the lock cycle to form.

use crate::{
    config::Config,
    db::{self, ConnectionPair},
    error::AppError,
    models::{
        account::{ALICE, BOB, Balance},
        isolation::IsolationLevel,
        observation::Observation,
    },
};
use sqlx::MySqlConnection;

/// Balance written by the dirty read and read committed demonstrations.
const MARKER_BALANCE: Balance = Balance::Integer(9999);

/// The demonstrations, in the order they are run and numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demonstration {
    DirtyRead,
    ReadCommitted,
    RepeatableRead,
    NonRepeatableRead,
    Deadlock,
    LostUpdate,
}

impl Demonstration {
    pub const ALL: [Demonstration; 6] = [
        Demonstration::DirtyRead,
        Demonstration::ReadCommitted,
        Demonstration::RepeatableRead,
        Demonstration::NonRepeatableRead,
        Demonstration::Deadlock,
        Demonstration::LostUpdate,
    ];

    /// Section heading printed before the demonstration runs.
    pub fn title(self) -> &'static str {
        match self {
            Demonstration::DirtyRead => "READ UNCOMMITTED (Dirty Read)",
            Demonstration::ReadCommitted => "READ COMMITTED",
            Demonstration::RepeatableRead => "REPEATABLE READ",
            Demonstration::NonRepeatableRead => "Non-repeatable Read",
            Demonstration::Deadlock => "Deadlock",
            Demonstration::LostUpdate => "Lost Update",
        }
    }

    /// Open a connection pair, run the script on it, then close the pair.
    ///
    /// Returns the readings the script printed.
    ///
    /// # Errors
    ///
    /// Any connection, query or commit failure ends the script early and is
    /// returned to the caller. The connections are still closed, which rolls
    /// back whatever transaction was left open.
    pub async fn run(self, config: &Config) -> Result<Narration, AppError> {
        let mut pair = ConnectionPair::open(config).await?;
        let (c1, c2) = (&mut pair.first, &mut pair.second);

        let result = match self {
            Demonstration::DirtyRead => read_uncommitted(c1, c2).await,
            Demonstration::ReadCommitted => read_committed(c1, c2).await,
            Demonstration::RepeatableRead => {
                read_twice_around_commit(c1, c2, IsolationLevel::RepeatableRead, 500).await
            }
            Demonstration::NonRepeatableRead => {
                read_twice_around_commit(c1, c2, IsolationLevel::ReadCommitted, 200).await
            }
            Demonstration::Deadlock => deadlock(c1, c2).await,
            Demonstration::LostUpdate => lost_update(c1, c2).await,
        };

        pair.close().await;
        result
    }
}

/// Readings a demonstration printed, in the order they were taken.
#[derive(Debug, Default)]
pub struct Narration {
    pub observations: Vec<Observation<'static>>,
}

impl Narration {
    /// Print one reading and keep it.
    fn report(
        &mut self,
        label: &'static str,
        level: IsolationLevel,
        account: &'static str,
        balance: Balance,
    ) {
        let observation = Observation {
            label,
            level,
            account,
            balance,
        };
        tracing::debug!(%observation, "Observed balance");
        println!("{observation}");
        self.observations.push(observation);
    }
}

/// Dirty read: an uncommitted write becomes visible to a READ UNCOMMITTED reader.
///
/// # Process
///
/// 1. c1 writes 9999 to Alice without committing
/// 2. c2 reads Alice
/// 3. c1 rolls back, c2 commits
async fn read_uncommitted(
    c1: &mut MySqlConnection,
    c2: &mut MySqlConnection,
) -> Result<Narration, AppError> {
    let mut narration = Narration::default();
    let level = IsolationLevel::ReadUncommitted;
    let mut tx1 = db::begin(c1, Some(level)).await?;
    let mut tx2 = db::begin(c2, Some(level)).await?;

    db::set_balance(&mut tx1, ALICE, MARKER_BALANCE).await?;
    let dirty = db::fetch_balance(&mut tx2, ALICE).await?;
    narration.report("Dirty Read", level, ALICE, dirty);

    tx1.rollback().await?;
    tx2.commit().await?;

    Ok(narration)
}

/// READ COMMITTED: the reader sees the write only once it is committed.
///
/// # Process
///
/// 1. c1 writes 9999 to Alice
/// 2. c2 reads Alice (old value)
/// 3. c1 commits
/// 4. c2 reads Alice again (new value) and commits
async fn read_committed(
    c1: &mut MySqlConnection,
    c2: &mut MySqlConnection,
) -> Result<Narration, AppError> {
    let mut narration = Narration::default();
    let level = IsolationLevel::ReadCommitted;
    let mut tx1 = db::begin(c1, Some(level)).await?;
    let mut tx2 = db::begin(c2, Some(level)).await?;

    db::set_balance(&mut tx1, ALICE, MARKER_BALANCE).await?;
    let before = db::fetch_balance(&mut tx2, ALICE).await?;
    narration.report("Before commit", level, ALICE, before);

    tx1.commit().await?;
    let after = db::fetch_balance(&mut tx2, ALICE).await?;
    narration.report("After commit", level, ALICE, after);

    tx2.commit().await?;

    Ok(narration)
}

/// Read Bob twice in c1 while c2 commits an increment in between.
///
/// Under REPEATABLE READ both reads agree. Under READ COMMITTED the second
/// read shows the increment (a non-repeatable read).
async fn read_twice_around_commit(
    c1: &mut MySqlConnection,
    c2: &mut MySqlConnection,
    level: IsolationLevel,
    increment: i64,
) -> Result<Narration, AppError> {
    let mut narration = Narration::default();
    let mut tx1 = db::begin(c1, Some(level)).await?;
    let mut tx2 = db::begin(c2, Some(level)).await?;

    let first = db::fetch_balance(&mut tx1, BOB).await?;
    narration.report("First read", level, BOB, first);

    db::adjust_balance(&mut tx2, BOB, increment).await?;
    tx2.commit().await?;

    let second = db::fetch_balance(&mut tx1, BOB).await?;
    narration.report("Second read", level, BOB, second);

    tx1.commit().await?;

    Ok(narration)
}

/// Deadlock: two transactions lock Alice and Bob in opposite order.
///
/// # Process
///
/// 1. c1 adds 100 to Alice, c2 adds 100 to Bob (each now holds one row lock)
/// 2. Concurrently, c1 adds 100 to Bob and c2 adds 100 to Alice
/// 3. The server aborts one side; the error is printed and both roll back
///
/// If neither side fails, both commit.
async fn deadlock(
    c1: &mut MySqlConnection,
    c2: &mut MySqlConnection,
) -> Result<Narration, AppError> {
    let mut tx1 = db::begin(c1, None).await?;
    let mut tx2 = db::begin(c2, None).await?;

    let crossed = async {
        db::adjust_balance(&mut tx1, ALICE, 100).await?;
        db::adjust_balance(&mut tx2, BOB, 100).await?;

        // Each update waits on the row lock the other transaction holds
        let (first, second) = tokio::join!(
            db::adjust_balance(&mut tx1, BOB, 100),
            db::adjust_balance(&mut tx2, ALICE, 100),
        );
        first.and(second)
    }
    .await;

    match crossed {
        Ok(_) => {
            tracing::info!("Crossed updates completed without a deadlock");
            tx1.commit().await?;
            tx2.commit().await?;
        }
        Err(e) => {
            if !e.is_deadlock() {
                tracing::warn!("Crossed updates failed for another reason: {}", e);
            }
            println!("Deadlock detected: {e}");
            tx1.rollback().await?;
            tx2.rollback().await?;
        }
    }

    Ok(Narration::default())
}

/// Lost update: two read-modify-write cycles on Alice overwrite each other.
///
/// # Process
///
/// 1. c1 and c2 both read Alice
/// 2. c1 writes its read + 100 and commits
/// 3. c2 writes its read + 200 and commits, discarding c1's increment
/// 4. A fresh read shows the final balance next to the serial result
async fn lost_update(
    c1: &mut MySqlConnection,
    c2: &mut MySqlConnection,
) -> Result<Narration, AppError> {
    let mut narration = Narration::default();
    let level = IsolationLevel::ReadCommitted;
    let overflow = || AppError::BalanceOverflow(ALICE.to_string());

    let mut tx1 = db::begin(c1, Some(level)).await?;
    let mut tx2 = db::begin(c2, Some(level)).await?;

    let read1 = db::fetch_balance(&mut tx1, ALICE).await?;
    narration.report("First transaction reads", level, ALICE, read1);
    let read2 = db::fetch_balance(&mut tx2, ALICE).await?;
    narration.report("Second transaction reads", level, ALICE, read2);

    db::set_balance(&mut tx1, ALICE, read1.checked_add(100).ok_or_else(overflow)?).await?;
    tx1.commit().await?;

    db::set_balance(&mut tx2, ALICE, read2.checked_add(200).ok_or_else(overflow)?).await?;
    tx2.commit().await?;

    let expected = read1.checked_add(300).ok_or_else(overflow)?;
    let final_balance = db::fetch_balance(c1, ALICE).await?;
    narration.report("After both commits", level, ALICE, final_balance);

    if final_balance != expected {
        println!("Lost update: serial execution would leave Alice's balance = {expected}");
    }

    Ok(narration)
}
