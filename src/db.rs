//! Database connections, transactions and the statements the demonstrations issue.
//!
//! This module provides utilities for:
//! - Opening dedicated MySQL connections, one pair per demonstration
//! - Starting transactions at a chosen isolation level
//! - Reading and updating rows of the `accounts` table
//! - Creating and seeding `accounts` through the embedded migration

use crate::{
    config::Config,
    error::AppError,
    models::{account::Balance, isolation::IsolationLevel},
};
use sqlx::{
    Connection, MySql, MySqlConnection, Transaction,
    mysql::MySqlArguments,
    query::Query,
};

/// Open one dedicated connection.
///
/// Demonstrations need two sessions that the server treats as independent
/// clients, so connections are opened directly instead of through a pool.
///
/// # Errors
///
/// Returns an error if:
/// - The server cannot be reached
/// - Authentication fails
/// - The configured database does not exist
pub async fn create_connection(config: &Config) -> Result<MySqlConnection, sqlx::Error> {
    MySqlConnection::connect_with(&config.connect_options()).await
}

/// Close a connection, logging instead of failing.
///
/// The server rolls back any transaction still open on the session.
async fn close_connection(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }
}

/// The two sessions a demonstration interleaves statements on.
pub struct ConnectionPair {
    pub first: MySqlConnection,
    pub second: MySqlConnection,
}

impl ConnectionPair {
    /// Open both connections. If the second fails the first is closed again.
    pub async fn open(config: &Config) -> Result<Self, AppError> {
        let first = create_connection(config).await?;

        let second = match create_connection(config).await {
            Ok(conn) => conn,
            Err(e) => {
                close_connection(first).await;
                return Err(e.into());
            }
        };

        tracing::debug!(host = %config.host, database = %config.database, "Connection pair opened");

        Ok(Self { first, second })
    }

    /// Close both connections.
    pub async fn close(self) {
        close_connection(self.first).await;
        close_connection(self.second).await;
        tracing::debug!("Connection pair closed");
    }
}

/// Start a transaction, optionally at a specific isolation level.
///
/// # Process
///
/// 1. `SET TRANSACTION ISOLATION LEVEL ...` (only when `level` is given)
/// 2. `BEGIN`
///
/// With `None` the transaction runs at the session's default level.
pub async fn begin(
    conn: &mut MySqlConnection,
    level: Option<IsolationLevel>,
) -> Result<Transaction<'_, MySql>, AppError> {
    if let Some(level) = level {
        // Text protocol; the statement cannot be prepared
        sqlx::raw_sql(level.set_transaction_statement())
            .execute(&mut *conn)
            .await?;
    }

    let tx = conn.begin().await?;

    match level {
        Some(level) => tracing::debug!(isolation = %level, "Transaction started"),
        None => tracing::debug!("Transaction started at session default isolation"),
    }

    Ok(tx)
}

/// Run a statement and return the number of rows it changed.
///
/// MySQL counts changed rows, so an UPDATE that writes the value a row
/// already holds reports 0.
async fn execute_query(
    conn: &mut MySqlConnection,
    query: Query<'_, MySql, MySqlArguments>,
) -> Result<u64, AppError> {
    let rows = query.execute(&mut *conn).await?.rows_affected();
    Ok(rows)
}

/// Read one account's balance.
///
/// # Errors
///
/// - `AccountNotFound`: no row has this name
/// - `Database`: the query failed or `balance` is not a numeric column
pub async fn fetch_balance(conn: &mut MySqlConnection, name: &str) -> Result<Balance, AppError> {
    tracing::debug!(account = name, "SELECT balance");

    sqlx::query_as::<_, Balance>("SELECT balance FROM accounts WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
}

/// Overwrite one account's balance.
pub async fn set_balance(
    conn: &mut MySqlConnection,
    name: &str,
    balance: Balance,
) -> Result<u64, AppError> {
    tracing::debug!(account = name, %balance, "UPDATE balance = value");

    let query = sqlx::query("UPDATE accounts SET balance = ? WHERE name = ?");
    let query = match balance {
        Balance::Integer(value) => query.bind(value),
        Balance::Decimal(value) => query.bind(value),
        Balance::Float(value) => query.bind(value),
    };

    execute_query(conn, query.bind(name)).await
}

/// Add `amount` to one account's balance inside the database.
pub async fn adjust_balance(
    conn: &mut MySqlConnection,
    name: &str,
    amount: i64,
) -> Result<u64, AppError> {
    tracing::debug!(account = name, amount, "UPDATE balance = balance + amount");

    let query = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE name = ?")
        .bind(amount)
        .bind(name);

    execute_query(conn, query).await
}

/// Create the `accounts` table and seed Alice and Bob.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so the seed runs once per database.
///
/// # Migration Files
///
/// Migration files must be in `migrations/` directory with format:
/// - `<timestamp>_<name>.sql` (e.g., `20250101000001_create_accounts.sql`)
pub async fn run_migrations(conn: &mut MySqlConnection) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(conn).await
}

/// Open a short-lived connection and apply the embedded migration.
pub async fn prepare_schema(config: &Config) -> Result<(), AppError> {
    let mut conn = create_connection(config).await?;
    let result = run_migrations(&mut conn).await;
    close_connection(conn).await;

    Ok(result?)
}

/// These tests need a disposable MySQL database configured through the same
/// environment variables as the binary. Run with `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::{ALICE, BOB};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    async fn setup() -> (Config, ConnectionPair) {
        let config = Config::from_env().expect("database environment variables");
        prepare_schema(&config).await.expect("prepare schema");
        let pair = ConnectionPair::open(&config).await.expect("open connections");
        (config, pair)
    }

    /// Hide `accounts` on this session behind a temporary table whose
    /// `balance` column has the given type, holding a single Alice row.
    async fn shadow_accounts(conn: &mut MySqlConnection, column_type: &str, seed: &str) {
        sqlx::raw_sql("DROP TEMPORARY TABLE IF EXISTS accounts")
            .execute(&mut *conn)
            .await
            .unwrap();

        let create = format!(
            "CREATE TEMPORARY TABLE accounts (name VARCHAR(64) NOT NULL PRIMARY KEY, balance {column_type} NOT NULL)"
        );
        sqlx::raw_sql(&create).execute(&mut *conn).await.unwrap();

        let insert = format!("INSERT INTO accounts (name, balance) VALUES ('{ALICE}', {seed})");
        sqlx::raw_sql(&insert).execute(&mut *conn).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn reads_seeded_accounts() {
        let (_, mut pair) = setup().await;

        fetch_balance(&mut pair.first, ALICE).await.unwrap();
        fetch_balance(&mut pair.first, BOB).await.unwrap();

        pair.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn missing_account_is_reported_by_name() {
        let (_, mut pair) = setup().await;

        let error = fetch_balance(&mut pair.first, "Mallory").await.unwrap_err();
        assert!(matches!(error, AppError::AccountNotFound(ref name) if name == "Mallory"));

        pair.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn uncommitted_write_is_visible_only_below_read_committed() {
        let (_, mut pair) = setup().await;
        let original = fetch_balance(&mut pair.first, BOB).await.unwrap();
        let dirty = original.checked_add(1).unwrap();

        let mut writer = begin(&mut pair.first, Some(IsolationLevel::ReadCommitted))
            .await
            .unwrap();
        set_balance(&mut writer, BOB, dirty).await.unwrap();

        let mut reader = begin(&mut pair.second, Some(IsolationLevel::ReadUncommitted))
            .await
            .unwrap();
        assert_eq!(fetch_balance(&mut reader, BOB).await.unwrap(), dirty);
        reader.commit().await.unwrap();

        let mut reader = begin(&mut pair.second, Some(IsolationLevel::ReadCommitted))
            .await
            .unwrap();
        assert_eq!(fetch_balance(&mut reader, BOB).await.unwrap(), original);
        reader.commit().await.unwrap();

        writer.rollback().await.unwrap();
        pair.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn adjust_balance_changes_one_row() {
        let (_, mut pair) = setup().await;

        let mut tx = begin(&mut pair.first, None).await.unwrap();
        assert_eq!(adjust_balance(&mut tx, ALICE, 1).await.unwrap(), 1);
        tx.rollback().await.unwrap();

        pair.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn decimal_balance_keeps_its_scale() {
        let (_, mut pair) = setup().await;
        let conn = &mut pair.first;
        shadow_accounts(conn, "DECIMAL(12,2)", "1500.00").await;

        let balance = fetch_balance(conn, ALICE).await.unwrap();
        assert_eq!(balance, Balance::Decimal(Decimal::from_str("1500.00").unwrap()));
        assert_eq!(balance.to_string(), "1500.00");

        set_balance(conn, ALICE, balance).await.unwrap();
        assert_eq!(fetch_balance(conn, ALICE).await.unwrap().to_string(), "1500.00");

        set_balance(conn, ALICE, balance.checked_add(1).unwrap())
            .await
            .unwrap();
        assert_eq!(fetch_balance(conn, ALICE).await.unwrap().to_string(), "1501.00");

        adjust_balance(conn, ALICE, 1).await.unwrap();
        assert_eq!(fetch_balance(conn, ALICE).await.unwrap().to_string(), "1502.00");

        pair.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server"]
    async fn double_balance_decodes_as_float() {
        let (_, mut pair) = setup().await;
        let conn = &mut pair.first;
        shadow_accounts(conn, "DOUBLE", "12.5").await;

        let balance = fetch_balance(conn, ALICE).await.unwrap();
        assert_eq!(balance, Balance::Float(12.5));

        set_balance(conn, ALICE, balance.checked_add(1).unwrap())
            .await
            .unwrap();
        assert_eq!(fetch_balance(conn, ALICE).await.unwrap(), Balance::Float(13.5));

        adjust_balance(conn, ALICE, 1).await.unwrap();
        assert_eq!(fetch_balance(conn, ALICE).await.unwrap(), Balance::Float(14.5));

        pair.close().await;
    }
}
