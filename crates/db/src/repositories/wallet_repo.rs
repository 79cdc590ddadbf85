//! Repositories for the `wallets` and `wallet_transactions` tables.

use klyra_core::types::{DbId, Money, Timestamp};
use klyra_core::wallet::NewTransaction;
use sqlx::PgExecutor;

use crate::models::wallet::{TransactionRow, WalletRow};

/// Column list for `wallet_transactions` queries.
const TX_COLUMNS: &str =
    "id, user_id, kind_id, amount, debt_delta, description, booking_id, created_at";

/// Provides balance reads and delta updates for wallets.
pub struct WalletRepo;

impl WalletRepo {
    pub async fn find(db: impl PgExecutor<'_>, user_id: DbId) -> Result<Option<WalletRow>, sqlx::Error> {
        sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, credit_balance, pending_debt, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Fetch and row-lock a wallet for the rest of the transaction.
    pub async fn lock(db: impl PgExecutor<'_>, user_id: DbId) -> Result<Option<WalletRow>, sqlx::Error> {
        sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, credit_balance, pending_debt, updated_at FROM wallets \
             WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Add signed deltas to a wallet, creating it if missing.
    pub async fn apply_delta(
        db: impl PgExecutor<'_>,
        user_id: DbId,
        amount: Money,
        debt_delta: Money,
        now: Timestamp,
    ) -> Result<WalletRow, sqlx::Error> {
        sqlx::query_as::<_, WalletRow>(
            "INSERT INTO wallets (user_id, credit_balance, pending_debt, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
             SET credit_balance = wallets.credit_balance + EXCLUDED.credit_balance, \
                 pending_debt = wallets.pending_debt + EXCLUDED.pending_debt, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING user_id, credit_balance, pending_debt, updated_at",
        )
        .bind(user_id)
        .bind(amount)
        .bind(debt_delta)
        .bind(now)
        .fetch_one(db)
        .await
    }
}

/// Provides inserts and history reads for ledger rows.
pub struct TransactionRepo;

impl TransactionRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        row: &NewTransaction,
        now: Timestamp,
    ) -> Result<TransactionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO wallet_transactions \
                (user_id, kind_id, amount, debt_delta, description, booking_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TX_COLUMNS}"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(row.user_id)
            .bind(row.kind.id())
            .bind(row.amount)
            .bind(row.debt_delta)
            .bind(&row.description)
            .bind(row.booking_id)
            .bind(now)
            .fetch_one(db)
            .await
    }

    /// A user's ledger, newest first.
    pub async fn list_for_user(
        db: impl PgExecutor<'_>,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<TransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {TX_COLUMNS} FROM wallet_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(db)
            .await
    }
}
