//! Wallet and ledger rows.

use klyra_core::error::CoreError;
use klyra_core::status::{StatusId, TransactionKind};
use klyra_core::types::{DbId, Money, Timestamp};
use klyra_core::wallet::{Transaction, WalletAccount};
use sqlx::FromRow;

use super::decode_status;

/// A row from the `wallets` table.
#[derive(Debug, Clone, FromRow)]
pub struct WalletRow {
    pub user_id: DbId,
    pub credit_balance: Money,
    pub pending_debt: Money,
    pub updated_at: Timestamp,
}

impl From<WalletRow> for WalletAccount {
    fn from(row: WalletRow) -> Self {
        WalletAccount {
            user_id: row.user_id,
            credit_balance: row.credit_balance,
            pending_debt: row.pending_debt,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `wallet_transactions` table.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: DbId,
    pub user_id: DbId,
    pub kind_id: StatusId,
    pub amount: Money,
    pub debt_delta: Money,
    pub description: String,
    pub booking_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            kind: decode_status(row.kind_id, "transaction kind", TransactionKind::from_id)?,
            amount: row.amount,
            debt_delta: row.debt_delta,
            description: row.description,
            booking_id: row.booking_id,
            created_at: row.created_at,
        })
    }
}
