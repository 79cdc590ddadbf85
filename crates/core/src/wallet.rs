//! Wallet ledger rules: debt-first credits, penalty splits, and the
//! descriptions written on transaction rows.
//!
//! Every mutation of a wallet writes exactly one [`Transaction`] whose
//! `amount` is the change of `credit_balance` and whose `debt_delta` is the
//! change of `pending_debt`. Summing the rows reproduces the wallet.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::{format_inr_compact, round_money, rupees};
use crate::policy::MIN_TOP_UP;
use crate::status::TransactionKind;
use crate::types::{DbId, Money, Timestamp};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub user_id: DbId,
    pub credit_balance: Money,
    pub pending_debt: Money,
    pub updated_at: Timestamp,
}

impl WalletAccount {
    /// Wallet state for a user that has never been credited.
    pub fn empty(user_id: DbId, now: Timestamp) -> Self {
        Self {
            user_id,
            credit_balance: Decimal::ZERO,
            pending_debt: Decimal::ZERO,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: TransactionKind,
    /// Signed change of `credit_balance`.
    pub amount: Money,
    /// Signed change of `pending_debt`.
    pub debt_delta: Money,
    pub description: String,
    pub booking_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A ledger row to be written together with its wallet mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: DbId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub debt_delta: Money,
    pub description: String,
    pub booking_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Credits and charges
// ---------------------------------------------------------------------------

/// How an incoming credit is divided between debt and balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSplit {
    pub applied_to_debt: Money,
    pub credited_to_balance: Money,
}

/// Credits repay pending debt first; the remainder goes to the balance.
pub fn settle_credit(pending_debt: Money, amount: Money) -> CreditSplit {
    let applied_to_debt = amount.min(pending_debt).max(Decimal::ZERO);
    CreditSplit {
        applied_to_debt,
        credited_to_balance: amount - applied_to_debt,
    }
}

/// How a penalty is divided between the balance and new debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSplit {
    pub from_balance: Money,
    pub to_debt: Money,
}

/// A penalty takes what the balance holds and carries the rest as debt.
pub fn split_charge(credit_balance: Money, charge: Money) -> ChargeSplit {
    let from_balance = charge.min(credit_balance).max(Decimal::ZERO);
    ChargeSplit {
        from_balance,
        to_debt: charge - from_balance,
    }
}

/// Fail with [`CoreError::InsufficientBalance`] unless `balance` covers `cost`.
pub fn ensure_can_pay(balance: Money, cost: Money) -> Result<(), CoreError> {
    if balance < cost {
        return Err(CoreError::InsufficientBalance {
            required: cost,
            available: balance,
        });
    }
    Ok(())
}

pub fn validate_top_up(amount: Money) -> Result<Money, CoreError> {
    let amount = round_money(amount);
    if amount < rupees(MIN_TOP_UP) {
        return Err(CoreError::Validation(format!(
            "Minimum top-up amount is ₹{MIN_TOP_UP}"
        )));
    }
    Ok(amount)
}

/// Result of crediting a wallet (top-up or coupon).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub amount: Money,
    pub applied_to_debt: Money,
    pub credited_to_balance: Money,
    pub credit_balance: Money,
    pub pending_debt: Money,
}

// ---------------------------------------------------------------------------
// Ledger descriptions
// ---------------------------------------------------------------------------

pub fn booking_debit_description(spot_number: &str) -> String {
    format!("Parking Booking - {spot_number}")
}

pub fn top_up_description(amount: Money) -> String {
    format!("Wallet Top-up - {}", format_inr_compact(amount))
}

pub fn coupon_description(code: &str) -> String {
    format!("Coupon Redeemed - {code}")
}

pub fn extension_description(hours: i64) -> String {
    format!("Booking Extension - {hours}h")
}

pub fn refund_description(booking_id: DbId) -> String {
    format!("Refund - Booking #{booking_id}")
}

pub fn compensation_description(booking_id: DbId) -> String {
    format!("Compensation - Booking #{booking_id}")
}

pub fn penalty_description(booking_id: DbId, overstay_minutes: i64) -> String {
    format!("Overstay Penalty - Booking #{booking_id} ({overstay_minutes} min)")
}

/// Ledger rows for an engine-initiated cancellation: refund then compensation.
pub fn cancellation_rows(
    user_id: DbId,
    booking_id: DbId,
    refund: Money,
    compensation: Money,
) -> [NewTransaction; 2] {
    [
        NewTransaction {
            user_id,
            kind: TransactionKind::Refund,
            amount: refund,
            debt_delta: Decimal::ZERO,
            description: refund_description(booking_id),
            booking_id: Some(booking_id),
        },
        NewTransaction {
            user_id,
            kind: TransactionKind::Compensation,
            amount: compensation,
            debt_delta: Decimal::ZERO,
            description: compensation_description(booking_id),
            booking_id: Some(booking_id),
        },
    ]
}
