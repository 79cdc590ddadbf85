//! Wallet, top-up and coupon operations.

use klyra_core::coupon::{gift_coupon, normalize_code, Coupon, NewCoupon};
use klyra_core::error::CoreError;
use klyra_core::types::{DbId, Money, Timestamp};
use klyra_core::wallet::{validate_top_up, CreditReceipt, Transaction, WalletAccount};
use serde::Serialize;

use super::ParkingEngine;

/// Attempts at drawing an unused gift code before giving up.
const GIFT_CODE_ATTEMPTS: usize = 5;

/// Result of redeeming a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub code: String,
    #[serde(flatten)]
    pub receipt: CreditReceipt,
}

impl ParkingEngine {
    /// Redeem a coupon code. Credits repay pending debt before the balance.
    pub async fn redeem_coupon(
        &self,
        user_id: DbId,
        code: &str,
        now: Timestamp,
    ) -> Result<Redemption, CoreError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(CoreError::Validation("Coupon code is required".to_string()));
        }

        let receipt = self.store.redeem_coupon(user_id, &code, now).await?;
        tracing::info!(
            user_id,
            code = %code,
            amount = %receipt.amount,
            applied_to_debt = %receipt.applied_to_debt,
            "Coupon redeemed",
        );
        Ok(Redemption { code, receipt })
    }

    pub async fn top_up(
        &self,
        user_id: DbId,
        amount: Money,
        now: Timestamp,
    ) -> Result<CreditReceipt, CoreError> {
        let amount = validate_top_up(amount)?;
        let receipt = self.store.top_up(user_id, amount, now).await?;
        tracing::info!(
            user_id,
            amount = %amount,
            applied_to_debt = %receipt.applied_to_debt,
            "Wallet topped up",
        );
        Ok(receipt)
    }

    /// Mint a single-use gift coupon bought by `user_id`.
    ///
    /// Payment is settled elsewhere; a colliding random code is redrawn.
    pub async fn gift_coupon(
        &self,
        user_id: DbId,
        amount: Money,
        now: Timestamp,
    ) -> Result<Coupon, CoreError> {
        let mut last_err = None;
        for _ in 0..GIFT_CODE_ATTEMPTS {
            let coupon = gift_coupon(user_id, amount)?;
            match self.store.insert_coupon(coupon, now).await {
                Ok(created) => {
                    tracing::info!(
                        user_id,
                        coupon_id = created.id,
                        amount = %created.amount,
                        "Gift coupon created",
                    );
                    return Ok(created);
                }
                Err(CoreError::Conflict(msg)) => {
                    tracing::debug!(user_id, "Gift code collision, retrying");
                    last_err = Some(CoreError::Conflict(msg));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            CoreError::Internal("Could not allocate a gift code".to_string())
        }))
    }

    /// Operator-defined coupon with an explicit code.
    pub async fn mint_coupon(
        &self,
        admin_id: DbId,
        coupon: NewCoupon,
        now: Timestamp,
    ) -> Result<Coupon, CoreError> {
        let coupon = NewCoupon {
            created_by: Some(admin_id),
            ..coupon
        }
        .validated()?;
        let created = self.store.insert_coupon(coupon, now).await?;
        tracing::info!(
            admin_id,
            code = %created.code,
            amount = %created.amount,
            max_uses = created.max_uses,
            "Coupon minted",
        );
        Ok(created)
    }

    /// Outstanding debt; zero when the user has no wallet yet.
    pub async fn check_pending_debt(&self, user_id: DbId) -> Result<Money, CoreError> {
        Ok(self
            .store
            .find_wallet(user_id)
            .await?
            .map(|w| w.pending_debt)
            .unwrap_or(Money::ZERO))
    }

    pub async fn wallet(&self, user_id: DbId, now: Timestamp) -> Result<WalletAccount, CoreError> {
        Ok(self
            .store
            .find_wallet(user_id)
            .await?
            .unwrap_or_else(|| WalletAccount::empty(user_id, now)))
    }

    pub async fn transactions(
        &self,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Transaction>, CoreError> {
        self.store.list_transactions(user_id, limit.clamp(1, 500)).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use klyra_core::coupon::GIFT_CODE_PREFIX;
    use klyra_core::status::TransactionKind;
    use klyra_core::store::ParkingStore;
    use klyra_core::wallet::NewTransaction;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::engine::test_support::{at, engine, fund};

    fn coupon(code: &str, amount: Money, max_uses: i32) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            amount,
            max_uses,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn coupon_repays_debt_before_balance() {
        let (engine, store) = engine();
        store
            .post_transaction(
                NewTransaction {
                    user_id: 1,
                    kind: TransactionKind::OverstayPenalty,
                    amount: Money::ZERO,
                    debt_delta: dec!(120),
                    description: "seed debt".to_string(),
                    booking_id: None,
                },
                at(8, 0),
            )
            .await;
        engine
            .mint_coupon(99, coupon("welcome100", dec!(100), 1), at(8, 0))
            .await
            .unwrap();

        let redemption = engine
            .redeem_coupon(1, " Welcome100 ", at(9, 0))
            .await
            .unwrap();

        assert_eq!(redemption.code, "WELCOME100");
        assert_eq!(redemption.receipt.applied_to_debt, dec!(100));
        assert_eq!(redemption.receipt.credited_to_balance, Money::ZERO);
        assert_eq!(engine.check_pending_debt(1).await.unwrap(), dec!(20));
        assert_eq!(engine.wallet(1, at(9, 0)).await.unwrap().credit_balance, Money::ZERO);
    }

    #[tokio::test]
    async fn single_use_coupon_redeems_once() {
        let (engine, store) = engine();
        engine
            .mint_coupon(99, coupon("ONCE", dec!(75), 1), at(8, 0))
            .await
            .unwrap();

        engine.redeem_coupon(1, "once", at(9, 0)).await.unwrap();
        let repeat = engine.redeem_coupon(1, "ONCE", at(9, 1)).await.unwrap_err();
        assert_matches!(repeat, CoreError::CouponExhausted(_));
        assert_eq!(store.find_wallet(1).await.unwrap().unwrap().credit_balance, dec!(75));
        assert_eq!(store.ledger(1).await.len(), 1);

        let err = engine.redeem_coupon(2, "ONCE", at(9, 2)).await.unwrap_err();
        assert_matches!(err, CoreError::CouponExhausted(_));
        assert!(store.find_wallet(2).await.unwrap().is_none());
        let used = store.find_coupon("ONCE").await.unwrap().unwrap();
        assert_eq!(used.used_count, 1);
        assert!(!used.is_active);
    }

    #[tokio::test]
    async fn unknown_coupon_is_not_found() {
        let (engine, _store) = engine();
        let err = engine.redeem_coupon(1, "NOPE", at(9, 0)).await.unwrap_err();
        assert_matches!(err, CoreError::CouponNotFound(code) if code == "NOPE");
    }

    #[tokio::test]
    async fn duplicate_mint_is_conflict() {
        let (engine, _store) = engine();
        engine
            .mint_coupon(99, coupon("SPRING", dec!(10), 5), at(8, 0))
            .await
            .unwrap();
        let err = engine
            .mint_coupon(99, coupon("spring", dec!(10), 5), at(8, 0))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }

    #[tokio::test]
    async fn gift_coupon_is_single_use_and_owned() {
        let (engine, _store) = engine();
        let gift = engine.gift_coupon(7, dec!(100), at(8, 0)).await.unwrap();

        assert!(gift.code.starts_with(GIFT_CODE_PREFIX));
        assert_eq!(gift.max_uses, 1);
        assert_eq!(gift.created_by, Some(7));

        let err = engine.gift_coupon(7, dec!(20), at(8, 0)).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn top_up_enforces_minimum_and_settles_debt() {
        let (engine, store) = engine();
        let err = engine.top_up(1, dec!(49.99), at(8, 0)).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));

        fund(&store, 1, dec!(10)).await;
        let receipt = engine.top_up(1, dec!(50), at(9, 0)).await.unwrap();
        assert_eq!(receipt.credit_balance, dec!(60));

        let history = engine.transactions(1, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "Wallet Top-up - ₹50");
    }

    #[tokio::test]
    async fn missing_wallet_reads_as_empty() {
        let (engine, _store) = engine();
        assert_eq!(engine.check_pending_debt(5).await.unwrap(), Money::ZERO);
        let wallet = engine.wallet(5, at(8, 0)).await.unwrap();
        assert_eq!(wallet.credit_balance, Money::ZERO);
    }
}
