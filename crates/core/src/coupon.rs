//! Prepaid coupons: code rules, minting, and redemption checks.

use std::sync::LazyLock;

use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::{round_money, rupees};
use crate::policy::MIN_GIFT_AMOUNT;
use crate::types::{DbId, Money, Timestamp};

/// Prefix of self-service gift coupon codes.
pub const GIFT_CODE_PREFIX: &str = "KLYRA";

/// Number of random characters after the gift prefix.
pub const GIFT_CODE_RANDOM_LEN: usize = 8;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: DbId,
    pub code: String,
    pub amount: Money,
    pub max_uses: i32,
    pub used_count: i32,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Store command minting a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub amount: Money,
    pub max_uses: i32,
    #[serde(default)]
    pub created_by: Option<DbId>,
}

impl NewCoupon {
    /// Normalize the code and check amount and usage limits.
    pub fn validated(self) -> Result<Self, CoreError> {
        let code = normalize_code(&self.code);
        if !CODE_RE.is_match(&code) {
            return Err(CoreError::Validation(
                "Coupon code must be 3-32 letters, digits, '-' or '_'".to_string(),
            ));
        }
        let amount = round_money(self.amount);
        if amount <= Money::ZERO {
            return Err(CoreError::Validation(
                "Coupon amount must be positive".to_string(),
            ));
        }
        if self.max_uses < 1 {
            return Err(CoreError::Validation(
                "Coupon max uses must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            code,
            amount,
            max_uses: self.max_uses,
            created_by: self.created_by,
        })
    }
}

/// Trim and upper-case a user-entered code.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Generate a single-use gift code such as `KLYRA7Q2M9XKD`.
pub fn generate_gift_code() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GIFT_CODE_RANDOM_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{GIFT_CODE_PREFIX}{suffix}")
}

/// Build the mint command for a gift coupon bought by `user_id`.
pub fn gift_coupon(user_id: DbId, amount: Money) -> Result<NewCoupon, CoreError> {
    if round_money(amount) < rupees(MIN_GIFT_AMOUNT) {
        return Err(CoreError::Validation(format!(
            "Minimum gift coupon amount is ₹{MIN_GIFT_AMOUNT}"
        )));
    }
    NewCoupon {
        code: generate_gift_code(),
        amount,
        max_uses: 1,
        created_by: Some(user_id),
    }
    .validated()
}

/// Check a coupon can be redeemed once more.
pub fn ensure_redeemable(coupon: &Coupon) -> Result<(), CoreError> {
    if coupon.used_count >= coupon.max_uses {
        return Err(CoreError::CouponExhausted(coupon.code.clone()));
    }
    if !coupon.is_active {
        return Err(CoreError::CouponInactive(coupon.code.clone()));
    }
    Ok(())
}

/// Usage counter and active flag after one more redemption.
pub fn after_redemption(coupon: &Coupon) -> (i32, bool) {
    let used = coupon.used_count + 1;
    (used, used < coupon.max_uses)
}
