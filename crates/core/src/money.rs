//! Money helpers: rounding and rupee display.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Money;

/// Number of decimal places money values are stored with.
pub const MONEY_SCALE: u32 = 2;

/// Round to paise, halves away from zero.
pub fn round_money(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount as `₹50.00`.
pub fn format_inr(amount: Money) -> String {
    let mut rounded = round_money(amount);
    rounded.rescale(MONEY_SCALE);
    format!("₹{rounded}")
}

/// Whole-rupee display used in ledger descriptions (`₹500`, `₹75.50`).
pub fn format_inr_compact(amount: Money) -> String {
    format!("₹{}", round_money(amount).normalize())
}

/// Convert a whole number of rupees into [`Money`].
pub fn rupees(amount: i64) -> Money {
    Decimal::from(amount)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(format_inr(dec!(50)), "₹50.00");
        assert_eq!(format_inr(dec!(12.5)), "₹12.50");
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec!(41.665)), dec!(41.67));
        assert_eq!(round_money(dec!(41.664)), dec!(41.66));
    }

    #[test]
    fn compact_drops_trailing_zeros() {
        assert_eq!(format_inr_compact(dec!(500.00)), "₹500");
        assert_eq!(format_inr_compact(dec!(75.50)), "₹75.5");
    }
}
