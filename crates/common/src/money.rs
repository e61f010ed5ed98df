//! Decimal money helpers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits stored for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Price of `quantity` units at `unit_price`.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}
