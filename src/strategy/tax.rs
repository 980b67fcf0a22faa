//! Auction house listing tax.
//!
//! The house takes a flat cut of the sale price, with the rate stepping up
//! for expensive items.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Prices below this pay the low rate.
pub const MID_TIER_FROM: u64 = 10_000_000;
/// Prices up to and including this pay the mid rate.
pub const MID_TIER_TO: u64 = 100_000_000;

/// Tax rate for a given price.
pub fn tax_rate(price: u64) -> Decimal {
    if price > MID_TIER_TO {
        dec!(0.025)
    } else if price >= MID_TIER_FROM {
        dec!(0.02)
    } else {
        dec!(0.01)
    }
}

/// Tax paid when an item sells at `price`.
pub fn listing_tax(price: u64) -> Decimal {
    Decimal::from(price) * tax_rate(price)
}
