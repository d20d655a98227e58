//! Checkout pricing.
//!
//! Everything here is a pure function of its inputs. Amounts are kept at full
//! precision and only rounded through [`PriceBreakdown::rounded`] when they are
//! presented.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

pub const PLATFORM_FEE: Decimal = dec!(10);

/// Largest amount the `NUMERIC(12, 2)` money columns can hold.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Most units of one product a single checkout line may carry.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

const HUNDRED: Decimal = dec!(100);

/// Selling price of a product after its own discount.
pub fn current_price(mrp: Decimal, discount_percent: Decimal) -> Decimal {
    let discount_percent = clamp_percent(discount_percent);
    mrp - mrp * discount_percent / HUNDRED
}

/// Delivery charge tier for an already discounted subtotal.
pub fn delivery_charge(after_discount: Decimal) -> Decimal {
    if after_discount < dec!(500) {
        dec!(80)
    } else if after_discount < dec!(1000) {
        dec!(50)
    } else {
        dec!(10)
    }
}

fn clamp_percent(percent: Decimal) -> Decimal {
    percent.clamp(Decimal::ZERO, HUNDRED)
}

/// One priced cart or checkout line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    /// `None` when the product could not be resolved; such lines cost nothing.
    pub unit_price: Option<Decimal>,
    pub quantity: i32,
}

impl PricedLine {
    pub fn new(unit_price: Option<Decimal>, quantity: i32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    fn amount(&self) -> Decimal {
        let quantity = Decimal::from(self.quantity.max(0));
        self.unit_price.unwrap_or(Decimal::ZERO).max(Decimal::ZERO) * quantity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub after_discount: Decimal,
    pub delivery_charge: Decimal,
    pub platform_fee: Decimal,
    pub grand_total: Decimal,
}

impl PriceBreakdown {
    /// Round every amount to currency precision for display.
    pub fn rounded(&self) -> Self {
        let round = |value: Decimal| {
            value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        Self {
            subtotal: round(self.subtotal),
            discount_percent: self.discount_percent,
            discount_amount: round(self.discount_amount),
            after_discount: round(self.after_discount),
            delivery_charge: round(self.delivery_charge),
            platform_fee: round(self.platform_fee),
            grand_total: round(self.grand_total),
        }
    }
}

/// Price a set of lines with an optional coupon discount (0 when none applies).
pub fn quote(lines: &[PricedLine], discount_percent: Decimal) -> PriceBreakdown {
    let discount_percent = clamp_percent(discount_percent);
    let subtotal: Decimal = lines.iter().map(PricedLine::amount).sum();
    let discount_amount = subtotal * discount_percent / HUNDRED;
    let after_discount = subtotal - discount_amount;
    let delivery_charge = delivery_charge(after_discount);

    PriceBreakdown {
        subtotal,
        discount_percent,
        discount_amount,
        after_discount,
        delivery_charge,
        platform_fee: PLATFORM_FEE,
        grand_total: after_discount + delivery_charge + PLATFORM_FEE,
    }
}
