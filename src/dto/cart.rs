use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::Product, pricing::PriceBreakdown};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CartQuoteRequest {
    pub coupon_code: Option<String>,
}

/// Cart entry joined with the live catalog row.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// `None` when the product no longer exists.
    pub product: Option<Product>,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub summary: PriceBreakdown,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartQuote {
    pub coupon_code: Option<String>,
    pub summary: PriceBreakdown,
}
