use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{
        coupons, order_items,
        orders::{self, OrderStatus},
        products, users, wishlist_items,
    },
    pricing,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub stock: i32,
    pub mrp: Decimal,
    pub discount_percent: Decimal,
    /// Derived from `mrp` and `discount_percent` on every read.
    pub current_price: Decimal,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            current_price: pricing::current_price(model.mrp, model.discount_percent),
            image_urls: image_urls_from_json(model.image_urls),
            name: model.name,
            description: model.description,
            category: model.category,
            stock: model.stock,
            mrp: model.mrp,
            discount_percent: model.discount_percent,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

pub fn image_urls_from_json(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<wishlist_items::Model> for WishlistItem {
    fn from(model: wishlist_items::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: Decimal,
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<coupons::Model> for Coupon {
    fn from(model: coupons::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            discount_percentage: model.discount_percentage,
            is_active: model.is_active,
            expiry_date: model.expiry_date.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Shipping address as it was at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub name: String,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentInfo {
    pub method: String,
    pub reference: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentInfo,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            total_price: model.total_price,
            coupon_code: model.coupon_code,
            shipping_address: ShippingAddress {
                name: model.shipping_name,
                mobile: model.shipping_mobile,
                address: model.shipping_address,
                city: model.shipping_city,
                postal_code: model.shipping_postal_code,
                country: model.shipping_country,
            },
            payment: PaymentInfo {
                method: model.payment_method,
                reference: model.payment_reference,
                status: model.payment_status,
                paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            },
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    /// Display data joined from the catalog when the order is read.
    pub product_name: Option<String>,
    pub image_urls: Vec<String>,
}

impl OrderItem {
    pub fn from_entity(model: order_items::Model, product: Option<&products::Model>) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            product_name: product.map(|p| p.name.clone()),
            image_urls: product
                .map(|p| image_urls_from_json(p.image_urls.clone()))
                .unwrap_or_default(),
        }
    }
}
