#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Index;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use storefront_api::{
    config::AppConfig,
    dto::orders::{PlaceOrderItem, PlaceOrderRequest},
    entity::{
        AuditLogs, CartItems, Coupons, OrderItems, Orders, Products, UserOrders, Users,
        WishlistItems, cart_items, coupons, products, users, wishlist_items,
    },
    middleware::auth::AuthUser,
    models::ShippingAddress,
    state::AppState,
};
use uuid::Uuid;

/// Fresh in-memory database with the schema built from the entities.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_state() -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let orm = Database::connect(options).await.expect("connect sqlite");
    create_schema(&orm).await;

    let config = AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        db_max_connections: 1,
    };
    AppState::new(orm, config)
}

async fn create_schema(orm: &DatabaseConnection) {
    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    let statements = vec![
        schema.create_table_from_entity(Users),
        schema.create_table_from_entity(Products),
        schema.create_table_from_entity(CartItems),
        schema.create_table_from_entity(WishlistItems),
        schema.create_table_from_entity(Coupons),
        schema.create_table_from_entity(Orders),
        schema.create_table_from_entity(OrderItems),
        schema.create_table_from_entity(UserOrders),
        schema.create_table_from_entity(AuditLogs),
    ];
    for stmt in statements {
        orm.execute(backend.build(&stmt)).await.expect("create table");
    }

    // one entry per (user, product), as in the migration
    let pairs = [
        Index::create()
            .name("uq_cart_items_user_product")
            .table(CartItems)
            .col(cart_items::Column::UserId)
            .col(cart_items::Column::ProductId)
            .unique()
            .to_owned(),
        Index::create()
            .name("uq_wishlist_items_user_product")
            .table(WishlistItems)
            .col(wishlist_items::Column::UserId)
            .col(wishlist_items::Column::ProductId)
            .unique()
            .to_owned(),
    ];
    for stmt in pairs {
        orm.execute(backend.build(&stmt)).await.expect("create index");
    }
}

pub async fn create_user(state: &AppState, role: &str) -> AuthUser {
    let id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("{id}@example.com")),
        name: Set("Test User".into()),
        role: Set(role.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert user");

    AuthUser {
        user_id: id,
        role: role.into(),
    }
}

pub async fn create_product(state: &AppState, mrp: Decimal, stock: i32) -> products::Model {
    create_discounted_product(state, mrp, Decimal::ZERO, stock).await
}

pub async fn create_discounted_product(
    state: &AppState,
    mrp: Decimal,
    discount_percent: Decimal,
    stock: i32,
) -> products::Model {
    let now = Utc::now();
    products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Ferris Mug".into()),
        description: Set("Coffee tastes better with Ferris".into()),
        category: Set("kitchen".into()),
        stock: Set(stock),
        mrp: Set(mrp),
        discount_percent: Set(discount_percent),
        image_urls: Set(serde_json::json!(["https://cdn.example.com/mug.png"])),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert product")
}

pub async fn create_coupon(
    state: &AppState,
    code: &str,
    discount: Decimal,
    is_active: bool,
    expiry: DateTime<Utc>,
) -> coupons::Model {
    coupons::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.into()),
        discount_percentage: Set(discount),
        is_active: Set(is_active),
        expiry_date: Set(expiry.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert coupon")
}

pub fn in_days(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Put an entry straight into the cart, bypassing stock checks.
pub async fn put_in_cart(state: &AppState, user: &AuthUser, product_id: Uuid, quantity: i32) {
    let now = Utc::now();
    cart_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert cart item");
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> i32 {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await
        .expect("query product")
        .expect("product exists")
        .stock
}

pub async fn cart_len(state: &AppState, user: &AuthUser) -> usize {
    use sea_orm::{ColumnTrait, QueryFilter};
    CartItems::find()
        .filter(cart_items::Column::UserId.eq(user.user_id))
        .all(&state.orm)
        .await
        .expect("query cart")
        .len()
}

pub fn shipping() -> ShippingAddress {
    ShippingAddress {
        name: "Asha Rao".into(),
        mobile: Some("+91 90000 00000".into()),
        address: Some("12 Hill Road".into()),
        city: Some("Pune".into()),
        postal_code: Some("411001".into()),
        country: Some("IN".into()),
    }
}

pub fn order_request(items: Vec<(Uuid, i32, Decimal)>, total_amount: Decimal) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: items
            .into_iter()
            .map(|(product_id, quantity, price)| PlaceOrderItem {
                product_id,
                quantity,
                price,
            })
            .collect(),
        shipping_address: shipping(),
        total_amount,
        payment_id: format!("pay_{}", Uuid::new_v4().simple()),
        payment_method: None,
        coupon_code: None,
    }
}
