use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{
        AddToCartRequest, CartLine, CartQuote, CartQuoteRequest, CartState, UpdateCartItemRequest,
    },
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    services::coupon_service,
    state::AppState,
};

/// Quantity an add should leave in the cart.
///
/// A request that on its own exceeds the available stock is refused. Merging
/// into an existing entry caps the sum at the stock instead.
pub fn resolve_quantity(
    product_id: Uuid,
    existing: Option<i32>,
    requested: i32,
    stock: i32,
) -> AppResult<i32> {
    if requested < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }
    if stock <= 0 || requested > stock {
        return Err(AppError::OutOfStock(product_id));
    }
    let quantity = match existing {
        Some(current) => current.saturating_add(requested).min(stock),
        None => requested.clamp(1, stock),
    };
    Ok(quantity)
}

/// The user's cart joined with live catalog data and an uncouponed summary.
pub async fn load_cart_state<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartState> {
    let (items, lines) = load_lines(conn, user_id).await?;
    let summary = pricing::quote(&lines, Decimal::ZERO).rounded();
    Ok(CartState { items, summary })
}

async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<(Vec<CartLine>, Vec<PricedLine>)> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut lines = Vec::with_capacity(rows.len());
    for (entry, product) in rows {
        let product = product.map(Product::from);
        let unit_price = product.as_ref().map(|p| p.current_price);
        lines.push(PricedLine::new(unit_price, entry.quantity));

        let unit_price = unit_price.unwrap_or(Decimal::ZERO);
        items.push(CartLine {
            id: entry.id,
            product_id: entry.product_id,
            quantity: entry.quantity,
            product,
            unit_price,
            line_total: unit_price * Decimal::from(entry.quantity),
        });
    }
    Ok((items, lines))
}

async fn find_entry<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<CartModel>> {
    let entry = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .one(conn)
        .await?;
    Ok(entry)
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartState>> {
    let cart = load_cart_state(&state.orm, user.user_id).await?;
    let meta = Meta::whole(cart.items.len());
    Ok(ApiResponse::success("OK", cart, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartState>> {
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let product = match Products::find_by_id(payload.product_id).one(&state.orm).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let existing = find_entry(&state.orm, user.user_id, payload.product_id).await?;
    let quantity = resolve_quantity(
        payload.product_id,
        existing.as_ref().map(|e| e.quantity),
        payload.quantity,
        product.stock,
    )?;

    // a concurrent first add lands on the unique pair and merges instead
    let now = Utc::now();
    let merged = Expr::col((CartItems, CartCol::Quantity)).add(payload.quantity);
    let on_conflict = OnConflict::columns([CartCol::UserId, CartCol::ProductId])
        .value(
            CartCol::Quantity,
            Expr::case(Expr::expr(merged.clone()).lte(product.stock), merged)
                .finally(product.stock),
        )
        .value(CartCol::UpdatedAt, DateTime::<FixedOffset>::from(now))
        .to_owned();

    CartItems::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        quantity: Set(quantity),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(on_conflict)
    .exec_without_returning(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": quantity }),
    )
    .await;

    let cart = load_cart_state(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", cart, Some(Meta::empty())))
}

pub async fn set_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartState>> {
    let entry = match find_entry(&state.orm, user.user_id, payload.product_id).await? {
        Some(e) => e,
        None => return Err(AppError::NotInCart(payload.product_id)),
    };
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::ProductNotFound(payload.product_id))?;
    if payload.quantity > product.stock {
        return Err(AppError::OutOfStock(payload.product_id));
    }

    let mut active: CartActive = entry.into();
    active.quantity = Set(payload.quantity);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    let cart = load_cart_state(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, Some(Meta::empty())))
}

/// Removing an entry that is not there is not an error.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartState>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected > 0 {
        audit::record(
            &state.orm,
            user.user_id,
            "cart_remove",
            "cart_items",
            serde_json::json!({ "product_id": product_id }),
        )
        .await;
    }

    let cart = load_cart_state(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", cart, Some(Meta::empty())))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    tracing::debug!(user_id = %user.user_id, removed = result.rows_affected, "cart cleared");
    audit::record(
        &state.orm,
        user.user_id,
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": result.rows_affected }),
    )
    .await;

    Ok(ApiResponse::done("Cart cleared"))
}

/// Price the current cart, applying a coupon when one is given.
pub async fn quote_cart(
    state: &AppState,
    user: &AuthUser,
    payload: CartQuoteRequest,
) -> AppResult<ApiResponse<CartQuote>> {
    let coupon_code = payload
        .coupon_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());

    let discount = match coupon_code.as_deref() {
        Some(code) => coupon_service::redeemable_discount(&state.orm, code).await?,
        None => Decimal::ZERO,
    };

    let (_, lines) = load_lines(&state.orm, user.user_id).await?;
    let summary = pricing::quote(&lines, discount).rounded();

    Ok(ApiResponse::success(
        "Quote",
        CartQuote {
            coupon_code,
            summary,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_keeps_requested_quantity() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_quantity(id, None, 3, 10).unwrap(), 3);
        assert_eq!(resolve_quantity(id, None, 10, 10).unwrap(), 10);
    }

    #[test]
    fn merge_is_capped_at_stock() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_quantity(id, Some(4), 3, 5).unwrap(), 5);
        assert_eq!(resolve_quantity(id, Some(1), 1, 5).unwrap(), 2);
    }

    #[test]
    fn request_above_stock_is_refused() {
        let id = Uuid::new_v4();
        assert!(matches!(
            resolve_quantity(id, None, 6, 5),
            Err(AppError::OutOfStock(p)) if p == id
        ));
        assert!(matches!(
            resolve_quantity(id, Some(2), 1, 0),
            Err(AppError::OutOfStock(_))
        ));
    }

    #[test]
    fn non_positive_quantity_is_a_validation_error() {
        let id = Uuid::new_v4();
        assert!(matches!(
            resolve_quantity(id, None, 0, 5),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_quantity(id, Some(1), -2, 5),
            Err(AppError::BadRequest(_))
        ));
    }
}
