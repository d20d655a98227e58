use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderItem, PlaceOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel, OrderStatus},
        products::{Column as ProdCol, Entity as Products},
        user_orders::{ActiveModel as UserOrderActive, Column as UserOrderCol, Entity as UserOrders},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    services::coupon_service,
    state::AppState,
};

const DEFAULT_PAYMENT_METHOD: &str = "card";
const PAYMENT_STATUS_PAID: &str = "paid";

/// Progress of a single order placement, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStep {
    Started,
    StockReserved,
    OrderCreated,
    UserUpdated,
    CartCleared,
    Done,
    Failed,
}

impl PlacementStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementStep::Started => "STARTED",
            PlacementStep::StockReserved => "STOCK_RESERVED",
            PlacementStep::OrderCreated => "ORDER_CREATED",
            PlacementStep::UserUpdated => "USER_UPDATED",
            PlacementStep::CartCleared => "CART_CLEARED",
            PlacementStep::Done => "DONE",
            PlacementStep::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PlacementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn advance(order_id: Uuid, reached: &mut PlacementStep, next: PlacementStep) {
    tracing::debug!(%order_id, from = %reached, to = %next, "order placement step");
    *reached = next;
}

/// Reject malformed checkout requests before anything is written.
pub fn validate_request(payload: &PlaceOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if let Some(item) = payload.items.iter().find(|i| i.quantity < 1) {
        return Err(AppError::BadRequest(format!(
            "quantity for product {} must be at least 1",
            item.product_id
        )));
    }
    if let Some(item) = payload
        .items
        .iter()
        .find(|i| i.quantity > pricing::MAX_LINE_QUANTITY)
    {
        return Err(AppError::BadRequest(format!(
            "quantity for product {} must be at most {}",
            item.product_id,
            pricing::MAX_LINE_QUANTITY
        )));
    }
    if let Some(item) = payload.items.iter().find(|i| i.price < Decimal::ZERO) {
        return Err(AppError::BadRequest(format!(
            "price for product {} must not be negative",
            item.product_id
        )));
    }
    if let Some(item) = payload.items.iter().find(|i| i.price > pricing::MAX_AMOUNT) {
        return Err(AppError::BadRequest(format!(
            "price for product {} exceeds {}",
            item.product_id,
            pricing::MAX_AMOUNT
        )));
    }
    if payload.total_amount < Decimal::ZERO {
        return Err(AppError::BadRequest("total_amount must not be negative".into()));
    }
    if payload.total_amount > pricing::MAX_AMOUNT {
        return Err(AppError::BadRequest(format!(
            "total_amount exceeds {}",
            pricing::MAX_AMOUNT
        )));
    }
    if payload.payment_id.trim().is_empty() {
        return Err(AppError::BadRequest("payment_id is required".into()));
    }
    if payload.shipping_address.name.trim().is_empty() {
        return Err(AppError::BadRequest("shipping name is required".into()));
    }
    Ok(())
}

/// Grand total the server would charge for the checkout snapshot.
pub fn expected_total(items: &[PlaceOrderItem], discount_percent: Decimal) -> Decimal {
    let lines: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine::new(Some(item.price), item.quantity))
        .collect();
    pricing::quote(&lines, discount_percent).rounded().grand_total
}

/// Place an order for an already captured payment.
///
/// Stock reservation, order creation, the history append and cart clearing
/// share one transaction. Any failure rolls all of it back.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    validate_request(&payload)?;

    let coupon_code = payload
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);
    let discount = match coupon_code.as_deref() {
        Some(code) => coupon_service::redeemable_discount(&state.orm, code).await?,
        None => Decimal::ZERO,
    };

    let expected = expected_total(&payload.items, discount);
    if expected != payload.total_amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) {
        tracing::warn!(
            user_id = %user.user_id,
            charged = %payload.total_amount,
            expected = %expected,
            "charged total differs from server quote"
        );
    }

    let order_id = Uuid::new_v4();
    let mut reached = PlacementStep::Started;
    tracing::debug!(%order_id, user_id = %user.user_id, step = %reached, "order placement step");

    let txn = state.orm.begin().await?;
    let created = reserve_and_record(
        &txn,
        user.user_id,
        order_id,
        &payload,
        coupon_code,
        &mut reached,
    )
    .await;

    let (order, items) = match created {
        Ok(created) => {
            txn.commit().await?;
            created
        }
        Err(err) => {
            tracing::warn!(
                %order_id,
                step = %PlacementStep::Failed,
                after = %reached,
                code = err.code(),
                error = %err,
                "order placement failed"
            );
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(%order_id, error = %rollback_err, "rollback failed");
            }
            return Err(err);
        }
    };
    advance(order_id, &mut reached, PlacementStep::Done);

    audit::record(
        &state.orm,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
    )
    .await;

    let items = attach_products(&state.orm, items).await?;
    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

async fn reserve_and_record(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    order_id: Uuid,
    payload: &PlaceOrderRequest,
    coupon_code: Option<String>,
    reached: &mut PlacementStep,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    if Users::find_by_id(user_id).one(txn).await?.is_none() {
        return Err(AppError::UserNotFound);
    }

    // fixed row order so concurrent checkouts lock products consistently
    let mut reservations: Vec<&PlaceOrderItem> = payload.items.iter().collect();
    reservations.sort_by_key(|item| item.product_id);
    for item in reservations {
        reserve_stock(txn, item.product_id, item.quantity).await?;
    }
    advance(order_id, reached, PlacementStep::StockReserved);

    let now = Utc::now();
    let address = &payload.shipping_address;
    let payment_method = payload
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD);

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        total_price: Set(payload.total_amount),
        coupon_code: Set(coupon_code),
        shipping_name: Set(address.name.trim().to_string()),
        shipping_mobile: Set(address.mobile.clone()),
        shipping_address: Set(address.address.clone()),
        shipping_city: Set(address.city.clone()),
        shipping_postal_code: Set(address.postal_code.clone()),
        shipping_country: Set(address.country.clone()),
        payment_method: Set(payment_method.to_string()),
        payment_reference: Set(payload.payment_id.trim().to_string()),
        payment_status: Set(PAYMENT_STATUS_PAID.to_string()),
        paid_at: Set(Some(now.into())),
        status: Set(OrderStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let created = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price: Set(item.price),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await?;
        items.push(created);
    }
    advance(order_id, reached, PlacementStep::OrderCreated);

    UserOrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        order_id: Set(order.id),
        created_at: Set(now.into()),
    }
    .insert(txn)
    .await?;
    advance(order_id, reached, PlacementStep::UserUpdated);

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(txn)
        .await?;
    advance(order_id, reached, PlacementStep::CartCleared);

    Ok((order, items))
}

/// Take `quantity` units of a product, or fail without touching its stock.
async fn reserve_stock<C: ConnectionTrait>(conn: &C, product_id: Uuid, quantity: i32) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let exists = Products::find_by_id(product_id).one(conn).await?.is_some();
        return Err(if exists {
            AppError::InsufficientStock(product_id)
        } else {
            AppError::ProductNotFound(product_id)
        });
    }
    Ok(())
}

/// Join order items with catalog display data.
pub async fn attach_products<C: ConnectionTrait>(
    conn: &C,
    items: Vec<OrderItemModel>,
) -> AppResult<Vec<OrderItem>> {
    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    Ok(items
        .into_iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            OrderItem::from_entity(item, product)
        })
        .collect())
}

/// Load the items of each order, keeping the order of `orders`.
pub async fn with_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;
    let items = attach_products(conn, items).await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            OrderWithItems {
                order: Order::from(order),
                items,
            }
        })
        .collect())
}

/// Orders from the user's history, newest first.
pub async fn list_my_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let order_ids: Vec<Uuid> = UserOrders::find()
        .filter(UserOrderCol::UserId.eq(user.user_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|entry| entry.order_id)
        .collect();

    let orders = if order_ids.is_empty() {
        Vec::new()
    } else {
        Orders::find()
            .filter(OrderCol::Id.is_in(order_ids))
            .order_by_desc(OrderCol::CreatedAt)
            .all(&state.orm)
            .await?
    };

    let items = with_items(&state.orm, orders).await?;
    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        "OK",
        OrderList { items },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut found = with_items(&state.orm, vec![order]).await?;
    let order = found.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}
