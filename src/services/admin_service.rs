use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        users::UserList,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        user_orders::{Column as UserOrderCol, Entity as UserOrders},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
        wishlist_items::{Column as WishlistCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    middleware::auth::{ADMIN_ROLE, AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_service::with_items,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::page(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Move an order to a new status. Delivered and cancelled orders stay put.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let from = existing.status;
    if !from.can_transition_to(payload.status) {
        return Err(AppError::InvalidStatusTransition {
            from,
            to: payload.status,
        });
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, %from, to = %order.status, "order status changed");
    audit::record(
        &state.orm,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": from, "to": order.status }),
    )
    .await;

    let mut found = with_items(&state.orm, vec![order]).await?;
    let order = found.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order updated", order, Some(Meta::empty())))
}

/// Hard delete an order with its items and history link. Stock is left as is.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    if Orders::find_by_id(id).one(&txn).await?.is_none() {
        txn.rollback().await?;
        return Err(AppError::NotFound);
    }

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    UserOrders::delete_many()
        .filter(UserOrderCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Order deleted"))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::page(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

/// Remove a customer account with its cart and wishlist.
///
/// Admin accounts cannot be removed. Accounts with placed orders are kept so
/// order history stays attributable.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let target = match removable_user(&txn, id).await {
        Ok(target) => target,
        Err(err) => {
            txn.rollback().await?;
            return Err(err);
        }
    };

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(id))
        .exec(&txn)
        .await?;
    WishlistItems::delete_many()
        .filter(WishlistCol::UserId.eq(id))
        .exec(&txn)
        .await?;
    Users::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %id, "user deleted");
    audit::record(
        &state.orm,
        user.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id, "email": target.email }),
    )
    .await;

    Ok(ApiResponse::done("User deleted"))
}

async fn removable_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<UserModel> {
    let target = match Users::find_by_id(id).one(conn).await? {
        Some(u) => u,
        None => return Err(AppError::UserNotFound),
    };
    if target.role == ADMIN_ROLE {
        return Err(AppError::Forbidden);
    }

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(id))
        .count(conn)
        .await?;
    if orders > 0 {
        return Err(AppError::UserHasOrders(id));
    }
    Ok(target)
}
