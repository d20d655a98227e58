mod common;

use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entity::Users,
    error::AppError,
    routes::params::Pagination,
    services::{admin_service, order_service, user_service},
};
use uuid::Uuid;

use common::{
    cart_len, create_product, create_user, order_request, put_in_cart, test_state,
};

#[tokio::test]
async fn profile_reads_the_callers_account() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;

    let profile = user_service::get_profile(&state, &user)
        .await?
        .data
        .expect("profile");
    assert_eq!(profile.id, user.user_id);
    assert_eq!(profile.role, "user");
    assert_eq!(profile.email, format!("{}@example.com", user.user_id));
    Ok(())
}

#[tokio::test]
async fn admins_list_users_page_by_page() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    let user = create_user(&state, "user").await;
    create_user(&state, "user").await;

    let first = admin_service::list_users(
        &state,
        &admin,
        Pagination {
            page: Some(1),
            per_page: Some(2),
        },
    )
    .await?;
    assert_eq!(first.data.expect("users").items.len(), 2);
    assert_eq!(first.meta.and_then(|m| m.total), Some(3));

    let err = admin_service::list_users(&state, &user, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn deleting_a_customer_drops_their_cart_and_profile() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 5).await;
    put_in_cart(&state, &user, product.id, 2).await;

    admin_service::delete_user(&state, &admin, user.user_id).await?;

    assert!(Users::find_by_id(user.user_id).one(&state.orm).await?.is_none());
    assert_eq!(cart_len(&state, &user).await, 0);

    let err = user_service::get_profile(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound));

    let err = admin_service::delete_user(&state, &admin, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserNotFound));
    Ok(())
}

#[tokio::test]
async fn admins_and_order_holders_are_kept() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    let other_admin = create_user(&state, "admin").await;
    let buyer = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 5).await;

    let err = admin_service::delete_user(&state, &admin, other_admin.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    order_service::place_order(
        &state,
        &buyer,
        order_request(vec![(product.id, 1, dec!(100))], dec!(190)),
    )
    .await?;
    let err = admin_service::delete_user(&state, &admin, buyer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserHasOrders(id) if id == buyer.user_id));
    assert!(Users::find_by_id(buyer.user_id).one(&state.orm).await?.is_some());

    let err = admin_service::delete_user(&state, &buyer, admin.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}
