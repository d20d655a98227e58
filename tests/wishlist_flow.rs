mod common;

use rust_decimal_macros::dec;
use storefront_api::{
    dto::wishlist::AddWishlistRequest, error::AppError, routes::params::Pagination,
    services::wishlist_service,
};
use uuid::Uuid;

use common::{create_product, create_user, test_state};

#[tokio::test]
async fn wishlist_add_list_remove() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(250), 3).await;

    let entry = wishlist_service::add_to_wishlist(
        &state,
        &user,
        AddWishlistRequest {
            product_id: product.id,
        },
    )
    .await?
    .data
    .expect("wishlist entry");
    assert_eq!(entry.product_id, product.id);

    let err = wishlist_service::add_to_wishlist(
        &state,
        &user,
        AddWishlistRequest {
            product_id: product.id,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let listed = wishlist_service::list_wishlist(&state, &user, Pagination::default())
        .await?
        .data
        .expect("wishlist");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, product.id);

    wishlist_service::remove_from_wishlist(&state, &user, product.id).await?;
    let err = wishlist_service::remove_from_wishlist(&state, &user, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn unknown_products_cannot_be_wishlisted() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;

    let err = wishlist_service::add_to_wishlist(
        &state,
        &user,
        AddWishlistRequest {
            product_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}
