mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_api::{
    dto::{
        cart::{AddToCartRequest, CartQuoteRequest, UpdateCartItemRequest},
        products::UpdateProductRequest,
    },
    error::{AppError, CouponRejection},
    services::{cart_service, product_service},
};
use uuid::Uuid;

use common::{create_coupon, create_discounted_product, create_product, create_user, in_days, test_state};

fn add(product_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn adding_twice_merges_and_caps_at_stock() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 5).await;

    let cart = cart_service::add_to_cart(&state, &user, add(product.id, 3)).await?;
    let cart = cart.data.expect("cart state");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    let cart = cart_service::add_to_cart(&state, &user, add(product.id, 4)).await?;
    let cart = cart.data.expect("cart state");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    Ok(())
}

#[tokio::test]
async fn add_rejects_bad_quantities_and_unknown_products() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 2).await;
    let sold_out = create_product(&state, dec!(100), 0).await;

    let err = cart_service::add_to_cart(&state, &user, add(product.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock(id) if id == product.id));

    let err = cart_service::add_to_cart(&state, &user, add(sold_out.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock(_)));

    let err = cart_service::add_to_cart(&state, &user, add(product.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = cart_service::add_to_cart(&state, &user, add(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn set_quantity_checks_entry_then_stock() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 4).await;

    let err = cart_service::set_quantity(
        &state,
        &user,
        UpdateCartItemRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotInCart(id) if id == product.id));

    cart_service::add_to_cart(&state, &user, add(product.id, 1)).await?;

    let err = cart_service::set_quantity(
        &state,
        &user,
        UpdateCartItemRequest {
            product_id: product.id,
            quantity: 9,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock(_)));

    let cart = cart_service::set_quantity(
        &state,
        &user,
        UpdateCartItemRequest {
            product_id: product.id,
            quantity: 4,
        },
    )
    .await?
    .data
    .expect("cart state");
    assert_eq!(cart.items[0].quantity, 4);
    Ok(())
}

#[tokio::test]
async fn remove_is_idempotent_and_clear_empties_the_cart() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let mug = create_product(&state, dec!(100), 10).await;
    let hoodie = create_product(&state, dec!(300), 10).await;

    cart_service::add_to_cart(&state, &user, add(mug.id, 1)).await?;
    cart_service::add_to_cart(&state, &user, add(hoodie.id, 2)).await?;

    let cart = cart_service::remove_from_cart(&state, &user, mug.id).await?;
    assert_eq!(cart.data.expect("cart state").items.len(), 1);
    let cart = cart_service::remove_from_cart(&state, &user, mug.id).await?;
    assert_eq!(cart.data.expect("cart state").items.len(), 1);

    cart_service::clear_cart(&state, &user).await?;
    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart state");
    assert!(cart.items.is_empty());
    assert_eq!(cart.summary.subtotal, Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn cart_reads_live_catalog_prices() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    let user = create_user(&state, "user").await;
    let product = create_discounted_product(&state, dec!(1000), dec!(25), 10).await;

    cart_service::add_to_cart(&state, &user, add(product.id, 2)).await?;
    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart state");
    assert_eq!(cart.items[0].unit_price, dec!(750));
    assert_eq!(cart.items[0].line_total, dec!(1500));
    assert_eq!(cart.summary.delivery_charge, dec!(10));
    assert_eq!(cart.summary.grand_total, dec!(1520));

    product_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            mrp: Some(dec!(400)),
            ..Default::default()
        },
    )
    .await?;

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart state");
    assert_eq!(cart.items[0].unit_price, dec!(300));
    assert_eq!(cart.summary.subtotal, dec!(600));
    assert_eq!(cart.summary.delivery_charge, dec!(50));
    Ok(())
}

#[tokio::test]
async fn quote_applies_a_redeemable_coupon() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(550), 10).await;
    create_coupon(&state, "SAVE10", dec!(10), true, in_days(7)).await;
    create_coupon(&state, "OLD", dec!(50), true, in_days(-1)).await;

    cart_service::add_to_cart(&state, &user, add(product.id, 2)).await?;

    let quote = cart_service::quote_cart(
        &state,
        &user,
        CartQuoteRequest {
            coupon_code: Some("SAVE10".into()),
        },
    )
    .await?
    .data
    .expect("quote");
    assert_eq!(quote.summary.discount_amount, dec!(110));
    assert_eq!(quote.summary.after_discount, dec!(990));
    assert_eq!(quote.summary.grand_total, dec!(1050));

    let plain = cart_service::quote_cart(&state, &user, CartQuoteRequest::default())
        .await?
        .data
        .expect("quote");
    assert_eq!(plain.summary.grand_total, dec!(1120));

    let err = cart_service::quote_cart(
        &state,
        &user,
        CartQuoteRequest {
            coupon_code: Some("OLD".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Coupon(CouponRejection::Expired)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_adds_merge_into_one_entry() -> anyhow::Result<()> {
    let state = test_state().await;
    let user = create_user(&state, "user").await;
    let product = create_product(&state, dec!(100), 5).await;

    let product_id = product.id;
    let mut tasks = Vec::new();
    for quantity in [2, 2] {
        let state = state.clone();
        let user = user.clone();
        tasks.push(tokio::spawn(async move {
            cart_service::add_to_cart(&state, &user, add(product_id, quantity)).await
        }));
    }
    for task in tasks {
        task.await??;
    }

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart state");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 4);

    // the merge still caps at stock
    cart_service::add_to_cart(&state, &user, add(product.id, 3)).await?;
    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart state");
    assert_eq!(cart.items[0].quantity, 5);
    Ok(())
}
