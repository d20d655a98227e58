mod common;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use storefront_api::{
    dto::coupons::{CreateCouponRequest, SetCouponActiveRequest, ValidateCouponRequest},
    error::{AppError, CouponRejection},
    services::coupon_service,
};

use common::{create_coupon, create_user, in_days, test_state};

fn validate(code: &str) -> ValidateCouponRequest {
    ValidateCouponRequest { code: code.into() }
}

#[tokio::test]
async fn validation_reports_discount_or_reason() -> anyhow::Result<()> {
    let state = test_state().await;
    create_coupon(&state, "SAVE10", dec!(10), true, in_days(3)).await;
    create_coupon(&state, "PAUSED", dec!(15), false, in_days(-3)).await;
    create_coupon(&state, "GONE", dec!(20), true, in_days(-1)).await;

    let ok = coupon_service::validate_coupon(&state, validate("SAVE10"))
        .await?
        .data
        .expect("validation");
    assert!(ok.is_valid);
    assert_eq!(ok.discount_percentage, Some(dec!(10)));

    let paused = coupon_service::validate_coupon(&state, validate("PAUSED"))
        .await?
        .data
        .expect("validation");
    assert!(!paused.is_valid);
    assert_eq!(paused.reason, Some(CouponRejection::Inactive));

    let gone = coupon_service::validate_coupon(&state, validate("GONE"))
        .await?
        .data
        .expect("validation");
    assert_eq!(gone.reason, Some(CouponRejection::Expired));

    // codes match exactly
    let missing = coupon_service::validate_coupon(&state, validate("save10"))
        .await?
        .data
        .expect("validation");
    assert_eq!(missing.reason, Some(CouponRejection::NotFound));
    Ok(())
}

#[tokio::test]
async fn admins_create_coupons_with_unique_codes() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    let user = create_user(&state, "user").await;

    let request = |code: &str, pct| CreateCouponRequest {
        code: code.into(),
        discount_percentage: pct,
        expiry_date: "2099-12-31".into(),
    };

    let created = coupon_service::create_coupon(&state, &admin, request("NEWYEAR", dec!(25)))
        .await?
        .data
        .expect("coupon");
    assert!(created.is_active);
    assert_eq!(
        created.expiry_date,
        Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()
    );

    let err = coupon_service::create_coupon(&state, &admin, request("NEWYEAR", dec!(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = coupon_service::create_coupon(&state, &admin, request("ZERO", dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = coupon_service::create_coupon(&state, &user, request("MINE", dec!(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listed = coupon_service::list_coupons(&state, &admin)
        .await?
        .data
        .expect("coupons");
    assert_eq!(listed.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn deactivated_coupons_stop_validating() -> anyhow::Result<()> {
    let state = test_state().await;
    let admin = create_user(&state, "admin").await;
    create_coupon(&state, "FLASH", dec!(30), true, in_days(1)).await;

    let coupon = coupon_service::set_coupon_active(
        &state,
        &admin,
        "FLASH",
        SetCouponActiveRequest { is_active: false },
    )
    .await?
    .data
    .expect("coupon");
    assert!(!coupon.is_active);

    let err = coupon_service::redeemable_discount(&state.orm, "FLASH")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Coupon(CouponRejection::Inactive)));

    let err = coupon_service::set_coupon_active(
        &state,
        &admin,
        "NOPE",
        SetCouponActiveRequest { is_active: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}
