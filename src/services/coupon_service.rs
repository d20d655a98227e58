use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::coupons::{CouponList, CouponValidation, CreateCouponRequest, SetCouponActiveRequest, ValidateCouponRequest},
    entity::coupons::{ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel},
    error::{AppError, AppResult, CouponRejection},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Decide whether a coupon can be redeemed at `now`.
///
/// Checks run in a fixed order: existence, then the active flag, then expiry.
/// A coupon stops being valid at the exact instant of its expiry date.
pub fn check_redeemable(
    coupon: Option<&CouponModel>,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now >= coupon.expiry_date.with_timezone(&Utc) {
        return Err(CouponRejection::Expired);
    }
    Ok(coupon.discount_percentage)
}

pub async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Option<CouponModel>> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(code))
        .one(conn)
        .await?;
    Ok(coupon)
}

/// Discount percentage of a currently redeemable coupon.
pub async fn redeemable_discount<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Decimal> {
    let coupon = find_by_code(conn, code).await?;
    let discount = check_redeemable(coupon.as_ref(), Utc::now())?;
    Ok(discount)
}

pub async fn validate_coupon(
    state: &AppState,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<CouponValidation>> {
    let coupon = find_by_code(&state.orm, &payload.code).await?;
    let validation = match check_redeemable(coupon.as_ref(), Utc::now()) {
        Ok(discount) => CouponValidation {
            is_valid: true,
            code: payload.code,
            discount_percentage: Some(discount),
            reason: None,
            message: None,
        },
        Err(rejection) => {
            tracing::debug!(code = %payload.code, reason = rejection.code(), "coupon rejected");
            CouponValidation {
                is_valid: false,
                code: payload.code,
                discount_percentage: None,
                reason: Some(rejection),
                message: Some(rejection.to_string()),
            }
        }
    };

    let message = if validation.is_valid {
        "Coupon is valid"
    } else {
        "Coupon is not valid"
    };
    Ok(ApiResponse::success(message, validation, Some(Meta::empty())))
}

/// Parse an expiry given either as a timestamp or as a date.
///
/// A bare date keeps the coupon valid through the whole day: the stored expiry
/// is the following midnight UTC.
pub fn parse_expiry(input: &str) -> AppResult<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("expiry_date must be RFC 3339 or YYYY-MM-DD".into()))?;
    date.succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| AppError::BadRequest("expiry_date is out of range".into()))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let code = payload.code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("code must not be empty".into()));
    }
    if payload.discount_percentage <= Decimal::ZERO || payload.discount_percentage > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "discount_percentage must be greater than 0 and at most 100".into(),
        ));
    }
    let expiry = parse_expiry(&payload.expiry_date)?;

    if find_by_code(&state.orm, &code).await?.is_some() {
        return Err(AppError::BadRequest("Coupon already exists".into()));
    }

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        discount_percentage: Set(payload.discount_percentage),
        is_active: Set(true),
        expiry_date: Set(expiry.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon added successfully",
        Coupon::from(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn list_coupons(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let items: Vec<Coupon> = Coupons::find()
        .order_by_desc(CouponCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();
    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(meta),
    ))
}

/// Toggle the active flag, the only mutation a coupon ever receives.
pub async fn set_coupon_active(
    state: &AppState,
    user: &AuthUser,
    code: &str,
    payload: SetCouponActiveRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let existing = match find_by_code(&state.orm, code).await? {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: CouponActive = existing.into();
    active.is_active = Set(payload.is_active);
    let coupon = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "coupon_toggle",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "is_active": coupon.is_active }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon updated",
        Coupon::from(coupon),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn coupon(is_active: bool, expiry: DateTime<Utc>) -> CouponModel {
        CouponModel {
            id: Uuid::new_v4(),
            code: "SAVE10".into(),
            discount_percentage: dec!(10),
            is_active,
            expiry_date: expiry.into(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn active_unexpired_coupon_yields_discount() {
        let now = Utc::now();
        let c = coupon(true, now + Duration::days(1));
        assert_eq!(check_redeemable(Some(&c), now), Ok(dec!(10)));
    }

    #[test]
    fn missing_coupon_is_not_found() {
        assert_eq!(check_redeemable(None, Utc::now()), Err(CouponRejection::NotFound));
    }

    #[test]
    fn inactive_is_reported_before_expired() {
        let now = Utc::now();
        let c = coupon(false, now - Duration::days(3));
        assert_eq!(check_redeemable(Some(&c), now), Err(CouponRejection::Inactive));
    }

    #[test]
    fn expiry_instant_itself_is_expired() {
        let expiry = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let c = coupon(true, expiry);
        assert_eq!(check_redeemable(Some(&c), expiry), Err(CouponRejection::Expired));
        assert!(check_redeemable(Some(&c), expiry - Duration::milliseconds(1)).is_ok());
    }

    #[test]
    fn date_only_expiry_covers_the_whole_day() {
        let expiry = parse_expiry("2026-02-28").expect("date parses");
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        let c = coupon(true, expiry);
        let late_that_day = Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap();
        assert!(check_redeemable(Some(&c), late_that_day).is_ok());
    }

    #[test]
    fn timestamp_expiry_is_kept_verbatim() {
        let expiry = parse_expiry("2026-05-01T12:30:00+02:00").expect("timestamp parses");
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 5, 1, 10, 30, 0).unwrap());
        assert!(parse_expiry("next tuesday").is_err());
    }
}
