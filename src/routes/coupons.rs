use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::{
    dto::coupons::{CouponList, CouponValidation, CreateCouponRequest, SetCouponActiveRequest, ValidateCouponRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Coupon,
    response::ApiResponse,
    services::coupon_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/validate", post(validate_coupon))
        .route("/{code}/active", patch(set_coupon_active))
}

#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon can be redeemed", body = ApiResponse<CouponValidation>),
        (status = 400, description = "Coupon cannot be redeemed", body = ApiResponse<CouponValidation>),
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CouponValidation>>)> {
    let resp = coupon_service::validate_coupon(&state, payload).await?;
    let status = if resp.data.as_ref().is_some_and(|v| v.is_valid) {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/coupons",
    responses(
        (status = 200, description = "All coupons (admin only)", body = ApiResponse<CouponList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    let resp = coupon_service::list_coupons(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created (admin only)", body = ApiResponse<Coupon>),
        (status = 400, description = "Invalid or duplicate coupon"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Coupon>>)> {
    let resp = coupon_service::create_coupon(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/coupons/{code}/active",
    params(
        ("code" = String, Path, description = "Coupon code")
    ),
    request_body = SetCouponActiveRequest,
    responses(
        (status = 200, description = "Coupon activated or deactivated (admin only)", body = ApiResponse<Coupon>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn set_coupon_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
    Json(payload): Json<SetCouponActiveRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = coupon_service::set_coupon_active(&state, &user, &code, payload).await?;
    Ok(Json(resp))
}
