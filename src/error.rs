use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::orders::OrderStatus,
    response::{ApiResponse, Meta},
};

/// Why a coupon code cannot be redeemed, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    #[error("Coupon not found")]
    NotFound,
    #[error("Coupon is no longer active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
}

impl CouponRejection {
    pub fn code(&self) -> &'static str {
        match self {
            CouponRejection::NotFound => "COUPON_NOT_FOUND",
            CouponRejection::Inactive => "COUPON_INACTIVE",
            CouponRejection::Expired => "COUPON_EXPIRED",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("No order items provided")]
    EmptyCart,

    #[error("Product {0} is out of stock for the requested quantity")]
    OutOfStock(Uuid),

    #[error("Insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("Product {0} is not in the cart")]
    NotInCart(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("User not found")]
    UserNotFound,

    #[error("User {0} still has orders on record")]
    UserHasOrders(Uuid),

    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Persistence failure")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound
            | AppError::NotInCart(_)
            | AppError::ProductNotFound(_)
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::EmptyCart | AppError::Coupon(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::OutOfStock(_)
            | AppError::InsufficientStock(_)
            | AppError::UserHasOrders(_)
            | AppError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::OutOfStock(_) => "OUT_OF_STOCK",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::NotInCart(_) => "NOT_IN_CART",
            AppError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::UserHasOrders(_) => "USER_HAS_ORDERS",
            AppError::Coupon(rejection) => rejection.code(),
            AppError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorData {
    pub code: String,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Persistence(err) => tracing::error!(error = %err, "persistence failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                code: self.code().to_string(),
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_stable_codes() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::InsufficientStock(id).code(), "INSUFFICIENT_STOCK");
        assert_eq!(AppError::InsufficientStock(id).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(CouponRejection::Expired).code(),
            "COUPON_EXPIRED"
        );
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UserHasOrders(id).code(), "USER_HAS_ORDERS");
        assert_eq!(AppError::UserHasOrders(id).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn persistence_errors_are_generic_to_clients() {
        let err = AppError::from(sea_orm::DbErr::Custom("connection reset".into()));
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
        assert_eq!(err.to_string(), "Persistence failure");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
