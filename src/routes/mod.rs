use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod cart;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/coupons", coupons::router())
        .nest("/orders", orders::route())
        .nest("/wishlist", wishlist::router())
        .nest("/user", users::router())
        .nest("/admin", admin::router())
}
