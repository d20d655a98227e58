use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartLine, CartQuote, CartQuoteRequest, CartState, UpdateCartItemRequest},
        coupons::{CouponList, CouponValidation, CreateCouponRequest, SetCouponActiveRequest, ValidateCouponRequest},
        orders::{OrderList, OrderWithItems, PlaceOrderItem, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        users::UserList,
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    entity::orders::OrderStatus,
    error::{CouponRejection, ErrorData},
    models::{Coupon, Order, OrderItem, PaymentInfo, Product, ShippingAddress, User, WishlistItem},
    pricing::PriceBreakdown,
    response::{ApiResponse, Meta},
    routes::{
        admin, cart, coupons, health, orders, params, products as product_routes, users, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::quote_cart,
        coupons::validate_coupon,
        coupons::list_coupons,
        coupons::create_coupon,
        coupons::set_coupon_active,
        orders::place_order,
        orders::list_my_orders,
        orders::get_order,
        orders::update_order_status,
        orders::delete_order,
        admin::list_all_orders,
        admin::list_users,
        admin::delete_user,
        users::me,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist
    ),
    components(
        schemas(
            User,
            Product,
            WishlistItem,
            Coupon,
            Order,
            OrderItem,
            OrderStatus,
            ShippingAddress,
            PaymentInfo,
            PriceBreakdown,
            CouponRejection,
            ErrorData,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartQuoteRequest,
            CartLine,
            CartState,
            CartQuote,
            ValidateCouponRequest,
            CouponValidation,
            CreateCouponRequest,
            SetCouponActiveRequest,
            CouponList,
            PlaceOrderItem,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            AddWishlistRequest,
            WishlistProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartState>,
            ApiResponse<CartQuote>,
            ApiResponse<CouponValidation>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<UserList>,
            ApiResponse<User>,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Coupons", description = "Coupon validation and management"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Users", description = "Profile of the signed-in user"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
