pub mod audit_logs;
pub mod cart_items;
pub mod coupons;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod user_orders;
pub mod users;
pub mod wishlist_items;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use coupons::Entity as Coupons;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use user_orders::Entity as UserOrders;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
