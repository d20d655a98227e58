use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::auth::Claims,
    entity::{coupons, products, users},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, 1).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Store Admin", "admin").await?;
    let user_id = ensure_user(&orm, "user@example.com", "Demo Shopper", "user").await?;
    seed_products(&orm).await?;
    seed_coupon(&orm, "WELCOME10", dec!(10)).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    println!("Admin token: {}", dev_token(&config.jwt_secret, admin_id, "admin")?);
    println!("User token:  {}", dev_token(&config.jwt_secret, user_id, "user")?);
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?;
    if let Some(user) = existing {
        println!("User {email} already present");
        return Ok(user.id);
    }

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let catalog = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", "apparel", dec!(1499), dec!(20), 50),
        ("Ferris Mug", "Coffee tastes better with Ferris", "kitchen", dec!(450), Decimal::ZERO, 100),
        ("Rust Sticker Pack", "Decorate your laptop", "accessories", dec!(199), dec!(10), 200),
        ("Async Rust Handbook", "Learn async Rust patterns", "books", dec!(899), dec!(5), 75),
    ];

    for (name, description, category, mrp, discount_percent, stock) in catalog {
        let exists = products::Entity::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now();
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            category: Set(category.to_string()),
            stock: Set(stock),
            mrp: Set(mrp),
            discount_percent: Set(discount_percent),
            image_urls: Set(serde_json::json!([])),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_coupon(orm: &DatabaseConnection, code: &str, discount: Decimal) -> anyhow::Result<()> {
    let exists = coupons::Entity::find()
        .filter(coupons::Column::Code.eq(code))
        .one(orm)
        .await?
        .is_some();
    if !exists {
        coupons::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_percentage: Set(discount),
            is_active: Set(true),
            expiry_date: Set((Utc::now() + Duration::days(90)).into()),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded coupon {code}");
    Ok(())
}

/// Tokens for local testing only; production tokens come from the identity provider.
fn dev_token(secret: &str, user_id: Uuid, role: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
