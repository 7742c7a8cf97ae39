use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;

use bookmart_auth::{Admin, Hs256Jwt, PasswordHasher, Permission, UserStatus};
use bookmart_core::AdminId;
use bookmart_infra::services::{
    AdminService, BookService, CartService, CheckoutService, OrderService, UserService,
};
use bookmart_infra::{Datastore, InMemoryStore, PostgresStore};

/// Everything the handlers need, wired over one shared datastore.
#[derive(Clone)]
pub struct AppServices {
    pub books: BookService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub users: UserService,
    pub admin: AdminService,
    pub jwt: Arc<Hs256Jwt>,
}

/// Pick the datastore from the environment and build the service layer.
///
/// `USE_PERSISTENT_STORES=true` plus a `DATABASE_URL` selects Postgres;
/// anything else runs in-memory (dev/test). A default admin account is
/// seeded when none exists yet.
pub async fn build_services(jwt: Arc<Hs256Jwt>) -> AppServices {
    let store = select_store().await;
    let hasher = match std::env::var("BCRYPT_COST")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        Some(cost) => PasswordHasher::new(cost),
        None => PasswordHasher::default(),
    };

    if let Err(e) = seed_default_admin(store.as_ref(), &hasher).await {
        tracing::warn!(error = %e, "default admin seeding failed");
    }

    AppServices {
        books: BookService::new(store.clone()),
        carts: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        users: UserService::new(store.clone(), hasher.clone()),
        admin: AdminService::new(store, hasher),
        jwt,
    }
}

async fn select_store() -> Arc<dyn Datastore> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        match connect_postgres().await {
            Ok(store) => return Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "postgres unavailable, falling back to in-memory");
            }
        }
    }

    Arc::new(InMemoryStore::new())
}

async fn connect_postgres() -> anyhow::Result<PostgresStore> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = PgPool::connect(&url).await?;
    Ok(PostgresStore::new(pool))
}

/// Seed the `admin` account with the wildcard grant if it does not exist.
/// The password comes from `ADMIN_PASSWORD`; the fallback is for dev only.
async fn seed_default_admin(
    store: &dyn Datastore,
    hasher: &PasswordHasher,
) -> anyhow::Result<()> {
    let mut tx = store.begin().await?;
    if tx.find_admin_by_username("admin").await?.is_some() {
        return Ok(());
    }

    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_PASSWORD not set; seeding admin with dev password");
        "admin123".to_string()
    });

    let admin = Admin {
        id: AdminId::new(),
        username: "admin".to_string(),
        password_hash: hasher.hash(&password)?,
        full_name: "Administrator".to_string(),
        permissions: vec![Permission::new("*")],
        status: UserStatus::Active,
        last_login_at: None,
        created_at: Utc::now(),
    };
    tx.insert_admin(&admin).await?;
    tx.commit().await?;

    tracing::info!("seeded default admin account");
    Ok(())
}
