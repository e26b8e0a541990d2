//! Bulk writes used by the seed and cleanup commands.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use storelens_core::model::Snapshot;

use super::RepositoryError;

/// Tables in dependency order (children last).
const TABLES: [&str; 7] = [
    "users",
    "products",
    "carts",
    "cart_items",
    "orders",
    "order_items",
    "reviews",
];

/// Insert every entity of `snapshot` in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if an id or email already exists, and
/// `RepositoryError::Database` for other failures. Nothing is written on error.
pub async fn write_snapshot(pool: &PgPool, snapshot: &Snapshot) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;
    insert_all(&mut tx, snapshot).await.map_err(conflict)?;
    tx.commit().await?;

    info!(
        users = snapshot.users.len(),
        products = snapshot.products.len(),
        carts = snapshot.carts.len(),
        orders = snapshot.orders.len(),
        reviews = snapshot.reviews.len(),
        "relational store seeded"
    );
    Ok(())
}

async fn insert_all(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &Snapshot,
) -> Result<(), sqlx::Error> {
    for user in &snapshot.users {
        sqlx::query(
            "INSERT INTO users (id, name, email, signup_source, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.signup_source)
        .bind(user.created_at)
        .execute(&mut **tx)
        .await?;
    }

    for product in &snapshot.products {
        sqlx::query(
            "INSERT INTO products (id, name, category, price, description, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.description.as_deref())
        .bind(product.is_active)
        .bind(product.created_at)
        .execute(&mut **tx)
        .await?;
    }

    for cart in &snapshot.carts {
        sqlx::query("INSERT INTO carts (id, user_id, created_at, status) VALUES ($1, $2, $3, $4)")
            .bind(&cart.id)
            .bind(&cart.user_id)
            .bind(cart.created_at)
            .bind(cart.status.as_str())
            .execute(&mut **tx)
            .await?;
        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, added_at, removed_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&item.id)
            .bind(&item.cart_id)
            .bind(&item.product_id)
            .bind(item.added_at)
            .bind(item.removed_at)
            .execute(&mut **tx)
            .await?;
        }
    }

    for order in &snapshot.orders {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_date, status, total_amount) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .execute(&mut **tx)
        .await?;
        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.unit_price)
            .execute(&mut **tx)
            .await?;
        }
    }

    for review in &snapshot.reviews {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment, review_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&review.id)
        .bind(&review.user_id)
        .bind(&review.product_id)
        .bind(review.rating)
        .bind(review.comment.as_deref())
        .bind(review.review_date)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Delete every row of every StoreLens table. Sessions are kept.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the truncate fails.
pub async fn clear(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::query(&format!("TRUNCATE {} CASCADE", TABLES.join(", ")))
        .execute(pool)
        .await?;
    info!(tables = TABLES.len(), "relational store cleared");
    Ok(())
}

fn conflict(err: sqlx::Error) -> RepositoryError {
    let duplicate = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(db.message().to_string()),
        _ => None,
    };
    duplicate.map_or(RepositoryError::Database(err), RepositoryError::Conflict)
}
