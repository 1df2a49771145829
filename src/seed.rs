use sqlx::PgPool;

use crate::auth::password;
use crate::config::AdminSeed;
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};

const SEED_LOCK_KEY: i64 = 1;

/// Creates the first administrator when no user exists yet.
///
/// Every user route requires an admin token, so without this an empty
/// database could never be logged into. Returns the created user, or `None`
/// when users were already present.
pub async fn ensure_admin(pool: &PgPool, seed: &AdminSeed) -> Result<Option<User>, AppError> {
    if db::users::count_all(pool).await? > 0 {
        return Ok(None);
    }

    let hashpass = password::hash_blocking(seed.password.clone())
        .await
        .map_err(AppError::Internal)?;

    // Serializes concurrent seeders; the loser sees the winner's row.
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SEED_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    if db::users::count_all(&mut *tx).await? > 0 {
        return Ok(None);
    }

    let user = db::users::create(
        &mut *tx,
        &seed.name,
        &seed.email.trim().to_lowercase(),
        &hashpass,
        Role::Admin,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, email = %user.email, "Seeded first administrator");
    Ok(Some(user))
}
