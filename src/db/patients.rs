use sqlx::PgPool;

use crate::models::Patient;

pub async fn list(pool: &PgPool) -> Result<Vec<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>("SELECT * FROM pasien ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>("SELECT * FROM pasien WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM pasien WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &PgPool, nama_pasien: &str, nohp: &str) -> Result<Patient, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        "INSERT INTO pasien (nama_pasien, nohp) VALUES ($1, $2) RETURNING *",
    )
    .bind(nama_pasien)
    .bind(nohp)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    nama_pasien: &str,
    nohp: &str,
) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        "UPDATE pasien SET nama_pasien = $2, nohp = $3, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(nama_pasien)
    .bind(nohp)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>("DELETE FROM pasien WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}
