use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{Reservation, ReservationStatus, ReservationWithPatient};

const SELECT_WITH_PATIENT: &str = "SELECT r.*, p.nama_pasien
     FROM reservasi r
     JOIN pasien p ON p.id = r.pasien_id";

/// Column values shared by insert and full update.
#[derive(Debug, Clone)]
pub struct ReservationFields {
    pub pasien_id: i64,
    pub start_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
    pub description: Option<String>,
    pub status: ReservationStatus,
}

pub async fn list(pool: &PgPool) -> Result<Vec<ReservationWithPatient>, sqlx::Error> {
    let sql = format!("{SELECT_WITH_PATIENT} ORDER BY r.start_at, r.id");
    sqlx::query_as::<_, ReservationWithPatient>(&sql)
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ReservationWithPatient>, sqlx::Error> {
    let sql = format!("{SELECT_WITH_PATIENT} WHERE r.id = $1");
    sqlx::query_as::<_, ReservationWithPatient>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_patient(pool: &PgPool, pasien_id: i64) -> Result<Vec<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservasi WHERE pasien_id = $1 ORDER BY start_at, id",
    )
    .bind(pasien_id)
    .fetch_all(pool)
    .await
}

pub async fn create(pool: &PgPool, fields: &ReservationFields) -> Result<Reservation, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(
        "INSERT INTO reservasi (pasien_id, start_at, finish_at, description, status)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(fields.pasien_id)
    .bind(fields.start_at)
    .bind(fields.finish_at)
    .bind(fields.description.as_deref())
    .bind(fields.status)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    fields: &ReservationFields,
) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(
        "UPDATE reservasi
         SET pasien_id = $2, start_at = $3, finish_at = $4, description = $5, status = $6,
             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(fields.pasien_id)
    .bind(fields.start_at)
    .bind(fields.finish_at)
    .bind(fields.description.as_deref())
    .bind(fields.status)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>("DELETE FROM reservasi WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}
