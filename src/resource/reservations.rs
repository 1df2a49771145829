use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

use super::{Resource, Violation};
use crate::db;
use crate::db::reservations::ReservationFields;
use crate::error::{AppError, FieldError};
use crate::models::{Reservation, ReservationStatus, ReservationView, Role};
use crate::validation::{Checks, Operation, Validate};

#[derive(Debug, Deserialize)]
pub struct ReservationInput {
    #[serde(rename = "pasienId")]
    pub pasien_id: Option<i64>,
    pub start_at: Option<String>,
    pub finish_at: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl Validate for ReservationInput {
    type Output = ReservationFields;

    fn validate(self, _op: Operation) -> Result<ReservationFields, AppError> {
        let mut checks = Checks::new();
        let pasien_id = checks.positive_id("pasienId", self.pasien_id);
        let start_at = checks.timestamp("start_at", self.start_at);
        let finish_at = checks.timestamp("finish_at", self.finish_at);
        let description = checks.optional_text("description", self.description, 1000);
        let status = checks.choice("status", self.status, ReservationStatus::default());

        if let (Some(start), Some(finish)) = (start_at, finish_at) {
            if finish < start {
                checks.fail("finish_at", "must not be earlier than start_at");
            }
        }

        checks.finish(|| {
            Some(ReservationFields {
                pasien_id: pasien_id?,
                start_at: start_at?,
                finish_at: finish_at?,
                description,
                status: status?,
            })
        })
    }
}

fn missing_patient() -> AppError {
    AppError::Validation(vec![FieldError {
        field: "pasienId",
        message: "Referenced patient not found".to_string(),
    }])
}

pub struct Reservations;

#[async_trait]
impl Resource for Reservations {
    const NAME: &'static str = "Reservation";
    const REQUIRED_ROLE: Role = Role::Staff;

    type Summary = ReservationView;
    type Detail = ReservationView;
    type Record = Reservation;
    type Input = ReservationInput;
    type Fields = ReservationFields;
    type Prepared = ReservationFields;

    async fn list(pool: &PgPool) -> Result<Vec<ReservationView>, sqlx::Error> {
        let rows = db::reservations::list(pool).await?;
        Ok(rows.into_iter().map(ReservationView::from).collect())
    }

    async fn find(pool: &PgPool, id: i64) -> Result<Option<ReservationView>, sqlx::Error> {
        let row = db::reservations::find_by_id(pool, id).await?;
        Ok(row.map(ReservationView::from))
    }

    async fn prepare(
        pool: &PgPool,
        fields: ReservationFields,
        _op: Operation,
    ) -> Result<ReservationFields, AppError> {
        if !db::patients::exists(pool, fields.pasien_id).await? {
            return Err(missing_patient());
        }
        Ok(fields)
    }

    async fn insert(pool: &PgPool, fields: &ReservationFields) -> Result<Reservation, sqlx::Error> {
        db::reservations::create(pool, fields).await
    }

    async fn update(
        pool: &PgPool,
        id: i64,
        fields: &ReservationFields,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        db::reservations::update(pool, id, fields).await
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<Option<Reservation>, sqlx::Error> {
        db::reservations::delete(pool, id).await
    }

    fn on_violation(violation: Violation, _op: Operation) -> Option<AppError> {
        match violation {
            // Patient deleted between the existence check and the write.
            Violation::ForeignKey => Some(missing_patient()),
            Violation::Check => Some(AppError::Validation(vec![FieldError {
                field: "finish_at",
                message: "must not be earlier than start_at".to_string(),
            }])),
            Violation::Unique => None,
        }
    }
}
