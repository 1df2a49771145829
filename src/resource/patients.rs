use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

use super::{Resource, Violation};
use crate::db;
use crate::error::AppError;
use crate::models::{Patient, PatientDetail, Role};
use crate::validation::{Checks, Operation, Validate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    pub nama_pasien: Option<String>,
    pub nohp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub nama_pasien: String,
    pub nohp: String,
}

impl Validate for PatientInput {
    type Output = PatientFields;

    fn validate(self, _op: Operation) -> Result<PatientFields, AppError> {
        let mut checks = Checks::new();
        let nama_pasien = checks.text("namaPasien", self.nama_pasien, 100);
        let nohp = checks.phone("nohp", self.nohp);
        checks.finish(|| {
            Some(PatientFields {
                nama_pasien: nama_pasien?,
                nohp: nohp?,
            })
        })
    }
}

pub struct Patients;

#[async_trait]
impl Resource for Patients {
    const NAME: &'static str = "Patient";
    const REQUIRED_ROLE: Role = Role::Staff;

    type Summary = Patient;
    type Detail = PatientDetail;
    type Record = Patient;
    type Input = PatientInput;
    type Fields = PatientFields;
    type Prepared = PatientFields;

    async fn list(pool: &PgPool) -> Result<Vec<Patient>, sqlx::Error> {
        db::patients::list(pool).await
    }

    async fn find(pool: &PgPool, id: i64) -> Result<Option<PatientDetail>, sqlx::Error> {
        let Some(patient) = db::patients::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let reservasi = db::reservations::list_by_patient(pool, patient.id).await?;
        Ok(Some(PatientDetail { patient, reservasi }))
    }

    async fn prepare(
        _pool: &PgPool,
        fields: PatientFields,
        _op: Operation,
    ) -> Result<PatientFields, AppError> {
        Ok(fields)
    }

    async fn insert(pool: &PgPool, fields: &PatientFields) -> Result<Patient, sqlx::Error> {
        db::patients::create(pool, &fields.nama_pasien, &fields.nohp).await
    }

    async fn update(
        pool: &PgPool,
        id: i64,
        fields: &PatientFields,
    ) -> Result<Option<Patient>, sqlx::Error> {
        db::patients::update(pool, id, &fields.nama_pasien, &fields.nohp).await
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
        db::patients::delete(pool, id).await
    }

    fn on_violation(violation: Violation, op: Operation) -> Option<AppError> {
        match (violation, op) {
            (Violation::Unique, _) => Some(AppError::Conflict(
                "A patient with this phone number already exists".to_string(),
            )),
            (Violation::ForeignKey, Operation::Delete) => Some(AppError::Conflict(
                "Patient still has reservations".to_string(),
            )),
            _ => None,
        }
    }
}
