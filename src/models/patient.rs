use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reservation;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub nama_pasien: String,
    pub nohp: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A patient together with every reservation it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub reservasi: Vec<Reservation>,
}
