use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "reservation_status")]
pub enum ReservationStatus {
    #[default]
    Booked,
    Finished,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 3] = [
        ReservationStatus::Booked,
        ReservationStatus::Finished,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Booked => "Booked",
            ReservationStatus::Finished => "Finished",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("must be one of Booked, Finished, Cancelled (got '{s}')"))
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    #[serde(rename = "pasienId")]
    pub pasien_id: i64,
    pub start_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
    pub description: Option<String>,
    pub status: ReservationStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the reservation/patient join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReservationWithPatient {
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub nama_pasien: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientName {
    pub nama_pasien: String,
}

/// A reservation as listed to clients, carrying the owning patient's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub pasien: PatientName,
}

impl From<ReservationWithPatient> for ReservationView {
    fn from(row: ReservationWithPatient) -> Self {
        ReservationView {
            reservation: row.reservation,
            pasien: PatientName {
                nama_pasien: row.nama_pasien,
            },
        }
    }
}
