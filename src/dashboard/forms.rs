use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Patient, ReservationStatus, ReservationView};

/// Value format of an `<input type="datetime-local">`.
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

const DISPLAY_FORMAT: &str = "%d %b %Y %H:%M";

pub fn to_local_input(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(LOCAL_INPUT_FORMAT).to_string()
}

/// Reads a `datetime-local` value as clinic time. Browsers may append seconds.
pub fn parse_local_input(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let naive = NaiveDateTime::parse_from_str(value, LOCAL_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

pub fn display_datetime(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(DISPLAY_FORMAT).to_string()
}

/// Human length of a reservation, e.g. `1h 30m`.
pub fn duration_label(start: DateTime<Utc>, finish: DateTime<Utc>) -> String {
    let minutes = (finish - start).num_minutes().max(0);
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPayload<'a> {
    pub email: &'a str,
    pub inputpass: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientForm {
    #[serde(default)]
    pub nama_pasien: String,
    #[serde(default)]
    pub nohp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPayload {
    pub nama_pasien: String,
    pub nohp: String,
}

impl PatientForm {
    pub fn from_patient(patient: &Patient) -> Self {
        PatientForm {
            nama_pasien: patient.nama_pasien.clone(),
            nohp: patient.nohp.clone(),
        }
    }

    pub fn check(&self) -> Result<PatientPayload, Vec<String>> {
        let mut errors = Vec::new();
        let nama_pasien = self.nama_pasien.trim();
        let nohp = self.nohp.trim();

        if nama_pasien.is_empty() {
            errors.push("Patient name is required".to_string());
        }
        if nohp.is_empty() {
            errors.push("Phone number is required".to_string());
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PatientPayload {
            nama_pasien: nama_pasien.to_string(),
            nohp: nohp.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationForm {
    #[serde(default)]
    pub pasien_id: String,
    #[serde(default)]
    pub start_at: String,
    #[serde(default)]
    pub finish_at: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReservationPayload {
    #[serde(rename = "pasienId")]
    pub pasien_id: i64,
    pub start_at: DateTime<Utc>,
    pub finish_at: DateTime<Utc>,
    pub description: Option<String>,
    pub status: ReservationStatus,
}

impl ReservationForm {
    /// Blank form for a new reservation, optionally preselecting a patient.
    pub fn for_patient(pasien_id: Option<i64>) -> Self {
        ReservationForm {
            pasien_id: pasien_id.map(|id| id.to_string()).unwrap_or_default(),
            status: ReservationStatus::Booked.to_string(),
            ..Default::default()
        }
    }

    pub fn from_view(view: &ReservationView, offset: FixedOffset) -> Self {
        let r = &view.reservation;
        ReservationForm {
            pasien_id: r.pasien_id.to_string(),
            start_at: to_local_input(r.start_at, offset),
            finish_at: to_local_input(r.finish_at, offset),
            description: r.description.clone().unwrap_or_default(),
            status: r.status.to_string(),
        }
    }

    pub fn check(&self, offset: FixedOffset) -> Result<ReservationPayload, Vec<String>> {
        let mut errors = Vec::new();

        let pasien_id = self.pasien_id.trim().parse::<i64>().ok().filter(|id| *id > 0);
        if pasien_id.is_none() {
            errors.push("Choose a patient".to_string());
        }

        let start_at = parse_local_input(&self.start_at, offset);
        if start_at.is_none() {
            errors.push("Start time is required".to_string());
        }
        let finish_at = parse_local_input(&self.finish_at, offset);
        if finish_at.is_none() {
            errors.push("Finish time is required".to_string());
        }
        if let (Some(start), Some(finish)) = (start_at, finish_at) {
            if finish < start {
                errors.push("Finish time cannot be before start time".to_string());
            }
        }

        let status = if self.status.trim().is_empty() {
            Ok(ReservationStatus::Booked)
        } else {
            self.status.parse::<ReservationStatus>()
        };
        if let Err(message) = &status {
            errors.push(format!("Status {message}"));
        }

        match (pasien_id, start_at, finish_at, status) {
            (Some(pasien_id), Some(start_at), Some(finish_at), Ok(status)) if errors.is_empty() => {
                let description = self.description.trim();
                Ok(ReservationPayload {
                    pasien_id,
                    start_at,
                    finish_at,
                    description: (!description.is_empty()).then(|| description.to_string()),
                    status,
                })
            }
            _ => Err(errors),
        }
    }
}
