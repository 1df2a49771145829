pub mod patient;
pub mod reservation;
pub mod user;

pub use patient::{Patient, PatientDetail};
pub use reservation::{PatientName, Reservation, ReservationStatus, ReservationView, ReservationWithPatient};
pub use user::{Role, User};
