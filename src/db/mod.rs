pub mod patients;
pub mod reservations;
pub mod users;
