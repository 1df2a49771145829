pub mod auth;

use axum::routing::{get, post};
use axum::Router;

use crate::resource::{self, Patients, Reservations, Users};
use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Resources
        .merge(resource::router::<Patients>("/pasiens"))
        .merge(resource::router::<Reservations>("/reservasi"))
        .merge(resource::router::<Users>("/user"))
}
