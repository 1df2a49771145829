pub mod client;
pub mod forms;
pub mod pages;
pub mod proxy;

use std::sync::Arc;

use axum::response::Redirect;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::DashboardConfig;
use self::client::BackendClient;

#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<DashboardConfig>,
    pub backend: BackendClient,
}

pub fn build_dashboard(config: DashboardConfig) -> Result<Router, String> {
    let backend = BackendClient::new(&config.backend_url)?;
    let state = DashboardState {
        config: Arc::new(config),
        backend,
    };

    let app = Router::new()
        .merge(api_routes())
        .merge(page_routes())
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    Ok(crate::with_security_headers(app).with_state(state))
}

fn api_routes() -> Router<DashboardState> {
    Router::new()
        .route("/api/auth/login", post(proxy::login))
        .route("/api/auth/logout", post(proxy::logout))
        .route("/api/pasiens", get(proxy::collection).post(proxy::collection))
        .route(
            "/api/pasiens/{id}",
            get(proxy::item).put(proxy::item).delete(proxy::item),
        )
        .route("/api/reservasi", get(proxy::collection).post(proxy::collection))
        .route(
            "/api/reservasi/{id}",
            get(proxy::item).put(proxy::item).delete(proxy::item),
        )
}

fn page_routes() -> Router<DashboardState> {
    Router::new()
        // Session
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route("/logout", post(pages::logout))
        .route("/", get(|| async { Redirect::to("/dashboard/pasien") }))
        .route("/dashboard", get(|| async { Redirect::to("/dashboard/pasien") }))
        // Patients
        .route("/dashboard/pasien", get(pages::patient_list))
        .route(
            "/dashboard/pasien/form",
            get(pages::patient_new).post(pages::patient_create),
        )
        .route("/dashboard/pasien/{id}", get(pages::patient_detail))
        .route(
            "/dashboard/pasien/{id}/edit",
            get(pages::patient_edit).post(pages::patient_update),
        )
        .route("/dashboard/pasien/{id}/delete", post(pages::patient_delete))
        // Reservations
        .route("/dashboard/reservasi", get(pages::reservation_list))
        .route(
            "/dashboard/reservasi/form",
            get(pages::reservation_new).post(pages::reservation_create),
        )
        .route("/dashboard/reservasi/{id}", get(pages::reservation_detail))
        .route(
            "/dashboard/reservasi/{id}/edit",
            get(pages::reservation_edit).post(pages::reservation_update),
        )
        .route(
            "/dashboard/reservasi/{id}/delete",
            post(pages::reservation_delete),
        )
}
