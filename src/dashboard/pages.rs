use askama::Template;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use chrono::FixedOffset;
use serde::Deserialize;

use super::client::BackendError;
use super::forms::{
    display_datetime, duration_label, LoginForm, LoginPayload, PatientForm, ReservationForm,
};
use super::DashboardState;
use crate::models::{
    Patient, PatientDetail, PatientName, Reservation, ReservationStatus, ReservationView, User,
};
use crate::routes::auth::{access_cookie, clear_access_cookie, LoginResponse, ACCESS_COOKIE};

// ---------------------------------------------------------------------------
// Session and errors
// ---------------------------------------------------------------------------

/// A logged-in browser: the cookie token, checked against `/auth/me`.
pub struct Session {
    pub token: String,
    pub user_name: String,
}

impl FromRequestParts<DashboardState> for Session {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DashboardState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(PageError::Backend(BackendError::Unauthorized))?;

        let user: User = state.backend.get_json("/auth/me", &token).await?;
        Ok(Session {
            token,
            user_name: user.name,
        })
    }
}

#[derive(Debug)]
pub enum PageError {
    Backend(BackendError),
    Render(askama::Error),
}

impl From<BackendError> for PageError {
    fn from(err: BackendError) -> Self {
        PageError::Backend(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            // A rejected page load means the session is unusable.
            PageError::Backend(BackendError::Unauthorized | BackendError::Rejected(_)) => (
                CookieJar::new().add(clear_access_cookie()),
                Redirect::to("/login"),
            )
                .into_response(),
            PageError::Backend(BackendError::NotFound(message)) => {
                message_page(StatusCode::NOT_FOUND, "Not found", &message)
            }
            PageError::Backend(BackendError::Unavailable(detail)) => {
                tracing::error!("Backend unavailable: {detail}");
                message_page(
                    StatusCode::BAD_GATEWAY,
                    "Service unavailable",
                    "The reservation service could not be reached. Try again shortly.",
                )
            }
            PageError::Render(err) => {
                tracing::error!("Template render failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

fn render<T: Template>(template: &T) -> Result<Response, PageError> {
    let html = template.render().map_err(PageError::Render)?;
    Ok(Html(html).into_response())
}

#[derive(Template)]
#[template(path = "message.html")]
struct MessagePage<'a> {
    user_name: &'a str,
    title: &'a str,
    message: &'a str,
}

fn message_page(status: StatusCode, title: &str, message: &str) -> Response {
    let page = MessagePage {
        user_name: "",
        title,
        message,
    };
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            tracing::error!("Template render failed: {err}");
            status.into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// View rows
// ---------------------------------------------------------------------------

struct PatientRow {
    id: i64,
    nama_pasien: String,
    nohp: String,
    registered: String,
}

impl PatientRow {
    fn new(patient: &Patient, offset: FixedOffset) -> Self {
        PatientRow {
            id: patient.id,
            nama_pasien: patient.nama_pasien.clone(),
            nohp: patient.nohp.clone(),
            registered: display_datetime(patient.created_at, offset),
        }
    }
}

struct ReservationRow {
    id: i64,
    pasien_id: i64,
    nama_pasien: String,
    start: String,
    finish: String,
    duration: String,
    description: String,
    status: String,
}

impl ReservationRow {
    fn new(view: &ReservationView, offset: FixedOffset) -> Self {
        let r = &view.reservation;
        ReservationRow {
            id: r.id,
            pasien_id: r.pasien_id,
            nama_pasien: view.pasien.nama_pasien.clone(),
            start: display_datetime(r.start_at, offset),
            finish: display_datetime(r.finish_at, offset),
            duration: duration_label(r.start_at, r.finish_at),
            description: r.description.clone().unwrap_or_default(),
            status: r.status.to_string(),
        }
    }
}

struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

fn patient_options(patients: &[Patient], selected: &str) -> Vec<SelectOption> {
    patients
        .iter()
        .map(|p| {
            let value = p.id.to_string();
            SelectOption {
                selected: value == selected,
                label: format!("{} ({})", p.nama_pasien, p.nohp),
                value,
            }
        })
        .collect()
}

fn status_options(selected: &str) -> Vec<SelectOption> {
    ReservationStatus::ALL
        .into_iter()
        .map(|s| SelectOption {
            value: s.to_string(),
            label: s.to_string(),
            selected: s.as_str().eq_ignore_ascii_case(selected),
        })
        .collect()
}

fn offset_label(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("UTC{sign}{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage {
    email: String,
    error: String,
}

pub async fn login_page() -> Result<Response, PageError> {
    render(&LoginPage {
        email: String::new(),
        error: String::new(),
    })
}

pub async fn login_submit(
    State(state): State<DashboardState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let email = form.email.trim();
    let retry = |error: String| {
        render(&LoginPage {
            email: email.to_string(),
            error,
        })
    };

    if email.is_empty() || form.password.is_empty() {
        return retry("Email and password are required".to_string());
    }

    let payload = LoginPayload {
        email,
        inputpass: &form.password,
    };
    let result: Result<LoginResponse, BackendError> = state
        .backend
        .send_json(Method::POST, "/auth/login", None, &payload)
        .await;

    match result {
        Ok(login) => {
            tracing::info!(user_id = login.user.id, "Dashboard login");
            let jar = jar.add(access_cookie(&login.token, state.config.cookie_secure));
            Ok((jar, Redirect::to("/dashboard/pasien")).into_response())
        }
        Err(BackendError::Rejected(message) | BackendError::NotFound(message)) => retry(message),
        Err(BackendError::Unauthorized) => retry("Login failed".to_string()),
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<DashboardState>, jar: CookieJar) -> Response {
    if let Err(err) = state
        .backend
        .send(Method::POST, "/auth/logout", None, None)
        .await
    {
        tracing::warn!("Backend logout failed: {err}");
    }
    (jar.add(clear_access_cookie()), Redirect::to("/login")).into_response()
}

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "patients/list.html")]
struct PatientListPage {
    user_name: String,
    patients: Vec<PatientRow>,
}

#[derive(Template)]
#[template(path = "patients/detail.html")]
struct PatientDetailPage {
    user_name: String,
    patient: PatientRow,
    reservations: Vec<ReservationRow>,
    error: String,
}

#[derive(Template)]
#[template(path = "patients/form.html")]
struct PatientFormPage {
    user_name: String,
    heading: String,
    action: String,
    cancel_href: String,
    form: PatientForm,
    errors: Vec<String>,
}

pub async fn patient_list(
    session: Session,
    State(state): State<DashboardState>,
) -> Result<Response, PageError> {
    let patients: Vec<Patient> = state.backend.get_json("/pasiens", &session.token).await?;
    let offset = state.config.clinic_offset;
    render(&PatientListPage {
        user_name: session.user_name,
        patients: patients.iter().map(|p| PatientRow::new(p, offset)).collect(),
    })
}

async fn patient_detail_page(
    state: &DashboardState,
    session: Session,
    id: i64,
    error: String,
) -> Result<Response, PageError> {
    let detail: PatientDetail = state
        .backend
        .get_json(&format!("/pasiens/{id}"), &session.token)
        .await?;
    let offset = state.config.clinic_offset;

    // Detail reservations carry no patient name of their own.
    let nama_pasien = detail.patient.nama_pasien.clone();
    let reservations = detail
        .reservasi
        .into_iter()
        .map(|reservation| {
            ReservationRow::new(
                &ReservationView {
                    reservation,
                    pasien: PatientName {
                        nama_pasien: nama_pasien.clone(),
                    },
                },
                offset,
            )
        })
        .collect();

    render(&PatientDetailPage {
        user_name: session.user_name,
        patient: PatientRow::new(&detail.patient, offset),
        reservations,
        error,
    })
}

pub async fn patient_detail(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    patient_detail_page(&state, session, id, String::new()).await
}

pub async fn patient_new(session: Session) -> Result<Response, PageError> {
    render(&PatientFormPage {
        user_name: session.user_name,
        heading: "New patient".to_string(),
        action: "/dashboard/pasien/form".to_string(),
        cancel_href: "/dashboard/pasien".to_string(),
        form: PatientForm::default(),
        errors: Vec::new(),
    })
}

pub async fn patient_create(
    session: Session,
    State(state): State<DashboardState>,
    Form(form): Form<PatientForm>,
) -> Result<Response, PageError> {
    let errors = match form.check() {
        Ok(payload) => match state
            .backend
            .send_json::<_, Patient>(Method::POST, "/pasiens", Some(&session.token), &payload)
            .await
        {
            Ok(patient) => {
                return Ok(Redirect::to(&format!("/dashboard/pasien/{}", patient.id)).into_response());
            }
            Err(BackendError::Rejected(message)) => vec![message],
            Err(err) => return Err(err.into()),
        },
        Err(errors) => errors,
    };

    render(&PatientFormPage {
        user_name: session.user_name,
        heading: "New patient".to_string(),
        action: "/dashboard/pasien/form".to_string(),
        cancel_href: "/dashboard/pasien".to_string(),
        form,
        errors,
    })
}

pub async fn patient_edit(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let detail: PatientDetail = state
        .backend
        .get_json(&format!("/pasiens/{id}"), &session.token)
        .await?;

    render(&PatientFormPage {
        user_name: session.user_name,
        heading: format!("Edit {}", detail.patient.nama_pasien),
        action: format!("/dashboard/pasien/{id}/edit"),
        cancel_href: format!("/dashboard/pasien/{id}"),
        form: PatientForm::from_patient(&detail.patient),
        errors: Vec::new(),
    })
}

pub async fn patient_update(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
    Form(form): Form<PatientForm>,
) -> Result<Response, PageError> {
    let errors = match form.check() {
        Ok(payload) => match state
            .backend
            .send_json::<_, Patient>(
                Method::PUT,
                &format!("/pasiens/{id}"),
                Some(&session.token),
                &payload,
            )
            .await
        {
            Ok(_) => return Ok(Redirect::to(&format!("/dashboard/pasien/{id}")).into_response()),
            Err(BackendError::Rejected(message)) => vec![message],
            Err(err) => return Err(err.into()),
        },
        Err(errors) => errors,
    };

    render(&PatientFormPage {
        user_name: session.user_name,
        heading: "Edit patient".to_string(),
        action: format!("/dashboard/pasien/{id}/edit"),
        cancel_href: format!("/dashboard/pasien/{id}"),
        form,
        errors,
    })
}

pub async fn patient_delete(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    match state
        .backend
        .delete(&format!("/pasiens/{id}"), &session.token)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/pasien").into_response()),
        Err(BackendError::Rejected(_)) => {
            let error = "Patient cannot be deleted while reservations exist".to_string();
            patient_detail_page(&state, session, id, error).await
        }
        Err(err) => Err(err.into()),
    }
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "reservations/list.html")]
struct ReservationListPage {
    user_name: String,
    reservations: Vec<ReservationRow>,
}

#[derive(Template)]
#[template(path = "reservations/detail.html")]
struct ReservationDetailPage {
    user_name: String,
    reservation: ReservationRow,
    error: String,
}

#[derive(Template)]
#[template(path = "reservations/form.html")]
struct ReservationFormPage {
    user_name: String,
    heading: String,
    action: String,
    cancel_href: String,
    form: ReservationForm,
    patients: Vec<SelectOption>,
    statuses: Vec<SelectOption>,
    offset_label: String,
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewReservationQuery {
    pub pasien: Option<i64>,
}

pub async fn reservation_list(
    session: Session,
    State(state): State<DashboardState>,
) -> Result<Response, PageError> {
    let reservations: Vec<ReservationView> =
        state.backend.get_json("/reservasi", &session.token).await?;
    let offset = state.config.clinic_offset;
    render(&ReservationListPage {
        user_name: session.user_name,
        reservations: reservations
            .iter()
            .map(|r| ReservationRow::new(r, offset))
            .collect(),
    })
}

pub async fn reservation_detail(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let view: ReservationView = state
        .backend
        .get_json(&format!("/reservasi/{id}"), &session.token)
        .await?;
    render(&ReservationDetailPage {
        user_name: session.user_name,
        reservation: ReservationRow::new(&view, state.config.clinic_offset),
        error: String::new(),
    })
}

/// Renders the reservation form, loading the patient dropdown from the backend.
async fn reservation_form_page(
    state: &DashboardState,
    session: Session,
    heading: String,
    action: String,
    cancel_href: String,
    form: ReservationForm,
    errors: Vec<String>,
) -> Result<Response, PageError> {
    let patients: Vec<Patient> = state.backend.get_json("/pasiens", &session.token).await?;
    render(&ReservationFormPage {
        user_name: session.user_name,
        heading,
        action,
        cancel_href,
        patients: patient_options(&patients, form.pasien_id.trim()),
        statuses: status_options(&form.status),
        offset_label: offset_label(state.config.clinic_offset),
        form,
        errors,
    })
}

pub async fn reservation_new(
    session: Session,
    State(state): State<DashboardState>,
    Query(query): Query<NewReservationQuery>,
) -> Result<Response, PageError> {
    reservation_form_page(
        &state,
        session,
        "New reservation".to_string(),
        "/dashboard/reservasi/form".to_string(),
        "/dashboard/reservasi".to_string(),
        ReservationForm::for_patient(query.pasien),
        Vec::new(),
    )
    .await
}

pub async fn reservation_create(
    session: Session,
    State(state): State<DashboardState>,
    Form(form): Form<ReservationForm>,
) -> Result<Response, PageError> {
    let errors = match form.check(state.config.clinic_offset) {
        Ok(payload) => match state
            .backend
            .send_json::<_, Reservation>(
                Method::POST,
                "/reservasi",
                Some(&session.token),
                &payload,
            )
            .await
        {
            Ok(created) => {
                let href = format!("/dashboard/reservasi/{}", created.id);
                return Ok(Redirect::to(&href).into_response());
            }
            Err(BackendError::Rejected(message)) => vec![message],
            Err(err) => return Err(err.into()),
        },
        Err(errors) => errors,
    };

    reservation_form_page(
        &state,
        session,
        "New reservation".to_string(),
        "/dashboard/reservasi/form".to_string(),
        "/dashboard/reservasi".to_string(),
        form,
        errors,
    )
    .await
}

pub async fn reservation_edit(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let view: ReservationView = state
        .backend
        .get_json(&format!("/reservasi/{id}"), &session.token)
        .await?;
    let form = ReservationForm::from_view(&view, state.config.clinic_offset);

    reservation_form_page(
        &state,
        session,
        format!("Edit reservation #{id}"),
        format!("/dashboard/reservasi/{id}/edit"),
        format!("/dashboard/reservasi/{id}"),
        form,
        Vec::new(),
    )
    .await
}

pub async fn reservation_update(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
    Form(form): Form<ReservationForm>,
) -> Result<Response, PageError> {
    let errors = match form.check(state.config.clinic_offset) {
        Ok(payload) => match state
            .backend
            .send_json::<_, Reservation>(
                Method::PUT,
                &format!("/reservasi/{id}"),
                Some(&session.token),
                &payload,
            )
            .await
        {
            Ok(_) => return Ok(Redirect::to(&format!("/dashboard/reservasi/{id}")).into_response()),
            Err(BackendError::Rejected(message)) => vec![message],
            Err(err) => return Err(err.into()),
        },
        Err(errors) => errors,
    };

    reservation_form_page(
        &state,
        session,
        format!("Edit reservation #{id}"),
        format!("/dashboard/reservasi/{id}/edit"),
        format!("/dashboard/reservasi/{id}"),
        form,
        errors,
    )
    .await
}

pub async fn reservation_delete(
    session: Session,
    State(state): State<DashboardState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    match state
        .backend
        .delete(&format!("/reservasi/{id}"), &session.token)
        .await
    {
        Ok(()) => Ok(Redirect::to("/dashboard/reservasi").into_response()),
        Err(BackendError::Rejected(message)) => {
            let view: ReservationView = state
                .backend
                .get_json(&format!("/reservasi/{id}"), &session.token)
                .await?;
            render(&ReservationDetailPage {
                user_name: session.user_name,
                reservation: ReservationRow::new(&view, state.config.clinic_offset),
                error: message,
            })
        }
        Err(err) => Err(err.into()),
    }
}
