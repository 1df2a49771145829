pub mod patients;
pub mod reservations;
pub mod users;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::models::Role;
use crate::state::SharedState;
use crate::validation::{Operation, Validate};

pub use patients::Patients;
pub use reservations::Reservations;
pub use users::Users;

/// Database constraint classes a write can trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Unique,
    ForeignKey,
    Check,
}

impl Violation {
    pub fn of(err: &sqlx::Error) -> Option<Violation> {
        let sqlx::Error::Database(db_err) = err else {
            return None;
        };
        if db_err.is_unique_violation() {
            Some(Violation::Unique)
        } else if db_err.is_foreign_key_violation() {
            Some(Violation::ForeignKey)
        } else if db_err.is_check_violation() {
            Some(Violation::Check)
        } else {
            None
        }
    }
}

/// One CRUD entity; the generic handlers below serve it over HTTP.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Singular name used in messages and logs.
    const NAME: &'static str;
    /// Minimum role for every operation on this resource.
    const REQUIRED_ROLE: Role;

    /// Element type of the list endpoint.
    type Summary: Serialize + Send;
    /// Body of the single-record endpoint.
    type Detail: Serialize + Send;
    /// Returned by create, update and delete.
    type Record: Serialize + Send;
    /// Request body of create and update.
    type Input: DeserializeOwned + Validate<Output = Self::Fields> + Send + 'static;
    /// Shape-checked input.
    type Fields: Send + Sync + 'static;
    /// Values ready to be written.
    type Prepared: Send + Sync + 'static;

    async fn list(pool: &PgPool) -> Result<Vec<Self::Summary>, sqlx::Error>;

    async fn find(pool: &PgPool, id: i64) -> Result<Option<Self::Detail>, sqlx::Error>;

    /// Checks needing the database or slow work, run after shape validation.
    async fn prepare(
        pool: &PgPool,
        fields: Self::Fields,
        op: Operation,
    ) -> Result<Self::Prepared, AppError>;

    async fn insert(pool: &PgPool, prepared: &Self::Prepared) -> Result<Self::Record, sqlx::Error>;

    async fn update(
        pool: &PgPool,
        id: i64,
        prepared: &Self::Prepared,
    ) -> Result<Option<Self::Record>, sqlx::Error>;

    async fn delete(pool: &PgPool, id: i64) -> Result<Option<Self::Record>, sqlx::Error>;

    /// Refuse an update before touching the database.
    fn check_update(_auth: &AuthUser, _id: i64, _prepared: &Self::Prepared) -> Result<(), AppError> {
        Ok(())
    }

    /// Refuse a delete before touching the database.
    fn check_delete(_auth: &AuthUser, _id: i64) -> Result<(), AppError> {
        Ok(())
    }

    /// Maps a constraint violation to a client error. `None` means a server fault.
    fn on_violation(violation: Violation, op: Operation) -> Option<AppError>;
}

fn not_found<R: Resource>() -> AppError {
    AppError::NotFound(format!("{} not found", R::NAME))
}

fn write_error<R: Resource>(err: sqlx::Error, op: Operation) -> AppError {
    match Violation::of(&err).and_then(|v| R::on_violation(v, op)) {
        Some(mapped) => mapped,
        None => AppError::Database(err),
    }
}

pub async fn list<R: Resource>(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<R::Summary>>, AppError> {
    auth.require(R::REQUIRED_ROLE)?;
    let records = R::list(&state.pool).await?;
    Ok(Json(records))
}

pub async fn show<R: Resource>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<R::Detail>, AppError> {
    auth.require(R::REQUIRED_ROLE)?;
    let record = R::find(&state.pool, id)
        .await?
        .ok_or_else(not_found::<R>)?;
    Ok(Json(record))
}

pub async fn create<R: Resource>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<R::Input>,
) -> Result<(StatusCode, Json<R::Record>), AppError> {
    auth.require(R::REQUIRED_ROLE)?;
    let fields = input.validate(Operation::Create)?;
    let prepared = R::prepare(&state.pool, fields, Operation::Create).await?;

    let record = R::insert(&state.pool, &prepared)
        .await
        .map_err(|e| write_error::<R>(e, Operation::Create))?;

    tracing::info!(resource = R::NAME, by = auth.user_id, "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<R: Resource>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(input): Json<R::Input>,
) -> Result<Json<R::Record>, AppError> {
    auth.require(R::REQUIRED_ROLE)?;
    let fields = input.validate(Operation::Update)?;
    let prepared = R::prepare(&state.pool, fields, Operation::Update).await?;
    R::check_update(&auth, id, &prepared)?;

    let record = R::update(&state.pool, id, &prepared)
        .await
        .map_err(|e| write_error::<R>(e, Operation::Update))?
        .ok_or_else(not_found::<R>)?;

    tracing::info!(resource = R::NAME, id, by = auth.user_id, "record updated");
    Ok(Json(record))
}

pub async fn destroy<R: Resource>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<R::Record>, AppError> {
    auth.require(R::REQUIRED_ROLE)?;
    R::check_delete(&auth, id)?;

    let record = R::delete(&state.pool, id)
        .await
        .map_err(|e| write_error::<R>(e, Operation::Delete))?
        .ok_or_else(not_found::<R>)?;

    tracing::info!(resource = R::NAME, id, by = auth.user_id, "record deleted");
    Ok(Json(record))
}

/// Mounts the five CRUD routes of `R` under `path`.
pub fn router<R: Resource>(path: &str) -> Router<SharedState> {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(
            &format!("{path}/{{id}}"),
            get(show::<R>).put(update::<R>).delete(destroy::<R>),
        )
}
