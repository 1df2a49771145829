use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

use super::{Resource, Violation};
use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::validation::{Checks, Operation, Validate};

pub const MIN_PASSWORD_LEN: usize = 8;

/// `hashpass` carries the plaintext password; it is hashed before storage.
#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub hashpass: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserWrite {
    pub name: String,
    pub email: String,
    pub hashpass: Option<String>,
    pub role: Role,
}

impl Validate for UserInput {
    type Output = UserFields;

    fn validate(self, op: Operation) -> Result<UserFields, AppError> {
        let mut checks = Checks::new();
        let name = checks.text("name", self.name, 100);
        let email = checks.email("email", self.email);
        let role = checks.choice("role", self.role, Role::Staff);

        let password = self.hashpass.filter(|p| !p.is_empty());
        match &password {
            None if op == Operation::Create => checks.fail("hashpass", "is required"),
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => checks.fail(
                "hashpass",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ),
            _ => {}
        }

        checks.finish(|| {
            Some(UserFields {
                name: name?,
                email: email?,
                password,
                role: role?,
            })
        })
    }
}

pub struct Users;

#[async_trait]
impl Resource for Users {
    const NAME: &'static str = "User";
    const REQUIRED_ROLE: Role = Role::Admin;

    type Summary = User;
    type Detail = User;
    type Record = User;
    type Input = UserInput;
    type Fields = UserFields;
    type Prepared = UserWrite;

    async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        db::users::list_all(pool).await
    }

    async fn find(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        db::users::find_by_id(pool, id).await
    }

    async fn prepare(
        _pool: &PgPool,
        fields: UserFields,
        _op: Operation,
    ) -> Result<UserWrite, AppError> {
        let hashpass = match fields.password {
            Some(plain) => Some(
                password::hash_blocking(plain)
                    .await
                    .map_err(AppError::Internal)?,
            ),
            None => None,
        };
        Ok(UserWrite {
            name: fields.name,
            email: fields.email,
            hashpass,
            role: fields.role,
        })
    }

    async fn insert(pool: &PgPool, user: &UserWrite) -> Result<User, sqlx::Error> {
        // Create validation always yields a password.
        let Some(hashpass) = user.hashpass.as_deref() else {
            return Err(sqlx::Error::Protocol(
                "user insert without a password hash".to_string(),
            ));
        };
        db::users::create(pool, &user.name, &user.email, hashpass, user.role).await
    }

    async fn update(pool: &PgPool, id: i64, user: &UserWrite) -> Result<Option<User>, sqlx::Error> {
        db::users::update(
            pool,
            id,
            &user.name,
            &user.email,
            user.hashpass.as_deref(),
            user.role,
        )
        .await
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        db::users::delete(pool, id).await
    }

    fn check_update(auth: &AuthUser, id: i64, prepared: &UserWrite) -> Result<(), AppError> {
        if auth.user_id == id && prepared.role != auth.role {
            return Err(AppError::BadRequest(
                "You cannot change your own role".to_string(),
            ));
        }
        Ok(())
    }

    fn check_delete(auth: &AuthUser, id: i64) -> Result<(), AppError> {
        if auth.user_id == id {
            return Err(AppError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }
        Ok(())
    }

    fn on_violation(violation: Violation, _op: Operation) -> Option<AppError> {
        match violation {
            Violation::Unique => Some(AppError::Conflict(
                "A user with this email already exists".to_string(),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> UserInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn create_requires_password() {
        let result = input(r#"{"name":"Sari","email":"sari@klinik.test"}"#).validate(Operation::Create);
        match result {
            Err(AppError::Validation(errors)) => assert_eq!(errors[0].field, "hashpass"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_may_keep_password() {
        let fields = input(r#"{"name":"Sari","email":"Sari@Klinik.test","hashpass":"","role":"admin"}"#)
            .validate(Operation::Update)
            .unwrap();
        assert_eq!(fields.password, None);
        assert_eq!(fields.email, "sari@klinik.test");
        assert_eq!(fields.role, Role::Admin);
    }

    #[test]
    fn short_password_and_unknown_role_rejected() {
        let result = input(r#"{"name":"Sari","email":"sari@klinik.test","hashpass":"short","role":"dentist"}"#)
            .validate(Operation::Create);
        match result {
            Err(AppError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, ["role", "hashpass"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn role_defaults_to_staff() {
        let fields = input(r#"{"name":"Budi","email":"budi@klinik.test","hashpass":"password123"}"#)
            .validate(Operation::Create)
            .unwrap();
        assert_eq!(fields.role, Role::Staff);
    }

    #[test]
    fn cannot_delete_self() {
        let auth = AuthUser {
            user_id: 5,
            role: Role::Admin,
        };
        assert!(Users::check_delete(&auth, 5).is_err());
        assert!(Users::check_delete(&auth, 6).is_ok());
    }

    #[test]
    fn cannot_change_own_role() {
        let auth = AuthUser {
            user_id: 5,
            role: Role::Admin,
        };
        let write = |role| UserWrite {
            name: "Sari".to_string(),
            email: "sari@klinik.test".to_string(),
            hashpass: None,
            role,
        };
        assert!(Users::check_update(&auth, 5, &write(Role::Staff)).is_err());
        assert!(Users::check_update(&auth, 5, &write(Role::Admin)).is_ok());
        assert!(Users::check_update(&auth, 6, &write(Role::Staff)).is_ok());
    }
}
