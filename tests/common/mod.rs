#![allow(dead_code)]

use std::net::SocketAddr;

use chrono::FixedOffset;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use reservasi::auth::password;
use reservasi::config::{Config, DashboardConfig};
use reservasi::db;
use reservasi::models::{Role, User};

pub const ADMIN_EMAIL: &str = "admin@clinic.test";
pub const STAFF_EMAIL: &str = "staff@clinic.test";
pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user directly, bypassing the admin-only API.
    pub async fn create_user(&self, email: &str, password: &str, role: Role) -> User {
        let hashpass = password::hash(password).expect("hashing failed");
        db::users::create(&self.pool, "Test User", email, &hashpass, role)
            .await
            .expect("create user failed")
    }

    /// Login and return the response body + status.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "inputpass": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Create a user with the given role and return its access token.
    pub async fn token_for(&self, email: &str, role: Role) -> String {
        self.create_user(email, PASSWORD, role).await;
        let (body, status) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, Role::Admin).await
    }

    pub async fn staff_token(&self) -> String {
        self.token_for(STAFF_EMAIL, Role::Staff).await
    }

    /// Create a patient, return the patient JSON.
    pub async fn create_patient(&self, token: &str, name: &str, nohp: &str) -> Value {
        let (body, status) = self
            .post_auth("/pasiens", token, &json!({ "namaPasien": name, "nohp": nohp }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create patient failed: {body}");
        body
    }

    /// Create a reservation for a patient, return the reservation JSON.
    pub async fn create_reservation(
        &self,
        token: &str,
        pasien_id: i64,
        start_at: &str,
        finish_at: &str,
    ) -> Value {
        let (body, status) = self
            .post_auth(
                "/reservasi",
                token,
                &json!({ "pasienId": pasien_id, "start_at": start_at, "finish_at": finish_at }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create reservation failed: {body}");
        body
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// A running dashboard, wired to a [`TestApp`] backend.
pub struct TestDashboard {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestDashboard {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Log in through the dashboard form and return the `access-token` cookie value.
    pub async fn login_cookie(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("dashboard login failed");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        set_cookie_value(&resp, "access-token").expect("no access-token cookie")
    }
}

/// Value of the named cookie in a response's `Set-Cookie` headers.
pub fn set_cookie_value(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("reservasi_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    // Connect to test DB and run migrations
    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        cors_origin: "http://localhost:3000".to_string(),
        cookie_secure: false,
        max_body_size: 65_536,
        log_level: "warn".to_string(),
        admin_seed: None,
    };

    let (app, _state) = reservasi::build_app(pool.clone(), config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: client(),
        db_name,
    }
}

/// Spawn a dashboard that talks to the backend at `backend_url`.
pub async fn spawn_dashboard(backend_url: String) -> TestDashboard {
    let config = DashboardConfig {
        backend_url,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        clinic_offset: FixedOffset::east_opt(7 * 3600).unwrap(),
        cookie_secure: false,
        log_level: "warn".to_string(),
    };
    let app = reservasi::dashboard::build_dashboard(config).expect("dashboard build failed");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Dashboard failed");
    });

    TestDashboard {
        addr,
        client: client(),
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
