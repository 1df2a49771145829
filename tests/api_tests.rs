mod common;

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::json;

use reservasi::config::AdminSeed;
use reservasi::models::Role;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Login & token checkpoint ────────────────────────────────────

#[tokio::test]
async fn login_valid_credentials_sets_cookie() {
    let app = common::spawn_app().await;
    app.create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": common::STAFF_EMAIL, "inputpass": common::PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = common::set_cookie_value(&resp, "access-token").expect("cookie set");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["token"].as_str().unwrap(), cookie);
    assert_eq!(body["user"]["role"], "staff");
    assert!(body["user"].get("hashpass").is_none());

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_failures_are_generic() {
    let app = common::spawn_app().await;
    app.create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;

    let (wrong_password, status) = app.login(common::STAFF_EMAIL, "not-the-password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (unknown_email, status) = app.login("nobody@clinic.test", common::PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["error"], "Login failed");

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_email_costs_a_password_check() {
    let app = common::spawn_app().await;
    app.create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;

    // Warm up both paths so one-time setup does not skew the timings.
    app.login("warmup@clinic.test", common::PASSWORD).await;
    app.login(common::STAFF_EMAIL, "not-the-password").await;

    let mut unknown = Duration::ZERO;
    let mut wrong = Duration::ZERO;
    for i in 0..3 {
        let started = Instant::now();
        let (_, status) = app.login(&format!("nobody{i}@clinic.test"), common::PASSWORD).await;
        unknown += started.elapsed();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let started = Instant::now();
        let (_, status) = app.login(common::STAFF_EMAIL, "not-the-password").await;
        wrong += started.elapsed();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    assert!(
        unknown * 4 >= wrong,
        "unknown email took {unknown:?}, wrong password took {wrong:?}"
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_is_rate_limited_after_repeated_failures() {
    let app = common::spawn_app().await;
    app.create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;

    for _ in 0..5 {
        let (_, status) = app.login(common::STAFF_EMAIL, "wrong-password").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // Even the right password is refused while locked out.
    let (_, status) = app.login(common::STAFF_EMAIL, common::PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

#[tokio::test]
async fn protected_routes_check_the_token() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;

    let resp = app.client.get(app.url("/pasiens")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, status) = app.get_auth("/pasiens", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (body, status) = app.get_auth("/pasiens", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn me_returns_current_user() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;

    let (body, status) = app.get_auth("/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], common::ADMIN_EMAIL);
    assert_eq!(body["role"], "admin");
    assert!(body.get("hashpass").is_none());

    common::cleanup(app).await;
}

// ── Patients ────────────────────────────────────────────────────

#[tokio::test]
async fn create_patient_and_reject_duplicate_phone() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;

    let patient = app.create_patient(&token, "Andi", "0811").await;
    assert!(patient["id"].as_i64().unwrap() > 0);
    assert_eq!(patient["namaPasien"], "Andi");
    assert_eq!(patient["nohp"], "0811");
    assert!(patient["createdAt"].is_string());
    assert!(patient["updatedAt"].is_string());

    let (body, status) = app
        .post_auth("/pasiens", &token, &json!({ "namaPasien": "Budi", "nohp": "0811" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A patient with this phone number already exists");

    common::cleanup(app).await;
}

#[tokio::test]
async fn create_patient_validates_fields() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;

    let (body, status) = app.post_auth("/pasiens", &token, &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["namaPasien", "nohp"]);

    common::cleanup(app).await;
}

#[tokio::test]
async fn update_and_delete_patient() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let patient = app.create_patient(&token, "Andi", "0811").await;
    let id = patient["id"].as_i64().unwrap();

    let (body, status) = app
        .put_auth(
            &format!("/pasiens/{id}"),
            &token,
            &json!({ "namaPasien": "Andi Wijaya", "nohp": "0812 3456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["namaPasien"], "Andi Wijaya");

    let (body, status) = app.get_auth(&format!("/pasiens/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nohp"], "0812 3456");
    assert!(body["reservasi"].as_array().unwrap().is_empty());

    let (body, status) = app.delete_auth(&format!("/pasiens/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (body, status) = app.get_auth(&format!("/pasiens/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Patient not found");

    let (_, status) = app
        .put_auth(
            &format!("/pasiens/{id}"),
            &token,
            &json!({ "namaPasien": "Ghost", "nohp": "0899" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn patients_list_newest_first() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    app.create_patient(&token, "First", "0811").await;
    app.create_patient(&token, "Second", "0812").await;

    let (body, status) = app.get_auth("/pasiens", &token).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["namaPasien"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Second", "First"]);

    common::cleanup(app).await;
}

#[tokio::test]
async fn deleting_patient_with_reservations_is_refused() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let patient = app.create_patient(&token, "Andi", "0811").await;
    let id = patient["id"].as_i64().unwrap();
    let reservation = app
        .create_reservation(&token, id, "2026-03-01T02:00:00Z", "2026-03-01T03:00:00Z")
        .await;

    let (body, status) = app.delete_auth(&format!("/pasiens/{id}"), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Patient still has reservations");

    // Both rows survive.
    let (body, status) = app.get_auth(&format!("/pasiens/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservasi"][0]["id"], reservation["id"]);

    common::cleanup(app).await;
}

// ── Reservations ────────────────────────────────────────────────

#[tokio::test]
async fn reservation_round_trip() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let patient = app.create_patient(&token, "Andi", "0811").await;
    let pasien_id = patient["id"].as_i64().unwrap();

    let (created, status) = app
        .post_auth(
            "/reservasi",
            &token,
            &json!({
                "pasienId": pasien_id,
                "start_at": "2026-03-01T02:00:00Z",
                "finish_at": "2026-03-01T02:45:00Z",
                "description": "Scaling",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "Booked");
    let id = created["id"].as_i64().unwrap();

    let (body, status) = app.get_auth(&format!("/reservasi/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pasienId"], pasien_id);
    assert_eq!(body["start_at"], "2026-03-01T02:00:00Z");
    assert_eq!(body["finish_at"], "2026-03-01T02:45:00Z");
    assert_eq!(body["description"], "Scaling");
    assert_eq!(body["status"], "Booked");
    assert_eq!(body["pasien"]["namaPasien"], "Andi");

    let (_, status) = app
        .put_auth(
            &format!("/reservasi/{id}"),
            &token,
            &json!({
                "pasienId": pasien_id,
                "start_at": "2026-03-01T02:00:00Z",
                "finish_at": "2026-03-01T03:00:00Z",
                "description": "Scaling and polishing",
                "status": "Finished",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app.get_auth(&format!("/reservasi/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["finish_at"], "2026-03-01T03:00:00Z");
    assert_eq!(body["description"], "Scaling and polishing");
    assert_eq!(body["status"], "Finished");

    let (body, status) = app.delete_auth(&format!("/reservasi/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (body, status) = app.get_auth(&format!("/reservasi/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Reservation not found");

    common::cleanup(app).await;
}

#[tokio::test]
async fn reservation_finish_before_start_is_rejected() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let patient = app.create_patient(&token, "Andi", "0811").await;

    let (body, status) = app
        .post_auth(
            "/reservasi",
            &token,
            &json!({
                "pasienId": patient["id"],
                "start_at": "2026-03-01T03:00:00Z",
                "finish_at": "2026-03-01T02:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "finish_at");

    let (body, _) = app.get_auth("/reservasi", &token).await;
    assert!(body.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn reservation_rejects_unknown_status() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let patient = app.create_patient(&token, "Andi", "0811").await;

    let (body, status) = app
        .post_auth(
            "/reservasi",
            &token,
            &json!({
                "pasienId": patient["id"],
                "start_at": "2026-03-01T02:00:00Z",
                "finish_at": "2026-03-01T03:00:00Z",
                "status": "Done",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "status");

    common::cleanup(app).await;
}

#[tokio::test]
async fn reservation_for_missing_patient_is_rejected() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;

    let (body, status) = app
        .post_auth(
            "/reservasi",
            &token,
            &json!({
                "pasienId": 9999,
                "start_at": "2026-03-01T02:00:00Z",
                "finish_at": "2026-03-01T03:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "pasienId");
    assert_eq!(body["fields"][0]["message"], "Referenced patient not found");

    common::cleanup(app).await;
}

#[tokio::test]
async fn reservations_list_with_patient_names() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;
    let andi = app.create_patient(&token, "Andi", "0811").await;
    let budi = app.create_patient(&token, "Budi", "0812").await;
    app.create_reservation(
        &token,
        budi["id"].as_i64().unwrap(),
        "2026-03-02T02:00:00Z",
        "2026-03-02T03:00:00Z",
    )
    .await;
    app.create_reservation(
        &token,
        andi["id"].as_i64().unwrap(),
        "2026-03-01T02:00:00Z",
        "2026-03-01T03:00:00Z",
    )
    .await;

    let (body, status) = app.get_auth("/reservasi", &token).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["pasien"]["namaPasien"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Andi", "Budi"]);

    common::cleanup(app).await;
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn staff_cannot_manage_users() {
    let app = common::spawn_app().await;
    let token = app.staff_token().await;

    let (_, status) = app.get_auth("/user", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app
        .post_auth(
            "/user",
            &token,
            &json!({ "name": "Eve", "email": "eve@clinic.test", "hashpass": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_creates_user_who_can_log_in() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;

    let (body, status) = app
        .post_auth(
            "/user",
            &token,
            &json!({ "name": "Dewi", "email": "Dewi@Clinic.test", "hashpass": "s3cret-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "dewi@clinic.test");
    assert_eq!(body["role"], "staff");
    assert!(body.get("hashpass").is_none());

    // Stored hashed, not as given.
    let stored: String = sqlx::query_scalar("SELECT hashpass FROM users WHERE email = $1")
        .bind("dewi@clinic.test")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(stored.starts_with("$argon2"));

    let (_, status) = app.login("dewi@clinic.test", "s3cret-pass").await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post_auth(
            "/user",
            &token,
            &json!({ "name": "Dewi 2", "email": "dewi@clinic.test", "hashpass": "another-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A user with this email already exists");

    common::cleanup(app).await;
}

#[tokio::test]
async fn user_update_rehashes_password() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let user = app
        .create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;

    let (body, status) = app
        .put_auth(
            &format!("/user/{}", user.id),
            &token,
            &json!({
                "name": "Renamed",
                "email": common::STAFF_EMAIL,
                "hashpass": "brand-new-pass",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["role"], "admin");

    let (_, status) = app.login(common::STAFF_EMAIL, common::PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, status) = app.login(common::STAFF_EMAIL, "brand-new-pass").await;
    assert_eq!(status, StatusCode::OK);

    // Omitting the password keeps it.
    let (_, status) = app
        .put_auth(
            &format!("/user/{}", user.id),
            &token,
            &json!({ "name": "Renamed", "email": common::STAFF_EMAIL, "role": "staff" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.login(common::STAFF_EMAIL, "brand-new-pass").await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_cannot_delete_self() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let (me, _) = app.get_auth("/auth/me", &token).await;
    let my_id = me["id"].as_i64().unwrap();

    let (_, status) = app.delete_auth(&format!("/user/{my_id}"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = app
        .create_user(common::STAFF_EMAIL, common::PASSWORD, Role::Staff)
        .await;
    let (body, status) = app.delete_auth(&format!("/user/{}", other.id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], other.id);

    let (list, _) = app.get_auth("/user", &token).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_cannot_demote_self() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let (me, _) = app.get_auth("/auth/me", &token).await;
    let my_id = me["id"].as_i64().unwrap();

    let (body, status) = app
        .put_auth(
            &format!("/user/{my_id}"),
            &token,
            &json!({ "name": "Renamed", "email": common::ADMIN_EMAIL, "role": "staff" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot change your own role");

    let (body, status) = app
        .put_auth(
            &format!("/user/{my_id}"),
            &token,
            &json!({ "name": "Renamed", "email": common::ADMIN_EMAIL, "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");

    let (fresh, status) = app.login(common::ADMIN_EMAIL, common::PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    let fresh = fresh["token"].as_str().unwrap();
    let (_, status) = app.get_auth("/user", fresh).await;
    assert_eq!(status, StatusCode::OK);

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(admins, 1);

    common::cleanup(app).await;
}

// ── Seeding ─────────────────────────────────────────────────────

#[tokio::test]
async fn admin_seed_only_applies_to_empty_database() {
    let app = common::spawn_app().await;
    let seed = AdminSeed {
        email: "Owner@Clinic.test".to_string(),
        password: "owner-password".to_string(),
        name: "Owner".to_string(),
    };

    let created = reservasi::seed::ensure_admin(&app.pool, &seed).await.unwrap();
    let created = created.expect("admin seeded");
    assert_eq!(created.role, Role::Admin);
    assert_eq!(created.email, "owner@clinic.test");

    let again = reservasi::seed::ensure_admin(&app.pool, &seed).await.unwrap();
    assert!(again.is_none());

    let (body, status) = app.login("owner@clinic.test", "owner-password").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_admin_seeds_create_one_admin() {
    let app = common::spawn_app().await;
    let seed = AdminSeed {
        email: "owner@clinic.test".to_string(),
        password: "owner-password".to_string(),
        name: "Owner".to_string(),
    };

    let (first, second) = tokio::join!(
        reservasi::seed::ensure_admin(&app.pool, &seed),
        reservasi::seed::ensure_admin(&app.pool, &seed),
    );
    let seeded = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .count();
    assert_eq!(seeded, 1);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 1);

    common::cleanup(app).await;
}
