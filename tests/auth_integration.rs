use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::{json, Value};
use sme_accounts::configuration::{get_configuration, DatabaseSettings, Settings};
use sme_accounts::startup::run;
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub settings: Settings,
}

/// Stand-in for the email delivery API: accepts every send
async fn spawn_email_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind email stub port");
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(|| {
        App::new().route(
            "/email",
            web::post().to(|| async { HttpResponse::Ok().finish() }),
        )
    })
    .listen(listener)
    .expect("Failed to start email stub")
    .run();
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    configuration.email.base_url = spawn_email_stub().await;
    let connection_pool = configure_database(&configuration.database).await;

    let server = run(listener, connection_pool.clone(), configuration.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        settings: configuration,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Pulls the refresh_token cookie value out of a login/refresh response
fn extract_refresh_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .map(|v| {
            v.split(';')
                .next()
                .unwrap()
                .trim_start_matches("refresh_token=")
                .to_string()
        })
}

async fn signup_user(app: &TestApp, email: &str, password: &str) {
    let client = reqwest::Client::new();
    let body = json!({
        "email": email,
        "password": password,
        "confirm_password": password
    });

    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
}

// --- Signup Tests ---

#[tokio::test]
async fn signup_returns_201_and_creates_unverified_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = json!({
        "email": "a@x.com",
        "password": "Abcd123!",
        "confirm_password": "Abcd123!"
    });

    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());

    let response_body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(response_body["user"]["email"], "a@x.com");
    assert_eq!(response_body["user"]["email_verified"], false);

    let user = sqlx::query("SELECT id, email, email_verified FROM users WHERE email = 'a@x.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");
    assert!(!user.get::<bool, _>("email_verified"));

    // Exactly one verification token exists and is unconsumed
    let tokens = sqlx::query(
        "SELECT token, consumed FROM single_use_tokens WHERE purpose = 'email_verification'",
    )
    .fetch_all(&app.db_pool)
    .await
    .expect("Failed to fetch tokens");
    assert_eq!(tokens.len(), 1);
    assert!(!tokens[0].get::<bool, _>("consumed"));
}

#[tokio::test]
async fn signup_normalizes_email_to_lowercase() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = json!({
        "email": "MixedCase@Example.COM",
        "password": "Abcd123!",
        "confirm_password": "Abcd123!"
    });

    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());

    let count =
        sqlx::query("SELECT COUNT(*) AS n FROM users WHERE email = 'mixedcase@example.com'")
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to count users");
    assert_eq!(count.get::<i64, _>("n"), 1);
}

#[tokio::test]
async fn signup_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_emails = vec!["notanemail", "user@", "@example.com", "user@@example.com"];

    for invalid_email in invalid_emails {
        let body = json!({
            "email": invalid_email,
            "password": "Abcd123!",
            "confirm_password": "Abcd123!"
        });

        let response = client
            .post(&format!("{}/auth/signup", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn signup_rejects_weak_passwords_with_rule_specific_messages() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let cases = vec![
        ("Ab1!", "too short"),
        ("abcd123!", "uppercase"),
        ("Abcdefg!", "number"),
        ("Abcd1234", "special"),
    ];

    for (weak_password, expected_fragment) in cases {
        let body = json!({
            "email": "weak@example.com",
            "password": weak_password,
            "confirm_password": weak_password
        });

        let response = client
            .post(&format!("{}/auth/signup", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16());

        let response_body: Value = response.json().await.expect("Failed to parse response");
        let message = response_body["message"].as_str().unwrap();
        assert!(
            message.contains(expected_fragment),
            "Message '{}' should identify the broken rule '{}'",
            message,
            expected_fragment
        );
    }
}

#[tokio::test]
async fn signup_returns_400_for_password_mismatch() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = json!({
        "email": "mismatch@example.com",
        "password": "Abcd123!",
        "confirm_password": "Abcd124!"
    });

    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());

    let response_body: Value = response.json().await.expect("Failed to parse response");
    assert!(response_body["message"]
        .as_str()
        .unwrap()
        .contains("confirm_password"));
}

#[tokio::test]
async fn duplicate_signup_gets_success_shape_but_creates_nothing() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "dup@example.com", "Abcd123!").await;

    // Second signup with the same email looks identical to a success
    let body = json!({
        "email": "dup@example.com",
        "password": "Other123!",
        "confirm_password": "Other123!"
    });
    let response = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());

    let count = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE email = 'dup@example.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count users");
    assert_eq!(count.get::<i64, _>("n"), 1);
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_with_access_token_and_refresh_cookie() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "login@example.com", "Abcd123!").await;

    let login_body = json!({
        "email": "login@example.com",
        "password": "Abcd123!"
    });

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&login_body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let cookie = extract_refresh_cookie(&response).expect("Missing refresh cookie");
    assert!(!cookie.is_empty());

    let response_body: Value = response.json().await.expect("Failed to parse response");
    assert!(response_body.get("access_token").is_some());
    assert_eq!(response_body["user"]["email"], "login@example.com");
    // No business set up yet, so none is embedded
    assert!(response_body.get("business").is_none());
}

#[tokio::test]
async fn login_cookie_lifetime_follows_remember_me() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "remember@example.com", "Abcd123!").await;

    for (remember_me, expected_lifetime) in [
        (false, app.settings.jwt.refresh_token_expiry),
        (true, app.settings.jwt.refresh_token_expiry_remember),
    ] {
        let response = client
            .post(&format!("{}/auth/login", &app.address))
            .json(&json!({
                "email": "remember@example.com",
                "password": "Abcd123!",
                "remember_me": remember_me
            }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16());

        let set_cookie = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("refresh_token="))
            .expect("Missing refresh cookie")
            .to_string();
        assert!(
            set_cookie.contains(&format!("Max-Age={}", expected_lifetime)),
            "Cookie '{}' should carry Max-Age={}",
            set_cookie,
            expected_lifetime
        );
        assert!(set_cookie.contains("HttpOnly"));
    }
}

#[tokio::test]
async fn login_ledger_expiry_matches_remember_me_lifetime() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "ledger@example.com", "Abcd123!").await;

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({
            "email": "ledger@example.com",
            "password": "Abcd123!",
            "remember_me": true
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let row = sqlx::query(
        r#"
        SELECT EXTRACT(EPOCH FROM (expires_at - created_at))::BIGINT AS lifetime
        FROM refresh_tokens
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .fetch_one(&app.db_pool)
    .await
    .expect("Failed to fetch refresh record");

    let lifetime = row.get::<i64, _>("lifetime");
    let expected = app.settings.jwt.refresh_token_expiry_remember;
    assert!(
        (lifetime - expected).abs() <= 2,
        "Ledger lifetime {} should be about {}",
        lifetime,
        expected
    );
}

#[tokio::test]
async fn login_returns_401_for_wrong_password_and_unknown_email_alike() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "victim@example.com", "Abcd123!").await;

    let wrong_password = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "victim@example.com", "password": "Wrong123!"}))
        .send()
        .await
        .expect("Failed to execute request.");

    let unknown_email = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "nobody@example.com", "password": "Abcd123!"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    // Identical message for both, so account existence cannot be probed
    let body_a: Value = wrong_password.json().await.unwrap();
    let body_b: Value = unknown_email.json().await.unwrap();
    assert_eq!(body_a["message"], body_b["message"]);
}

#[tokio::test]
async fn login_returns_403_for_disabled_account() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "disabled@example.com", "Abcd123!").await;

    sqlx::query("UPDATE users SET is_active = FALSE WHERE email = 'disabled@example.com'")
        .execute(&app.db_pool)
        .await
        .expect("Failed to disable account");

    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "disabled@example.com", "password": "Abcd123!"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
}

// --- Refresh / Logout Tests ---

#[tokio::test]
async fn refresh_returns_new_access_token_without_rotating_the_record() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "refresh@example.com", "Abcd123!").await;

    let login = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "refresh@example.com", "password": "Abcd123!"}))
        .send()
        .await
        .expect("Failed to execute request.");
    let refresh_cookie = extract_refresh_cookie(&login).expect("Missing refresh cookie");

    // The same refresh token mints access tokens repeatedly
    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/refresh", &app.address))
            .header("Cookie", format!("refresh_token={}", refresh_cookie))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        assert!(body.get("access_token").is_some());
    }

    let count = sqlx::query("SELECT COUNT(*) AS n FROM refresh_tokens WHERE invalidated = FALSE")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count refresh tokens");
    assert_eq!(count.get::<i64, _>("n"), 1);
}

#[tokio::test]
async fn refresh_returns_401_without_cookie() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_unknown_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Cookie", "refresh_token=not-a-real-token")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_invalidates_the_refresh_record_and_clears_the_cookie() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "logout@example.com", "Abcd123!").await;

    let login = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "logout@example.com", "password": "Abcd123!"}))
        .send()
        .await
        .expect("Failed to execute request.");
    let refresh_cookie = extract_refresh_cookie(&login).expect("Missing refresh cookie");
    let login_body: Value = login.json().await.expect("Failed to parse response");
    let access_token = login_body["access_token"].as_str().unwrap().to_string();

    let logout = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .header("Cookie", format!("refresh_token={}", refresh_cookie))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, logout.status().as_u16());

    // Cookie is expired on the way out
    let cleared = logout
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .expect("Missing clearing cookie")
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    // The old token no longer refreshes
    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .header("Cookie", format!("refresh_token={}", refresh_cookie))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

// --- Protected Route Tests ---

#[tokio::test]
async fn me_requires_a_bearer_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_returns_the_user_payload() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup_user(&app, "me@example.com", "Abcd123!").await;

    let login = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "me@example.com", "password": "Abcd123!"}))
        .send()
        .await
        .expect("Failed to execute request.");
    let login_body: Value = login.json().await.expect("Failed to parse response");
    let access_token = login_body["access_token"].as_str().unwrap();

    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["email"], "me@example.com");
    assert!(body["business"].is_null());
}
