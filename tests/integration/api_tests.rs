//! API integration tests
//!
//! Drive the full router in-process over the in-memory repository and an
//! outbox mailer.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use elibrary_server::{
    api, config::AppConfig, repository::Repository, services::email::OutboxMailer, AppState,
};

struct TestApp {
    router: Router,
    repository: Repository,
    outbox: Arc<OutboxMailer>,
}

fn test_app() -> TestApp {
    let repository = Repository::in_memory();
    let outbox = Arc::new(OutboxMailer::default());
    let state = AppState::new(AppConfig::default(), repository.clone(), outbox.clone());
    TestApp {
        router: api::router(state),
        repository,
        outbox,
    }
}

impl TestApp {
    async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Path of the activation link in the last email sent to `email`
    fn activation_path(&self, email: &str) -> String {
        let mail = self.outbox.last_to(email).expect("activation email sent");
        let start = mail.body.find("/api/v1/auth/activate/").expect("link in body");
        mail.body[start..].lines().next().unwrap().trim().to_string()
    }

    async fn signup(&self, username: &str) -> (StatusCode, Value) {
        self.post("/api/v1/auth/signup", None, signup_form(username)).await
    }

    /// Sign up and activate; returns the account id and a session token
    async fn reader(&self, username: &str) -> (i64, String) {
        let (status, _) = self.signup(username).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self.get(&self.activation_path(&email_of(username)), None).await;
        assert_eq!(status, StatusCode::OK);
        (
            body["account"]["id"].as_i64().unwrap(),
            body["session"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, username: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/auth/login",
            None,
            json!({ "username": username, "password": "str0ng!pass" }),
        )
        .await
    }

    /// Activated account with the staff flag; returns a token carrying it
    async fn staff(&self, username: &str) -> String {
        let (id, _) = self.reader(username).await;
        self.repository.accounts.set_staff(id as i32, true).await.unwrap();
        let (status, body) = self.login(username).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

fn email_of(username: &str) -> String {
    format!("{}@example.com", username)
}

fn signup_form(username: &str) -> Value {
    json!({
        "username": username,
        "email": email_of(username),
        "phone_number": 12345,
        "add_city": "gdynia",
        "add_street": "SEA street",
        "building_number": 3,
        "apartment_number": 14,
        "password1": "str0ng!pass",
        "password2": "str0ng!pass"
    })
}

fn fiction_form(title: &str) -> Value {
    json!({ "title": title, "author_name": "Ursula", "author_surname": "Le Guin" })
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let (status, body) = app.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_signup_sends_activation_email() {
    let app = test_app();

    let (status, body) = app.signup("reader").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "Confirm your email address to finalize registration process, please!"
    );

    let mail = app.outbox.last_to("reader@example.com").unwrap();
    assert_eq!(mail.subject, "Account activation.");
    assert!(mail.body.contains("reader"));
    assert!(mail.body.contains("localhost:8080"));
}

#[tokio::test]
async fn test_activation_logs_in_once() {
    let app = test_app();
    app.signup("first").await;
    let path = app.activation_path("first@example.com");

    let (status, body) = app.get(&path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["is_active"], true);
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "first");
    assert!(me.get("password_hash").is_none());

    let (status, body) = app.get(&path, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid activation link!");
}

#[tokio::test]
async fn test_tampered_activation_link() {
    let app = test_app();
    app.signup("second").await;
    let path = app.activation_path("second@example.com");
    let tampered = format!("{}x", path);

    let (status, body) = app.get(&tampered, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid activation link!");

    let (status, _) = app.get("/api/v1/auth/activate/%25%25/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_form_errors() {
    let app = test_app();

    let mut form = signup_form("mismatch");
    form["password2"] = json!("other!pass1");
    let (status, body) = app.post("/api/v1/auth/signup", None, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password2"].is_array());

    let mut form = signup_form("weak");
    form["password1"] = json!("12345678");
    form["password2"] = json!("12345678");
    let (status, body) = app.post("/api/v1/auth/signup", None, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password1"].is_array());

    let mut form = signup_form("homeless");
    form.as_object_mut().unwrap().remove("add_city");
    let (status, body) = app.post("/api/v1/auth/signup", None, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["city"].is_array());

    assert!(app.outbox.sent().is_empty());
}

#[tokio::test]
async fn test_pick_or_add_city() {
    let app = test_app();
    app.signup("settler").await;

    let (status, cities) = app.get("/api/v1/cities", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cities[0]["name"], "Gdynia");

    let mut form = signup_form("neighbour");
    form["pick_city"] = json!("Gdynia");
    form["add_city"] = json!("sopot");
    let (status, _) = app.post("/api/v1/auth/signup", None, form).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, cities) = app.get("/api/v1/cities", None).await;
    assert_eq!(cities.as_array().unwrap().len(), 1);

    let mut form = signup_form("lost");
    form["pick_city"] = json!("Atlantis");
    let (status, _) = app.post("/api/v1/auth/signup", None, form).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_username() {
    let app = test_app();
    app.signup("twin").await;
    let (status, _) = app.signup("twin").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login() {
    let app = test_app();
    app.signup("sleeper").await;

    let (status, body) = app.login("sleeper").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let inactive_message = body["message"].clone();

    app.get(&app.activation_path("sleeper@example.com"), None).await;
    let (status, body) = app.login("sleeper").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "sleeper", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], inactive_message);
}

#[tokio::test]
async fn test_resend_activation() {
    let app = test_app();
    app.signup("forgetful").await;

    let (status, _) = app
        .post(
            "/api/v1/auth/activation/resend",
            None,
            json!({ "email": "forgetful@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(app.outbox.sent().len(), 2);

    let (status, _) = app.get(&app.activation_path("forgetful@example.com"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_view_and_edit() {
    let app = test_app();
    let (_, token) = app.reader("profiled").await;

    let (status, profile) = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["contact"]["phone_number"], 12345);
    assert_eq!(profile["address"]["city"], "Gdynia");
    assert_eq!(profile["address"]["street"], "Sea street");

    let (status, profile) = app
        .request(
            Method::PUT,
            "/api/v1/profile",
            Some(&token),
            Some(json!({ "phone_number": 999, "add_street": "harbour road" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["contact"]["phone_number"], 999);
    assert_eq!(profile["address"]["street"], "Harbour road");
    assert_eq!(profile["address"]["building_number"], 3);

    let (status, _) = app.get("/api/v1/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_profile_edit_keeps_profile() {
    let app = test_app();
    let (_, token) = app.reader("steady").await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/profile",
            Some(&token),
            Some(json!({
                "email": "moved@example.org",
                "phone_number": 4242,
                "pick_city": "Atlantis"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, profile) = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "steady@example.com");
    assert_eq!(profile["contact"]["phone_number"], 12345);
    assert_eq!(profile["address"]["city"], "Gdynia");
}

#[tokio::test]
async fn test_staff_grants_staff() {
    let app = test_app();
    let admin = app.staff("head").await;
    let (reader_id, reader_token) = app.reader("assistant").await;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}/staff", reader_id),
            Some(&reader_token),
            Some(json!({ "is_staff": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, account) = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}/staff", reader_id),
            Some(&admin),
            Some(json!({ "is_staff": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["is_staff"], true);
    assert!(account.get("password_hash").is_none());

    let (status, body) = app.login("assistant").await;
    assert_eq!(status, StatusCode::OK);
    let promoted = body["token"].as_str().unwrap().to_string();
    let (status, _) = app
        .post("/api/v1/catalog/fiction_books", Some(&promoted), fiction_form("Solaris"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/users/9999/staff",
            Some(&admin),
            Some(json!({ "is_staff": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_requires_login_and_staff() {
    let app = test_app();
    let (_, token) = app.reader("plain").await;

    let (status, _) = app.get("/api/v1/catalog/fiction_books", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/catalog/fiction_books", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/v1/catalog/fiction_books", Some(&token), fiction_form("Nope"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalog_unknown_selector() {
    let app = test_app();
    let (_, token) = app.reader("curious").await;

    let (status, body) = app.get("/api/v1/catalog/magazines", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "articles": [], "science_books": [], "fiction_books": [] }));

    let (status, body) = app.get("/api/v1/catalog/magazines/1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "article": null, "science_book": null, "fiction_book": null }));

    let staff = app.staff("librarian").await;
    let (status, body) = app
        .post("/api/v1/catalog/magazines", Some(&staff), fiction_form("Vogue"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Unknown work type");
}

#[tokio::test]
async fn test_catalog_add_edit_delete() {
    let app = test_app();
    let staff = app.staff("curator").await;

    let (status, created) = app
        .post("/api/v1/catalog/fiction_books", Some(&staff), fiction_form("The Dispossessed"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let book = &created["fiction_book"];
    let id = book["id"].as_i64().unwrap();
    assert_eq!(book["authors"][0]["surname"], "Le Guin");

    let (status, listing) = app.get("/api/v1/catalog/fiction_books", Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["fiction_books"].as_array().unwrap().len(), 1);
    assert_eq!(listing["articles"], json!([]));

    let (status, edited) = app
        .request(
            Method::PUT,
            &format!("/api/v1/catalog/fiction_books/{}", id),
            Some(&staff),
            Some(json!({
                "title": "The Lathe of Heaven",
                "authors": [{ "name": "Ursula K.", "surname": "Le Guin" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["fiction_book"]["title"], "The Lathe of Heaven");
    assert_eq!(edited["fiction_book"]["authors"][0]["name"], "Ursula K.");

    let uri = format!("/api/v1/catalog/fiction_books/{}", id);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, Some(&staff)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_author_list_mismatch() {
    let app = test_app();
    let staff = app.staff("strict").await;

    let (status, body) = app
        .post(
            "/api/v1/catalog/fiction_books",
            Some(&staff),
            json!({ "title": "Good Omens", "author_name": "Terry,Neil", "author_surname": "Pratchett" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["author_surname"].is_array());
}

#[tokio::test]
async fn test_lending_flow() {
    let app = test_app();
    let staff = app.staff("desk").await;
    let (reader_id, reader) = app.reader("borrower").await;

    let (_, created) = app
        .post("/api/v1/catalog/fiction_books", Some(&staff), fiction_form("Earthsea"))
        .await;
    let work_id = created["fiction_book"]["id"].as_i64().unwrap();

    let (status, unit) = app
        .post(
            "/api/v1/units",
            Some(&staff),
            json!({ "work": { "kind": "fiction_book", "id": work_id } }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(unit["available"], true);
    let unit_id = unit["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            &format!("/api/v1/units/{}/issue", unit_id),
            Some(&reader),
            json!({ "account_id": reader_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, loan) = app
        .post(
            &format!("/api/v1/units/{}/issue", unit_id),
            Some(&staff),
            json!({ "account_id": reader_id, "loan_days": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["is_late"], false);

    let (status, _) = app
        .post(
            &format!("/api/v1/units/{}/issue", unit_id),
            Some(&staff),
            json!({ "account_id": reader_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, loans) = app.get("/api/v1/profile/loans", Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans.as_array().unwrap().len(), 1);
    assert!(loans[0]["returned_at"].is_null());

    let (status, returned) = app
        .post(&format!("/api/v1/units/{}/return", unit_id), Some(&staff), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(returned["returned_at"].is_string());

    let (status, unit) = app.get(&format!("/api/v1/units/{}", unit_id), Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unit["available"], true);
}
