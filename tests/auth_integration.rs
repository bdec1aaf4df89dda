use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use session_auth::auth::{
    hash_password_with_cost, HashCost, OpaqueTokenGenerator, SessionKeys, TokenPolicy,
};
use session_auth::directory::InMemoryUserDirectory;
use session_auth::error::StoreError;
use session_auth::session::{InMemorySessionStore, SessionStore};
use session_auth::startup::{run, AppState};

const EMAIL: &str = "a@x.com";
const PASSWORD: &str = "p1";

/// Session store that can be switched into an outage.
struct SwitchableStore {
    inner: Arc<InMemorySessionStore>,
    reads_down: AtomicBool,
    writes_down: AtomicBool,
}

impl SwitchableStore {
    fn outage() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }
}

#[async_trait]
impl SessionStore for SwitchableStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.writes_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.writes_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.delete(key).await
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<InMemorySessionStore>,
    switchable: Arc<SwitchableStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub user_id: i64,
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value, bearer: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}{}", self.address, path))
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login", &json!({"email": email, "password": password}), None)
            .await
    }

    async fn login_ok(&self) -> (String, String) {
        let response = self.login(EMAIL, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    async fn refresh(&self, user_id: i64, refresh_token: &str) -> reqwest::Response {
        self.post(
            "/auth/refresh-token",
            &json!({"userId": user_id, "refreshToken": refresh_token}),
            None,
        )
        .await
    }

    async fn logout(&self, user_id: i64, access_token: &str) -> reqwest::Response {
        self.post("/auth/logout", &json!({"userId": user_id}), Some(access_token))
            .await
    }

    async fn me(&self, authorization: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}/auth/me", self.address));
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn guard_allows(&self, access_token: &str) -> bool {
        self.me(Some(&format!("Bearer {}", access_token)))
            .await
            .status()
            .is_success()
    }

    fn fail_store_reads(&self) {
        self.switchable.reads_down.store(true, Ordering::SeqCst);
    }

    fn fail_store_writes(&self) {
        self.switchable.writes_down.store(true, Ordering::SeqCst);
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemorySessionStore::new());
    let switchable = Arc::new(SwitchableStore {
        inner: store.clone(),
        reads_down: AtomicBool::new(false),
        writes_down: AtomicBool::new(false),
    });
    let directory = Arc::new(InMemoryUserDirectory::new());
    let user_id = directory
        .insert(EMAIL, hash_password_with_cost(PASSWORD, 4).unwrap())
        .await;

    // default limits: 5 logins and 100 auth requests per minute per client
    let state = AppState::new(
        switchable.clone(),
        directory.clone(),
        Arc::new(OpaqueTokenGenerator),
        SessionKeys::new("test").unwrap(),
        TokenPolicy::default(),
        HashCost::new(4).unwrap(),
    );
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
        store,
        switchable,
        directory,
        user_id,
    }
}

fn assert_error_body(body: &Value, status: u16, error: &str) {
    assert_eq!(body["statusCode"], status);
    assert_eq!(body["error"], error);
    assert!(body["message"].is_string());
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_distinct_tokens_for_valid_credentials() {
    let app = spawn_app().await;

    let response = app.login(EMAIL, PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let access_token = body["accessToken"].as_str().unwrap();
    let refresh_token = body["refreshToken"].as_str().unwrap();

    assert_ne!(access_token, refresh_token);
    assert!(access_token.len() >= 43);
    assert!(refresh_token.len() >= 43);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
}

#[tokio::test]
async fn login_tokens_validate_immediately() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.login_ok().await;

    assert!(app.guard_allows(&access_token).await);

    let response = app.refresh(app.user_id, &refresh_token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    let wrong_password = app.login(EMAIL, "hunter2-secret").await;
    let unknown_email = app.login("nobody@x.com", PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let wrong_password = wrong_password.text().await.unwrap();
    let unknown_email = unknown_email.text().await.unwrap();
    assert_eq!(wrong_password, unknown_email);
    assert!(!wrong_password.contains("hunter2-secret"));

    let body: Value = serde_json::from_str(&wrong_password).unwrap();
    assert_error_body(&body, 401, "Unauthorized");
}

#[tokio::test]
async fn login_returns_400_for_malformed_input() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"email": EMAIL}), "missing password"),
        (json!({"password": PASSWORD}), "missing email"),
        (json!({}), "missing all fields"),
        (json!({"email": "notanemail", "password": PASSWORD}), "invalid email"),
        (json!({"email": EMAIL, "password": ""}), "empty password"),
    ];

    for (body, reason) in test_cases {
        let response = app.post("/auth/login", &body, None).await;
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);

        let body: Value = response.json().await.unwrap();
        assert_error_body(&body, 400, "Bad Request");
    }
}

#[tokio::test]
async fn failed_login_leaves_no_session_behind() {
    let app = spawn_app().await;
    let _ = app.login(EMAIL, "wrong").await;
    assert!(app.store.is_empty().await);
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_rejects_never_issued_token() {
    let app = spawn_app().await;

    let response = app.refresh(app.user_id, &"0".repeat(64)).await;
    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_error_body(&body, 401, "Unauthorized");
    assert_eq!(body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn refresh_rejects_token_of_another_user() {
    let app = spawn_app().await;
    let (_, refresh_token) = app.login_ok().await;

    let response = app.refresh(app.user_id + 100, &refresh_token).await;
    assert_eq!(401, response.status().as_u16());

    // still usable by its owner
    let response = app.refresh(app.user_id, &refresh_token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rotates_the_session() {
    let app = spawn_app().await;
    let (old_access, old_refresh) = app.login_ok().await;

    let response = app.refresh(app.user_id, &old_refresh).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let new_access = body["accessToken"].as_str().unwrap().to_string();
    let new_refresh = body["refreshToken"].as_str().unwrap().to_string();

    assert!(app.guard_allows(&new_access).await);
    assert!(!app.guard_allows(&old_access).await);
    assert_eq!(401, app.refresh(app.user_id, &old_refresh).await.status().as_u16());
    assert_eq!(200, app.refresh(app.user_id, &new_refresh).await.status().as_u16());
}

#[tokio::test]
async fn repeated_refresh_keeps_producing_valid_pairs() {
    let app = spawn_app().await;
    let (_, mut refresh_token) = app.login_ok().await;

    for _ in 0..10 {
        let response = app.refresh(app.user_id, &refresh_token).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();

        assert!(app.guard_allows(body["accessToken"].as_str().unwrap()).await);
        refresh_token = body["refreshToken"].as_str().unwrap().to_string();
    }

    assert_eq!(app.store.len().await, 2);
}

#[tokio::test]
async fn refresh_returns_404_for_deleted_user() {
    let app = spawn_app().await;
    let (_, refresh_token) = app.login_ok().await;
    app.directory.remove(app.user_id).await;

    let response = app.refresh(app.user_id, &refresh_token).await;
    assert_eq!(404, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_error_body(&body, 404, "Not Found");
}

#[tokio::test]
async fn refresh_returns_400_for_malformed_input() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"refreshToken": "abc"}), "missing userId"),
        (json!({"userId": app.user_id}), "missing refreshToken"),
        (json!({"userId": "one", "refreshToken": "abc"}), "non-numeric userId"),
        (json!({"userId": app.user_id, "refreshToken": ""}), "empty refreshToken"),
    ];

    for (body, reason) in test_cases {
        let response = app.post("/auth/refresh-token", &body, None).await;
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);
    }
}

// --- Logout / Guard Tests ---

#[tokio::test]
async fn logout_scenario_revokes_access_and_refresh_tokens() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.login_ok().await;

    assert!(app.guard_allows(&access_token).await);

    let response = app.logout(app.user_id, &access_token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let response = app.me(Some(&format!("Bearer {}", access_token))).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid token");

    assert_eq!(401, app.refresh(app.user_id, &refresh_token).await.status().as_u16());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn guard_rejects_bad_authorization_headers() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;

    let basic = format!("Basic {}", access_token);
    let unknown = format!("Bearer {}", "f".repeat(64));
    let test_cases = vec![
        (None, "no header"),
        (Some(""), "empty header"),
        (Some(basic.as_str()), "non-Bearer scheme"),
        (Some("Bearer"), "scheme without token"),
        (Some(unknown.as_str()), "unknown token"),
    ];

    for (header, reason) in test_cases {
        let response = app.me(header).await;
        assert_eq!(401, response.status().as_u16(), "Should reject: {}", reason);

        let body: Value = response.json().await.unwrap();
        assert_error_body(&body, 401, "Unauthorized");
    }
}

#[tokio::test]
async fn logout_requires_bearer_token() {
    let app = spawn_app().await;

    let response = app
        .post("/auth/logout", &json!({"userId": app.user_id}), None)
        .await;
    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Authentication token required");
}

#[tokio::test]
async fn logout_for_another_user_is_rejected() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;

    let response = app.logout(app.user_id + 1, &access_token).await;
    assert_eq!(401, response.status().as_u16());

    assert!(app.guard_allows(&access_token).await);
}

#[tokio::test]
async fn logout_only_ends_the_presented_session() {
    let app = spawn_app().await;
    let (first_access, _) = app.login_ok().await;
    let (second_access, _) = app.login_ok().await;

    assert_eq!(200, app.logout(app.user_id, &first_access).await.status().as_u16());

    assert!(!app.guard_allows(&first_access).await);
    assert!(app.guard_allows(&second_access).await);
}

#[tokio::test]
async fn me_returns_session_identity() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;

    let response = app.me(Some(&format!("Bearer {}", access_token))).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["userId"], app.user_id);
    assert_eq!(body["email"], EMAIL);
}

// --- Withdraw Tests ---

#[tokio::test]
async fn withdraw_ends_session_and_deactivates_account() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;
    let (_, other_refresh) = app.login_ok().await;

    let response = app
        .post("/auth/withdraw", &json!({"userId": app.user_id}), Some(&access_token))
        .await;
    assert_eq!(200, response.status().as_u16());

    assert!(!app.guard_allows(&access_token).await);
    assert_eq!(404, app.refresh(app.user_id, &other_refresh).await.status().as_u16());
    assert_eq!(401, app.login(EMAIL, PASSWORD).await.status().as_u16());
}

// --- Throttling Tests ---

#[tokio::test]
async fn sixth_login_within_a_minute_is_throttled() {
    let app = spawn_app().await;

    for _ in 0..5 {
        assert_eq!(401, app.login(EMAIL, "guess").await.status().as_u16());
    }

    let response = app.login(EMAIL, PASSWORD).await;
    assert_eq!(429, response.status().as_u16());
    assert!(response.headers().get("retry-after").is_some());

    let body: Value = response.json().await.unwrap();
    assert_error_body(&body, 429, "Too Many Requests");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn login_throttle_does_not_block_other_endpoints() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.login_ok().await;
    for _ in 0..5 {
        let _ = app.login(EMAIL, "guess").await;
    }

    assert!(app.guard_allows(&access_token).await);
    assert_eq!(200, app.refresh(app.user_id, &refresh_token).await.status().as_u16());
}

// --- Session Store Outage Tests ---

#[tokio::test]
async fn refresh_returns_503_when_the_store_is_down() {
    let app = spawn_app().await;
    let (_, refresh_token) = app.login_ok().await;
    app.fail_store_reads();

    let response = app.refresh(app.user_id, &refresh_token).await;
    assert_eq!(503, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_error_body(&body, 503, "Service Unavailable");
}

#[tokio::test]
async fn login_returns_503_when_the_store_rejects_writes() {
    let app = spawn_app().await;
    app.fail_store_writes();

    let response = app.login(EMAIL, PASSWORD).await;
    assert_eq!(503, response.status().as_u16());
}

#[tokio::test]
async fn protected_routes_fail_closed_when_the_store_is_down() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;
    app.fail_store_reads();

    assert_eq!(401, app.me(Some(&format!("Bearer {}", access_token))).await.status().as_u16());
    assert_eq!(401, app.logout(app.user_id, &access_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_returns_503_when_the_delete_fails() {
    let app = spawn_app().await;
    let (access_token, _) = app.login_ok().await;
    app.fail_store_writes();

    let response = app.logout(app.user_id, &access_token).await;
    assert_eq!(503, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_error_body(&body, 503, "Service Unavailable");
}
