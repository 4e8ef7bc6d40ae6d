//! API client tests against a live server on an ephemeral port.
//!
//! Tests verify:
//! - Login stores the token and user, and later calls carry the token
//! - 401 clears storage and redirects unless already on a login page
//! - Other error statuses pass through untouched

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use tokio::net::TcpListener;

use studyshala::client::{
    ApiClient, HistoryNavigator, MemoryTokenStore, Navigator, TokenStore, ADMIN_LOGIN_PATH,
    LOGIN_PATH, TOKEN_KEY, USER_KEY,
};
use studyshala::{ClientError, FileTokenStore, PrincipalView};

use super::test_utils::{TestApp, ADMIN, PASSWORD, STUDENT};

struct LiveServer {
    app: TestApp,
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl LiveServer {
    async fn start() -> Self {
        let app = TestApp::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let router = app.router.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            app,
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    fn client(&self, page: &str) -> (ApiClient, Arc<MemoryTokenStore>, Arc<HistoryNavigator>) {
        let tokens = Arc::new(MemoryTokenStore::new());
        let navigator = Arc::new(HistoryNavigator::new(page));
        let client = ApiClient::new(&self.base_url, tokens.clone(), navigator.clone()).unwrap();
        (client, tokens, navigator)
    }
}

impl Drop for LiveServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn test_health_through_client() {
    let server = LiveServer::start().await;
    let (client, _, _) = server.client("/");

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "OK");
    assert_eq!(health.environment, "development");
}

#[tokio::test]
async fn test_login_stores_token_and_user() {
    let server = LiveServer::start().await;
    let (client, tokens, navigator) = server.client(LOGIN_PATH);

    let login = client.login(STUDENT, PASSWORD).await.unwrap();
    assert_eq!(login.message, "Login successful");
    assert_eq!(tokens.get(TOKEN_KEY).as_deref(), Some(login.token.as_str()));

    let stored: PrincipalView = serde_json::from_str(&tokens.get(USER_KEY).unwrap()).unwrap();
    assert_eq!(stored.identifier, STUDENT);

    // The stored token authenticates later requests.
    let me = client.me().await.unwrap();
    assert_eq!(me.user.identifier, STUDENT);
    assert_eq!(navigator.navigations(), 0);
}

#[tokio::test]
async fn test_failed_login_on_login_page_stays() {
    let server = LiveServer::start().await;
    let (client, tokens, navigator) = server.client(LOGIN_PATH);

    let err = client.login(STUDENT, "wrong-password").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    match err {
        ClientError::Status { message, .. } => assert_eq!(message, "Invalid credentials"),
        other => panic!("unexpected error: {}", other),
    }

    assert_eq!(tokens.get(TOKEN_KEY), None);
    assert_eq!(navigator.current_path(), LOGIN_PATH);
    assert_eq!(navigator.navigations(), 0);
}

#[tokio::test]
async fn test_admin_login_page_is_exempt() {
    let server = LiveServer::start().await;
    let (client, _, navigator) = server.client(ADMIN_LOGIN_PATH);

    assert!(client.login(ADMIN, "nope-nope").await.is_err());
    assert_eq!(navigator.current_path(), ADMIN_LOGIN_PATH);
    assert_eq!(navigator.navigations(), 0);
}

#[tokio::test]
async fn test_unauthorized_clears_storage_and_redirects() {
    let server = LiveServer::start().await;
    let (client, tokens, navigator) = server.client("/dashboard");

    tokens.set(TOKEN_KEY, "stale.token").unwrap();
    tokens.set(USER_KEY, "{\"name\":\"someone\"}").unwrap();

    let err = client.me().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    assert_eq!(tokens.get(TOKEN_KEY), None);
    assert_eq!(tokens.get(USER_KEY), None);
    assert_eq!(navigator.current_path(), LOGIN_PATH);
    assert_eq!(navigator.history(), vec!["/dashboard".to_string(), LOGIN_PATH.to_string()]);
}

#[tokio::test]
async fn test_forbidden_passes_through() {
    let server = LiveServer::start().await;
    let (client, tokens, navigator) = server.client("/student");
    client.login(STUDENT, PASSWORD).await.unwrap();

    let request = client.request(Method::GET, "admin/users").unwrap();
    let response = client.send(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Not a 401: credentials and page are untouched.
    assert!(tokens.get(TOKEN_KEY).is_some());
    assert!(tokens.get(USER_KEY).is_some());
    assert_eq!(navigator.current_path(), "/student");
}

#[tokio::test]
async fn test_logout_clears_storage() {
    let server = LiveServer::start().await;
    let (client, tokens, _) = server.client(LOGIN_PATH);
    client.login(STUDENT, PASSWORD).await.unwrap();
    assert_eq!(server.app.session_count().await, 1);

    let response = client.logout().await.unwrap();
    assert_eq!(response.message, "Logged out successfully");
    assert_eq!(tokens.get(TOKEN_KEY), None);
    assert_eq!(tokens.get(USER_KEY), None);
    assert_eq!(server.app.session_count().await, 0);
}

#[tokio::test]
async fn test_file_token_store_survives_new_client() {
    let server = LiveServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let first = ApiClient::new(
        &server.base_url,
        Arc::new(FileTokenStore::new(&path)),
        Arc::new(HistoryNavigator::new(LOGIN_PATH)),
    )
    .unwrap();
    first.login(ADMIN, PASSWORD).await.unwrap();

    // A second client reading the same file is already logged in.
    let second = ApiClient::new(
        &server.base_url,
        Arc::new(FileTokenStore::new(&path)),
        Arc::new(HistoryNavigator::default()),
    )
    .unwrap();
    assert_eq!(second.me().await.unwrap().user.identifier, ADMIN);
}
