use keystone_infra::{Config, Environment};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    data_dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by a throwaway data root on an ephemeral port.
        let data_dir = TempDir::new().expect("failed to create temp dir");
        let mut config = Config::for_environment(Environment::Staging);
        config.data_dir = data_dir.path().to_path_buf();
        config.hashing_secret = "test-secret".to_string();

        let app = keystone_api::app::build_app(&config).expect("route table conflict");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            data_dir,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn record(&self, collection: &str, key: &str) -> Option<Value> {
        let path = self.data_dir.path().join(collection).join(format!("{key}.json"));
        let bytes = std::fs::read(path).ok()?;
        Some(serde_json::from_slice(&bytes).unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn signup(phone: &str) -> Value {
    json!({
        "firstName": "A",
        "lastName": "B",
        "phone": phone,
        "password": "pw",
        "tosAgreement": true
    })
}

async fn body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn signup_login_extend_logout_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Signup
    let res = client.post(srv.url("/users")).json(&signup("555")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, json!({}));

    // Login
    let res = client
        .post(srv.url("/tokens"))
        .json(&json!({ "phone": "555", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let token = body(res).await;
    let id = token["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 20);
    assert_eq!(token["phone"], "555");
    let expires = token["expires"].as_i64().unwrap();

    // Read back
    let res = client.get(srv.url(&format!("/tokens?id={id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, token);

    // Extend
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let res = client
        .put(srv.url("/tokens"))
        .json(&json!({ "id": id, "extend": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let extended = srv.record("tokens", &id).unwrap();
    assert!(extended["expires"].as_i64().unwrap() > expires);

    // Logout
    let res = client.delete(srv.url(&format!("/tokens?id={id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url(&format!("/tokens?id={id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(res).await, json!({}));
}

#[tokio::test]
async fn users_are_stored_one_file_per_phone_without_plaintext() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    client.post(srv.url("/users")).json(&signup("555")).send().await.unwrap();

    let record = srv.record("users", "555").unwrap();
    assert_eq!(record["phone"], "555");
    assert!(record["hashedPassword"].as_str().is_some_and(|h| h != "pw"));

    let res = client.get(srv.url("/users?phone=555")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let user = body(res).await;
    assert_eq!(user["firstName"], "A");
    assert!(user.get("hashedPassword").is_none());
}

#[tokio::test]
async fn duplicate_signup_is_400_and_leaves_record_alone() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    client.post(srv.url("/users")).json(&signup("555")).send().await.unwrap();
    let before = srv.record("users", "555").unwrap();

    let mut again = signup("555");
    again["firstName"] = json!("Z");
    let res = client.post(srv.url("/users")).json(&again).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(res).await,
        json!({ "Error": "A user with that phone number already exists." })
    );
    assert_eq!(srv.record("users", "555").unwrap(), before);
}

#[tokio::test]
async fn deleting_unknown_records_is_400_not_500() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.delete(srv.url("/users?phone=000")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.delete(srv.url("/tokens?id=nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unmatched_routes_are_404_json() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for res in [
        client.get(srv.url("/checks")).send().await.unwrap(),
        client.patch(srv.url("/users")).send().await.unwrap(),
        client.get(srv.url("/")).send().await.unwrap(),
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            res.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body(res).await, json!({}));
    }
}

#[tokio::test]
async fn malformed_body_is_treated_as_missing_fields() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"phone\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await, json!({ "Error": "Missing required fields." }));
}

#[tokio::test]
async fn wrong_password_does_not_issue_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    client.post(srv.url("/users")).json(&signup("555")).send().await.unwrap();

    let res = client
        .post(srv.url("/tokens"))
        .json(&json!({ "phone": "555", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!srv.data_dir.path().join("tokens").exists());
}
