//! End-to-end tests for the HTTP API.
//!
//! Each test starts a real Axum server on a random port over in-memory
//! backends and drives it with `reqwest`.

use std::net::SocketAddr;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use casedesk::blob::memory::MemoryBlobStore;
use casedesk::config::{CredentialsConfig, PasswordScheme, ServerConfig, StorageConfig};
use casedesk::db::StoreClient;
use casedesk::db::memory::MemoryStore;
use casedesk::web::{GatewayState, start_server};
use casedesk::Config;

struct TestServer {
    addr: SocketAddr,
    state: Arc<GatewayState>,
    blobs: Arc<MemoryBlobStore>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(password_scheme: PasswordScheme) -> Self {
        let storage = StorageConfig::memory();
        let blobs = Arc::new(MemoryBlobStore::new(&storage.bucket));
        let store = StoreClient {
            kv: Arc::new(MemoryStore::new()),
            blobs: blobs.clone(),
        };
        let config = Config {
            server: ServerConfig::default(),
            storage,
            credentials: CredentialsConfig { password_scheme },
        };
        let state = Arc::new(GatewayState::new(&store, &config));
        let addr = start_server("127.0.0.1:0".parse().expect("addr"), Arc::clone(&state))
            .await
            .expect("server starts");
        Self {
            addr,
            state,
            blobs,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json body"))
    }

    async fn upload(&self, path: &str, form: Form) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json body"))
    }

    async fn create_user(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/createUser",
                json!({
                    "email": email,
                    "password": password,
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "organization": "Analytical LLP",
                    "profile_picture": "",
                }),
            )
            .await;
        assert_eq!(status, 201, "{body}");
        body["object"].clone()
    }

    async fn create_case(&self, user_id: &str) -> String {
        let (status, body) = self.post("/createCase", case_body(user_id)).await;
        assert_eq!(status, 201, "{body}");
        body["object"]["_id"].as_str().expect("case id").to_string()
    }

    async fn shutdown(self) {
        if let Some(tx) = self.state.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

fn case_body(user_id: &str) -> Value {
    json!({
        "case_title": "Doe v. Roe",
        "attorney_first_name": "Jane",
        "attorney_last_name": "Doe",
        "case_info": "Breach of contract",
        "case_type": "Civil",
        "city": "Springfield",
        "date": "2026-10-18",
        "judge_name": "Hale",
        "state": "IL",
        "user_id": user_id,
    })
}

fn file_part(name: &str, contents: &[u8]) -> Part {
    Part::bytes(contents.to_vec())
        .file_name(name.to_string())
        .mime_str("text/plain")
        .expect("mime")
}

#[tokio::test]
async fn health_reports_healthy() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let resp = reqwest::get(server.url("/health")).await.expect("request");
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "healthy");
    server.shutdown().await;
}

#[tokio::test]
async fn login_outcomes_under_plaintext_scheme() {
    let server = TestServer::start(PasswordScheme::Plaintext).await;
    server.create_user("ada@example.com", "pw").await;

    let (status, body) = server
        .post("/login", json!({"email": "ada@example.com", "password": "nope"}))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"message": "Passwords do not match", "status": 401}));

    let (status, body) = server
        .post("/login", json!({"email": "ghost@example.com", "password": "pw"}))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "User not found");

    let (status, body) = server
        .post("/login", json!({"email": "ada@example.com", "password": "pw"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "User authorized successfully");
    assert_eq!(body["object"]["password"], "pw");
    assert_eq!(body["object"]["email"], "ada@example.com");
    server.shutdown().await;
}

#[tokio::test]
async fn argon2_scheme_never_stores_plaintext() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let user = server.create_user("ada@example.com", "pw").await;
    let stored = user["password"].as_str().expect("password");
    assert!(stored.starts_with("$argon2"), "{stored}");

    let (status, _) = server
        .post("/login", json!({"email": "ada@example.com", "password": "pw"}))
        .await;
    assert_eq!(status, 200);
    server.shutdown().await;
}

#[tokio::test]
async fn user_update_and_delete() {
    let server = TestServer::start(PasswordScheme::Plaintext).await;
    let user = server.create_user("ada@example.com", "pw").await;
    let id = user["_id"].as_str().expect("id");

    let (status, body) = server
        .post(
            "/updateUser",
            json!({
                "_id": id,
                "email": "ada@newfirm.com",
                "password": "pw2",
                "first_name": "Ada",
                "last_name": "King",
                "organization": "New Firm",
                "profile_picture": "ada.png",
            }),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["object"]["last_name"], "King");

    let (status, _) = server
        .post(
            "/updateUser",
            json!({"_id": "missing000000000", "email": "x@example.com", "password": "x"}),
        )
        .await;
    assert_eq!(status, 404);

    let (status, _) = server
        .post("/deleteUser", json!({"_id": id, "email": "ada@example.com"}))
        .await;
    assert_eq!(status, 404);

    let (status, _) = server
        .post("/deleteUser", json!({"_id": id, "email": "ada@newfirm.com"}))
        .await;
    assert_eq!(status, 200);

    let (status, _) = server.post("/getUser", json!({"_id": id})).await;
    assert_eq!(status, 404);
    server.shutdown().await;
}

#[tokio::test]
async fn update_without_email_is_rejected_and_user_stays_usable() {
    let server = TestServer::start(PasswordScheme::Plaintext).await;
    let user = server.create_user("ada@example.com", "pw").await;
    let id = user["_id"].as_str().expect("id");

    for body in [
        json!({"_id": id, "password": "pw"}),
        json!({"_id": id, "email": " ", "password": "pw"}),
    ] {
        let (status, response) = server.post("/updateUser", body).await;
        assert_eq!(status, 400, "{response}");
        assert_eq!(response["message"], "Email and password are required");
    }

    let (status, body) = server
        .post("/login", json!({"email": "ada@example.com", "password": "pw"}))
        .await;
    assert_eq!(status, 200, "{body}");

    let (status, _) = server
        .post("/deleteUser", json!({"_id": id, "email": "ada@example.com"}))
        .await;
    assert_eq!(status, 200);
    server.shutdown().await;
}

#[tokio::test]
async fn malformed_body_gets_error_envelope() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let resp = server
        .client
        .post(server.url("/getCase"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(
        body,
        json!({"message": "Failed to read request body", "status": 400})
    );
    server.shutdown().await;
}

#[tokio::test]
async fn case_with_blank_field_is_rejected() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let mut body = case_body("U1");
    body["judge_name"] = json!("");
    let (status, body) = server.post("/createCase", body).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "All fields must be filled out");
    server.shutdown().await;
}

#[tokio::test]
async fn new_case_chat_grows_in_append_order() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let case_id = server.create_case("U1").await;

    let (status, body) = server.post("/getCaseChat", json!({"case_id": case_id})).await;
    assert_eq!(status, 200);
    assert_eq!(body["object"]["_id"], case_id.as_str());
    assert_eq!(body["object"]["messages"].as_array().expect("list").len(), 1);
    assert_eq!(body["object"]["messages"][0]["sender"], "System");
    assert_eq!(body["object"]["messages"][0]["text"], "Welcome to the chat");

    for n in 0..4 {
        let (status, _) = server
            .post(
                "/addMessage",
                json!({
                    "case_id": case_id,
                    "text": format!("note {n}"),
                    "sender": "ada@example.com",
                    "timestamp": format!("2026-10-18T10:00:0{n}Z"),
                }),
            )
            .await;
        assert_eq!(status, 200);
    }

    let (_, body) = server.post("/getCaseChat", json!({"case_id": case_id})).await;
    let texts: Vec<&str> = body["object"]["messages"]
        .as_array()
        .expect("list")
        .iter()
        .map(|m| m["text"].as_str().expect("text"))
        .collect();
    assert_eq!(
        texts,
        vec!["Welcome to the chat", "note 0", "note 1", "note 2", "note 3"]
    );

    let (status, _) = server
        .post(
            "/addMessage",
            json!({"case_id": case_id, "text": " ", "sender": "x", "timestamp": "t"}),
        )
        .await;
    assert_eq!(status, 400);
    server.shutdown().await;
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    for (path, body, message) in [
        ("/getUser", json!({"_id": "nope"}), "User not found"),
        ("/getCase", json!({"_id": "nope"}), "Case not found"),
        ("/getDocumentById", json!({"_id": "nope"}), "Document not found"),
        ("/getCaseChat", json!({"case_id": "nope"}), "Case not found"),
        ("/getCaseDocuments", json!({"case_id": "nope"}), "Case not found"),
        ("/deleteCaseById", json!({"_id": "nope"}), "Case not found"),
        ("/deleteDocumentById", json!({"_id": "nope"}), "Document not found"),
        ("/getUserCases", json!({"user_id": "nope"}), "User not found"),
    ] {
        let (status, response) = server.post(path, body).await;
        assert_eq!(status, 404, "{path}");
        assert_eq!(response["message"], message, "{path}");
        assert!(response.get("object").is_none(), "{path}");
    }
    server.shutdown().await;
}

#[tokio::test]
async fn single_upload_key_is_sanitized() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let case_id = server.create_case("U1").await;

    let form = Form::new()
        .text("case_id", case_id.clone())
        .part("file", file_part("My File: v1.2.txt", b"hello"));
    let (status, body) = server.upload("/uploadDocument", form).await;
    assert_eq!(status, 200, "{body}");

    let key = format!("{case_id}/MyFilev12txt");
    assert_eq!(body["object"], format!("memory://casedesk-documents/{key}"));
    assert_eq!(server.blobs.keys().await, vec![key.clone()]);
    let blob = server.blobs.get(&key).await.expect("blob");
    assert_eq!(blob.content_type, "text/plain");
    server.shutdown().await;
}

#[tokio::test]
async fn upload_requires_case_id_and_existing_case() {
    let server = TestServer::start(PasswordScheme::Argon2).await;

    let form = Form::new().part("file", file_part("a.txt", b"a"));
    let (status, body) = server.upload("/uploadDocument", form).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Case ID is required");

    let form = Form::new()
        .text("case_id", "nope")
        .part("files", file_part("a.txt", b"a"));
    let (status, body) = server.upload("/createDocuments", form).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Case not found");
    assert!(server.blobs.keys().await.is_empty());
    server.shutdown().await;
}

#[tokio::test]
async fn document_lifecycle() {
    let server = TestServer::start(PasswordScheme::Argon2).await;
    let case_id = server.create_case("U1").await;

    let form = Form::new()
        .text("case_id", case_id.clone())
        .part("files", file_part("brief.txt", b"brief"))
        .part("files", file_part("exhibit A.txt", b"exhibit"));
    let (status, body) = server.upload("/createDocuments", form).await;
    assert_eq!(status, 200, "{body}");
    let documents = body["object"].as_array().expect("list").clone();
    assert_eq!(documents.len(), 2);
    for document in &documents {
        assert_eq!(document["case"], case_id.as_str());
        assert_eq!(document["relevancy"], 0.0);
        assert_eq!(document["stored"], false);
        let key = document["file_name"].as_str().expect("key");
        assert!(!key.contains([' ', ':', '.']), "{key}");
    }

    let (_, body) = server.post("/getCase", json!({"_id": case_id})).await;
    assert_eq!(body["object"]["number_files"], 2);

    let url = documents[0]["file_url"].as_str().expect("url");
    let (status, body) = server
        .post(
            "/updateDocumentRelevancy",
            json!({"file_url": url, "relevancy": 0.9}),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["object"]["relevancy"], 0.9);

    let first_id = documents[0]["_id"].as_str().expect("id");
    let (status, _) = server
        .post("/deleteDocumentById", json!({"_id": first_id}))
        .await;
    assert_eq!(status, 200);
    let (status, _) = server
        .post("/getDocumentById", json!({"_id": first_id}))
        .await;
    assert_eq!(status, 404);
    assert_eq!(server.blobs.keys().await.len(), 1);

    let (status, body) = server
        .post("/deleteCaseDocuments", json!({"case_id": case_id}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["object"].as_array().expect("list").len(), 1);

    let (status, body) = server
        .post("/getCaseDocuments", json!({"case_id": case_id}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["object"], json!([]));
    assert!(server.blobs.keys().await.is_empty());
    server.shutdown().await;
}

#[tokio::test]
async fn deleting_cases_cascades() {
    let server = TestServer::start(PasswordScheme::Plaintext).await;
    let user = server.create_user("ada@example.com", "pw").await;
    let user_id = user["_id"].as_str().expect("id");
    let first = server.create_case(user_id).await;
    let second = server.create_case(user_id).await;

    let form = Form::new()
        .text("case_id", first.clone())
        .part("files", file_part("a.txt", b"a"));
    let (status, body) = server.upload("/uploadDocuments", form).await;
    assert_eq!(status, 200);
    assert_eq!(body["object"].as_array().expect("urls").len(), 1);

    let (_, body) = server
        .post("/getUserCases", json!({"user_id": user_id}))
        .await;
    assert_eq!(body["object"].as_array().expect("list").len(), 2);

    let (status, _) = server.post("/deleteCaseById", json!({"_id": first})).await;
    assert_eq!(status, 200);
    let (status, _) = server.post("/getCase", json!({"_id": first})).await;
    assert_eq!(status, 404);
    assert!(
        server
            .state
            .repos
            .chats
            .get_by_id(&first)
            .await
            .expect("get")
            .is_none()
    );
    assert!(server.blobs.keys().await.is_empty());

    let (status, body) = server
        .post("/deleteUserCases", json!({"user_id": user_id}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["object"][0]["_id"], second.as_str());

    let (status, _) = server
        .post("/deleteUserCases", json!({"user_id": user_id}))
        .await;
    assert_eq!(status, 404);

    let (status, _) = server.post("/getUser", json!({"_id": user_id})).await;
    assert_eq!(status, 200);
    server.shutdown().await;
}
