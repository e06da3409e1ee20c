#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use relief_coord::{
    app,
    config::Config,
    errors::Result,
    notify::{Email, Mailer},
    state::AppState,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const ADMIN_EMAIL: &str = "admin@relief.test";
pub const ADMIN_PASSWORD: &str = "Adm1n!pass";
pub const VOLUNTEER_PASSWORD: &str = "Vol!unteer1";
pub const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .filter(|e| e.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<()> {
        self.sent.lock().expect("mailer lock").push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn spawn_app() -> TestApp {
    let config = Config {
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        ..Config::default()
    };
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::with_mailer(config, mailer.clone())
        .await
        .expect("init state");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    TestApp { addr, mailer }
}

pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> (u16, Value) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    // escaped record keys render as `table:⟨key⟩`
    let path = path.replace('⟨', "%E2%9F%A8").replace('⟩', "%E2%9F%A9");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request head");
    if !body.is_empty() {
        stream.write_all(body).await.expect("write request body");
    }
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response separator");
    let head = String::from_utf8(response[..split].to_vec()).expect("response head utf8");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    let body = &response[split + 4..];
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(body).to_string())
        })
    };
    (status, json)
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let auth = token.map(|t| format!("Bearer {t}"));
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(auth) = auth.as_deref() {
            headers.push(("Authorization", auth));
        }
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        send_raw(self.addr, method, path, &headers, body.as_bytes()).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        self.request("GET", path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.request("POST", path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.request("PATCH", path, token, Some(body)).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> (u16, Value) {
        self.post(
            "/api/auth/signin",
            None,
            json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn token(&self, email: &str, password: &str) -> String {
        let (status, body) = self.sign_in(email, password).await;
        assert_eq!(status, 200, "sign in {email}: {body}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a volunteer and returns its id.
    pub async fn apply_as_volunteer(&self, email: &str, skills: &[&str]) -> String {
        let (status, body) = self
            .post(
                "/api/volunteers/signup",
                None,
                json!({
                    "name": "Vera Volunteer",
                    "email": email,
                    "password": VOLUNTEER_PASSWORD,
                    "phone": "+91 98450 00000",
                    "skills": skills,
                    "documents": {
                        "identity_proof": "uploads/id.pdf",
                        "address_proof": "uploads/address.pdf",
                        "certificates": ["uploads/first-aid.pdf"]
                    }
                }),
            )
            .await;
        assert_eq!(status, 201, "volunteer signup: {body}");
        body["id"].as_str().expect("volunteer id").to_string()
    }

    /// Registers and approves a volunteer, returning its id and token.
    pub async fn approved_volunteer(&self, admin: &str, email: &str) -> (String, String) {
        let id = self.apply_as_volunteer(email, &["driving", "first aid"]).await;
        let (status, body) = self
            .post(&format!("/api/admin/volunteers/{id}/approve"), Some(admin), json!({}))
            .await;
        assert_eq!(status, 200, "approve: {body}");
        let token = self.token(email, VOLUNTEER_PASSWORD).await;
        (id, token)
    }

    pub async fn create_shelter(&self, admin: &str, name: &str, capacity: u32) -> String {
        let (status, body) = self
            .post(
                "/api/admin/shelters",
                Some(admin),
                json!({
                    "name": name,
                    "location": "Ward 7 community hall",
                    "total_capacity": capacity,
                    "inmates": 0
                }),
            )
            .await;
        assert_eq!(status, 201, "create shelter: {body}");
        body["id"].as_str().expect("shelter id").to_string()
    }

    pub async fn volunteer(&self, admin: &str, id: &str) -> Value {
        let (status, body) = self.get("/api/admin/volunteers", Some(admin)).await;
        assert_eq!(status, 200);
        body.as_array()
            .expect("volunteer list")
            .iter()
            .find(|v| v["id"] == id)
            .cloned()
            .expect("volunteer listed")
    }
}
