#![allow(dead_code)]

use std::sync::Mutex;

use quill::core::db::MemoryStore;
use quill::mailer::Mailer;
use quill::media::KvMediaHost;
use serde_json::{json, Value};
use spin_sdk::http::{Method, Request, Response};

pub const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Keeps every OTP it is asked to send, or refuses them all when `failing`.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn last_otp(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(email, _)| email == to)
            .map(|(_, otp)| otp.clone())
    }
}

impl Mailer for RecordingMailer {
    fn send_otp(&self, to: &str, _name: &str, otp: &str) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("smtp relay unavailable");
        }
        self.sent.lock().unwrap().push((to.to_string(), otp.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub mailer: RecordingMailer,
}

pub struct Account {
    pub id: String,
    pub token: String,
    pub email: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            mailer: RecordingMailer::default(),
        }
    }

    pub fn with_failing_mailer() -> Self {
        Self {
            store: MemoryStore::new(),
            mailer: RecordingMailer {
                failing: true,
                ..Default::default()
            },
        }
    }

    pub fn raw(&self, method: Method, uri: &str, token: Option<&str>, body: Vec<u8>) -> Response {
        let mut builder = Request::builder();
        builder.method(method).uri(uri).header("Content-Type", "application/json");
        if let Some(token) = token {
            builder.header("Authorization", format!("Bearer {}", token));
        }
        let req = builder.body(body).build();

        let media = KvMediaHost::new(&self.store, "");
        let app = quill::App {
            store: &self.store,
            media: &media,
            mailer: &self.mailer,
        };
        quill::router::route(&app, req)
    }

    /// Sends a JSON request and decodes the JSON reply (`Null` when empty).
    pub fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (u16, Value) {
        let bytes = body.map(|b| b.to_string().into_bytes()).unwrap_or_default();
        let resp = self.raw(method, uri, token, bytes);
        let value = serde_json::from_slice(resp.body()).unwrap_or(Value::Null);
        (*resp.status(), value)
    }

    pub fn get(&self, uri: &str, token: &str) -> (u16, Value) {
        self.call(Method::Get, uri, Some(token), None)
    }

    pub fn post(&self, uri: &str, token: &str, body: Value) -> (u16, Value) {
        self.call(Method::Post, uri, Some(token), Some(body))
    }

    /// Signs up, verifies and signs in a fresh user.
    pub fn account(&self, name: &str) -> Account {
        let email = format!("{}@example.com", name.to_lowercase());
        let password = format!("{}-password", name.to_lowercase());

        let (status, body) = self.call(
            Method::Post,
            "/auth/signup",
            None,
            Some(json!({ "name": name, "email": email, "password": password })),
        );
        assert_eq!(status, 201, "signup failed: {:?}", body);
        let id = body["user_id"].as_str().unwrap().to_string();

        let otp = self.mailer.last_otp(&email).expect("otp was not sent");
        let (status, _) = self.call(
            Method::Post,
            "/auth/verify-otp",
            None,
            Some(json!({ "email": email, "otp": otp })),
        );
        assert_eq!(status, 200);

        let (status, body) = self.call(
            Method::Post,
            "/auth/signin",
            None,
            Some(json!({ "email": email, "password": password })),
        );
        assert_eq!(status, 200, "signin failed: {:?}", body);
        let token = body["token"].as_str().unwrap().to_string();

        Account { id, token, email }
    }

    pub fn create_blog(&self, author: &Account, title: &str) -> String {
        let (status, body) = self.post(
            "/blogs",
            &author.token,
            json!({
                "title": title,
                "category": "Travel",
                "content": "<p>Notes from the road.</p>",
                "image": PNG_URI,
            }),
        );
        assert_eq!(status, 201, "create blog failed: {:?}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub fn notifications(&self, account: &Account) -> Vec<Value> {
        let (status, body) = self.get("/notifications", &account.token);
        assert_eq!(status, 200);
        body["notifications"].as_array().unwrap().clone()
    }
}
