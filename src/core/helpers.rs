use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rand::Rng;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::core::errors::ApiError;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Rejects ids that could never name a stored document.
pub fn require_uuid(id: &str, what: &str) -> Result<(), ApiError> {
    if id.is_empty() || !validate_uuid(id) {
        return Err(ApiError::bad_request(format!("Invalid {} id", what)));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> bool {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Regex should compile"))
        .is_match(email)
}

pub fn generate_otp(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|i| {
            // no leading zero, so the code always has `len` digits
            let low = if i == 0 { 1 } else { 0 };
            char::from(b'0' + rng.gen_range(low..10u8))
        })
        .collect()
}

/// Strips every tag, leaving plain text. Entities ammonia writes back out
/// are decoded, so `a & b` stays `a & b`.
pub fn sanitize_text(text: &str) -> String {
    let stripped = Builder::default()
        .tags(HashSet::new())
        .clean(text.trim())
        .to_string();
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Keeps safe formatting markup from the rich-text editor.
pub fn sanitize_html(html: &str) -> String {
    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(html)
        .to_string()
}

/// First `max` characters of the text content of an HTML fragment.
pub fn snippet(html: &str, max: usize) -> String {
    sanitize_text(html).chars().take(max).collect()
}

pub fn parse_json<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(req.body())?)
}

pub fn json_response<T: Serialize>(status: u16, body: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

pub fn message_response(status: u16, message: &str) -> anyhow::Result<Response> {
    json_response(status, &serde_json::json!({ "message": message }))
}

pub fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
