use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::*;
use crate::models::models::{TokenData, User};
use crate::App;

#[derive(Deserialize)]
struct SignUpBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct VerifyOtpBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    otp: String,
}

#[derive(Deserialize)]
struct SignInBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn find_user_by_email(store: &dyn KvStore, email: &str) -> anyhow::Result<Option<User>> {
    let Some(user_id) = store.get_json::<String>(&email_key(email))? else {
        return Ok(None);
    };
    store.get_json::<User>(&user_key(&user_id))
}

pub fn sign_up(app: &App, req: Request) -> anyhow::Result<Response> {
    let body: SignUpBody = parse_json(&req)?;
    let name = sanitize_text(&body.name);
    let email = body.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || body.password.is_empty() {
        return Ok(ApiError::bad_request("All fields required").into());
    }
    if name.chars().count() < MIN_NAME_LENGTH || name.chars().count() > MAX_NAME_LENGTH {
        return Ok(ApiError::bad_request("Name must be 2-50 characters").into());
    }
    if !validate_email(&email) {
        return Ok(ApiError::bad_request("Invalid email address").into());
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return Ok(ApiError::bad_request("Password too short").into());
    }

    let store = app.store;
    if store.exists(&email_key(&email))? {
        return Ok(ApiError::bad_request("User already exists").into());
    }

    let otp = generate_otp(OTP_LENGTH);
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password: hash_password(&body.password)?,
        profile_image: None,
        otp: Some(otp.clone()),
        verified: false,
        created_at: now_iso(),
    };

    store.set_json(&user_key(&user.id), &user)?;
    store.set_json(&email_key(&user.email), &user.id)?;
    let mut users = store.get_list(USERS_LIST_KEY)?;
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;
    info!(user_id = %user.id, "user created");

    if let Err(e) = app.mailer.send_otp(&user.email, &user.name, &otp) {
        warn!(user_id = %user.id, error = %e, "otp email failed");
        return Ok(ApiError::InternalError("User created but OTP email failed".to_string()).into());
    }

    json_response(
        201,
        &serde_json::json!({
            "message": "User created. OTP sent to email.",
            "user_id": user.id,
        }),
    )
}

pub fn verify_otp(app: &App, req: Request) -> anyhow::Result<Response> {
    let body: VerifyOtpBody = parse_json(&req)?;
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.otp.trim().is_empty() {
        return Ok(ApiError::bad_request("Email and code are required").into());
    }

    let Some(mut user) = find_user_by_email(app.store, &email)? else {
        return Ok(ApiError::not_found("User not found").into());
    };

    match user.otp.as_deref() {
        Some(expected) if expected == body.otp.trim() => {}
        _ => return Ok(ApiError::bad_request("Invalid or expired code").into()),
    }

    user.otp = None;
    user.verified = true;
    app.store.set_json(&user_key(&user.id), &user)?;
    info!(user_id = %user.id, "email verified");

    message_response(200, "Email verified")
}

pub fn sign_in(app: &App, req: Request) -> anyhow::Result<Response> {
    let body: SignInBody = parse_json(&req)?;
    let email = body.email.trim().to_lowercase();

    let user = match find_user_by_email(app.store, &email)? {
        Some(u) if verify_password(&body.password, &u.password) => u,
        _ => return Ok(ApiError::Unauthorized.into()),
    };

    let token = issue_token(app.store, &user.id)?;
    info!(user_id = %user.id, "signed in");

    json_response(
        200,
        &serde_json::json!({
            "token": token,
            "user_id": user.id,
            "name": user.name,
        }),
    )
}

pub fn sign_out(app: &App, req: Request) -> anyhow::Result<Response> {
    let Some(token) = bearer_token(&req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    app.store.delete(&token_key(token))?;
    let mut tokens = app.store.get_list(TOKENS_LIST_KEY)?;
    tokens.retain(|t| t != token);
    app.store.set_json(TOKENS_LIST_KEY, &tokens)?;

    message_response(200, "Logged out successfully")
}

fn token_expired(data: &TokenData) -> bool {
    let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) else {
        return true;
    };
    let age_hours = (chrono::Utc::now() - created.with_timezone(&chrono::Utc)).num_hours();
    age_hours > token_expiration_hours()
}

/// Rewrites `tokens_list`, dropping tokens whose document is gone or
/// expired, and those for which `revoke` returns true. Dropped documents
/// are deleted.
fn prune_tokens(store: &dyn KvStore, revoke: impl Fn(&TokenData) -> bool) -> anyhow::Result<Vec<String>> {
    let mut kept = Vec::new();
    for token in store.get_list(TOKENS_LIST_KEY)? {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if token_expired(&data) || revoke(&data) => store.delete(&key)?,
            Some(_) => kept.push(token),
            None => {}
        }
    }
    Ok(kept)
}

pub fn issue_token(store: &dyn KvStore, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens = prune_tokens(store, |_| false)?;
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;
    Ok(token)
}

/// Deletes every token issued to `user_id`.
pub fn revoke_tokens(store: &dyn KvStore, user_id: &str) -> anyhow::Result<()> {
    let kept = prune_tokens(store, |data| data.user_id == user_id)?;
    store.set_json(TOKENS_LIST_KEY, &kept)
}

/// Resolves the bearer token to a user id. Expired tokens and tokens of
/// deleted users resolve to nothing.
pub fn validate_token(store: &dyn KvStore, req: &Request) -> Option<String> {
    let token = bearer_token(req)?;
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    if token_expired(&data) {
        return None;
    }

    if !store.exists(&user_key(&data.user_id)).ok()? {
        return None;
    }
    Some(data.user_id)
}

pub fn require_user(app: &App, req: &Request) -> Result<String, ApiError> {
    validate_token(app.store, req).ok_or(ApiError::Unauthorized)
}

/// The signed-in user's document.
pub fn require_user_doc(app: &App, req: &Request) -> anyhow::Result<User> {
    let user_id = require_user(app, req)?;
    app.store
        .get_json::<User>(&user_key(&user_id))?
        .ok_or_else(|| ApiError::Unauthorized.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;

    fn stale_token(store: &MemoryStore, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let data = TokenData {
            user_id: user_id.to_string(),
            created_at: (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339(),
        };
        store.set_json(&token_key(&token), &data).unwrap();
        let mut tokens = store.get_list(TOKENS_LIST_KEY).unwrap();
        tokens.push(token.clone());
        store.set_json(TOKENS_LIST_KEY, &tokens).unwrap();
        token
    }

    #[test]
    fn issuing_drops_expired_and_dangling_tokens() {
        let store = MemoryStore::new();
        let stale = stale_token(&store, "u1");
        store.set_json(TOKENS_LIST_KEY, &vec![stale.clone(), "dangling".to_string()]).unwrap();

        let fresh = issue_token(&store, "u2").unwrap();
        assert_eq!(store.get_list(TOKENS_LIST_KEY).unwrap(), vec![fresh]);
        assert!(!store.exists(&token_key(&stale)).unwrap());
    }

    #[test]
    fn revoke_keeps_other_users_live_tokens() {
        let store = MemoryStore::new();
        let mine = issue_token(&store, "u1").unwrap();
        let theirs = issue_token(&store, "u2").unwrap();
        stale_token(&store, "u2");

        revoke_tokens(&store, "u1").unwrap();
        assert_eq!(store.get_list(TOKENS_LIST_KEY).unwrap(), vec![theirs]);
        assert!(!store.exists(&token_key(&mine)).unwrap());
    }
}
