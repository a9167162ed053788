use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::{issue_token, require_user, revoke_tokens};
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::*;
use crate::media::{destroy_by_url, ImageUpload};
use crate::models::models::User;
use crate::App;

#[derive(Deserialize)]
struct UpdateProfileBody {
    name: Option<String>,
    old_password: Option<String>,
    new_password: Option<String>,
    profile_image: Option<String>,
}

fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "profile_image": user.profile_image,
        "verified": user.verified,
        "created_at": user.created_at,
    })
}

fn load_user(store: &dyn KvStore, user_id: &str) -> anyhow::Result<User> {
    require_uuid(user_id, "user")?;
    let user = store
        .get_json::<User>(&user_key(user_id))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(user)
}

pub fn get_user_details(app: &App, user_id: &str) -> anyhow::Result<Response> {
    let user = load_user(app.store, user_id)?;
    json_response(200, &build_user_json(&user))
}

pub fn get_profile(app: &App, req: Request) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    get_user_details(app, &user_id)
}

pub fn update_profile(app: &App, req: Request, user_id: &str) -> anyhow::Result<Response> {
    let caller = require_user(app, &req)?;
    let mut user = load_user(app.store, user_id)?;
    if user.id != caller {
        return Ok(ApiError::Forbidden.into());
    }
    let body: UpdateProfileBody = parse_json(&req)?;

    if let Some(name) = &body.name {
        let name = sanitize_text(name);
        if name.chars().count() < MIN_NAME_LENGTH || name.chars().count() > MAX_NAME_LENGTH {
            return Ok(ApiError::bad_request("Name must be 2-50 characters").into());
        }
        user.name = name;
    }

    let mut password_changed = false;
    if let Some(new_password) = &body.new_password {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Ok(ApiError::bad_request("Password too short").into());
        }
        let old_password = body
            .old_password
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Current password required"))?;
        if !verify_password(old_password, &user.password) {
            return Ok(ApiError::Unauthorized.into());
        }
        user.password = hash_password(new_password)?;
        password_changed = true;
    }

    if let Some(image) = body.profile_image.as_deref().filter(|i| !i.trim().is_empty()) {
        let image = ImageUpload::from_data_uri(image)?;
        let new_url = app.media.upload(PROFILE_IMAGE_FOLDER, &image)?;
        if let Some(old) = &user.profile_image {
            destroy_by_url(app.media, old);
        }
        user.profile_image = Some(new_url);
    }

    app.store.set_json(&user_key(&user.id), &user)?;
    info!(user_id = %user.id, password_changed, "profile updated");

    let mut response_data = build_user_json(&user);
    if password_changed {
        revoke_tokens(app.store, &user.id)?;
        let token = issue_token(app.store, &user.id)?;
        response_data["token"] = serde_json::Value::String(token);
    }

    json_response(
        200,
        &serde_json::json!({ "message": "Profile updated successfully", "user": response_data }),
    )
}
