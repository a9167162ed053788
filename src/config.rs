use std::{env, fmt::Display, str::FromStr};

use tracing::warn;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_CATEGORY_LENGTH: usize = 50;
pub const MAX_CONTENT_LENGTH: usize = 50_000;
pub const MAX_COMMENT_LENGTH: usize = 2_000;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const BLOG_SNIPPET_LENGTH: usize = 100;
pub const OTP_LENGTH: usize = 6;
pub const MAX_NOTIFICATION_WINDOW_DAYS: i64 = 365;

pub const BLOG_IMAGE_FOLDER: &str = "blog-picture";
pub const PROFILE_IMAGE_FOLDER: &str = "profile-picture";

// === Store keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const BLOGS_LIST_KEY: &str = "blogs_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email.to_lowercase())
}

pub fn blog_key(id: &str) -> String {
    format!("blog:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn blog_comments_key(blog_id: &str) -> String {
    format!("blog_comments:{}", blog_id)
}

pub fn favourite_key(user_id: &str, blog_id: &str) -> String {
    format!("favourite:{}:{}", user_id, blog_id)
}

pub fn user_favourites_key(user_id: &str) -> String {
    format!("user_favourites:{}", user_id)
}

pub fn blog_favourites_key(blog_id: &str) -> String {
    format!("blog_favourites:{}", blog_id)
}

pub fn subscription_key(user_id: &str) -> String {
    format!("subscription:{}", user_id)
}

pub fn notification_key(id: &str) -> String {
    format!("notification:{}", id)
}

pub fn user_notifications_key(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn media_key(public_id: &str) -> String {
    format!("media:{}", public_id)
}

// === Environment ===

pub fn token_expiration_hours() -> i64 {
    try_load("QUILL_TOKEN_EXPIRATION_HOURS", 24)
}

pub fn notification_window_days() -> i64 {
    try_load("QUILL_NOTIFICATION_WINDOW_DAYS", 2)
}

/// Prefix for uploaded image URLs. Empty means URLs are served relative to
/// this app under `/media/`.
pub fn media_base_url() -> String {
    env::var("QUILL_MEDIA_BASE_URL")
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_default()
}

pub fn port() -> u16 {
    try_load("QUILL_PORT", 3000)
}

pub fn seed_demo() -> bool {
    try_load("QUILL_SEED_DEMO", false)
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|e| {
            warn!("Invalid value for {key} ({e}), using default {default}");
            default
        }),
        Err(_) => default,
    }
}
