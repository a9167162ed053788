use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::require_user;
use crate::blogs::load_blog;
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, message_response, now_iso, require_uuid};
use crate::models::models::{Blog, Favourite, NotificationKind};
use crate::notifications::{notify_best_effort, NotificationRefs};
use crate::App;

fn push_unique(store: &dyn KvStore, key: &str, id: &str) -> anyhow::Result<()> {
    let mut list = store.get_list(key)?;
    if !list.iter().any(|x| x == id) {
        list.push(id.to_string());
        store.set_json(key, &list)?;
    }
    Ok(())
}

fn pull(store: &dyn KvStore, key: &str, id: &str) -> anyhow::Result<()> {
    let mut list = store.get_list(key)?;
    list.retain(|x| x != id);
    store.set_json(key, &list)
}

pub fn save_blog(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    let blog = load_blog(app.store, blog_id)?;
    let store = app.store;

    let key = favourite_key(&user_id, &blog.id);
    if store.exists(&key)? {
        return Ok(ApiError::bad_request("Already saved").into());
    }

    let favourite = Favourite {
        blog_id: blog.id.clone(),
        user_id: user_id.clone(),
        created_at: now_iso(),
    };
    store.set_json(&key, &favourite)?;
    push_unique(store, &user_favourites_key(&user_id), &blog.id)?;
    push_unique(store, &blog_favourites_key(&blog.id), &user_id)?;
    info!(blog_id = %blog.id, %user_id, "blog saved");

    notify_best_effort(
        store,
        &blog.user_id,
        &user_id,
        NotificationKind::Save,
        NotificationRefs {
            blog_id: Some(blog.id.clone()),
            title: Some(blog.title.clone()),
            ..Default::default()
        },
    );

    json_response(
        201,
        &serde_json::json!({ "message": "Saved successfully", "favourite": favourite }),
    )
}

pub fn unsave_blog(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    require_uuid(blog_id, "blog")?;
    let store = app.store;

    let key = favourite_key(&user_id, blog_id);
    if !store.exists(&key)? {
        return Ok(ApiError::not_found("Favourite not found").into());
    }

    store.delete(&key)?;
    pull(store, &user_favourites_key(&user_id), blog_id)?;
    pull(store, &blog_favourites_key(blog_id), &user_id)?;
    info!(%blog_id, %user_id, "blog unsaved");

    message_response(200, "Removed from wishlist")
}

/// Blogs the caller bookmarked, most recently saved first. Blogs deleted
/// since are skipped.
pub fn list_saved(app: &App, req: Request) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;

    let mut blogs = Vec::new();
    for blog_id in app.store.get_list(&user_favourites_key(&user_id))?.iter().rev() {
        if let Some(blog) = app.store.get_json::<Blog>(&blog_key(blog_id))? {
            blogs.push(blog);
        }
    }

    json_response(200, &serde_json::json!({ "blogs": blogs }))
}
