use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::info;
use uuid::Uuid;

use crate::auth::require_user_doc;
use crate::blogs::load_blog;
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, now_iso, parse_json, sanitize_text};
use crate::models::models::{Comment, NotificationKind};
use crate::notifications::{notify_best_effort, NotificationRefs};
use crate::App;

#[derive(Deserialize)]
struct CommentBody {
    #[serde(default)]
    comment: String,
}

/// Comments of a blog, newest first.
pub fn blog_comments(store: &dyn KvStore, blog_id: &str) -> anyhow::Result<Vec<Comment>> {
    let mut comments = Vec::new();
    for id in store.get_list(&blog_comments_key(blog_id))? {
        if let Some(comment) = store.get_json::<Comment>(&comment_key(&id))? {
            comments.push(comment);
        }
    }
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(comments)
}

pub fn add_comment(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let commenter = require_user_doc(app, &req)?;
    let body: CommentBody = parse_json(&req)?;

    let text = sanitize_text(&body.comment);
    if text.is_empty() || text.chars().count() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::bad_request("Invalid comment").into());
    }

    let blog = load_blog(app.store, blog_id)?;

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        blog_id: blog.id.clone(),
        user_id: commenter.id.clone(),
        comment: text,
        name: commenter.name.clone(),
        email: commenter.email.clone(),
        created_at: now_iso(),
    };
    app.store.set_json(&comment_key(&comment.id), &comment)?;

    let index_key = blog_comments_key(&blog.id);
    let mut index = app.store.get_list(&index_key)?;
    index.push(comment.id.clone());
    app.store.set_json(&index_key, &index)?;
    info!(blog_id = %blog.id, comment_id = %comment.id, "comment added");

    notify_best_effort(
        app.store,
        &blog.user_id,
        &commenter.id,
        NotificationKind::Comment,
        NotificationRefs {
            blog_id: Some(blog.id.clone()),
            comment_id: Some(comment.id.clone()),
            title: Some(blog.title.clone()),
            message: Some(comment.comment.clone()),
        },
    );

    json_response(201, &comment)
}

pub fn list_comments(app: &App, blog_id: &str) -> anyhow::Result<Response> {
    let blog = load_blog(app.store, blog_id)?;
    let comments = blog_comments(app.store, &blog.id)?;
    json_response(200, &serde_json::json!({ "comments": comments }))
}
