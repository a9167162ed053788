//! Notification fan-out and the joined read-side feed.
//!
//! Writes are best effort: a handler that has already committed its primary
//! change logs a failed notification and carries on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::require_user;
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::helpers::{json_response, now_iso, snippet};
use crate::core::query_params::{get_positive_int, parse_query_params};
use crate::models::models::{Blog, Comment, Notification, NotificationKind, Subscription, User};
use crate::App;

/// Fields of a notification besides receiver, sender and kind.
#[derive(Default)]
pub struct NotificationRefs {
    pub blog_id: Option<String>,
    pub comment_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
}

/// Persists a notification and indexes it under the receiver, newest first.
/// Returns `None` when sender and receiver are the same user.
pub fn notify(
    store: &dyn KvStore,
    receiver: &str,
    sender: &str,
    kind: NotificationKind,
    refs: NotificationRefs,
) -> anyhow::Result<Option<Notification>> {
    if receiver == sender {
        return Ok(None);
    }

    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        receiver: receiver.to_string(),
        sender: sender.to_string(),
        kind,
        blog_id: refs.blog_id,
        comment_id: refs.comment_id,
        title: refs.title,
        message: refs.message,
        seen: false,
        created_at: now_iso(),
    };
    store.set_json(&notification_key(&notification.id), &notification)?;

    let index_key = user_notifications_key(receiver);
    let mut index = store.get_list(&index_key)?;
    index.insert(0, notification.id.clone());
    store.set_json(&index_key, &index)?;

    Ok(Some(notification))
}

/// [`notify`], logging instead of failing.
pub fn notify_best_effort(
    store: &dyn KvStore,
    receiver: &str,
    sender: &str,
    kind: NotificationKind,
    refs: NotificationRefs,
) {
    if let Err(e) = notify(store, receiver, sender, kind, refs) {
        warn!(%receiver, ?kind, error = %e, "failed to write notification");
    }
}

/// One `new_post` notification per subscriber of the author.
pub fn fan_out_new_post(store: &dyn KvStore, author: &User, blog: &Blog) -> anyhow::Result<usize> {
    let Some(subscription) = store.get_json::<Subscription>(&subscription_key(&author.id))? else {
        return Ok(0);
    };

    let mut sent = 0;
    for entry in &subscription.subscribers {
        let refs = NotificationRefs {
            blog_id: Some(blog.id.clone()),
            title: Some(blog.title.clone()),
            message: Some(format!("{} just published a new post: \"{}\"", author.name, blog.title)),
            ..Default::default()
        };
        if notify(store, &entry.user_id, &author.id, NotificationKind::NewPost, refs)?.is_some() {
            sent += 1;
        }
    }
    info!(blog_id = %blog.id, sent, "new post fan-out");
    Ok(sent)
}

#[derive(Serialize, Debug)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub sender_name: Option<String>,
    pub blog_title: Option<String>,
    pub blog_snippet: Option<String>,
    pub comment: Option<String>,
    pub comment_name: Option<String>,
}

fn parse_time(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts).ok().map(|t| t.with_timezone(&Utc))
}

/// Notifications for `user_id` created within the last `days`, newest first,
/// joined with sender, blog and comment. Missing referents join as `None`.
/// Stops reading the index at the first entry outside the window.
pub fn load_feed(store: &dyn KvStore, user_id: &str, days: i64) -> anyhow::Result<Vec<NotificationView>> {
    let since = Utc::now() - Duration::days(days);
    let mut views = Vec::new();

    for id in store.get_list(&user_notifications_key(user_id))? {
        let Some(notification) = store.get_json::<Notification>(&notification_key(&id))? else {
            continue;
        };
        match parse_time(&notification.created_at) {
            Some(created) if created >= since => {}
            // the index is newest first, so nothing further back is in range
            Some(_) => break,
            None => continue,
        }

        let sender_name = store
            .get_json::<User>(&user_key(&notification.sender))?
            .map(|u| u.name);
        let blog = match &notification.blog_id {
            Some(blog_id) => store.get_json::<Blog>(&blog_key(blog_id))?,
            None => None,
        };
        let comment = match &notification.comment_id {
            Some(comment_id) => store.get_json::<Comment>(&comment_key(comment_id))?,
            None => None,
        };

        views.push(NotificationView {
            sender_name,
            blog_title: blog.as_ref().map(|b| b.title.clone()),
            blog_snippet: blog.as_ref().map(|b| snippet(&b.content, BLOG_SNIPPET_LENGTH)),
            comment_name: comment.as_ref().map(|c| c.name.clone()),
            comment: comment.map(|c| c.comment),
            notification,
        });
    }

    views.sort_by(|a, b| b.notification.created_at.cmp(&a.notification.created_at));
    Ok(views)
}

pub fn get_notifications(app: &App, req: Request) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    let params = parse_query_params(req.uri());
    let days = get_positive_int(&params, "days", notification_window_days()).min(MAX_NOTIFICATION_WINDOW_DAYS);

    let notifications = load_feed(app.store, &user_id, days)?;
    json_response(200, &serde_json::json!({ "notifications": notifications }))
}

pub fn mark_all_seen(app: &App, req: Request) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;

    let mut updated = 0;
    for id in app.store.get_list(&user_notifications_key(&user_id))? {
        let key = notification_key(&id);
        if let Some(mut notification) = app.store.get_json::<Notification>(&key)? {
            if !notification.seen {
                notification.seen = true;
                app.store.set_json(&key, &notification)?;
                updated += 1;
            }
        }
    }

    json_response(200, &serde_json::json!({ "updated": updated }))
}
