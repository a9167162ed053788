//! Author subscriptions.
//!
//! A relation is stored twice: in the follower's `subscribed_to` list and in
//! the author's `subscribers` list. The two writes are independent, so a
//! failure between them leaves the sides out of step until the same
//! subscribe is retried.

use serde::Serialize;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::require_user_doc;
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, message_response, now_iso, require_uuid};
use crate::models::models::{NotificationKind, Subscription, SubscriptionEntry, User};
use crate::notifications::{notify_best_effort, NotificationRefs};
use crate::App;

pub fn load_subscription(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Subscription> {
    Ok(store
        .get_json::<Subscription>(&subscription_key(user_id))?
        .unwrap_or_else(|| Subscription::new(user_id)))
}

fn contains(list: &[SubscriptionEntry], user_id: &str) -> bool {
    list.iter().any(|e| e.user_id == user_id)
}

/// Records `follower` → `author` on both sides. Returns `true` when either
/// side changed.
pub fn subscribe(store: &dyn KvStore, follower: &str, author: &str) -> anyhow::Result<bool> {
    let now = now_iso();
    let mut changed = false;

    let mut author_doc = load_subscription(store, author)?;
    if !contains(&author_doc.subscribers, follower) {
        author_doc.subscribers.push(SubscriptionEntry {
            user_id: follower.to_string(),
            date: now.clone(),
        });
        author_doc.updated_at = Some(now.clone());
        store.set_json(&subscription_key(author), &author_doc)?;
        changed = true;
    }

    let mut follower_doc = load_subscription(store, follower)?;
    if !contains(&follower_doc.subscribed_to, author) {
        follower_doc.subscribed_to.push(SubscriptionEntry {
            user_id: author.to_string(),
            date: now.clone(),
        });
        follower_doc.updated_at = Some(now);
        store.set_json(&subscription_key(follower), &follower_doc)?;
        changed = true;
    }

    Ok(changed)
}

/// Removes `follower` → `author` from both sides.
pub fn unsubscribe(store: &dyn KvStore, follower: &str, author: &str) -> anyhow::Result<()> {
    let now = now_iso();
    let follower_key = subscription_key(follower);
    if let Some(mut doc) = store.get_json::<Subscription>(&follower_key)? {
        doc.subscribed_to.retain(|e| e.user_id != author);
        doc.updated_at = Some(now.clone());
        store.set_json(&follower_key, &doc)?;
    }

    let author_key = subscription_key(author);
    if let Some(mut doc) = store.get_json::<Subscription>(&author_key)? {
        doc.subscribers.retain(|e| e.user_id != follower);
        doc.updated_at = Some(now);
        store.set_json(&author_key, &doc)?;
    }
    Ok(())
}

pub fn handle_subscribe(app: &App, req: Request, author_id: &str) -> anyhow::Result<Response> {
    let follower = require_user_doc(app, &req)?;
    require_uuid(author_id, "user")?;
    if follower.id == author_id {
        return Ok(ApiError::bad_request("You cannot subscribe to yourself").into());
    }
    if !app.store.exists(&user_key(author_id))? {
        return Ok(ApiError::not_found("User not found").into());
    }

    if subscribe(app.store, &follower.id, author_id)? {
        info!(follower = %follower.id, author = %author_id, "subscribed");
        notify_best_effort(
            app.store,
            author_id,
            &follower.id,
            NotificationKind::Subscribe,
            NotificationRefs {
                message: Some(format!("{} has subscribed to you!", follower.name)),
                ..Default::default()
            },
        );
    }

    message_response(200, "Subscription successful")
}

pub fn handle_unsubscribe(app: &App, req: Request, author_id: &str) -> anyhow::Result<Response> {
    let follower = require_user_doc(app, &req)?;
    require_uuid(author_id, "user")?;
    if follower.id == author_id {
        return Ok(ApiError::bad_request("You cannot unsubscribe from yourself").into());
    }

    unsubscribe(app.store, &follower.id, author_id)?;
    info!(follower = %follower.id, author = %author_id, "unsubscribed");

    message_response(200, "Unsubscribed successfully")
}

#[derive(Serialize)]
struct SubscriptionView {
    user_id: String,
    name: Option<String>,
    date: String,
}

fn with_names(store: &dyn KvStore, entries: Vec<SubscriptionEntry>) -> anyhow::Result<Vec<SubscriptionView>> {
    entries
        .into_iter()
        .map(|e| -> anyhow::Result<SubscriptionView> {
            let name = store.get_json::<User>(&user_key(&e.user_id))?.map(|u| u.name);
            Ok(SubscriptionView {
                user_id: e.user_id,
                name,
                date: e.date,
            })
        })
        .collect()
}

pub fn get_subscribers(app: &App, user_id: &str) -> anyhow::Result<Response> {
    require_uuid(user_id, "user")?;
    let doc = load_subscription(app.store, user_id)?;
    json_response(
        200,
        &serde_json::json!({ "subscribers": with_names(app.store, doc.subscribers)? }),
    )
}

pub fn get_subscriptions(app: &App, user_id: &str) -> anyhow::Result<Response> {
    require_uuid(user_id, "user")?;
    let doc = load_subscription(app.store, user_id)?;
    json_response(
        200,
        &serde_json::json!({ "subscriptions": with_names(app.store, doc.subscribed_to)? }),
    )
}
