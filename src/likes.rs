use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::require_user;
use crate::blogs::load_blog;
use crate::config::blog_key;
use crate::core::db::{JsonStore, KvStore};
use crate::core::helpers::json_response;
use crate::models::models::{Blog, NotificationKind};
use crate::notifications::{notify_best_effort, NotificationRefs};
use crate::App;

/// Flips `user_id` in the like list and recomputes the counter from it.
/// Returns whether the blog is now liked by the user.
pub fn toggle(blog: &mut Blog, user_id: &str) -> bool {
    let liked = match blog.likes.iter().position(|id| id == user_id) {
        Some(pos) => {
            blog.likes.remove(pos);
            false
        }
        None => {
            blog.likes.push(user_id.to_string());
            true
        }
    };
    blog.likes_count = blog.likes.len();
    liked
}

/// Read-modify-write of the whole blog document; two concurrent toggles on
/// the same blog can lose one update.
pub fn toggle_like(store: &dyn KvStore, blog_id: &str, user_id: &str) -> anyhow::Result<(Blog, bool)> {
    let mut blog = load_blog(store, blog_id)?;
    let liked = toggle(&mut blog, user_id);
    store.set_json(&blog_key(&blog.id), &blog)?;

    if liked {
        notify_best_effort(
            store,
            &blog.user_id,
            user_id,
            NotificationKind::Like,
            NotificationRefs {
                blog_id: Some(blog.id.clone()),
                title: Some(blog.title.clone()),
                ..Default::default()
            },
        );
    }
    Ok((blog, liked))
}

pub fn handle_like(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    let (blog, liked) = toggle_like(app.store, blog_id, &user_id)?;
    info!(blog_id = %blog.id, %user_id, liked, "like toggled");

    json_response(
        200,
        &serde_json::json!({
            "message": if liked { "Liked successfully" } else { "Unliked successfully" },
            "likes_count": blog.likes_count,
            "is_liked": liked,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> Blog {
        Blog {
            id: "b".into(),
            title: "t".into(),
            category: "c".into(),
            content: "x".into(),
            image: String::new(),
            user_id: "owner".into(),
            name: "Owner".into(),
            likes: vec!["someone".into()],
            likes_count: 1,
            created_at: String::new(),
            updated_at: None,
        }
    }

    #[test]
    fn like_then_unlike_restores_count() {
        let mut b = blog();
        assert!(toggle(&mut b, "me"));
        assert_eq!(b.likes_count, 2);
        assert!(!toggle(&mut b, "me"));
        assert_eq!(b.likes_count, 1);
        assert_eq!(b.likes, vec!["someone".to_string()]);
    }

    #[test]
    fn counter_resyncs_with_list() {
        let mut b = blog();
        b.likes_count = 42;
        toggle(&mut b, "me");
        assert_eq!(b.likes_count, b.likes.len());
    }
}
