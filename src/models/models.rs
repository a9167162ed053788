use serde::{Deserialize, Serialize};

use crate::core::helpers::now_iso;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<String>,
    /// Set at signup, cleared once confirmed.
    pub otp: Option<String>,
    #[serde(default)]
    pub verified: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub image: String,
    pub user_id: String,
    /// Author display name at the time of posting.
    pub name: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub likes_count: usize,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub blog_id: String,
    pub user_id: String,
    pub comment: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Favourite {
    pub blog_id: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriptionEntry {
    pub user_id: String,
    pub date: String,
}

/// One per user: who follows them and whom they follow. The two sides of
/// a relation live in different documents.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Subscription {
    pub user_id: String,
    #[serde(default)]
    pub subscribers: Vec<SubscriptionEntry>,
    #[serde(default)]
    pub subscribed_to: Vec<SubscriptionEntry>,
    #[serde(default)]
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Subscription {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            subscribers: Vec::new(),
            subscribed_to: Vec::new(),
            created_at: now_iso(),
            updated_at: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    Like,
    NewPost,
    Subscribe,
    Save,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Notification {
    pub id: String,
    pub receiver: String,
    pub sender: String,
    pub kind: NotificationKind,
    pub blog_id: Option<String>,
    pub comment_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub seen: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
