use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::*;
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::{Blog, Subscription, SubscriptionEntry, User};

/// Byte-level document store. Every collection is a set of JSON documents
/// addressed by key, plus JSON id lists used as indexes.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
    fn exists(&self, key: &str) -> anyhow::Result<bool>;
}

pub trait JsonStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;

    /// Reads a JSON id list, treating a missing key as empty.
    fn get_list(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.get_json(key)?.unwrap_or_default())
    }
}

impl<S: KvStore + ?Sized> JsonStore for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

impl KvStore for spin_sdk::key_value::Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(spin_sdk::key_value::Store::get(self, key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::set(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::delete(self, key)?)
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(spin_sdk::key_value::Store::exists(self, key)?)
    }
}

/// In-process store for the native server and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries()?.contains_key(key))
    }
}

struct DemoAccount {
    name: &'static str,
    email: &'static str,
    blog_title: &'static str,
    blog_content: &'static str,
}

const DEMO_ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        name: "Alice",
        email: "alice@example.com",
        blog_title: "Hello from Alice",
        blog_content: "<p>Welcome to my blog! Excited to share thoughts here.</p>",
    },
    DemoAccount {
        name: "Bob",
        email: "bob@example.com",
        blog_title: "Bob's first post",
        blog_content: "<p>Just joined, looking forward to reading your posts.</p>",
    },
];

/// Creates two verified demo users (password = lowercase name repeated
/// twice, e.g. `alicealice`), one post each, and makes Bob a subscriber of
/// Alice. Does nothing when the demo users already exist.
pub fn seed_demo_data(store: &dyn KvStore) -> anyhow::Result<()> {
    if store.exists(&email_key(DEMO_ACCOUNTS[0].email))? {
        return Ok(());
    }

    let mut users = store.get_list(USERS_LIST_KEY)?;
    let mut blogs = store.get_list(BLOGS_LIST_KEY)?;
    let mut ids = Vec::new();

    for account in DEMO_ACCOUNTS.iter() {
        let user_id = Uuid::new_v4().to_string();
        let password = account.name.to_lowercase().repeat(2);
        let user = User {
            id: user_id.clone(),
            name: account.name.to_string(),
            email: account.email.to_string(),
            password: hash_password(&password)?,
            profile_image: None,
            otp: None,
            verified: true,
            created_at: now_iso(),
        };
        store.set_json(&user_key(&user_id), &user)?;
        store.set_json(&email_key(account.email), &user_id)?;
        users.push(user_id.clone());

        let blog_id = Uuid::new_v4().to_string();
        let blog = Blog {
            id: blog_id.clone(),
            title: account.blog_title.to_string(),
            category: "General".to_string(),
            content: account.blog_content.to_string(),
            image: String::new(),
            user_id: user_id.clone(),
            name: account.name.to_string(),
            likes: Vec::new(),
            likes_count: 0,
            created_at: now_iso(),
            updated_at: None,
        };
        store.set_json(&blog_key(&blog_id), &blog)?;
        blogs.insert(0, blog_id);
        ids.push(user_id);
    }

    let (alice, bob) = (&ids[0], &ids[1]);
    let now = now_iso();
    let mut alice_sub = Subscription::new(alice);
    alice_sub.subscribers.push(SubscriptionEntry { user_id: bob.clone(), date: now.clone() });
    let mut bob_sub = Subscription::new(bob);
    bob_sub.subscribed_to.push(SubscriptionEntry { user_id: alice.clone(), date: now });
    store.set_json(&subscription_key(alice), &alice_sub)?;
    store.set_json(&subscription_key(bob), &bob_sub)?;

    store.set_json(USERS_LIST_KEY, &users)?;
    store.set_json(BLOGS_LIST_KEY, &blogs)?;
    info!(users = ids.len(), "seeded demo data");
    Ok(())
}
