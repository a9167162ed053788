pub mod auth;
pub mod blogs;
pub mod comments;
pub mod config;
pub mod core;
pub mod favourites;
pub mod likes;
pub mod mailer;
pub mod media;
pub mod models;
pub mod notifications;
pub mod router;
pub mod subscriptions;
pub mod users;

use crate::core::db::KvStore;
use crate::mailer::Mailer;
use crate::media::MediaHost;

/// Everything a handler may touch for one request.
#[derive(Clone, Copy)]
pub struct App<'a> {
    pub store: &'a dyn KvStore,
    pub media: &'a dyn MediaHost,
    pub mailer: &'a dyn Mailer,
}

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::{
        http::{IntoResponse, Request},
        http_component,
        key_value::Store,
    };

    use crate::mailer::LogMailer;
    use crate::media::KvMediaHost;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = Store::open_default()?;
        let media = KvMediaHost::new(&store, crate::config::media_base_url());
        let app = crate::App {
            store: &store,
            media: &media,
            mailer: &LogMailer,
        };
        Ok(crate::router::route(&app, req))
    }
}
