use spin_sdk::http::{Request, Response};

use crate::core::errors::{into_response, ApiError};
use crate::{auth, blogs, comments, favourites, likes, media, notifications, subscriptions, users, App};

/// Dispatches one request. Never fails: handler errors become error
/// responses here.
pub fn route(app: &App, req: Request) -> Response {
    let path = req.path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().to_string();

    let result = match (method.as_str(), segments.as_slice()) {
        ("POST", ["auth", "signup"]) => auth::sign_up(app, req),
        ("POST", ["auth", "verify-otp"]) => auth::verify_otp(app, req),
        ("POST", ["auth", "signin"]) => auth::sign_in(app, req),
        ("POST", ["auth", "signout"]) => auth::sign_out(app, req),

        ("GET", ["profile"]) => users::get_profile(app, req),
        ("GET", ["users", id]) => users::get_user_details(app, id),
        ("PUT", ["users", id]) => users::update_profile(app, req, id),
        ("POST", ["users", id, "subscribe"]) => subscriptions::handle_subscribe(app, req, id),
        ("DELETE", ["users", id, "subscribe"]) => subscriptions::handle_unsubscribe(app, req, id),
        ("GET", ["users", id, "subscribers"]) => subscriptions::get_subscribers(app, id),
        ("GET", ["users", id, "subscriptions"]) => subscriptions::get_subscriptions(app, id),

        ("GET", ["blogs"]) => blogs::list_blogs(app, req),
        ("POST", ["blogs"]) => blogs::create_blog(app, req),
        ("GET", ["blogs", "mine"]) => blogs::my_blogs(app, req),
        ("GET", ["blogs", id]) => blogs::get_blog(app, id),
        ("PUT", ["blogs", id]) => blogs::update_blog(app, req, id),
        ("DELETE", ["blogs", id]) => blogs::delete_blog(app, req, id),
        ("POST", ["blogs", id, "like"]) => likes::handle_like(app, req, id),
        ("GET", ["blogs", id, "comments"]) => comments::list_comments(app, id),
        ("POST", ["blogs", id, "comments"]) => comments::add_comment(app, req, id),
        ("POST", ["blogs", id, "save"]) => favourites::save_blog(app, req, id),
        ("DELETE", ["blogs", id, "save"]) => favourites::unsave_blog(app, req, id),
        ("GET", ["saved"]) => favourites::list_saved(app, req),

        ("GET", ["notifications"]) => notifications::get_notifications(app, req),
        ("POST", ["notifications", "seen"]) => notifications::mark_all_seen(app, req),

        ("GET", ["media", folder, file]) => media::serve_media(app.store, folder, file),

        _ => Ok(ApiError::not_found("No route found").into()),
    };

    result.unwrap_or_else(into_response)
}
