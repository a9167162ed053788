use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{require_user, require_user_doc};
use crate::config::*;
use crate::core::db::{JsonStore, KvStore};
use crate::core::errors::ApiError;
use crate::core::helpers::*;
use crate::core::query_params::{get_string, parse_query_params};
use crate::media::{destroy_by_url, ImageUpload};
use crate::models::models::{Blog, User};
use crate::notifications::fan_out_new_post;
use crate::App;

#[derive(Deserialize)]
struct CreateBlogBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    image: String,
}

#[derive(Deserialize)]
struct UpdateBlogBody {
    title: Option<String>,
    category: Option<String>,
    content: Option<String>,
    image: Option<String>,
}

/// A blog as listed in the main feed, with its counters and author joined in.
#[derive(Serialize, Debug)]
pub struct BlogSummary {
    #[serde(flatten)]
    pub blog: Blog,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub comment_count: usize,
    pub favourite_count: usize,
    pub is_liked: bool,
}

fn clean_title(title: &str) -> Result<String, ApiError> {
    let title = sanitize_text(title);
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::bad_request("Title must be 1-200 characters"));
    }
    Ok(title)
}

fn clean_category(category: &str) -> Result<String, ApiError> {
    let category = sanitize_text(category);
    if category.is_empty() || category.chars().count() > MAX_CATEGORY_LENGTH {
        return Err(ApiError::bad_request("Category must be 1-50 characters"));
    }
    Ok(category)
}

fn clean_content(content: &str) -> Result<String, ApiError> {
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(ApiError::bad_request("Content too long"));
    }
    let content = sanitize_html(content);
    if sanitize_text(&content).is_empty() {
        return Err(ApiError::bad_request("Content is required"));
    }
    Ok(content)
}

pub fn load_blog(store: &dyn KvStore, blog_id: &str) -> anyhow::Result<Blog> {
    require_uuid(blog_id, "blog")?;
    let blog = store
        .get_json::<Blog>(&blog_key(blog_id))?
        .ok_or_else(|| ApiError::not_found("Blog not found"))?;
    Ok(blog)
}

/// Loads a blog the caller is allowed to change.
fn load_owned_blog(store: &dyn KvStore, blog_id: &str, user_id: &str) -> anyhow::Result<Blog> {
    let blog = load_blog(store, blog_id)?;
    if blog.user_id != user_id {
        return Err(ApiError::Forbidden.into());
    }
    Ok(blog)
}

/// Every stored blog, newest first.
pub fn all_blogs(store: &dyn KvStore) -> anyhow::Result<Vec<Blog>> {
    let mut blogs = Vec::new();
    for id in store.get_list(BLOGS_LIST_KEY)? {
        if let Some(blog) = store.get_json::<Blog>(&blog_key(&id))? {
            blogs.push(blog);
        }
    }
    blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(blogs)
}

pub fn create_blog(app: &App, req: Request) -> anyhow::Result<Response> {
    let author = require_user_doc(app, &req)?;
    let body: CreateBlogBody = parse_json(&req)?;

    if body.title.trim().is_empty()
        || body.category.trim().is_empty()
        || body.content.trim().is_empty()
        || body.image.trim().is_empty()
    {
        return Ok(ApiError::bad_request("Invalid field").into());
    }
    let title = clean_title(&body.title)?;
    let category = clean_category(&body.category)?;
    let content = clean_content(&body.content)?;
    let image = ImageUpload::from_data_uri(&body.image)?;

    let image_url = app.media.upload(BLOG_IMAGE_FOLDER, &image)?;

    let blog = Blog {
        id: Uuid::new_v4().to_string(),
        title,
        category,
        content,
        image: image_url,
        user_id: author.id.clone(),
        name: author.name.clone(),
        likes: Vec::new(),
        likes_count: 0,
        created_at: now_iso(),
        updated_at: None,
    };

    let store = app.store;
    store.set_json(&blog_key(&blog.id), &blog)?;
    let mut blogs = store.get_list(BLOGS_LIST_KEY)?;
    blogs.insert(0, blog.id.clone());
    store.set_json(BLOGS_LIST_KEY, &blogs)?;
    info!(blog_id = %blog.id, user_id = %author.id, "blog created");

    if let Err(e) = fan_out_new_post(store, &author, &blog) {
        warn!(blog_id = %blog.id, error = %e, "new post fan-out failed");
    }

    json_response(201, &blog)
}

pub fn get_blog(app: &App, blog_id: &str) -> anyhow::Result<Response> {
    let blog = load_blog(app.store, blog_id)?;
    json_response(200, &serde_json::json!({ "blog": blog }))
}

pub fn summarize(store: &dyn KvStore, blog: Blog, viewer_id: &str) -> anyhow::Result<BlogSummary> {
    let author = store.get_json::<User>(&user_key(&blog.user_id))?;
    let comment_count = store.get_list(&blog_comments_key(&blog.id))?.len();
    let favourite_count = store.get_list(&blog_favourites_key(&blog.id))?.len();
    let is_liked = blog.likes.iter().any(|id| id == viewer_id);

    Ok(BlogSummary {
        user_name: author.as_ref().map(|u| u.name.clone()),
        user_email: author.map(|u| u.email),
        comment_count,
        favourite_count,
        is_liked,
        blog,
    })
}

pub fn list_blogs(app: &App, req: Request) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;

    let summaries = all_blogs(app.store)?
        .into_iter()
        .map(|blog| summarize(app.store, blog, &user_id))
        .collect::<anyhow::Result<Vec<_>>>()?;

    json_response(200, &serde_json::json!({ "blogs": summaries }))
}

/// Blogs by `?user_id=`, or every blog when the parameter is absent.
pub fn my_blogs(app: &App, req: Request) -> anyhow::Result<Response> {
    require_user(app, &req)?;
    let params = parse_query_params(req.uri());
    let filter = get_string(&params, "user_id");
    if let Some(user_id) = &filter {
        require_uuid(user_id, "user")?;
    }

    let blogs: Vec<Blog> = all_blogs(app.store)?
        .into_iter()
        .filter(|b| filter.as_ref().map_or(true, |uid| &b.user_id == uid))
        .collect();

    json_response(200, &serde_json::json!({ "blogs": blogs }))
}

pub fn update_blog(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    let mut blog = load_owned_blog(app.store, blog_id, &user_id)?;
    let body: UpdateBlogBody = parse_json(&req)?;

    if let Some(title) = &body.title {
        blog.title = clean_title(title)?;
    }
    if let Some(category) = &body.category {
        blog.category = clean_category(category)?;
    }
    if let Some(content) = &body.content {
        blog.content = clean_content(content)?;
    }
    if let Some(image) = body.image.as_deref().filter(|i| !i.trim().is_empty()) {
        let image = ImageUpload::from_data_uri(image)?;
        let new_url = app.media.upload(BLOG_IMAGE_FOLDER, &image)?;
        destroy_by_url(app.media, &blog.image);
        blog.image = new_url;
    }

    blog.updated_at = Some(now_iso());
    app.store.set_json(&blog_key(&blog.id), &blog)?;
    info!(blog_id = %blog.id, "blog updated");

    json_response(200, &blog)
}

pub fn delete_blog(app: &App, req: Request, blog_id: &str) -> anyhow::Result<Response> {
    let user_id = require_user(app, &req)?;
    let blog = load_owned_blog(app.store, blog_id, &user_id)?;
    let store = app.store;

    destroy_by_url(app.media, &blog.image);

    let comments_key = blog_comments_key(&blog.id);
    for comment_id in store.get_list(&comments_key)? {
        store.delete(&comment_key(&comment_id))?;
    }
    store.delete(&comments_key)?;

    let favourites_key = blog_favourites_key(&blog.id);
    for saver in store.get_list(&favourites_key)? {
        store.delete(&favourite_key(&saver, &blog.id))?;
        let saved_key = user_favourites_key(&saver);
        let mut saved = store.get_list(&saved_key)?;
        saved.retain(|id| id != &blog.id);
        store.set_json(&saved_key, &saved)?;
    }
    store.delete(&favourites_key)?;

    store.delete(&blog_key(&blog.id))?;
    let mut blogs = store.get_list(BLOGS_LIST_KEY)?;
    blogs.retain(|id| id != &blog.id);
    store.set_json(BLOGS_LIST_KEY, &blogs)?;
    info!(blog_id = %blog.id, "blog deleted");

    Ok(Response::builder().status(204).build())
}
