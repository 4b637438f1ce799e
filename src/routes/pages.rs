use actix_session::Session;
use actix_web::{
    cookie::{time::Duration, Cookie},
    get,
    http::header::ContentType,
    web::Data,
    HttpRequest, HttpResponse,
};
use diesel::SqliteConnection;
use serde_json::json;
use tera::Tera;

use crate::{
    app::{AppError, AppState},
    auth::{self, Flash},
    cache,
    database::models::{post::Post, user::User},
};

use super::page_context;

fn render_home(
    templates: &Tera,
    conn: &mut SqliteConnection,
    user: Option<&User>,
    flashes: &[Flash],
) -> Result<String, AppError> {
    let posts: Vec<_> = Post::all_with_authors(conn)?
        .into_iter()
        .map(|(post, author)| {
            json!({
                "id": post.id,
                "title": post.title,
                "subtitle": post.subtitle,
                "date": post.date,
                "author_name": author.name,
            })
        })
        .collect();

    let mut ctx = page_context(user, flashes);
    ctx.insert("posts", &posts);
    Ok(templates.render("index.html", &ctx)?)
}

/// Front page: every post, newest first.
/// - url: `{domain}/`
///
/// Whole-page memoization only applies to anonymous readers; a cached
/// page bakes the navbar state into the body.
#[get("/")]
pub async fn home(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let user = auth::current_user(&session, &mut conn)?;

    if user.is_none() {
        let page = app_state
            .cache
            .fetch("/", || render_home(&app_state.templates, &mut conn, None, &[]))?;
        return Ok(cache::respond(&req, page));
    }

    let flashes = auth::take_flashes(&session)?;
    let body = render_home(&app_state.templates, &mut conn, user.as_ref(), &flashes)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Static page, cached with an ETag like the front page.
/// - url: `{domain}/about`
#[get("/about")]
pub async fn about(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    static_page(req, session, app_state, "/about", "about.html").await
}

/// Static page, cached with an ETag like the front page.
/// - url: `{domain}/contact`
#[get("/contact")]
pub async fn contact(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    static_page(req, session, app_state, "/contact", "contact.html").await
}

async fn static_page(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
    route: &str,
    template: &str,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let user = auth::current_user(&session, &mut conn)?;

    if user.is_none() {
        let page = app_state.cache.fetch(route, || {
            Ok(app_state.templates.render(template, &page_context(None, &[]))?)
        })?;
        return Ok(cache::respond(&req, page));
    }

    let flashes = auth::take_flashes(&session)?;
    let body = app_state
        .templates
        .render(template, &page_context(user.as_ref(), &flashes))?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Records the visitor's cookie-consent choice.
/// - url: `{domain}/set-cookie-consent`
#[get("/set-cookie-consent")]
pub async fn set_cookie_consent() -> HttpResponse {
    let cookie = Cookie::build("cookie_consent", "true")
        .path("/")
        .max_age(Duration::seconds(60))
        .finish();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Cookie consent set" }))
}

/// Drops every memoized page; handy after editing content.
/// - url: `{domain}/clear-cache`
#[get("/clear-cache")]
pub async fn clear_cache(app_state: Data<AppState>) -> HttpResponse {
    app_state.cache.clear();
    HttpResponse::Ok().json(json!({ "message": "Cache cleared" }))
}

/// Development aid: what the signed session currently holds.
/// - url: `{domain}/debug-session`
#[get("/debug-session")]
pub async fn debug_session(session: Session) -> Result<HttpResponse, AppError> {
    let user_id = session.get::<i32>(auth::USER_ID_KEY)?;
    let flashes = session
        .get::<Vec<Flash>>(auth::FLASHES_KEY)?
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id,
        "flashes": flashes,
    })))
}
