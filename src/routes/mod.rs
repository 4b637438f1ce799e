pub mod account;
pub mod pages;
pub mod post;
pub mod recommend;

use actix_session::Session;
use actix_web::http::header;
use actix_web::HttpResponse;
use chrono::Datelike;
use diesel::SqliteConnection;
use tera::Context;

use crate::{
    app::AppError,
    auth::{self, Flash},
    database::models::user::User,
};

/// Context every page starts from: footer year and navbar state.
pub(crate) fn page_context(user: Option<&User>, flashes: &[Flash]) -> Context {
    let mut ctx = Context::new();
    ctx.insert("year", &chrono::Utc::now().year());
    ctx.insert("logged_in", &user.is_some());
    ctx.insert("is_admin", &user.map_or(false, |u| u.is_admin));
    ctx.insert("user_name", &user.map(|u| u.name.clone()).unwrap_or_default());
    ctx.insert("flashes", flashes);
    ctx
}

/// Same, resolved from the live session (drains pending flashes).
pub(crate) fn session_context(
    session: &Session,
    conn: &mut SqliteConnection,
) -> Result<(Context, Option<User>), AppError> {
    let user = auth::current_user(session, conn)?;
    let flashes = auth::take_flashes(session)?;
    Ok((page_context(user.as_ref(), &flashes), user))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}
