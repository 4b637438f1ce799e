use actix_session::Session;
use actix_web::{
    get,
    http::header::ContentType,
    post,
    web::{Data, Form},
    HttpRequest, HttpResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    app::{AppError, AppState},
    auth,
    database::models::{comment::Comment, post::Post, user::User},
    forms::{self, CommentForm, PostForm},
};

use super::{page_context, redirect};

/// Pipe for showing a single post with its comments
/// - url: `{domain}/post/{post_id}`
#[get("/post/{post_id}")]
pub async fn show_post(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = req.match_info().query("post_id").parse::<i32>()?;

    let mut conn = app_state.db()?;
    let post = Post::find(&mut conn, post_id).ok_or(AppError::NotFound)?;
    let author = User::find_by_id(&mut conn, post.author_id)?;

    let comments: Vec<_> = Comment::for_post(&mut conn, post.id)?
        .into_iter()
        .map(|(comment, commenter)| {
            json!({
                "text": comment.text,
                "author_name": commenter.name,
                "avatar": commenter.gravatar_url(),
            })
        })
        .collect();

    let user = auth::current_user(&session, &mut conn)?;
    let flashes = auth::take_flashes(&session)?;
    let mut ctx = page_context(user.as_ref(), &flashes);
    ctx.insert(
        "post",
        &json!({
            "id": post.id,
            "title": post.title,
            "subtitle": post.subtitle,
            "body": post.body,
            "img_url": post.img_url,
            "date": post.date,
            "author_name": author.name,
        }),
    );
    ctx.insert("comments", &comments);
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("post.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for commenting on a post
/// - url: `{domain}/post/{post_id}`
///
/// # Response
/// - anonymous callers are flashed and redirected to `/login`
/// - otherwise the comment lands under the post and the user is sent back
///   to it
#[post("/post/{post_id}")]
pub async fn add_comment(
    req: HttpRequest,
    session: Session,
    form: Form<CommentForm>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = req.match_info().query("post_id").parse::<i32>()?;
    let form = form.into_inner();
    auth::verify_csrf(&session, &form.csrf_token)?;

    let mut conn = app_state.db()?;
    let post = Post::find(&mut conn, post_id).ok_or(AppError::NotFound)?;

    let Some(user) = auth::current_user(&session, &mut conn)? else {
        auth::flash(&session, "info", "You need to be logged in to make a comment!")?;
        return Ok(redirect("/login"));
    };

    if let Err(errors) = form.validate() {
        for message in forms::error_messages(&errors) {
            auth::flash(&session, "danger", &message)?;
        }
        return Ok(redirect(&format!("/post/{}", post.id)));
    }

    Comment::new(&mut conn, &post, &user, &form.body)?;
    Ok(redirect(&format!("/post/{}", post.id)))
}

/// Pipe for the new-post form, admin only
/// - url: `{domain}/new-post`
#[get("/new-post")]
pub async fn new_post_page(
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let admin = auth::require_admin(&session, &mut conn)?;

    let flashes = auth::take_flashes(&session)?;
    let mut ctx = page_context(Some(&admin), &flashes);
    ctx.insert("is_edit", &false);
    ctx.insert(
        "post",
        &json!({ "id": 0, "title": "", "subtitle": "", "img_url": "", "body": "" }),
    );
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("make-post.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for creating a post, admin only
/// - url: `{domain}/new-post`
#[post("/new-post")]
pub async fn create_post(
    session: Session,
    form: Form<PostForm>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let admin = auth::require_admin(&session, &mut conn)?;

    let form = form.into_inner();
    auth::verify_csrf(&session, &form.csrf_token)?;

    if let Err(errors) = form.validate() {
        for message in forms::error_messages(&errors) {
            auth::flash(&session, "danger", &message)?;
        }
        return Ok(redirect("/new-post"));
    }

    Post::new(
        &mut conn,
        &admin,
        &form.title,
        &form.subtitle,
        &form.body,
        &form.img_url,
    )?;

    Ok(redirect("/"))
}

/// Pipe for the edit-post form, admin only
/// - url: `{domain}/edit-post/{post_id}`
#[get("/edit-post/{post_id}")]
pub async fn edit_post_page(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let admin = auth::require_admin(&session, &mut conn)?;

    let post_id = req.match_info().query("post_id").parse::<i32>()?;
    let post = Post::find(&mut conn, post_id).ok_or(AppError::NotFound)?;

    let flashes = auth::take_flashes(&session)?;
    let mut ctx = page_context(Some(&admin), &flashes);
    ctx.insert("is_edit", &true);
    ctx.insert(
        "post",
        &json!({
            "id": post.id,
            "title": post.title,
            "subtitle": post.subtitle,
            "img_url": post.img_url,
            "body": post.body,
        }),
    );
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("make-post.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for editing a post, admin only
/// - url: `{domain}/edit-post/{post_id}`
#[post("/edit-post/{post_id}")]
pub async fn update_post(
    req: HttpRequest,
    session: Session,
    form: Form<PostForm>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    auth::require_admin(&session, &mut conn)?;

    let post_id = req.match_info().query("post_id").parse::<i32>()?;
    let form = form.into_inner();
    auth::verify_csrf(&session, &form.csrf_token)?;

    let mut post = Post::find(&mut conn, post_id).ok_or(AppError::NotFound)?;

    if let Err(errors) = form.validate() {
        for message in forms::error_messages(&errors) {
            auth::flash(&session, "danger", &message)?;
        }
        return Ok(redirect(&format!("/edit-post/{}", post.id)));
    }

    post.update(
        &mut conn,
        &form.title,
        &form.subtitle,
        &form.body,
        &form.img_url,
    )?;

    Ok(redirect(&format!("/post/{}", post.id)))
}

/// Pipe for deleting a post and its comments, admin only
/// - url: `{domain}/delete/{post_id}`
#[get("/delete/{post_id}")]
pub async fn delete_post(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    auth::require_admin(&session, &mut conn)?;

    let post_id = req.match_info().query("post_id").parse::<i32>()?;
    Post::find(&mut conn, post_id).ok_or(AppError::NotFound)?;
    Post::delete(&mut conn, post_id)?;

    Ok(redirect("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::http::header;
    use actix_web::test::{self, call_service};
    use actix_web::App;
    use pretty_assertions::assert_eq;

    use crate::app::test_utils::{csrf_token_from, seed_user, session_cookie, test_state};
    use crate::auth::session_middleware;

    macro_rules! post_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new($state.clone()))
                    .wrap(session_middleware(&$state.config))
                    .service(crate::routes::account::login_page)
                    .service(crate::routes::account::login)
                    .service(super::show_post)
                    .service(super::add_comment)
                    .service(super::new_post_page)
                    .service(super::create_post)
                    .service(super::edit_post_page)
                    .service(super::update_post)
                    .service(super::delete_post),
            )
            .await
        };
    }

    /// Runs the login flow and hands back the authenticated session cookie
    /// together with the session's CSRF token.
    macro_rules! log_in {
        ($app:expr, $email:expr, $password:expr) => {{
            let req = test::TestRequest::get().uri("/login").to_request();
            let resp = call_service(&$app, req).await;
            let cookie = session_cookie(&resp).unwrap();
            let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
            let csrf = csrf_token_from(&body);

            let req = test::TestRequest::post()
                .uri("/login")
                .cookie(cookie)
                .set_form(&[
                    ("email", $email),
                    ("password", $password),
                    ("csrf_token", csrf.as_str()),
                ])
                .to_request();
            let resp = call_service(&$app, req).await;
            assert_eq!(resp.status().as_u16(), 302);
            let cookie: Cookie<'static> = session_cookie(&resp).unwrap();
            (cookie, csrf)
        }};
    }

    #[actix_rt::test]
    async fn the_admin_can_publish_a_post() {
        let (state, _) = test_state();
        seed_user(&state, "admin@example.com", "test_password123", true, true);
        let app = post_app!(state);

        let (cookie, csrf) = log_in!(app, "admin@example.com", "test_password123");

        let req = test::TestRequest::post()
            .uri("/new-post")
            .cookie(cookie)
            .set_form(&[
                ("title", "A fresh post"),
                ("subtitle", "with a subtitle"),
                ("img_url", "http://img.example.com/cover.png"),
                ("body", "<p>Hello readers</p>"),
                ("csrf_token", csrf.as_str()),
            ])
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            "/"
        );

        let mut conn = state.pool.get().unwrap();
        let posts = Post::all_with_authors(&mut conn).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0.title, "A fresh post");
    }

    #[actix_rt::test]
    async fn non_admins_are_forbidden_from_post_mutation() {
        let (state, _) = test_state();
        seed_user(&state, "admin@example.com", "test_password123", true, true);
        seed_user(&state, "reader@example.com", "test_password123", true, false);
        let app = post_app!(state);

        let (cookie, csrf) = log_in!(app, "reader@example.com", "test_password123");

        let req = test::TestRequest::get()
            .uri("/new-post")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(call_service(&app, req).await.status().as_u16(), 403);

        let req = test::TestRequest::post()
            .uri("/new-post")
            .cookie(cookie.clone())
            .set_form(&[
                ("title", "Sneaky"),
                ("subtitle", "sub"),
                ("img_url", "http://img.example.com/x.png"),
                ("body", "body"),
                ("csrf_token", csrf.as_str()),
            ])
            .to_request();
        assert_eq!(call_service(&app, req).await.status().as_u16(), 403);

        let req = test::TestRequest::get()
            .uri("/delete/1")
            .cookie(cookie)
            .to_request();
        assert_eq!(call_service(&app, req).await.status().as_u16(), 403);
    }

    #[actix_rt::test]
    async fn anonymous_callers_are_forbidden_from_post_mutation() {
        let (state, _) = test_state();
        let app = post_app!(state);

        let req = test::TestRequest::get().uri("/new-post").to_request();
        assert_eq!(call_service(&app, req).await.status().as_u16(), 403);
    }

    #[actix_rt::test]
    async fn editing_rewrites_the_post_in_place() {
        let (state, _) = test_state();
        let admin = seed_user(&state, "admin@example.com", "test_password123", true, true);
        let post = {
            let mut conn = state.pool.get().unwrap();
            Post::new(&mut conn, &admin, "Old title", "old sub", "old body", "").unwrap()
        };
        let app = post_app!(state);

        let (cookie, csrf) = log_in!(app, "admin@example.com", "test_password123");

        let req = test::TestRequest::post()
            .uri(&format!("/edit-post/{}", post.id))
            .cookie(cookie)
            .set_form(&[
                ("title", "New title"),
                ("subtitle", "new sub"),
                ("img_url", "http://img.example.com/x.png"),
                ("body", "new body"),
                ("csrf_token", csrf.as_str()),
            ])
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            format!("/post/{}", post.id)
        );

        let mut conn = state.pool.get().unwrap();
        let reloaded = Post::find(&mut conn, post.id).unwrap();
        assert_eq!(reloaded.title, "New title");
        assert_eq!(reloaded.date, post.date);
    }

    #[actix_rt::test]
    async fn deleting_a_post_takes_its_comments_along() {
        let (state, _) = test_state();
        let admin = seed_user(&state, "admin@example.com", "test_password123", true, true);
        let post = {
            let mut conn = state.pool.get().unwrap();
            let post = Post::new(&mut conn, &admin, "Title", "sub", "body", "").unwrap();
            Comment::new(&mut conn, &post, &admin, "first!").unwrap();
            post
        };
        let app = post_app!(state);

        let (cookie, _) = log_in!(app, "admin@example.com", "test_password123");

        let req = test::TestRequest::get()
            .uri(&format!("/delete/{}", post.id))
            .cookie(cookie)
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 302);

        let mut conn = state.pool.get().unwrap();
        assert!(Post::find(&mut conn, post.id).is_none());
        assert!(Comment::for_post(&mut conn, post.id).unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn commenting_requires_a_login() {
        let (state, _) = test_state();
        let admin = seed_user(&state, "admin@example.com", "test_password123", true, true);
        let post = {
            let mut conn = state.pool.get().unwrap();
            Post::new(&mut conn, &admin, "Title", "sub", "body", "").unwrap()
        };
        let app = post_app!(state);

        // The login form mints a CSRF token even for anonymous sessions.
        let req = test::TestRequest::get().uri("/login").to_request();
        let resp = call_service(&app, req).await;
        let cookie = session_cookie(&resp).unwrap();
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        let csrf = csrf_token_from(&body);

        let req = test::TestRequest::post()
            .uri(&format!("/post/{}", post.id))
            .cookie(cookie)
            .set_form(&[("body", "drive-by comment"), ("csrf_token", csrf.as_str())])
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            "/login"
        );

        let mut conn = state.pool.get().unwrap();
        assert!(Comment::for_post(&mut conn, post.id).unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn a_logged_in_reader_can_comment() {
        let (state, _) = test_state();
        let admin = seed_user(&state, "admin@example.com", "test_password123", true, true);
        seed_user(&state, "reader@example.com", "test_password123", true, false);
        let post = {
            let mut conn = state.pool.get().unwrap();
            Post::new(&mut conn, &admin, "Title", "sub", "body", "").unwrap()
        };
        let app = post_app!(state);

        let (cookie, csrf) = log_in!(app, "reader@example.com", "test_password123");

        let req = test::TestRequest::post()
            .uri(&format!("/post/{}", post.id))
            .cookie(cookie)
            .set_form(&[("body", "lovely read"), ("csrf_token", csrf.as_str())])
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            format!("/post/{}", post.id)
        );

        let mut conn = state.pool.get().unwrap();
        let comments = Comment::for_post(&mut conn, post.id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0.text, "lovely read");
        assert_eq!(comments[0].1.email, "reader@example.com");
    }

    #[actix_rt::test]
    async fn a_missing_post_is_a_404() {
        let (state, _) = test_state();
        let app = post_app!(state);

        let req = test::TestRequest::get().uri("/post/999").to_request();
        assert_eq!(call_service(&app, req).await.status().as_u16(), 404);
    }
}
