use actix_session::Session;
use actix_web::{
    get,
    http::header::ContentType,
    post,
    web::{self, Data, Form},
    HttpRequest, HttpResponse,
};
use validator::Validate;

use crate::{
    app::{AppError, AppState},
    auth::{self, token::TokenError, token::VerificationToken},
    database::models::user::User,
    forms::{self, LoginForm, RegisterForm},
};

use super::{redirect, session_context};

/// Pipe for showing the registration form
/// - url: `{domain}/register`
#[get("/register")]
pub async fn register_page(
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let (mut ctx, _user) = session_context(&session, &mut conn)?;
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("register.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for creating an account
/// - url: `{domain}/register`
///
/// # Response
/// - duplicate email: flash and redirect to `/login`
/// - otherwise the account is created unverified and a verification link
///   goes out by email; the first account on a fresh database becomes the
///   blog's admin
#[post("/register")]
pub async fn register(
    session: Session,
    form: Form<RegisterForm>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    auth::verify_csrf(&session, &form.csrf_token)?;

    if let Err(errors) = form.validate() {
        for message in forms::error_messages(&errors) {
            auth::flash(&session, "danger", &message)?;
        }
        return Ok(redirect("/register"));
    }

    let mut conn = app_state.db()?;
    if User::find_by_email(&mut conn, &form.email).is_some() {
        auth::flash(&session, "info", "Email already registered! Please log in.")?;
        return Ok(redirect("/login"));
    }

    let password_hash = auth::hash_password(&form.password)?;
    let admin = User::count(&mut conn)? == 0;
    let user = User::new(&mut conn, &form.email, &password_hash, &form.name, admin)?;

    let token = VerificationToken::new(&app_state.config.secret_key).issue(&user.email)?;
    let link = format!("{}/verify/{}", app_state.config.base_url, token);
    let html = format!(
        "<p>Thanks for registering! Click the link below to verify your account:</p>\
         <p><a href='{link}'>{link}</a></p>\
         <p>If you did not sign up, you can ignore this email.</p>"
    );

    let delivery = app_state.delivery.clone();
    let to = user.email.clone();
    match web::block(move || delivery.send_mail(&to, "Verify your blog account", &html)).await {
        Ok(Ok(())) => {
            auth::flash(
                &session,
                "info",
                "Registration successful! Check your email to verify your account.",
            )?;
        }
        Ok(Err(err)) => {
            log::error!("verification mail to {} failed: {}", user.email, err);
            auth::flash(
                &session,
                "warning",
                "We could not send the verification email. Please try again later.",
            )?;
        }
        Err(_) => return Err(AppError::InternalServerError),
    }

    Ok(redirect("/login"))
}

/// Pipe for consuming a verification link
/// - url: `{domain}/verify/{token}`
///
/// # Response
/// - expired token: flash and redirect to `/register`
/// - tampered token: a distinct flash and redirect to `/register`
/// - unknown email: 404
/// - otherwise the account is marked verified and the user is sent to
///   `/login`
#[get("/verify/{token}")]
pub async fn verify_email(
    req: HttpRequest,
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = req.match_info().query("token").to_string();

    let email = match VerificationToken::new(&app_state.config.secret_key).verify(&token) {
        Ok(email) => email,
        Err(TokenError::Expired) => {
            auth::flash(
                &session,
                "danger",
                "The verification link has expired. Please register again.",
            )?;
            return Ok(redirect("/register"));
        }
        Err(TokenError::Invalid) => {
            auth::flash(&session, "danger", "The verification link is not valid.")?;
            return Ok(redirect("/register"));
        }
    };

    let mut conn = app_state.db()?;
    let mut user = User::find_by_email(&mut conn, &email).ok_or(AppError::NotFound)?;

    if user.is_verified {
        auth::flash(&session, "info", "Account already verified. Please log in.")?;
    } else {
        user.mark_verified(&mut conn)?;
        auth::flash(
            &session,
            "success",
            "Your account has been verified! Please log in.",
        )?;
    }

    Ok(redirect("/login"))
}

/// Pipe for showing the login form
/// - url: `{domain}/login`
#[get("/login")]
pub async fn login_page(
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let (mut ctx, _user) = session_context(&session, &mut conn)?;
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("login.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for logging in
/// - url: `{domain}/login`
///
/// # Response
/// - unknown email, wrong password or unverified account: flash and
///   redirect back to `/login`; no session is granted
/// - success: renewed session bound to the user, redirect to `/`
#[post("/login")]
pub async fn login(
    session: Session,
    form: Form<LoginForm>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    auth::verify_csrf(&session, &form.csrf_token)?;

    if let Err(errors) = form.validate() {
        for message in forms::error_messages(&errors) {
            auth::flash(&session, "danger", &message)?;
        }
        return Ok(redirect("/login"));
    }

    let mut conn = app_state.db()?;
    let Some(user) = User::find_by_email(&mut conn, &form.email) else {
        auth::flash(&session, "danger", "That email is not registered.")?;
        return Ok(redirect("/login"));
    };

    if !auth::verify_password(&user.password, &form.password) {
        auth::flash(&session, "danger", "Wrong password, please try again.")?;
        return Ok(redirect("/login"));
    }

    if !user.is_verified {
        auth::flash(
            &session,
            "warning",
            "Your account has not been verified. Please check your email.",
        )?;
        return Ok(redirect("/login"));
    }

    auth::login(&session, &user)?;
    Ok(redirect("/"))
}

/// Pipe for logging out
/// - url: `{domain}/logout`
#[get("/logout")]
pub async fn logout(session: Session) -> HttpResponse {
    auth::logout(&session);
    redirect("/")
}
