use std::path::Path;

use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{
    get,
    http::header::ContentType,
    post,
    web::{self, Data},
    HttpResponse,
};
use futures::{StreamExt as _, TryStreamExt};
use uuid::Uuid;

use crate::{
    app::{AppError, AppState},
    auth,
};

use super::{redirect, session_context};

const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "txt", "md"];

#[derive(Default)]
struct RecommendSubmission {
    title: String,
    notes: String,
    csrf_token: String,
    file_name: Option<String>,
    file_bytes: Vec<u8>,
}

async fn parse_submission(payload: &mut Multipart) -> Result<RecommendSubmission, AppError> {
    let mut submission = RecommendSubmission::default();

    while let Ok(Some(mut field)) = payload.try_next().await {
        let Some(name) = field.content_disposition().get_name().map(String::from) else {
            continue;
        };

        if name == "file" {
            submission.file_name = field.content_disposition().get_filename().map(String::from);
            submission.file_bytes.clear();
            while let Some(chunk) = field.next().await {
                submission.file_bytes.extend_from_slice(&chunk?);
            }
        } else {
            let mut value = Vec::new();
            while let Some(chunk) = field.next().await {
                value.extend_from_slice(&chunk?);
            }
            let value = String::from_utf8(value).map_err(|_| AppError::BadRequest)?;
            match name.as_str() {
                "title" => submission.title = value,
                "notes" => submission.notes = value,
                "csrf_token" => submission.csrf_token = value,
                _ => {}
            }
        }
    }

    Ok(submission)
}

fn allowed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
}

/// Pipe for the recommendation form, logged-in users only
/// - url: `{domain}/recommend`
#[get("/recommend")]
pub async fn recommend_page(
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    if auth::current_user(&session, &mut conn)?.is_none() {
        auth::flash(&session, "info", "Please log in to recommend a blog.")?;
        return Ok(redirect("/login"));
    }

    let (mut ctx, _user) = session_context(&session, &mut conn)?;
    ctx.insert("csrf_token", &auth::csrf_token(&session)?);

    let body = app_state.templates.render("recommend.html", &ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(body))
}

/// Pipe for submitting a recommendation, logged-in users only. The
/// multipart body carries `title`, `notes`, `csrf_token` and `file`.
/// - url: `{domain}/recommend`
///
/// # Response
/// An accepted file is stored once over FTP under a generated name and
/// announced to the admin with exactly one email. Missing files,
/// unsupported extensions and outbound failures are flashed; every
/// outcome redirects back to the form.
#[post("/recommend")]
pub async fn recommend(
    session: Session,
    mut payload: Multipart,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.db()?;
    let Some(user) = auth::current_user(&session, &mut conn)? else {
        auth::flash(&session, "info", "Please log in to recommend a blog.")?;
        return Ok(redirect("/login"));
    };

    let submission = parse_submission(&mut payload).await?;
    auth::verify_csrf(&session, &submission.csrf_token)?;

    let file_name = match submission.file_name {
        Some(ref name) if !name.is_empty() && !submission.file_bytes.is_empty() => name.clone(),
        _ => {
            auth::flash(&session, "danger", "Please attach a file.")?;
            return Ok(redirect("/recommend"));
        }
    };

    if !allowed_file(&file_name) {
        auth::flash(
            &session,
            "danger",
            "Unsupported file type. Allowed: pdf, doc, docx, txt, md.",
        )?;
        return Ok(redirect("/recommend"));
    }

    // Stored under a generated name so uploads cannot collide or smuggle a
    // path.
    let extension = Path::new(&file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let remote_name = format!("{}.{}", Uuid::new_v4(), extension);

    let delivery = app_state.delivery.clone();
    let stored_name = remote_name.clone();
    let bytes = submission.file_bytes;
    match web::block(move || delivery.store_file(&stored_name, &bytes)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            log::error!("recommendation upload failed: {}", err);
            auth::flash(
                &session,
                "danger",
                "We could not store your file. Please try again later.",
            )?;
            return Ok(redirect("/recommend"));
        }
        Err(_) => return Err(AppError::InternalServerError),
    }

    let html = format!(
        "<p>{} recommends a blog.</p>\
         <p><b>Title:</b> {}</p>\
         <p><b>Notes:</b> {}</p>\
         <p>The attached file was stored as {} (original name {}).</p>",
        user.email, submission.title, submission.notes, remote_name, file_name
    );
    let delivery = app_state.delivery.clone();
    let admin_email = app_state.config.admin_email.clone();
    match web::block(move || delivery.send_mail(&admin_email, "New blog recommendation", &html))
        .await
    {
        Ok(Ok(())) => {
            auth::flash(&session, "success", "Recommendation sent successfully!")?;
        }
        Ok(Err(err)) => {
            log::error!("recommendation mail failed: {}", err);
            auth::flash(
                &session,
                "warning",
                "Your file was stored, but the notification email failed.",
            )?;
        }
        Err(_) => return Err(AppError::InternalServerError),
    }

    Ok(redirect("/recommend"))
}
