use std::{fmt::Display, num::ParseIntError, sync::Arc, time::Duration};

use actix_web::{HttpResponse, ResponseError};
use tera::Tera;

use crate::{
    cache::PageCache,
    config::Config,
    database::db_utils::{self, DbConn, DbPool},
    outbound::{Delivery, SmtpFtpDelivery},
};

/** Used for storing the shared resources when handling requests */
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub templates: Arc<Tera>,
    pub cache: PageCache,
    pub delivery: Arc<dyn Delivery>,
    pub config: Arc<Config>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            templates: self.templates.clone(),
            cache: self.cache.clone(),
            delivery: self.delivery.clone(),
            config: self.config.clone(),
        }
    }
}

impl AppState {
    /// Wires the shared resources from configuration. `database_url`
    /// overrides the configured store so tests can hand in a throwaway
    /// file.
    pub fn new(database_url: Option<&str>) -> AppState {
        let config = Arc::new(Config::from_env());
        let pool = db_utils::connect_to_db(database_url.unwrap_or(&config.database_url));
        db_utils::init_db(&pool).expect("failed to create the database tables");

        AppState {
            pool,
            templates: Arc::new(load_templates()),
            cache: PageCache::new(Duration::from_secs(config.cache_ttl_secs)),
            delivery: Arc::new(SmtpFtpDelivery::new(config.clone())),
            config,
        }
    }

    /// One pooled connection, mapped onto the request error space.
    pub fn db(&self) -> Result<DbConn, AppError> {
        self.pool.get().map_err(|_| AppError::InternalServerError)
    }
}

pub fn load_templates() -> Tera {
    Tera::new("templates/**/*.html").expect("template directory failed to parse")
}

/** Holds the errors we will use during request processing */
#[derive(Debug)]
pub enum AppError {
    InternalServerError,
    BadRequest,
    Forbidden,
    NotFound,
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InternalServerError => f.write_str("Internal server error"),
            AppError::BadRequest => f.write_str("Bad request"),
            AppError::Forbidden => f.write_str("Forbidden"),
            AppError::NotFound => f.write_str("Not found"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            AppError::InternalServerError => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest => actix_web::http::StatusCode::BAD_REQUEST,
            AppError::Forbidden => actix_web::http::StatusCode::FORBIDDEN,
            AppError::NotFound => actix_web::http::StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::new(self.status_code())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => AppError::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => AppError::BadRequest,
            _ => AppError::InternalServerError,
        }
    }
}
impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        log::error!("template rendering failed: {}", err);
        AppError::InternalServerError
    }
}
impl From<actix_session::SessionGetError> for AppError {
    fn from(_: actix_session::SessionGetError) -> Self {
        AppError::InternalServerError
    }
}
impl From<actix_session::SessionInsertError> for AppError {
    fn from(_: actix_session::SessionInsertError) -> Self {
        AppError::InternalServerError
    }
}
impl From<actix_multipart::MultipartError> for AppError {
    fn from(_: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest
    }
}
impl From<ParseIntError> for AppError {
    fn from(_: ParseIntError) -> Self {
        Self::BadRequest
    }
}
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => AppError::InternalServerError,
            _ => AppError::BadRequest,
        }
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::BadRequest,
            _ => AppError::InternalServerError,
        }
    }
}

impl std::error::Error for AppError {}
