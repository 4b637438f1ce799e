pub mod token;

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::cookie::Key;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use diesel::SqliteConnection;
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};

use crate::{app::AppError, config::Config, database::models::user::User};

pub const USER_ID_KEY: &str = "user_id";
pub const FLASHES_KEY: &str = "flashes";
pub const CSRF_KEY: &str = "csrf_token";

/// Signed cookie sessions. Not marked secure so plain-http development
/// setups work.
pub fn session_middleware(config: &Config) -> SessionMiddleware<CookieSessionStore> {
    let key = Key::derive_from(config.secret_key.as_bytes());
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".to_string())
        .cookie_secure(false)
        .build()
}

/// Binds the session to a freshly authenticated user.
pub fn login(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session.insert(USER_ID_KEY, user.id)?;
    Ok(())
}

pub fn logout(session: &Session) {
    session.purge();
}

/// The logged-in user, if the session points at a live account.
pub fn current_user(
    session: &Session,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, AppError> {
    let Some(user_id) = session.get::<i32>(USER_ID_KEY)? else {
        return Ok(None);
    };

    match User::find_by_id(conn, user_id) {
        Ok(user) => Ok(Some(user)),
        Err(_) => {
            // The account is gone; the stale cookie must not linger.
            session.purge();
            Ok(None)
        }
    }
}

/// Gate for the post-mutation routes. Anonymous callers get the same
/// Forbidden as authenticated non-admins.
pub fn require_admin(session: &Session, conn: &mut SqliteConnection) -> Result<User, AppError> {
    match current_user(session, conn)? {
        Some(user) if user.is_admin => Ok(user),
        _ => Err(AppError::Forbidden),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

/// Queues a one-shot message for the next rendered page.
pub fn flash(session: &Session, level: &str, message: &str) -> Result<(), AppError> {
    let mut flashes = session.get::<Vec<Flash>>(FLASHES_KEY)?.unwrap_or_default();
    flashes.push(Flash {
        level: level.to_string(),
        message: message.to_string(),
    });
    session.insert(FLASHES_KEY, flashes)?;
    Ok(())
}

/// Drains the pending flashes for display.
pub fn take_flashes(session: &Session) -> Result<Vec<Flash>, AppError> {
    let flashes = session.get::<Vec<Flash>>(FLASHES_KEY)?.unwrap_or_default();
    if !flashes.is_empty() {
        session.remove(FLASHES_KEY);
    }
    Ok(flashes)
}

/// Returns the session's CSRF token, minting one on first use.
pub fn csrf_token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = session.get::<String>(CSRF_KEY)? {
        return Ok(token);
    }
    let token = Alphanumeric.sample_string(&mut rand::thread_rng(), 32);
    session.insert(CSRF_KEY, &token)?;
    Ok(token)
}

/// Every mutating form post has to echo the session token back.
pub fn verify_csrf(session: &Session, submitted: &str) -> Result<(), AppError> {
    match session.get::<String>(CSRF_KEY)? {
        Some(expected) if expected == submitted => Ok(()),
        _ => Err(AppError::BadRequest),
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::InternalServerError)
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("test_password123").unwrap();
        assert!(hash != "test_password123");
        assert!(verify_password(&hash, "test_password123"));
        assert!(!verify_password(&hash, "wrong_password"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("test_password123").unwrap();
        let second = hash_password("test_password123").unwrap();
        assert!(first != second);
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_password("not-a-hash", "test_password123"));
    }
}
