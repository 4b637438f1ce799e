use jwt_simple::JWTError;
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::app::AppError;

/// Verification links stay valid for an hour.
const TOKEN_MAX_AGE_SECS: u64 = 3600;

#[derive(Serialize, Deserialize)]
struct EmailClaims {
    email: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Signs and checks the time-limited email-ownership proofs embedded in
/// verification links.
pub struct VerificationToken {
    key: HS256Key,
}

impl VerificationToken {
    pub fn new(secret: &str) -> VerificationToken {
        VerificationToken {
            key: HS256Key::from_bytes(secret.as_bytes()),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, AppError> {
        let claims = Claims::with_custom_claims(
            EmailClaims {
                email: email.to_string(),
            },
            Duration::from_secs(TOKEN_MAX_AGE_SECS),
        );
        self.key
            .authenticate(claims)
            .map_err(|_| AppError::InternalServerError)
    }

    /// Returns the verified email address, or why the token is unusable.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        match self.key.verify_token::<EmailClaims>(token, None) {
            Ok(claims) => Ok(claims.custom.email),
            Err(err) => match err.downcast_ref::<JWTError>() {
                Some(JWTError::TokenHasExpired) => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "unit-test-secret-key-0123456789abcdef";

    #[test]
    fn issue_and_verify_round_trip() {
        let tokens = VerificationToken::new(SECRET);
        let token = tokens.issue("reader@example.com").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "reader@example.com");
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let tokens = VerificationToken::new(SECRET);

        let mut token = tokens.issue("reader@example.com").unwrap();
        token.push('x');
        assert_eq!(tokens.verify(&token), Err(TokenError::Invalid));
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Invalid));

        let foreign = VerificationToken::new("another-secret-key-0123456789abcdef")
            .issue("reader@example.com")
            .unwrap();
        assert_eq!(tokens.verify(&foreign), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let tokens = VerificationToken::new(SECRET);

        // Backdated past the verifier's clock tolerance.
        let mut claims = Claims::with_custom_claims(
            EmailClaims {
                email: "reader@example.com".to_string(),
            },
            Duration::from_secs(TOKEN_MAX_AGE_SECS),
        );
        claims.expires_at = Some(Clock::now_since_epoch() - Duration::from_hours(2));

        let token = tokens.key.authenticate(claims).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }
}
