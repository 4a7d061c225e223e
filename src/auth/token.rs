use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, crypto, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

pub const TOKEN_ISSUER: &str = "postline";
pub const TOKEN_SUBJECT: &str = "accessToken";

/// Claims
///
/// Payload carried inside every access token. Timestamps are epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub sub: String,
}

/// DecodedToken
///
/// The identity recovered from a token that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub user_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// TokenError
///
/// Verification failures are kept distinct so they can be logged and tested
/// individually, even though every one of them becomes a 401 for the client.
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token is expired or not yet valid")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token is invalid: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// TokenService
///
/// Issues and verifies HS256-signed access tokens. The secret and lifetime are
/// fixed at construction; the service holds no mutable state.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.session_secret_key, config.session_expire_time)
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    /// issue_at
    ///
    /// Issues a token as if the current time were `now` (epoch seconds).
    pub fn issue_at(&self, user_id: &str, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            iat: now,
            exp: now + self.lifetime_secs,
            iss: TOKEN_ISSUER.to_string(),
            sub: TOKEN_SUBJECT.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<DecodedToken, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// verify_at
    ///
    /// Checks the MAC over `header.payload` first, so any altered byte of a
    /// well-formed token is a `BadSignature`. Then checks issuer and subject,
    /// and requires `iat <= now < exp`. A token whose `exp` equals `now` is
    /// expired.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<DecodedToken, TokenError> {
        let (signing_input, signature) = split_token(token)?;
        let expected = crypto::sign(signing_input.as_bytes(), &self.encoding_key, Algorithm::HS256)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(TokenError::BadSignature);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Timestamps are checked below with exact boundaries and no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.sub = Some(TOKEN_SUBJECT.to_string());

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if claims.iat > now || now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.user_id.is_empty() {
            return Err(TokenError::Invalid("empty user id".to_string()));
        }

        Ok(DecodedToken {
            user_id: claims.user_id,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Splits a compact token into its signing input and signature. Anything that
/// is not three non-empty base64url segments is `Malformed`.
fn split_token(token: &str) -> Result<(&str, &str), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let well_formed = segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        });
    if !well_formed {
        return Err(TokenError::Malformed);
    }

    let split_at = token.len() - segments[2].len() - 1;
    Ok((&token[..split_at], segments[2]))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
