//! Password strength policy and salted one-way hashing.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use thiserror::Error;

pub const PASSWORD_MAXIMUM_LENGTH: usize = 64;
pub const PASSWORD_SPECIAL_CHARS: &str = "!\"\\#$%&'()*+,-./:;<=>?@[]^_`|~";

// Argon2id work factor: 19 MiB memory, 2 passes, 1 lane.
const HASH_MEMORY_KIB: u32 = 19 * 1024;
const HASH_ITERATIONS: u32 = 2;
const HASH_PARALLELISM: u32 = 1;

/// PasswordPolicy
///
/// The maximum length is fixed at [`PASSWORD_MAXIMUM_LENGTH`]; the minimum
/// length and the required character classes are configurable.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordPolicy {
    pub minimum_length: usize,
    pub lowercase: bool,
    pub uppercase: bool,
    pub number: bool,
    pub symbol: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            minimum_length: 8,
            lowercase: false,
            uppercase: false,
            number: false,
            symbol: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    MaxLength,
    Lowercase,
    Uppercase,
    Number,
    Symbol,
}

impl PasswordRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordRule::MinLength => "min-length",
            PasswordRule::MaxLength => "max-length",
            PasswordRule::Lowercase => "lowercase",
            PasswordRule::Uppercase => "uppercase",
            PasswordRule::Number => "number",
            PasswordRule::Symbol => "symbol",
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid password, failing criteria: {}", join_rules(.failed_rules))]
    InvalidPassword { failed_rules: Vec<PasswordRule> },
    #[error("failed to hash password: {0}")]
    Hash(String),
}

fn join_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(PasswordRule::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// validate
///
/// Checks `password` against every rule of `policy` and reports all failures
/// together. Length is counted in characters.
pub fn validate(password: &str, policy: &PasswordPolicy) -> Result<(), PasswordError> {
    let mut failed_rules = Vec::new();
    let length = password.chars().count();

    if length < policy.minimum_length {
        failed_rules.push(PasswordRule::MinLength);
    }
    if length > PASSWORD_MAXIMUM_LENGTH {
        failed_rules.push(PasswordRule::MaxLength);
    }
    if policy.lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        failed_rules.push(PasswordRule::Lowercase);
    }
    if policy.uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        failed_rules.push(PasswordRule::Uppercase);
    }
    if policy.number && !password.chars().any(|c| c.is_ascii_digit()) {
        failed_rules.push(PasswordRule::Number);
    }
    if policy.symbol && !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        failed_rules.push(PasswordRule::Symbol);
    }

    if failed_rules.is_empty() {
        Ok(())
    } else {
        Err(PasswordError::InvalidPassword { failed_rules })
    }
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_PARALLELISM, None)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// hash
///
/// Produces a PHC-format Argon2id hash with a fresh random salt embedded, so
/// two calls with the same input never return the same string.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let hashed = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hashed.to_string())
}

/// verify
///
/// Returns false for an empty hash, an empty password, an unparsable hash or
/// a mismatch. Never errors.
pub fn verify(hash: &str, password: &str) -> bool {
    if hash.is_empty() || password.is_empty() {
        return false;
    }

    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match hasher() {
        Ok(argon) => argon.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}
