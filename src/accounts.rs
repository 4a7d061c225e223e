//! Login and registration use cases, plus the root team that holds the
//! signup token gating registration.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    AppState,
    audit::AuditRecord,
    auth::{
        password::{self, PasswordError},
        token::TokenError,
    },
    ids::{IdType, new_id},
    models::{LoginRequest, RegisterRequest, Team, User},
    repository::{Repository, StoreError},
};

pub const LOGIN_TYPE_NORMAL: &str = "normal";
pub const ROOT_TEAM_ID: &str = "0";

/// AuthError
///
/// Outcomes of the login and registration use cases.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid login type")]
    InvalidLoginType,
    // Covers unknown users and wrong passwords alike.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidInput(String),
    #[error("The username already exists")]
    UsernameTaken,
    #[error("The email already exists")]
    EmailTaken,
    #[error(transparent)]
    InvalidPassword(#[from] PasswordError),
    #[error("invalid token")]
    InvalidSignupToken,
    #[error("registration requires a signup token")]
    SignupTokenRequired,
    #[error("unable to issue access token: {0}")]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// login
///
/// Looks the account up by username, falling back to email, verifies the
/// password and issues an access token for it.
pub async fn login(state: &AppState, request: &LoginRequest) -> Result<String, AuthError> {
    if request.login_type != LOGIN_TYPE_NORMAL {
        return Err(AuthError::InvalidLoginType);
    }

    let audit = AuditRecord::new("login").meta("username", &request.username);

    let mut user = None;
    if !request.username.is_empty() {
        user = state.repo.get_user_by_username(&request.username).await?;
    }
    if user.is_none() && !request.email.is_empty() {
        user = state.repo.get_user_by_email(&request.email).await?;
    }

    let Some(user) = user else {
        state.audit.record(audit.fail());
        return Err(AuthError::InvalidCredentials);
    };

    if !password::verify(&user.password, &request.password) {
        tracing::debug!(user_id = %user.id, "Invalid password for user");
        state.audit.record(audit.user(&user.id).fail());
        return Err(AuthError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.id)?;
    state.audit.record(audit.user(&user.id).success());
    Ok(token)
}

/// register
///
/// Validates the request, rejects names already held by a live user and
/// applies the password policy. The user is then stored with a hashed
/// password, either against a matching signup token or, without one, only
/// as the very first live user.
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<User, AuthError> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();
    let audit = AuditRecord::new("register").meta("username", &username);

    let result = register_user(state, username, email, request.password, request.token).await;
    match &result {
        Ok(user) => state.audit.record(audit.user(&user.id).success()),
        Err(e) => state.audit.record(audit.fail().meta("reason", e)),
    }
    result
}

async fn register_user(
    state: &AppState,
    username: String,
    email: String,
    password: String,
    signup_token: Option<String>,
) -> Result<User, AuthError> {
    validate_register_input(&username, &email, &password)?;

    if state.repo.get_user_by_username(&username).await?.is_some() {
        return Err(AuthError::UsernameTaken);
    }
    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    password::validate(&password, &state.config.password_policy)?;

    let now = chrono::Utc::now().timestamp_millis();
    let user = User {
        id: new_id(IdType::User),
        username,
        email,
        password: password::hash(&password)?,
        auth_service: state.config.auth_mode.clone(),
        props: HashMap::new(),
        create_at: now,
        update_at: now,
        delete_at: 0,
    };

    // A concurrent registration can pass the lookups above; the unique
    // indexes decide who wins. Without a token, the store also decides
    // whether this is still the first user.
    let created = match signup_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => {
            check_signup_token(state.repo.as_ref(), token).await?;
            state.repo.create_user(&user).await.map(|()| true)
        }
        None => state.repo.create_first_user(&user).await,
    };

    match created {
        Ok(true) => Ok(user),
        Ok(false) => Err(AuthError::SignupTokenRequired),
        Err(StoreError::Conflict(constraint)) if constraint.contains("username") => {
            Err(AuthError::UsernameTaken)
        }
        Err(StoreError::Conflict(constraint)) if constraint.contains("email") => {
            Err(AuthError::EmailTaken)
        }
        Err(e) => Err(e.into()),
    }
}

fn validate_register_input(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is required".into()));
    }
    if email.is_empty() {
        return Err(AuthError::InvalidInput("email is required".into()));
    }
    if !is_email_valid(email) {
        return Err(AuthError::InvalidInput("invalid email format".into()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".into()));
    }
    Ok(())
}

/// check_signup_token
///
/// A supplied signup token must equal the root team's.
async fn check_signup_token(repo: &dyn Repository, token: &str) -> Result<(), AuthError> {
    let team = get_root_team(repo).await?;
    if team.signup_token != token {
        return Err(AuthError::InvalidSignupToken);
    }
    Ok(())
}

/// is_email_valid
///
/// Accepts `local@domain.tld` shapes: exactly one `@`, no whitespace, and a
/// domain made of non-empty dot-separated labels.
pub fn is_email_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// get_root_team
///
/// Returns the root team, creating it with a fresh signup token on first use.
pub async fn get_root_team(repo: &dyn Repository) -> Result<Team, StoreError> {
    if let Some(team) = repo.get_team(ROOT_TEAM_ID).await? {
        return Ok(team);
    }

    let team = Team {
        id: ROOT_TEAM_ID.to_string(),
        signup_token: new_id(IdType::Token),
        modified_by: String::new(),
        update_at: chrono::Utc::now().timestamp_millis(),
    };
    repo.upsert_team_signup_token(&team).await?;
    tracing::info!("initialized team");

    // Re-read so two first callers agree on whichever token was stored last.
    Ok(repo.get_team(ROOT_TEAM_ID).await?.unwrap_or(team))
}

/// regenerate_signup_token
///
/// Replaces the root team's signup token, recording who rotated it.
pub async fn regenerate_signup_token(
    repo: &dyn Repository,
    modified_by: &str,
) -> Result<Team, StoreError> {
    let team = Team {
        id: ROOT_TEAM_ID.to_string(),
        signup_token: new_id(IdType::Token),
        modified_by: modified_by.to_string(),
        update_at: chrono::Utc::now().timestamp_millis(),
    };
    repo.upsert_team_signup_token(&team).await?;
    tracing::info!(modified_by, "signup token regenerated");
    Ok(team)
}
