use axum::http::{HeaderMap, header};

/// Name of the HttpOnly session cookie set on login.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Where a credential was found on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLocation {
    Cookie,
    BearerHeader,
    TokenHeader,
}

/// extract_credential
///
/// Looks for a credential in priority order: the `auth_token` cookie, an
/// `Authorization: Bearer <token>` header, then a legacy
/// `Authorization: token <token>` header. Scheme names are case-insensitive.
/// Returns `None` when nothing usable is present.
pub fn extract_credential(headers: &HeaderMap) -> Option<(String, TokenLocation)> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some((token, TokenLocation::Cookie));
    }

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;
    let (scheme, token) = authorization.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if scheme.eq_ignore_ascii_case("bearer") {
        Some((token.to_string(), TokenLocation::BearerHeader))
    } else if scheme.eq_ignore_ascii_case("token") {
        Some((token.to_string(), TokenLocation::TokenHeader))
    } else {
        None
    }
}

/// get_cookie
///
/// Returns the first non-empty value of cookie `name` across every `Cookie`
/// header on the request.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// session_cookie
///
/// Builds the `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE_NAME}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
