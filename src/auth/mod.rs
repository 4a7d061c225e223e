//! Identity and access control: password policy, access tokens, credential
//! transport and the session guard middleware.

pub mod credentials;
pub mod guard;
pub mod password;
pub mod token;

pub use credentials::{AUTH_COOKIE_NAME, TokenLocation, extract_credential};
pub use guard::{AuthUser, GuardMode, SessionError, csrf_guard, optional_auth, require_auth};
pub use token::{TokenError, TokenService};
