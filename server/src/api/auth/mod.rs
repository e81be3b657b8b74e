//! Session authentication: password hashing, JWT tokens, and the request
//! middleware

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{create_session_token, validate_session_token};
pub use middleware::{caller_from_token, require_auth, AuthError, AuthState};
pub use password::{hash_password, verify_password};
