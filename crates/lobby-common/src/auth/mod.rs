//! Credentials and session tokens

mod password;
mod token;

pub use password::{hash_password, verify_password, PasswordService};
pub use token::{IssuedToken, SessionClaims, SessionTokenService};
