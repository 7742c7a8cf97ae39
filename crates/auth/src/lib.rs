//! `bookmart-auth` — authentication boundary (accounts, password hashing, tokens).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod account;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;

pub use account::{Admin, User, UserProfilePatch, UserStatus};
pub use claims::{Claims, PrincipalKind, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator};
pub use password::PasswordHasher;
pub use permissions::Permission;
