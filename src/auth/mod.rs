//! # Auth
//!
//! Back-office authentication: Argon2id password hashes, HS256 access
//! tokens and role checks against the `profiles` table.

pub mod crypto;
pub mod errors;
pub mod jwt;
pub mod profile;
pub mod service;

pub use errors::{AuthError, AuthResult};
pub use jwt::{bearer_token, JwtClaims, JwtManager, TokenResponse};
pub use profile::{LoginRequest, Profile, Role, StoredProfile};
pub use service::{AuthService, LoginResponse};
