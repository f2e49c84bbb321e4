//! Token decoding and role extraction

pub mod claims;
pub mod roles;

pub use claims::{parse_claims, TokenClaims};
pub use roles::{extract_roles, Roles, DEFAULT_ROLE_PREFIX};
