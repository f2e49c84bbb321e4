//! Role extraction from access token scopes

use super::claims::{parse_claims, TokenClaims};
use std::collections::BTreeSet;

/// Scopes starting with this prefix are roles
pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

/// Set of role markers carried by a token, prefix retained (`ROLE_ADMIN`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roles {
    prefix: String,
    roles: BTreeSet<String>,
}

impl Default for Roles {
    fn default() -> Self {
        Self::empty(DEFAULT_ROLE_PREFIX)
    }
}

impl Roles {
    pub fn empty(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            roles: BTreeSet::new(),
        }
    }

    pub fn from_claims(claims: &TokenClaims, prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            roles: claims
                .scopes
                .iter()
                .filter(|scope| scope.starts_with(prefix))
                .cloned()
                .collect(),
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the admin marker (`<prefix>ADMIN`) is present
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&format!("{}ADMIN", self.prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a Roles {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.roles.iter()
    }
}

/// Roles of `token`; empty when the token is absent or cannot be decoded.
///
/// Expiry is not checked; an expired token still yields its roles.
pub fn extract_roles(token: Option<&str>, prefix: &str) -> Roles {
    token
        .and_then(|token| parse_claims(token).ok())
        .map(|claims| Roles::from_claims(&claims, prefix))
        .unwrap_or_else(|| Roles::empty(prefix))
}
