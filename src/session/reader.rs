//! Read-only session accessor for pages and menu rendering

use super::store::SessionStore;
use crate::auth::{extract_roles, parse_claims, Roles, TokenClaims};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

/// Read-only view of the current session.
///
/// Every call reads storage again, so a reader always sees the token the
/// guard installed last.
#[derive(Clone)]
pub struct SessionReader {
    store: SessionStore,
    role_prefix: Arc<str>,
}

impl SessionReader {
    pub(crate) fn new(store: SessionStore, role_prefix: &str) -> Self {
        Self {
            store,
            role_prefix: Arc::from(role_prefix),
        }
    }

    pub fn access_token(&self) -> Option<Secret<String>> {
        self.store.access_token().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read access token");
            None
        })
    }

    /// Claims of the current token; `None` when absent or undecodable
    pub fn claims(&self) -> Option<TokenClaims> {
        self.access_token()
            .and_then(|token| parse_claims(token.expose_secret()).ok())
    }

    pub fn roles(&self) -> Roles {
        let token = self.access_token();
        extract_roles(
            token.as_ref().map(|t| t.expose_secret().as_str()),
            &self.role_prefix,
        )
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.roles().is_admin()
    }

    /// Attach `Authorization: Bearer <token>` when a token is held.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}
