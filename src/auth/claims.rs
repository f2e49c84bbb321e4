//! Access token claim decoding
//!
//! The console never verifies token signatures; the identity service does.
//! Here the payload segment is only read for its expiry and scopes. Every
//! failure comes back as a [`ClaimsError`] value, never as a panic.

use crate::error::ClaimsError;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Decoded, transient view over an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (`sub`), when present
    pub subject: Option<String>,

    /// Absolute expiry (`exp`)
    pub expires_at: DateTime<Utc>,

    /// Scope strings (`scope` or `scopes`)
    pub scopes: Vec<String>,
}

impl TokenClaims {
    /// A token expiring exactly at `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Decode the claims carried in the middle segment of a token.
pub fn parse_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::Segments(segments.len()));
    }

    let bytes = decode_segment(segments[1])?;
    let payload: Value =
        serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Json(e.to_string()))?;
    let object = payload
        .as_object()
        .ok_or_else(|| ClaimsError::Json("payload must be an object".to_string()))?;

    let expires_at = expiry(object)?;

    Ok(TokenClaims {
        subject: object.get("sub").and_then(Value::as_str).map(str::to_string),
        expires_at,
        scopes: scopes(object),
    })
}

/// Accepts both URL-safe and standard alphabets, with or without padding.
fn decode_segment(segment: &str) -> Result<Vec<u8>, ClaimsError> {
    let trimmed = segment.trim_end_matches('=');

    general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .map_err(|_| ClaimsError::Base64)
}

fn expiry(object: &Map<String, Value>) -> Result<DateTime<Utc>, ClaimsError> {
    let exp = object.get("exp").ok_or(ClaimsError::MissingExpiry)?;
    let Value::Number(number) = exp else {
        return Err(ClaimsError::InvalidExpiry);
    };

    let secs = match number.as_i64() {
        Some(secs) => secs,
        None => {
            let value = number.as_f64().ok_or(ClaimsError::InvalidExpiry)?;
            if !value.is_finite() || value.abs() >= i64::MAX as f64 {
                return Err(ClaimsError::InvalidExpiry);
            }
            value.floor() as i64
        }
    };

    DateTime::from_timestamp(secs, 0).ok_or(ClaimsError::InvalidExpiry)
}

fn scopes(object: &Map<String, Value>) -> Vec<String> {
    let claim = object.get("scope").or_else(|| object.get("scopes"));

    match claim {
        Some(Value::String(joined)) => joined.split_whitespace().map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
