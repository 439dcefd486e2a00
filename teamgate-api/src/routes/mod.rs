/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, logout and profile
/// - `users`: User administration
/// - `teams`: Team administration and manager links

pub mod auth;
pub mod health;
pub mod teams;
pub mod users;

use crate::error::{ApiError, ApiResult};
use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Confirmation body for operations without a resource to return
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Unwraps a JSON body and runs its field validators
pub(crate) fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(req) = payload?;
    req.validate()?;
    Ok(req)
}

/// Parses a path segment as an entity id
pub(crate) fn parse_id(raw: &str, message: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(message.to_string()))
}

/// Keeps an explicit `null` distinct from an absent field
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>` field: absent gives `None`, `null` gives `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        team_id: Option<Option<Uuid>>,
    }

    #[test]
    fn test_deserialize_some_distinguishes_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.team_id, None);

        let null: Patch = serde_json::from_str(r#"{"team_id": null}"#).unwrap();
        assert_eq!(null.team_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"team_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.team_id, Some(Some(id)));
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "ID invalide").unwrap(), id);
        assert!(matches!(
            parse_id("42", "ID invalide"),
            Err(ApiError::BadRequest(msg)) if msg == "ID invalide"
        ));
    }
}
