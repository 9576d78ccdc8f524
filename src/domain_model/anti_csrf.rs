use crate::domain_model::MalformedTokenError;
use serde::{Deserialize, Serialize};

/// An anti-CSRF token together with the raw marker that was current when it
/// was issued. A token is only valid while that marker is still current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiCsrfTokenInfo {
    pub token: String,
    pub associated_marker: String,
}

impl AntiCsrfTokenInfo {
    pub fn new(token: impl Into<String>, associated_marker: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            associated_marker: associated_marker.into(),
        }
    }

    pub fn is_bound_to(&self, marker: &str) -> bool {
        self.associated_marker == marker
    }

    pub fn to_storage_value(&self) -> Result<String, MalformedTokenError> {
        serde_json::to_string(self).map_err(|e| MalformedTokenError::AntiCsrf(e.to_string()))
    }

    pub fn from_storage_value(stored: &str) -> Result<Self, MalformedTokenError> {
        serde_json::from_str(stored).map_err(|e| MalformedTokenError::AntiCsrf(e.to_string()))
    }
}
