use crate::domain_model::{MalformedTokenError, format_http_date};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use cookie::Cookie;
use serde::{Deserialize, Serialize};

/// Header value the server sends instead of a token to clear it.
pub const FRONT_TOKEN_REMOVE: &str = "remove";

/// Decoded front token: base64 of a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontTokenPayload {
    #[serde(default)]
    pub uid: String,
    /// Access token expiry, epoch millis.
    #[serde(default)]
    pub ate: i64,
    #[serde(default)]
    pub up: serde_json::Value,
}

impl FrontTokenPayload {
    pub fn decode(encoded: &str) -> Result<Self, MalformedTokenError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MalformedTokenError::Base64(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| MalformedTokenError::Json(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, MalformedTokenError> {
        let json = serde_json::to_vec(self).map_err(|e| MalformedTokenError::Json(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }
}

/// Persisted form of the front token: a cookie string whose expiry follows
/// the access token. `None` is stored as an empty value that already expired.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontTokenRecord {
    pub payload: Option<FrontTokenPayload>,
    pub expires_at: DateTime<Utc>,
}

impl FrontTokenRecord {
    pub fn new(payload: Option<FrontTokenPayload>) -> Self {
        let expires_at = payload
            .as_ref()
            .and_then(|p| DateTime::<Utc>::from_timestamp_millis(p.ate))
            // the default instant is the Unix epoch
            .unwrap_or_default();
        Self {
            payload,
            expires_at,
        }
    }

    pub fn to_storage_value(&self, cookie_name: &str) -> Result<String, MalformedTokenError> {
        let value = match &self.payload {
            Some(payload) => payload.encode()?,
            None => String::new(),
        };
        Ok(format!(
            "{cookie_name}={value}; Expires={}",
            format_http_date(self.expires_at)
        ))
    }

    pub fn from_storage_value(stored: &str) -> Result<Self, MalformedTokenError> {
        let cookie =
            Cookie::parse(stored).map_err(|e| MalformedTokenError::Cookie(e.to_string()))?;
        let expires_at = cookie
            .expires_datetime()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.unix_timestamp(), 0))
            .ok_or_else(|| MalformedTokenError::Cookie("missing Expires".into()))?;
        let payload = match cookie.value() {
            "" => None,
            value => Some(FrontTokenPayload::decode(value)?),
        };
        Ok(Self {
            payload,
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// The payload, unless the record has expired or holds none.
    pub fn into_live_payload(self, now: DateTime<Utc>) -> Option<FrontTokenPayload> {
        if self.is_expired_at(now) {
            return None;
        }
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn payload(ate: DateTime<Utc>) -> FrontTokenPayload {
        FrontTokenPayload {
            uid: "user-1".into(),
            ate: ate.timestamp_millis(),
            up: json!({"role": "admin"}),
        }
    }

    #[test]
    fn decodes_server_issued_token() {
        let encoded = STANDARD.encode(r#"{"uid":"u","ate":42,"up":{"k":1}}"#);
        let decoded = FrontTokenPayload::decode(&encoded).unwrap();
        assert_eq!(decoded.uid, "u");
        assert_eq!(decoded.ate, 42);
        assert_eq!(decoded.up, json!({"k": 1}));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            FrontTokenPayload::decode("%%%"),
            Err(MalformedTokenError::Base64(_))
        ));
        let not_json = STANDARD.encode("not json");
        assert!(matches!(
            FrontTokenPayload::decode(&not_json),
            Err(MalformedTokenError::Json(_))
        ));
    }

    #[test]
    fn live_record_survives_storage() {
        let now = Utc::now();
        let record = FrontTokenRecord::new(Some(payload(now + Duration::hours(1))));
        let stored = record.to_storage_value("sFrontToken").unwrap();
        assert!(stored.starts_with("sFrontToken="));

        let loaded = FrontTokenRecord::from_storage_value(&stored).unwrap();
        assert_eq!(
            loaded.into_live_payload(now).map(|p| p.up),
            Some(json!({"role": "admin"}))
        );
    }

    #[test]
    fn absent_payload_is_stored_as_expired() {
        let stored = FrontTokenRecord::new(None)
            .to_storage_value("sFrontToken")
            .unwrap();
        let loaded = FrontTokenRecord::from_storage_value(&stored).unwrap();
        assert_eq!(loaded.payload, None);
        assert!(loaded.is_expired_at(Utc::now()));
    }

    #[test]
    fn expired_record_yields_nothing() {
        let now = Utc::now();
        let record = FrontTokenRecord::new(Some(payload(now - Duration::minutes(5))));
        let stored = record.to_storage_value("sFrontToken").unwrap();
        let loaded = FrontTokenRecord::from_storage_value(&stored).unwrap();
        assert!(loaded.payload.is_some());
        assert_eq!(loaded.into_live_payload(now), None);
    }
}
