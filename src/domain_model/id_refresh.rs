use crate::domain_model::MalformedTokenError;
use chrono::{DateTime, Utc};
use cookie::Cookie;

/// Value a server sends to tell the client the session is gone.
pub const REMOVE_SENTINEL: &str = "remove";

/// Client-visible record that a session exists, stored as `value;expiryMillis`.
///
/// Markers are compared by their full raw text, so a rotation that keeps the
/// value but moves the expiry still counts as a different marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRefreshMarker {
    raw: String,
    value_len: usize,
    expiry_millis: i64,
}

impl IdRefreshMarker {
    pub fn parse(raw: &str) -> Result<Self, MalformedTokenError> {
        let (value, expiry) = raw
            .rsplit_once(';')
            .ok_or_else(|| MalformedTokenError::MissingExpiry(raw.to_owned()))?;
        let expiry_millis = expiry
            .trim()
            .parse::<i64>()
            .map_err(|_| MalformedTokenError::InvalidExpiry(expiry.to_owned()))?;
        Ok(Self {
            raw: raw.to_owned(),
            value_len: value.len(),
            expiry_millis,
        })
    }

    pub fn new(value: &str, expiry_millis: i64) -> Self {
        Self {
            raw: format!("{value};{expiry_millis}"),
            value_len: value.len(),
            expiry_millis,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> &str {
        &self.raw[..self.value_len]
    }

    pub fn expiry_millis(&self) -> i64 {
        self.expiry_millis
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expiry_millis < now_millis
    }
}

/// What a `Set-Cookie` for the marker asks the client to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerUpdate {
    Set(String),
    Remove,
}

impl MarkerUpdate {
    /// Max-Age wins over Expires. A cookie with neither never expires on its own.
    pub fn from_cookie(cookie: &Cookie<'_>, now: DateTime<Utc>) -> Self {
        let now_millis = now.timestamp_millis();
        let expiry_millis = if let Some(max_age) = cookie.max_age() {
            if max_age.whole_seconds() <= 0 {
                return MarkerUpdate::Remove;
            }
            let delta = i64::try_from(max_age.whole_milliseconds()).unwrap_or(i64::MAX);
            now_millis.saturating_add(delta)
        } else if let Some(expires) = cookie.expires_datetime() {
            i64::try_from(expires.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
        } else {
            i64::MAX
        };

        if expiry_millis < now_millis || cookie.value() == REMOVE_SENTINEL {
            return MarkerUpdate::Remove;
        }
        MarkerUpdate::Set(IdRefreshMarker::new(cookie.value(), expiry_millis).raw)
    }
}
