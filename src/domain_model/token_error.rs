#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedTokenError {
    #[error("id-refresh marker has no expiry: {0:?}")]
    MissingExpiry(String),
    #[error("id-refresh marker expiry is not a number: {0:?}")]
    InvalidExpiry(String),
    #[error("anti-csrf record is malformed: {0}")]
    AntiCsrf(String),
    #[error("front token is not valid base64: {0}")]
    Base64(String),
    #[error("front token payload is not valid JSON: {0}")]
    Json(String),
    #[error("front token record is malformed: {0}")]
    Cookie(String),
}
