use std::fmt;

/// Lifecycle notifications delivered to the host's event handler.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SessionEvent {
    SessionCreated,
    RefreshSession,
    SignOut,
    AccessTokenPayloadUpdated,
    Unauthorised,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::SessionCreated => "SESSION_CREATED",
            SessionEvent::RefreshSession => "REFRESH_SESSION",
            SessionEvent::SignOut => "SIGN_OUT",
            SessionEvent::AccessTokenPayloadUpdated => "ACCESS_TOKEN_PAYLOAD_UPDATED",
            SessionEvent::Unauthorised => "UNAUTHORISED",
        };
        f.write_str(name)
    }
}
