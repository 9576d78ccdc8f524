/// Requests the session layer issues on its own.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RequestKind {
    Refresh,
    SignOut,
}

/// Supplies extra headers for refresh and sign-out calls.
pub trait HeaderProvider: Send + Sync {
    fn request_headers(&self, kind: RequestKind) -> Vec<(String, String)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHeaderProvider;

impl HeaderProvider for NoopHeaderProvider {
    fn request_headers(&self, _kind: RequestKind) -> Vec<(String, String)> {
        Vec::new()
    }
}
