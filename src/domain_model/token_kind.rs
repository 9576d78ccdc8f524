use std::fmt;

/// The three client-side session tokens. Each is persisted under its own key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TokenKind {
    IdRefresh,
    AntiCsrf,
    FrontToken,
}

impl TokenKind {
    pub fn storage_key(&self) -> &'static str {
        match self {
            TokenKind::IdRefresh => "idrefreshtoken",
            TokenKind::AntiCsrf => "anticsrf",
            TokenKind::FrontToken => "fronttoken",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}
