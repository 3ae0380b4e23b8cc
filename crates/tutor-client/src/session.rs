use async_trait::async_trait;

/// Source of the signed-in user's access token.
///
/// Returning `None` means there is no usable session; the view then asks
/// the user to sign in instead of calling the gateway.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// A fixed session, for CLIs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl SessionSource for StaticSession {
    async fn access_token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.is_empty())
    }
}
