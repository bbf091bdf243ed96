use super::TokenStorage;
use crate::error::StorageError;
use crate::token::{RandomTokenGenerator, Token, TokenGenerator};
use antiforge_core::{Request, Response, Session};
use async_trait::async_trait;
use http::Extensions;
use std::sync::Arc;

/// Token kept server side in the request's [`Session`]
///
/// Requires [`SessionLayer`](antiforge_core::SessionLayer) (or anything else
/// that attaches a `Session`) in front of the protection layer.
#[derive(Clone)]
pub struct SessionStorage {
    session_key: String,
    generator: Arc<dyn TokenGenerator>,
}

impl SessionStorage {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            generator: Arc::new(RandomTokenGenerator::default()),
        }
    }

    pub fn with_generator(mut self, generator: impl TokenGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }
}

#[async_trait]
impl TokenStorage for SessionStorage {
    async fn load(&self, req: &Request) -> Option<Token> {
        let Some(session) = req.session() else {
            tracing::debug!("No session attached, CSRF token unavailable");
            return None;
        };

        session
            .get::<String>(&self.session_key)
            .filter(|value| !value.is_empty())
            .map(Token::new)
    }

    async fn save(
        &self,
        scope: &Extensions,
        _response: &mut Response,
        token: &Token,
    ) -> Result<(), StorageError> {
        let session = scope.get::<Session>().ok_or(StorageError::NoSession)?;
        session.insert(&self.session_key, token.as_str())?;
        Ok(())
    }

    fn generator(&self) -> &dyn TokenGenerator {
        self.generator.as_ref()
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("session_key", &self.session_key)
            .finish_non_exhaustive()
    }
}
