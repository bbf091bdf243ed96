//! Where the authoritative token lives
//!
//! A [`TokenStorage`] loads the token issued to the client and persists newly
//! minted ones into the response. Two implementations ship with the crate:
//! [`CookieStorage`] and [`SessionStorage`]; anything else can implement the
//! trait.

mod cookie;
mod session;

pub use self::cookie::{CookieOptions, CookieStorage};
pub use self::session::SessionStorage;

use crate::error::{CsrfError, StorageError};
use crate::token::{Token, TokenGenerator};
use antiforge_core::{Request, Response};
use async_trait::async_trait;
use http::Extensions;
use std::sync::{Arc, Mutex, PoisonError};

#[async_trait]
pub trait TokenStorage: Send + Sync + 'static {
    /// The token currently stored for this client, if any
    ///
    /// Must not fail: missing or malformed values load as `None`.
    async fn load(&self, req: &Request) -> Option<Token>;

    /// Persist `token` so that the next [`load`](Self::load) from the same
    /// client returns it
    ///
    /// `scope` holds the extensions of the request the response answers.
    async fn save(
        &self,
        scope: &Extensions,
        response: &mut Response,
        token: &Token,
    ) -> Result<(), StorageError>;

    fn generator(&self) -> &dyn TokenGenerator;

    /// Mint a token and stage it for saving once the handler returns
    ///
    /// Calling this twice within a request replaces the staged token.
    fn generate_new_token(&self, req: &Request) -> Result<Token, CsrfError> {
        let pending = PendingToken::from_request(req).ok_or(CsrfError::NotInstalled)?;
        let token = self.generator().generate();
        pending.replace(token.clone());
        Ok(token)
    }
}

/// Per-request slot for a token minted while the handler runs
///
/// The protection layer inserts one into every request it sees and flushes
/// it through [`TokenStorage::save`] after the handler returned.
#[derive(Clone, Default)]
pub struct PendingToken(Arc<Mutex<Option<Token>>>);

impl PendingToken {
    pub fn from_request(req: &Request) -> Option<&PendingToken> {
        req.extensions().get::<PendingToken>()
    }

    pub fn replace(&self, token: Token) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn peek(&self) -> Option<Token> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take(&self) -> Option<Token> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
