//! How the client echoes the token back
//!
//! A [`TokenPolicy`] extracts the submitted token from an inbound request.
//! `None` means the client sent nothing; `Some` with an empty token means the
//! slot was present but blank. Both fail verification, for different
//! reasons.

mod form;
mod header;

pub use form::{FormAndHeaderPolicy, FormPolicy};
pub use header::HeaderPolicy;

use crate::token::Token;
use antiforge_core::Request;
use async_trait::async_trait;

#[async_trait]
pub trait TokenPolicy: Send + Sync + 'static {
    async fn get_token(&self, req: &Request) -> Option<Token>;
}
