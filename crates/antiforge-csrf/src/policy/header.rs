use super::TokenPolicy;
use crate::token::Token;
use antiforge_core::Request;
use async_trait::async_trait;

/// Token sent in a request header
#[derive(Clone, Debug)]
pub struct HeaderPolicy {
    header_name: String,
}

impl HeaderPolicy {
    pub const DEFAULT_HEADER_NAME: &'static str = "X-CSRF-TOKEN";

    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub(crate) fn extract(&self, req: &Request) -> Option<Token> {
        let value = req.headers().get(self.header_name.as_str())?;
        // Opaque bytes cannot match a stored token, but they were still sent.
        Some(Token::new(String::from_utf8_lossy(value.as_bytes())))
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEADER_NAME)
    }
}

#[async_trait]
impl TokenPolicy for HeaderPolicy {
    async fn get_token(&self, req: &Request) -> Option<Token> {
        self.extract(req)
    }
}
