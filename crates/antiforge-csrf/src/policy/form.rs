use super::{HeaderPolicy, TokenPolicy};
use crate::token::Token;
use antiforge_core::multipart::is_multipart;
use antiforge_core::Request;
use async_trait::async_trait;

/// Token sent as a field of an urlencoded or multipart form body
#[derive(Clone, Debug)]
pub struct FormPolicy {
    field_name: String,
}

impl FormPolicy {
    pub const DEFAULT_FIELD_NAME: &'static str = "csrf_token";

    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub(crate) fn extract(&self, req: &Request) -> Option<Token> {
        if req.content_type().is_some_and(is_multipart) {
            return self.extract_multipart(req);
        }

        let fields: Vec<(String, String)> = match req.form() {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!(error = %e, "Request body is not a form");
                return None;
            }
        };

        fields
            .into_iter()
            .find(|(name, _)| *name == self.field_name)
            .map(|(_, value)| Token::new(value))
    }

    fn extract_multipart(&self, req: &Request) -> Option<Token> {
        let fields = match req.multipart() {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed multipart body");
                return None;
            }
        };

        fields
            .into_iter()
            .find(|field| !field.is_file() && field.name() == Some(self.field_name.as_str()))
            .map(|field| Token::new(field.text()))
    }
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIELD_NAME)
    }
}

#[async_trait]
impl TokenPolicy for FormPolicy {
    async fn get_token(&self, req: &Request) -> Option<Token> {
        self.extract(req)
    }
}

/// Header first, form field as fallback
#[derive(Clone, Debug, Default)]
pub struct FormAndHeaderPolicy {
    header: HeaderPolicy,
    form: FormPolicy,
}

impl FormAndHeaderPolicy {
    pub fn new(header_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            header: HeaderPolicy::new(header_name),
            form: FormPolicy::new(field_name),
        }
    }
}

#[async_trait]
impl TokenPolicy for FormAndHeaderPolicy {
    async fn get_token(&self, req: &Request) -> Option<Token> {
        self.header.extract(req).or_else(|| self.form.extract(req))
    }
}
