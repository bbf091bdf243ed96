use super::TokenStorage;
use crate::error::{ConfigError, StorageError};
use crate::token::{RandomTokenGenerator, Token, TokenGenerator, TokenSigner};
use antiforge_core::{cookies, Request, Response};
use async_trait::async_trait;
use cookie::{time, Cookie, SameSite};
use http::Extensions;
use std::sync::Arc;

/// Attributes of the token cookie
#[derive(Clone, Debug)]
pub struct CookieOptions {
    /// Default: "/"
    pub path: String,

    /// Default: None
    pub domain: Option<String>,

    /// Default: false
    pub secure: bool,

    /// Must stay false when a script echoes the cookie into a header.
    /// Default: false
    pub http_only: bool,

    /// Default: Lax
    pub same_site: SameSite,

    /// Lifetime in seconds; a session cookie when unset.
    /// Default: None
    pub max_age: Option<i64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
            max_age: None,
        }
    }
}

/// Token kept in a cookie on the client
///
/// With a secret phrase the cookie carries `token.signature` and a value
/// whose signature does not verify loads as "no token".
#[derive(Clone)]
pub struct CookieStorage {
    cookie_name: String,
    options: CookieOptions,
    signer: Option<TokenSigner>,
    generator: Arc<dyn TokenGenerator>,
}

impl CookieStorage {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            options: CookieOptions::default(),
            signer: None,
            generator: Arc::new(RandomTokenGenerator::default()),
        }
    }

    /// Sign cookie values with `secret_phrase`
    pub fn secret_phrase(mut self, secret_phrase: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        self.signer = Some(TokenSigner::new(secret_phrase)?);
        Ok(self)
    }

    pub fn options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_generator(mut self, generator: impl TokenGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn encode(&self, token: &Token) -> String {
        match &self.signer {
            Some(signer) => signer.sign(token),
            None => token.as_str().to_string(),
        }
    }

    fn build_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.cookie_name.clone(), value))
            .path(self.options.path.clone())
            .secure(self.options.secure)
            .http_only(self.options.http_only)
            .same_site(self.options.same_site);

        if let Some(domain) = &self.options.domain {
            cookie = cookie.domain(domain.clone());
        }
        if let Some(max_age) = self.options.max_age {
            cookie = cookie.max_age(time::Duration::seconds(max_age));
        }

        cookie.build()
    }
}

#[async_trait]
impl TokenStorage for CookieStorage {
    async fn load(&self, req: &Request) -> Option<Token> {
        let raw = req.cookie(&self.cookie_name)?;

        let token = match &self.signer {
            Some(signer) => signer.verify(&raw),
            None => Some(Token::new(raw)),
        };

        match token {
            Some(token) if !token.is_empty() => Some(token),
            _ => {
                tracing::debug!(cookie = %self.cookie_name, "Ignoring invalid CSRF cookie");
                None
            }
        }
    }

    async fn save(
        &self,
        _scope: &Extensions,
        response: &mut Response,
        token: &Token,
    ) -> Result<(), StorageError> {
        let cookie = self.build_cookie(self.encode(token));
        cookies::set(response, &cookie)?;
        Ok(())
    }

    fn generator(&self) -> &dyn TokenGenerator {
        self.generator.as_ref()
    }
}

impl std::fmt::Debug for CookieStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStorage")
            .field("cookie_name", &self.cookie_name)
            .field("options", &self.options)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antiforge_core::IntoResponse;
    use bytes::Bytes;
    use http::header;

    fn request_with_cookie(cookie: &str) -> Request {
        let req = http::Request::builder()
            .header(header::COOKIE, cookie)
            .body(Bytes::new())
            .unwrap();
        Request::from_http(req)
    }

    async fn saved_value(storage: &CookieStorage, token: &Token) -> String {
        let mut response = ().into_response();
        storage
            .save(&Extensions::new(), &mut response, token)
            .await
            .unwrap();
        cookies::set_cookies(response.headers())
            .into_iter()
            .find(|(name, _)| name == storage.cookie_name())
            .map(|(_, value)| value)
            .unwrap()
    }

    #[tokio::test]
    async fn test_unsigned_round_trip() {
        let storage = CookieStorage::new("csrf_token");
        let token = Token::new("abc123");

        let value = saved_value(&storage, &token).await;
        assert_eq!(value, "abc123");

        let req = request_with_cookie(&format!("csrf_token={}", value));
        assert_eq!(storage.load(&req).await, Some(token));
    }

    #[tokio::test]
    async fn test_signed_round_trip() {
        let storage = CookieStorage::new("csrf_token").secret_phrase("test").unwrap();
        let token = Token::new("abc123");

        let value = saved_value(&storage, &token).await;
        assert!(value.starts_with("abc123."));

        let req = request_with_cookie(&format!("csrf_token={}", value));
        assert_eq!(storage.load(&req).await, Some(token));
    }

    #[tokio::test]
    async fn test_signed_rejects_unsigned_and_foreign_values() {
        let storage = CookieStorage::new("csrf_token").secret_phrase("test").unwrap();
        let other = CookieStorage::new("csrf_token").secret_phrase("other").unwrap();
        let foreign = saved_value(&other, &Token::new("abc123")).await;

        for cookie in [
            "csrf_token=abc123".to_string(),
            format!("csrf_token={}", foreign),
            "csrf_token=".to_string(),
        ] {
            assert_eq!(storage.load(&request_with_cookie(&cookie)).await, None);
        }
    }

    #[tokio::test]
    async fn test_missing_cookie_loads_none() {
        let storage = CookieStorage::new("csrf_token");
        let req = Request::from_http(http::Request::new(Bytes::new()));
        assert_eq!(storage.load(&req).await, None);
        assert_eq!(storage.load(&request_with_cookie("other=1")).await, None);
    }

    #[tokio::test]
    async fn test_cookie_attributes() {
        let storage = CookieStorage::new("csrf_token").options(CookieOptions {
            domain: Some("example.com".to_string()),
            secure: true,
            max_age: Some(3600),
            ..CookieOptions::default()
        });

        let mut response = ().into_response();
        storage
            .save(&Extensions::new(), &mut response, &Token::new("t"))
            .await
            .unwrap();

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("csrf_token=t"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Domain=example.com"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=3600"));
        assert!(!set_cookie.contains("HttpOnly"));
    }
}
