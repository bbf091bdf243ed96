use crate::error::ConfigError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default number of random bytes in a token
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// A CSRF token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Create a token from an existing string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"***").finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Source of fresh tokens
pub trait TokenGenerator: Send + Sync + 'static {
    fn generate(&self) -> Token;
}

fn random_bytes(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Random bytes from the OS generator, base64url encoded
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    length: usize,
}

impl RandomTokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> Token {
        Token(URL_SAFE_NO_PAD.encode(random_bytes(self.length)))
    }
}

/// SHA-256 over fresh random bytes and a secret phrase
///
/// Tokens have a fixed length regardless of the secret, and knowing earlier
/// tokens tells nothing about the secret.
#[derive(Clone)]
pub struct HashedTokenGenerator {
    secret: Vec<u8>,
}

impl HashedTokenGenerator {
    pub fn new(secret_phrase: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret_phrase.as_ref().to_vec(),
        }
    }
}

impl fmt::Debug for HashedTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedTokenGenerator").finish_non_exhaustive()
    }
}

impl TokenGenerator for HashedTokenGenerator {
    fn generate(&self) -> Token {
        let mut hasher = Sha256::new();
        hasher.update(random_bytes(DEFAULT_TOKEN_LENGTH));
        hasher.update(&self.secret);
        Token(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }
}

/// HMAC-SHA256 signing of tokens with a server-held secret phrase
///
/// The signed form is `token.signature`, signature base64url encoded.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret_phrase: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let secret = secret_phrase.as_ref();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| ConfigError::EmptySecret)?;
        Ok(Self { mac })
    }

    fn signature(&self, raw: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(raw.as_bytes());
        mac
    }

    /// The signed representation of `token`
    pub fn sign(&self, token: &Token) -> String {
        let tag = self.signature(token.as_str()).finalize().into_bytes();
        format!("{}.{}", token.as_str(), URL_SAFE_NO_PAD.encode(tag))
    }

    /// Recover the raw token from a signed value
    ///
    /// Unsigned, tampered or otherwise malformed input yields `None`.
    pub fn verify(&self, candidate: &str) -> Option<Token> {
        let (raw, signature) = candidate.rsplit_once('.')?;
        if raw.is_empty() {
            return None;
        }
        let tag = URL_SAFE_NO_PAD.decode(signature).ok()?;
        // verify_slice compares in constant time
        self.signature(raw).verify_slice(&tag).ok()?;
        Some(Token::new(raw))
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.verify(candidate).is_some()
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

/// Constant-time comparison of two token strings
pub fn tokens_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
