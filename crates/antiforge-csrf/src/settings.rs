//! Declarative configuration
//!
//! [`CsrfSettings`] describes a storage/policy pair as plain data, so it can
//! come from a config file or, with the `config` feature, from `CSRF_*`
//! environment variables:
//!
//! ```text
//! CSRF_STORAGE=cookie
//! CSRF_SECRET_PHRASE=change-me
//! CSRF_POLICY=form_and_header
//! CSRF_EXEMPT_PATHS=/webhooks,/health
//! ```

use crate::error::ConfigError;
use crate::policy::{FormAndHeaderPolicy, FormPolicy, HeaderPolicy};
use crate::protect::{Csrf, CsrfLayer, ProtectOptions};
use crate::renderer::Rejection;
use crate::storage::{CookieStorage, SessionStorage};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Cookie,
    Session,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Header,
    Form,
    FormAndHeader,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
    pub cookie_name: String,
    pub header_name: String,
    pub field_name: String,
    pub session_key: String,
    /// Signs cookie values; ignored by session storage
    pub secret_phrase: Option<String>,
    pub storage: StorageKind,
    pub policy: PolicyKind,
    /// Status of the default rejection, 403 when unset
    pub rejection_status: Option<u16>,
    pub exempt_paths: Vec<String>,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            cookie_name: "csrf_token".to_string(),
            header_name: HeaderPolicy::DEFAULT_HEADER_NAME.to_string(),
            field_name: FormPolicy::DEFAULT_FIELD_NAME.to_string(),
            session_key: "csrf_token".to_string(),
            secret_phrase: None,
            storage: StorageKind::default(),
            policy: PolicyKind::default(),
            rejection_status: None,
            exempt_paths: Vec::new(),
        }
    }
}

impl CsrfSettings {
    /// Read `CSRF_*` variables, loading `.env` first when present
    #[cfg(feature = "config")]
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Ok(envy::prefixed("CSRF_").from_env::<Self>()?)
    }

    pub fn build(&self) -> Result<Csrf, ConfigError> {
        let csrf = match self.storage {
            StorageKind::Cookie => {
                let mut storage = CookieStorage::new(&self.cookie_name);
                if let Some(secret) = &self.secret_phrase {
                    storage = storage.secret_phrase(secret)?;
                }
                self.with_policy(storage)
            }
            StorageKind::Session => self.with_policy(SessionStorage::new(&self.session_key)),
        };

        match self.rejection_status {
            Some(status) => Ok(csrf.default_rejection(Rejection::from_u16(status)?)),
            None => Ok(csrf),
        }
    }

    /// [`build`](Self::build) plus the exempt paths, as an application layer
    pub fn layer(&self) -> Result<CsrfLayer, ConfigError> {
        let layer = self.build()?.layer();
        Ok(self
            .exempt_paths
            .iter()
            .fold(layer, |layer, path| layer.exempt(path.as_str())))
    }

    fn with_policy(&self, storage: impl crate::storage::TokenStorage) -> Csrf {
        match self.policy {
            PolicyKind::Header => Csrf::new(storage, HeaderPolicy::new(&self.header_name)),
            PolicyKind::Form => Csrf::new(storage, FormPolicy::new(&self.field_name)),
            PolicyKind::FormAndHeader => Csrf::new(
                storage,
                FormAndHeaderPolicy::new(&self.header_name, &self.field_name),
            ),
        }
    }
}

/// Per-endpoint overrides as data
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProtectSettings {
    pub exception_status: Option<u16>,
    /// Name of a renderer registered with [`Csrf::renderer`]
    pub error_renderer: Option<String>,
}

impl ProtectSettings {
    pub fn to_options(&self) -> Result<ProtectOptions, ConfigError> {
        let mut options = ProtectOptions::new();
        if let Some(status) = self.exception_status {
            options = options.exception(Rejection::from_u16(status)?);
        }
        if let Some(name) = &self.error_renderer {
            options = options.error_renderer_named(name.clone());
        }
        Ok(options)
    }
}
