use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::{DistillError, Llm};

/// Which provider model to call and the key to call it with.
#[derive(Clone)]
pub struct ModelRequest {
    pub name: String,
    pub api_key: Option<SecretString>,
}

impl ModelRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// The key, if one was supplied and is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

impl fmt::Debug for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("ModelRequest")
            .field("name", &self.name)
            .field("api_key", &api_key)
            .finish()
    }
}

/// A resolved, ready-to-call model.
#[derive(Clone)]
pub struct ModelHandle {
    name: String,
    llm: Arc<dyn Llm>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, llm: Arc<dyn Llm>) -> Self {
        Self {
            name: name.into(),
            llm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn llm(&self) -> &Arc<dyn Llm> {
        &self.llm
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Maps a [`ModelRequest`] to a callable model without touching the network.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError>;
}

impl<R> ModelResolver for Arc<R>
where
    R: ModelResolver + ?Sized,
{
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError> {
        (**self).resolve(request)
    }
}
