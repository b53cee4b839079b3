//! Client configuration.

use std::sync::{Arc, RwLock};

use bon::Builder;
use smol_str::SmolStr;

/// Immutable client configuration.
///
/// `host` carries no scheme; the client derives `http://{host}/api/v1` for
/// REST calls and `ws://{host}/channels` for the realtime channel. When no
/// `key` is supplied, [`crate::Brook::login`] must run before any
/// authenticated accessor is used.
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    /// Backend host, without scheme (e.g. `api.example.com`).
    #[builder(into)]
    pub host: String,

    /// Credential key. Optional at construction; a successful login adopts
    /// the returned user's key when this is absent.
    #[builder(into)]
    pub key: Option<SmolStr>,

    /// Language tag sent as the `lang` header.
    #[builder(into)]
    pub lang: Option<SmolStr>,

    /// Ask the backend to fill missing translations with the default
    /// language. Only attached when `lang` is set.
    #[builder(default)]
    pub fill_with_default_lang: bool,

    /// Suppress server-side cascading triggers for data writes.
    #[builder(default)]
    pub avoid_trigger: bool,
}

/// Shared credential-key cell.
///
/// The key may be written exactly once after construction, by a successful
/// login, and only when no key was supplied up front. Racing logins are
/// last-write-wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyCell(Arc<RwLock<Option<SmolStr>>>);

impl KeyCell {
    pub(crate) fn new(key: Option<SmolStr>) -> Self {
        Self(Arc::new(RwLock::new(key)))
    }

    pub(crate) fn get(&self) -> Option<SmolStr> {
        self.0.read().expect("key cell poisoned").clone()
    }

    /// Adopt `key` if no key is configured yet. Returns whether it was taken.
    pub(crate) fn adopt_if_absent(&self, key: &str) -> bool {
        let mut slot = self.0.write().expect("key cell poisoned");
        if slot.is_none() {
            *slot = Some(SmolStr::new(key));
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ClientConfig::builder().host("api.example.com").build();
        assert_eq!(config.host, "api.example.com");
        assert!(config.key.is_none());
        assert!(!config.fill_with_default_lang);
        assert!(!config.avoid_trigger);
    }

    #[test]
    fn key_cell_adopts_only_once() {
        let cell = KeyCell::new(None);
        assert!(cell.adopt_if_absent("abc123"));
        assert!(!cell.adopt_if_absent("other"));
        assert_eq!(cell.get().as_deref(), Some("abc123"));
    }

    #[test]
    fn key_cell_keeps_configured_key() {
        let cell = KeyCell::new(Some(SmolStr::new("configured")));
        assert!(!cell.adopt_if_absent("abc123"));
        assert_eq!(cell.get().as_deref(), Some("configured"));
    }
}
