//! Client facade root.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use brook_common::error::{Result, TransportError};
use brook_common::http_client::HttpClient;
use brook_common::websocket::WebSocketClient;
use brook_common::websocket::tungstenite_client::TungsteniteClient;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use serde_json::Value;
use smol_str::SmolStr;
use url::Url;

use crate::config::{ClientConfig, KeyCell};
use crate::invoke::Invocation;
use crate::resources::{App, Apps, Channel, User, Users, child};
use crate::response::ResponseBody;

/// Brook client facade.
///
/// Construction configures the base URL and headers once; each accessor
/// snapshots that configuration into an independent URL and header set, so
/// concurrent chains never interfere. Transports are injectable for tests;
/// the defaults are [`reqwest::Client`] and [`TungsteniteClient`].
pub struct Brook<C = reqwest::Client, W = TungsteniteClient> {
    http: Arc<C>,
    ws: Arc<W>,
    config: ClientConfig,
    key: KeyCell,
    base: Url,
    channel_base: Url,
    ws_base: Url,
}

impl Brook {
    /// Create a client with the default transports.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_clients(config, reqwest::Client::new(), TungsteniteClient::new())
    }
}

impl<C, W> Brook<C, W> {
    /// Create a client with injected HTTP and WebSocket transports.
    pub fn with_clients(config: ClientConfig, http: C, ws: W) -> Result<Self> {
        let parse = |scheme: &str, path: &str| {
            Url::parse(&format!("{scheme}://{}{path}", config.host)).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid host {:?}: {e}", config.host))
            })
        };

        let base = parse("http", "/api/v1")?;
        let channel_base = parse("http", "/channels")?;
        let ws_base = parse("ws", "/channels")?;
        let key = KeyCell::new(config.key.clone());

        Ok(Self {
            http: Arc::new(http),
            ws: Arc::new(ws),
            config,
            key,
            base,
            channel_base,
            ws_base,
        })
    }

    /// The credential key currently in effect, if any.
    pub fn key(&self) -> Option<SmolStr> {
        self.key.get()
    }

    /// Header snapshot for an authenticated chain.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid credentials"` when no key is configured: calling
    /// an authenticated accessor before `login` (or without a key supplied at
    /// construction) is a bug in the calling code, not a runtime condition.
    fn auth_headers(&self) -> HeaderMap {
        let Some(key) = self.key.get() else {
            panic!("Invalid credentials");
        };
        let Ok(key) = HeaderValue::from_str(&key) else {
            panic!("Invalid credentials");
        };

        let mut headers = HeaderMap::new();
        headers.insert("key", key);
        if let Some(lang) = &self.config.lang {
            headers.insert(
                "lang",
                HeaderValue::from_str(lang).expect("lang is not a valid header value"),
            );
            if self.config.fill_with_default_lang {
                headers.insert("fill-with-default-lang", HeaderValue::from_static("true"));
            }
        }
        if self.config.avoid_trigger {
            headers.insert("avoid-trigger", HeaderValue::from_static("true"));
        }
        headers
    }
}

impl<C: HttpClient, W> Brook<C, W> {
    /// Authenticate with HTTP Basic credentials against `/api/v1/me`.
    ///
    /// On success, if no credential key is configured yet, the returned
    /// user's `key` is adopted for every subsequent call from this client.
    /// Racing logins are last-write-wins on that adoption.
    pub async fn login(&self, email: &str, password: &str) -> Result<ResponseBody> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("login", email = %email).entered();

        let credentials = BASE64.encode(format!("{email}:{password}"));
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {credentials}"))
                .map_err(brook_common::error::EncodeError::from)?,
        );

        let inv = Invocation::new(self.http.clone(), child(&self.base, "me"), headers);
        let body = inv.get(None).await?;

        if let ResponseBody::Json(user) = &body {
            if let Some(key) = user.get("key").and_then(Value::as_str) {
                self.key.adopt_if_absent(key);
            }
        }

        Ok(body)
    }

    /// `/users` collection node.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid credentials"` when no key is configured.
    pub fn users(&self) -> Users<C> {
        Users::new(Invocation::new(
            self.http.clone(),
            child(&self.base, "users"),
            self.auth_headers(),
        ))
    }

    /// `/users/:user` item node.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid credentials"` when no key is configured.
    pub fn user(&self, id: &str) -> User<C> {
        User::new(Invocation::new(
            self.http.clone(),
            child(&child(&self.base, "users"), id),
            self.auth_headers(),
        ))
    }

    /// `/apps` collection node.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid credentials"` when no key is configured.
    pub fn apps(&self) -> Apps<C> {
        Apps::new(Invocation::new(
            self.http.clone(),
            child(&self.base, "apps"),
            self.auth_headers(),
        ))
    }

    /// `/apps/:app` item node.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid credentials"` when no key is configured.
    pub fn app(&self, id: &str) -> App<C> {
        App::new(Invocation::new(
            self.http.clone(),
            child(&child(&self.base, "apps"), id),
            self.auth_headers(),
        ))
    }
}

impl<C: HttpClient, W: WebSocketClient> Brook<C, W> {
    /// `/channels/:app` node: REST send plus the persistent socket.
    ///
    /// The socket URL carries the credential key as a query parameter.
    ///
    /// # Panics
    ///
    /// Panics with `"Invalid app"` when `app` is empty, and with
    /// `"Invalid credentials"` when no key is configured.
    pub fn channels(&self, app: &str) -> Channel<C, W> {
        assert!(!app.is_empty(), "Invalid app");
        let Some(key) = self.key.get() else {
            panic!("Invalid credentials");
        };

        let headers = self.auth_headers();
        let mut ws_url = child(&self.ws_base, app);
        ws_url.query_pairs_mut().append_pair("key", &key);

        Channel::new(
            Invocation::new(self.http.clone(), child(&self.channel_base, app), headers),
            self.ws.clone(),
            ws_url,
        )
    }
}
