//! Typed resource-path nodes.
//!
//! Each node exposes only the verbs valid at that point of the hierarchy, so
//! an invalid operation (say, DELETE on a collection root) does not exist
//! rather than failing at runtime. Every accessor call copies the URL and
//! headers it was given; sibling chains never share mutable state.

use std::sync::Arc;

use brook_common::error::{Result, TransportError};
use brook_common::http_client::{HttpClient, MultipartClient};
use brook_common::websocket::WebSocketClient;
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::channel::ChannelSession;
use crate::filter::Filter;
use crate::invoke::{Invocation, PushInvocation, Upload, UploadInvocation};
use crate::response::ResponseBody;

/// Append one path segment, returning a new URL.
pub(crate) fn child(url: &Url, segment: &str) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("HTTP URLs always have path segments")
        .push(segment);
    url
}

macro_rules! collection_verbs {
    () => {
        /// List this collection, optionally shaped by a filter.
        pub async fn get(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
            self.inv.get(filter).await
        }

        /// Create an item in this collection.
        pub async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
            self.inv.post(body).await
        }
    };
}

macro_rules! item_verbs {
    () => {
        /// Fetch this item.
        pub async fn get(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
            self.inv.get(filter).await
        }

        /// Replace this item.
        pub async fn put<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
            self.inv.put(body).await
        }

        /// Delete this item.
        pub async fn delete(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
            self.inv.delete(filter).await
        }
    };
}

/// `/users` collection node.
pub struct Users<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> Users<C> {
    pub(crate) fn new(inv: Invocation<C>) -> Self {
        Self { inv }
    }

    collection_verbs!();
}

/// `/users/:user` item node.
pub struct User<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> User<C> {
    pub(crate) fn new(inv: Invocation<C>) -> Self {
        Self { inv }
    }

    item_verbs!();

    /// `/users/:user/avatar` — multipart avatar upload.
    pub fn avatar(&self) -> Avatar<C> {
        Avatar {
            inv: UploadInvocation::new(
                self.inv.http(),
                child(self.inv.url(), "avatar"),
                self.inv.headers().clone(),
            ),
        }
    }

    /// `/users/:user/apps/:app` — membership and role fields.
    pub fn app(&self, app: &str) -> UserApp<C> {
        UserApp {
            inv: self.inv.derive(child(&child(self.inv.url(), "apps"), app)),
        }
    }
}

/// `/users/:user/avatar` node.
pub struct Avatar<C> {
    inv: UploadInvocation<C>,
}

impl<C: MultipartClient> Avatar<C> {
    /// Upload the avatar image.
    pub async fn put(&self, upload: &Upload) -> Result<()> {
        self.inv.put(upload).await
    }
}

/// `/users/:user/apps/:app` item node.
pub struct UserApp<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> UserApp<C> {
    item_verbs!();
}

/// `/apps` collection node.
pub struct Apps<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> Apps<C> {
    pub(crate) fn new(inv: Invocation<C>) -> Self {
        Self { inv }
    }

    collection_verbs!();
}

/// `/apps/:app` item node.
pub struct App<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> App<C> {
    pub(crate) fn new(inv: Invocation<C>) -> Self {
        Self { inv }
    }

    item_verbs!();

    /// `/apps/:app/collections` collection node.
    pub fn collections(&self) -> Collections<C> {
        Collections {
            inv: self.inv.derive(child(self.inv.url(), "collections")),
        }
    }

    /// `/apps/:app/collections/:collection` item node.
    pub fn collection(&self, collection: &str) -> Collection<C> {
        Collection {
            inv: self
                .inv
                .derive(child(&child(self.inv.url(), "collections"), collection)),
        }
    }

    /// `/apps/:app/users` — app user listing plus push by creator.
    pub fn users(&self) -> AppUsers<C> {
        AppUsers {
            inv: self.inv.derive(child(self.inv.url(), "users")),
            push: self.inv.derive(child(self.inv.url(), "push")),
        }
    }

    /// `/apps/:app/installations` collection node.
    pub fn installations(&self) -> Installations<C> {
        Installations {
            inv: self.inv.derive(child(self.inv.url(), "installations")),
            push: self.inv.derive(child(self.inv.url(), "push")),
        }
    }

    /// `/apps/:app/installations/:device` item node.
    pub fn installation(&self, device: &str) -> Installation<C> {
        Installation {
            inv: self
                .inv
                .derive(child(&child(self.inv.url(), "installations"), device)),
            push: self.inv.derive(child(self.inv.url(), "push")),
            device: device.to_owned(),
        }
    }
}

/// `/apps/:app/collections` collection node.
pub struct Collections<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> Collections<C> {
    collection_verbs!();
}

/// `/apps/:app/collections/:collection` item node.
pub struct Collection<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> Collection<C> {
    item_verbs!();

    /// `/apps/:app/collections/:collection/data` collection node.
    pub fn data(&self) -> DataCollection<C> {
        DataCollection {
            inv: self.inv.derive(child(self.inv.url(), "data")),
        }
    }

    /// `/apps/:app/collections/:collection/data/:id` item node.
    pub fn record(&self, id: &str) -> DataRecord<C> {
        DataRecord {
            inv: self.inv.derive(child(&child(self.inv.url(), "data"), id)),
        }
    }
}

/// Data records collection node.
pub struct DataCollection<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> DataCollection<C> {
    collection_verbs!();
}

/// Single data record node.
pub struct DataRecord<C> {
    inv: Invocation<C>,
}

impl<C: HttpClient> DataRecord<C> {
    item_verbs!();
}

/// `/apps/:app/users` node: listing plus push targeting a creator.
pub struct AppUsers<C> {
    inv: Invocation<C>,
    push: Invocation<C>,
}

impl<C: HttpClient> AppUsers<C> {
    /// List the app's users.
    pub async fn get(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
        self.inv.get(filter).await
    }

    /// Push to every installation created by `email`.
    pub fn push(&self, email: &str) -> PushInvocation<C> {
        PushInvocation::new(self.push.clone(), json!({"where": {"createdBy": email}}))
    }
}

/// `/apps/:app/installations` collection node.
pub struct Installations<C> {
    inv: Invocation<C>,
    push: Invocation<C>,
}

impl<C: HttpClient> Installations<C> {
    /// Register a device installation.
    pub async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
        self.inv.post(body).await
    }

    /// Push to every installation matching the given `where` predicate.
    pub fn push(&self, r#where: Value) -> PushInvocation<C> {
        PushInvocation::new(self.push.clone(), json!({"where": r#where}))
    }
}

/// `/apps/:app/installations/:device` item node.
pub struct Installation<C> {
    inv: Invocation<C>,
    push: Invocation<C>,
    device: String,
}

impl<C: HttpClient> Installation<C> {
    /// Fetch this installation.
    pub async fn get(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
        self.inv.get(filter).await
    }

    /// Delete this installation.
    pub async fn delete(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
        self.inv.delete(filter).await
    }

    /// Push to this one device.
    pub fn push(&self) -> PushInvocation<C> {
        PushInvocation::new(self.push.clone(), json!({"where": {"device": self.device}}))
    }
}

/// `/channels/:app` node: REST send plus the persistent socket.
pub struct Channel<C, W> {
    inv: Invocation<C>,
    ws: Arc<W>,
    ws_url: Url,
}

impl<C, W> Channel<C, W> {
    pub(crate) fn new(inv: Invocation<C>, ws: Arc<W>, ws_url: Url) -> Self {
        Self { inv, ws, ws_url }
    }
}

impl<C: HttpClient, W> Channel<C, W> {
    /// Send a message over the REST fallback path.
    pub async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
        self.inv.post(body).await
    }
}

impl<C, W: WebSocketClient> Channel<C, W> {
    /// Open a channel session over the persistent socket.
    ///
    /// A dropped connection is terminal; create a new session to reconnect.
    pub async fn connect(&self) -> Result<ChannelSession> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("channel_connect", url = %self.ws_url).entered();

        let conn = self
            .ws
            .connect(self.ws_url.clone())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(ChannelSession::start(conn))
    }
}
