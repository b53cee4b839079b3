use std::collections::VecDeque;
use std::sync::Arc;

use brook::http_client::{FormPart, HttpClient, MultipartClient};
use brook::websocket::tungstenite_client::TungsteniteClient;
use brook::{Brook, ClientConfig, ClientError, Filter, ResponseBody, Upload};
use http::{Method, Response as HttpResponse, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockClient {
    // Queue of HTTP responses to pop for each call
    queue: Arc<Mutex<VecDeque<HttpResponse<Vec<u8>>>>>,
    // Capture requests for assertions
    log: Arc<Mutex<Vec<http::Request<Vec<u8>>>>>,
    forms: Arc<Mutex<Vec<http::Request<FormPart>>>>,
}

impl MockClient {
    async fn push(&self, resp: HttpResponse<Vec<u8>>) {
        self.queue.lock().await.push_back(resp);
    }
    async fn take_log(&self) -> Vec<http::Request<Vec<u8>>> {
        let mut log = self.log.lock().await;
        let out = std::mem::take(&mut *log);
        out
    }
    async fn take_forms(&self) -> Vec<http::Request<FormPart>> {
        let mut forms = self.forms.lock().await;
        std::mem::take(&mut *forms)
    }
    async fn call_count(&self) -> usize {
        self.log.lock().await.len() + self.forms.lock().await.len()
    }
}

impl HttpClient for MockClient {
    type Error = std::convert::Infallible;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let log = self.log.clone();
        let queue = self.queue.clone();
        async move {
            log.lock().await.push(request);
            Ok(queue.lock().await.pop_front().expect("no queued response"))
        }
    }
}

impl MultipartClient for MockClient {
    fn send_form(
        &self,
        request: http::Request<FormPart>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let forms = self.forms.clone();
        let queue = self.queue.clone();
        async move {
            forms.lock().await.push(request);
            Ok(queue.lock().await.pop_front().expect("no queued response"))
        }
    }
}

fn response(status: u16, body: &str) -> HttpResponse<Vec<u8>> {
    HttpResponse::builder()
        .status(StatusCode::from_u16(status).unwrap())
        .body(body.as_bytes().to_vec())
        .unwrap()
}

fn client(key: Option<&str>) -> (Brook<MockClient, TungsteniteClient>, MockClient) {
    let config = ClientConfig::builder()
        .host("api.example.com")
        .maybe_key(key)
        .build();
    let mock = MockClient::default();
    let brook = Brook::with_clients(config, mock.clone(), TungsteniteClient::new())
        .expect("valid host");
    (brook, mock)
}

#[test]
#[should_panic(expected = "Invalid credentials")]
fn authenticated_accessor_without_key_panics() {
    let (brook, _mock) = client(None);
    let _ = brook.apps();
}

#[test]
#[should_panic(expected = "Invalid app")]
fn channels_without_app_panics() {
    let (brook, _mock) = client(Some("abc123"));
    let _ = brook.channels("");
}

#[tokio::test]
async fn login_adopts_key_and_targets_apps() {
    let (brook, mock) = client(None);
    mock.push(response(200, r#"{"email":"a@b.com","key":"abc123"}"#))
        .await;
    mock.push(response(200, "[]")).await;

    brook.login("a@b.com", "pw").await.unwrap();
    brook.apps().get(None).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log.len(), 2);

    // Basic base64("a@b.com:pw")
    assert_eq!(
        log[0].headers().get("authorization").unwrap(),
        "Basic YUBiLmNvbTpwdw=="
    );
    assert_eq!(log[0].uri(), "http://api.example.com/api/v1/me");

    assert_eq!(log[1].uri(), "http://api.example.com/api/v1/apps");
    assert_eq!(log[1].headers().get("key").unwrap(), "abc123");
    assert_eq!(brook.key().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn login_does_not_overwrite_configured_key() {
    let (brook, mock) = client(Some("configured"));
    mock.push(response(200, r#"{"key":"other"}"#)).await;

    brook.login("a@b.com", "pw").await.unwrap();

    assert_eq!(brook.key().as_deref(), Some("configured"));
}

#[tokio::test]
async fn login_failure_reports_upstream_status() {
    let (brook, mock) = client(None);
    mock.push(response(401, "bad credentials")).await;

    let err = brook.login("a@b.com", "nope").await.unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert!(brook.key().is_none());
}

#[tokio::test]
async fn get_filter_becomes_query_string_and_no_body() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "[]")).await;

    let filter = Filter::new().where_clause(json!({"a": 1}));
    brook.users().get(Some(&filter)).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::GET);
    assert_eq!(
        log[0].uri(),
        "http://api.example.com/api/v1/users?where=%7B%22a%22%3A1%7D"
    );
    assert!(log[0].body().is_empty());
}

#[tokio::test]
async fn post_body_goes_verbatim_without_query() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(201, r#"{"_id":"u1"}"#)).await;

    let body = json!({"email": "new@b.com", "where": {"not": "a filter"}});
    brook.users().post(&body).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::POST);
    assert_eq!(log[0].uri(), "http://api.example.com/api/v1/users");
    assert_eq!(
        log[0].headers().get("content-type").unwrap(),
        "application/json"
    );
    let sent: Value = serde_json::from_slice(log[0].body()).unwrap();
    assert_eq!(sent, body);
}

#[tokio::test]
async fn data_record_round_trip_preserves_id() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(201, r#"{"_id":"r1","title":"hello"}"#))
        .await;
    mock.push(response(200, r#"{"_id":"r1","title":"hello"}"#))
        .await;

    let collection = brook.app("kit").collection("posts");
    let created = collection
        .data()
        .post(&json!({"title": "hello"}))
        .await
        .unwrap();
    let id = created.as_json().unwrap()["_id"].as_str().unwrap().to_owned();

    let fetched = collection.record(&id).get(None).await.unwrap();
    assert_eq!(fetched.as_json().unwrap()["_id"], json!(id));

    let log = mock.take_log().await;
    assert_eq!(
        log[0].uri(),
        "http://api.example.com/api/v1/apps/kit/collections/posts/data"
    );
    assert_eq!(
        log[1].uri(),
        "http://api.example.com/api/v1/apps/kit/collections/posts/data/r1"
    );
}

#[tokio::test]
async fn delete_on_missing_resource_is_a_protocol_failure() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(404, "not found")).await;

    let err = brook
        .app("kit")
        .collection("posts")
        .record("gone")
        .delete(None)
        .await
        .unwrap_err();

    match err {
        ClientError::Http(err) => {
            assert_eq!(err.status.as_u16(), 404);
            assert_eq!(err.message, "not found");
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn sibling_chains_do_not_share_urls() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "[]")).await;
    mock.push(response(200, r#"{"android":1}"#)).await;

    let app = brook.app("kit");
    let users = app.users();

    users.get(None).await.unwrap();
    users.push("a@b.com").send(&json!({"alert": "hi"})).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].uri(), "http://api.example.com/api/v1/apps/kit/users");
    // push targets the app's push endpoint, not a users subpath
    assert_eq!(log[1].uri(), "http://api.example.com/api/v1/apps/kit/push");

    let sent: Value = serde_json::from_slice(log[1].body()).unwrap();
    assert_eq!(
        sent,
        json!({
            "notification": {"alert": "hi"},
            "filter": {"where": {"createdBy": "a@b.com"}},
        })
    );
}

#[tokio::test]
async fn installation_push_closes_over_device_filter() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "{}")).await;

    brook
        .app("kit")
        .installation("device-9")
        .push()
        .send(&json!({"alert": "ping"}))
        .await
        .unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::POST);
    assert_eq!(log[0].uri(), "http://api.example.com/api/v1/apps/kit/push");

    let sent: Value = serde_json::from_slice(log[0].body()).unwrap();
    assert_eq!(sent["filter"], json!({"where": {"device": "device-9"}}));
}

#[tokio::test]
async fn empty_upload_fails_before_any_network_call() {
    let (brook, mock) = client(Some("abc123"));

    let upload = Upload::builder().base64("").build();
    let err = brook.user("u1").avatar().put(&upload).await.unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(mock.call_count().await, 0);
}

#[tokio::test]
async fn avatar_upload_submits_multipart_file_field() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "")).await;

    let upload = Upload::builder()
        .base64("aGVsbG8=") // "hello"
        .filename("me.png")
        .content_type("image/png")
        .build();
    brook.user("u1").avatar().put(&upload).await.unwrap();

    let forms = mock.take_forms().await;
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].method(), Method::PUT);
    assert_eq!(
        forms[0].uri(),
        "http://api.example.com/api/v1/users/u1/avatar"
    );

    let part = forms[0].body();
    assert_eq!(part.field, "file");
    assert_eq!(part.bytes.as_ref(), b"hello");
    assert_eq!(part.filename.as_deref(), Some("me.png"));
    assert_eq!(part.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn configured_lang_and_trigger_flags_become_headers() {
    let config = ClientConfig::builder()
        .host("api.example.com")
        .key("abc123")
        .lang("es")
        .fill_with_default_lang(true)
        .avoid_trigger(true)
        .build();
    let mock = MockClient::default();
    let brook =
        Brook::with_clients(config, mock.clone(), TungsteniteClient::new()).unwrap();
    mock.push(response(200, "[]")).await;

    brook.apps().get(None).await.unwrap();

    let log = mock.take_log().await;
    let headers = log[0].headers();
    assert_eq!(headers.get("lang").unwrap(), "es");
    assert_eq!(headers.get("fill-with-default-lang").unwrap(), "true");
    assert_eq!(headers.get("avoid-trigger").unwrap(), "true");
}

#[tokio::test]
async fn non_json_response_passes_through_raw() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "plain ack")).await;

    let body = brook.app("kit").get(None).await.unwrap();
    assert_eq!(body, ResponseBody::Raw("plain ack".to_owned()));
}

#[tokio::test]
async fn channel_rest_send_skips_the_api_prefix() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, "{}")).await;

    brook
        .channels("kit")
        .post(&json!({"to": "a@b.com", "data": {"test": "value2"}}))
        .await
        .unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::POST);
    assert_eq!(log[0].uri(), "http://api.example.com/channels/kit");
}

#[tokio::test]
async fn user_app_membership_path_nests_under_user() {
    let (brook, mock) = client(Some("abc123"));
    mock.push(response(200, r#"{"role":"admin"}"#)).await;

    brook.user("u1").app("kit").get(None).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(
        log[0].uri(),
        "http://api.example.com/api/v1/users/u1/apps/kit"
    );
}
