//! The request pipeline.
//!
//! # Design
//! `RequestClient` keeps the build/parse split: `build_request` turns a
//! `RequestDescriptor` into a plain-data `HttpRequest` (auth guard, headers,
//! body encoding, timeout) and `parse_response` classifies a plain-data
//! `HttpResponse` (status line, envelope). Both are pure. `send` strings them
//! together around the injected `Transport` and is the only place with side
//! effects: session teardown on 401 and failure presentation.
//!
//! Stages per call: guard -> dispatch -> classify -> unwrap. Nothing is
//! retried and nothing is cached; the session is read once per call.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::descriptor::{Payload, PayloadEncoding, RequestDescriptor};
use crate::envelope::{Envelope, FALLBACK_MESSAGE};
use crate::error::RequestError;
use crate::http::{HttpRequest, HttpResponse};
use crate::presenter::{Presenter, TracingPresenter};
use crate::session::{Session, SessionStore};
use crate::transport::Transport;
use crate::upload::{MultipartBody, UploadCategory, UploadFile};

const JSON_CONTENT_TYPE: &str = "application/json";
const NETWORK_ERROR_MESSAGE: &str = "Network error";
const UPLOAD_FAILED_MESSAGE: &str = "Upload failed";

/// Envelope client for the study API.
///
/// Cheap to clone; clones share the transport, session store and presenter.
#[derive(Clone)]
pub struct RequestClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    presenter: Arc<dyn Presenter>,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Login payload returned by both sign-in endpoints.
#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    #[serde(default, alias = "userInfo")]
    user: Value,
}

impl RequestClient {
    /// Client that presents failures through `TracingPresenter`.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, session: Arc<dyn SessionStore>) -> Self {
        Self::with_presenter(config, transport, session, Arc::new(TracingPresenter))
    }

    pub fn with_presenter(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            session,
            presenter,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Timeout for `descriptor`: explicit override, then the upload category's
    /// timeout, then the default.
    pub fn resolve_timeout(&self, descriptor: &RequestDescriptor) -> Duration {
        descriptor
            .timeout_override()
            .or_else(|| descriptor.upload_category().map(|c| self.config.upload_timeout(c)))
            .unwrap_or(self.config.timeout)
    }

    /// Build the wire request for `descriptor` using `token` as the session
    /// token. Fails with `Unauthenticated` when auth is required and no token
    /// is available.
    pub fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<HttpRequest, RequestError> {
        let token = token.filter(|t| !t.is_empty());
        if descriptor.requires_auth() && token.is_none() {
            return Err(RequestError::Unauthenticated);
        }

        let mut url = self.resolve_url(descriptor.url())?;
        let mut headers = Vec::with_capacity(2);
        let body = match descriptor.payload_ref() {
            Payload::None => {
                headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
                None
            }
            Payload::Structured {
                value,
                encoding: PayloadEncoding::Json,
            } => {
                headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
                Some(serde_json::to_vec(value).map_err(|e| RequestError::InvalidRequest(e.to_string()))?)
            }
            Payload::Structured {
                value,
                encoding: PayloadEncoding::Query,
            } => {
                append_query(&mut url, value)?;
                headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
                None
            }
            Payload::Upload { file, .. } => {
                let multipart = MultipartBody::single_file(file);
                headers.push(("content-type".to_string(), multipart.content_type()));
                Some(multipart.bytes)
            }
        };

        if descriptor.requires_auth() {
            if let Some(token) = token {
                headers.push(("authorization".to_string(), format!("Bearer {token}")));
            }
        }

        Ok(HttpRequest {
            method: descriptor.method(),
            url: url.into(),
            headers,
            body,
            timeout: self.resolve_timeout(descriptor),
        })
    }

    /// Classify a response. Performs no side effects; a 401 maps to
    /// `SessionExpired` and it is up to the caller to tear the session down.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, RequestError> {
        if response.status == 401 {
            return Err(RequestError::SessionExpired);
        }
        if !response.is_success() {
            return Err(RequestError::Http {
                status: response.status,
                body: response.body,
            });
        }
        Envelope::from_body(&response.body)?.into_result()
    }

    /// Run one call and return the envelope's `data`.
    #[instrument(
        name = "request",
        skip(self, descriptor),
        fields(method = %descriptor.method(), url = descriptor.url())
    )]
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<Value, RequestError> {
        let result = self.execute(descriptor).await;
        match &result {
            Ok(_) => debug!("request succeeded"),
            Err(err) => self.surface(err, descriptor.is_multipart()),
        }
        result
    }

    /// `send`, then decode `data` into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T, RequestError> {
        let data = self.send(descriptor).await?;
        serde_json::from_value(data).map_err(|e| RequestError::MalformedResponse(e.to_string()))
    }

    /// Upload `file` to the category endpoint with the category timeout.
    pub async fn upload(&self, category: UploadCategory, file: UploadFile) -> Result<Value, RequestError> {
        self.send(&RequestDescriptor::upload(category, file)).await
    }

    /// Send a login call and persist the returned `{token, user}` as the
    /// session. The call is always made without an Authorization header.
    pub async fn sign_in(&self, descriptor: &RequestDescriptor) -> Result<Session, RequestError> {
        let descriptor = descriptor.clone().public();
        let login: LoginData = self.send_as(&descriptor).await?;
        if login.token.is_empty() {
            return Err(RequestError::MalformedResponse("login returned an empty token".to_string()));
        }
        let session = Session::new(login.token, login.user);
        self.session.set(session.clone());
        debug!("session established");
        Ok(session)
    }

    /// Send the logout call when a session exists, then clear the session
    /// whatever the outcome.
    pub async fn sign_out(&self, descriptor: &RequestDescriptor) -> Result<(), RequestError> {
        let result = match self.session.token() {
            Some(_) => self.send(descriptor).await.map(|_| ()),
            None => Ok(()),
        };
        self.session.clear();
        result
    }

    /// Callback-style adapter over `send`. Must be called from within a tokio
    /// runtime.
    pub fn dispatch<F>(&self, descriptor: RequestDescriptor, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Result<Value, RequestError>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.send(&descriptor).await;
            callback(result);
        })
    }

    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Value, RequestError> {
        let token = self.session.token();
        let request = self.build_request(descriptor, token.as_deref())?;
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "response received");
        let result = self.parse_response(response);
        if matches!(result, Err(RequestError::SessionExpired)) {
            self.session.clear();
        }
        result
    }

    /// Uploads report every non-business failure as "Upload failed".
    fn surface(&self, err: &RequestError, upload: bool) {
        warn!(error = %err, "request failed");
        match err {
            RequestError::Unauthenticated | RequestError::SessionExpired => self.presenter.navigate_to_login(),
            RequestError::Business { message, .. } => self.presenter.present_error(message),
            _ if upload => self.presenter.present_error(UPLOAD_FAILED_MESSAGE),
            RequestError::Transport(_) => self.presenter.present_error(NETWORK_ERROR_MESSAGE),
            RequestError::Http { .. } | RequestError::MalformedResponse(_) | RequestError::InvalidRequest(_) => {
                self.presenter.present_error(FALLBACK_MESSAGE)
            }
        }
    }

    fn resolve_url(&self, path: &str) -> Result<Url, RequestError> {
        let joined = if path.is_empty() || path.starts_with('/') {
            format!("{}{path}", self.config.base_url())
        } else {
            format!("{}/{path}", self.config.base_url())
        };
        Url::parse(&joined).map_err(|e| RequestError::InvalidRequest(format!("{joined}: {e}")))
    }
}

/// Flatten a JSON object into query pairs. Nulls are skipped; arrays repeat
/// the key.
fn append_query(url: &mut Url, value: &Value) -> Result<(), RequestError> {
    let map = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        _ => {
            return Err(RequestError::InvalidRequest(
                "query payload must be an object".to_string(),
            ))
        }
    };
    if map.values().all(Value::is_null) {
        return Ok(());
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.append_pair(key, &scalar(item));
                }
            }
            other => {
                pairs.append_pair(key, &scalar(other));
            }
        }
    }
    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
