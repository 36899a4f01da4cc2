//! Caller-side description of one API call.
//!
//! # Design
//! A `RequestDescriptor` says *what* to call: method, path relative to the
//! base URL, payload, whether a session is required and an optional timeout
//! override. It is built with consuming builder methods and is immutable once
//! handed to `RequestClient`, which only ever borrows it.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::RequestError;
use crate::http::HttpMethod;
use crate::upload::{UploadCategory, UploadFile};

/// Where a structured payload goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Serialized as the JSON request body.
    Json,
    /// Flattened into `application/x-www-form-urlencoded` query parameters.
    Query,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Structured { value: Value, encoding: PayloadEncoding },
    Upload { category: UploadCategory, file: UploadFile },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    url: String,
    payload: Payload,
    requires_auth: bool,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            payload: Payload::None,
            requires_auth: true,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Multipart upload of `file` to the category's endpoint.
    pub fn upload(category: UploadCategory, file: UploadFile) -> Self {
        Self {
            payload: Payload::Upload { category, file },
            ..Self::post(category.endpoint())
        }
    }

    /// Attach a payload using the method's natural encoding: query string for
    /// GET and DELETE, JSON body for POST and PUT.
    pub fn payload(self, value: impl Serialize) -> Result<Self, RequestError> {
        let encoding = if self.method.prefers_query() {
            PayloadEncoding::Query
        } else {
            PayloadEncoding::Json
        };
        self.encoded(value, encoding)
    }

    pub fn json(self, value: impl Serialize) -> Result<Self, RequestError> {
        self.encoded(value, PayloadEncoding::Json)
    }

    pub fn query(self, value: impl Serialize) -> Result<Self, RequestError> {
        self.encoded(value, PayloadEncoding::Query)
    }

    pub fn encoded(mut self, value: impl Serialize, encoding: PayloadEncoding) -> Result<Self, RequestError> {
        let value = serde_json::to_value(value).map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
        if encoding == PayloadEncoding::Query && !(value.is_object() || value.is_null()) {
            return Err(RequestError::InvalidRequest(
                "query payload must serialize to an object".to_string(),
            ));
        }
        self.payload = Payload::Structured { value, encoding };
        Ok(self)
    }

    /// Mark the call as callable without a session.
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn payload_ref(&self) -> &Payload {
        &self.payload
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.payload, Payload::Upload { .. })
    }

    pub fn upload_category(&self) -> Option<UploadCategory> {
        match &self.payload {
            Payload::Upload { category, .. } => Some(*category),
            _ => None,
        }
    }
}
