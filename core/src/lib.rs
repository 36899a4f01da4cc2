//! Envelope-aware API client core for the study app backend.
//!
//! # Overview
//! Every backend endpoint answers with a `{code, success?, message?, data}`
//! envelope and authenticates with a bearer token. `RequestClient` applies
//! that contract uniformly: a local auth guard, header injection, dispatch
//! through an injected `Transport`, classification of the outcome and
//! unwrapping of `data`.
//!
//! # Design
//! - The host-does-IO split stays visible: `build_request` and
//!   `parse_response` are pure; `send` composes them around the transport.
//! - Collaborators are traits behind `Arc`: `Transport` (network),
//!   `SessionStore` (token + user persistence) and `Presenter` (UI hooks), so
//!   the browser and mini-program variants differ only in what is injected.
//! - No retries, no caching, no cancellation. The session is the only shared
//!   state and is replaced last-writer-wins.

pub mod client;
pub mod config;
pub mod descriptor;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod http;
pub mod presenter;
pub mod session;
pub mod transport;
pub mod upload;

pub use client::RequestClient;
pub use config::ClientConfig;
pub use descriptor::{Payload, PayloadEncoding, RequestDescriptor};
pub use envelope::Envelope;
pub use error::{RequestError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use presenter::{Presenter, TracingPresenter};
pub use session::{
    JsonFileStorage, KeyValueStorage, MemorySessionStore, Session, SessionStore, StorageKeys,
    StorageSessionStore,
};
pub use transport::{BoxFuture, Transport, UreqTransport};
pub use upload::{UploadCategory, UploadFile};
