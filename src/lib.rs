#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, deny(warnings))]

//! # reactive-http-client
//!
//! An adapter letting an SDK's request pipeline run its HTTP calls on
//! [hyper]'s pooled, asynchronous client without depending on hyper's API.
//!
//! The SDK describes a call with the types in [`spi`] and hands it to a
//! [`ReactiveHttpClient`]. The client translates the headers (pulling out
//! `Content-Type` and `Content-Length`, which the engine treats as properties
//! of the body), streams the body and resolves to the response head, with the
//! response body streaming afterwards.
//!
//! ## Building a client
//!
//! Clients are built by an [`AsyncHttpClientFactory`]. The connection pool
//! settings a client is bound to come from, in order of precedence:
//!
//! - a builder function installed on the factory,
//! - an [`AttributeMap`](attribute::AttributeMap) passed to
//!   [`build_with_defaults`](AsyncHttpClientFactory::build_with_defaults),
//!   with missing options taken from the [`EngineDefaults`] table,
//! - the base configuration, which is
//!   [`ConnectionPoolSettings::from_env`] unless one was injected.
//!
//! ```rust
//! use reactive_http_client::spi::{ExecuteRequest, SdkHttpRequest};
//! use reactive_http_client::{AsyncHttpClientFactory, Method};
//!
//! # async fn run() -> reactive_http_client::Result<()> {
//! let client = AsyncHttpClientFactory::new().build()?;
//!
//! let request = SdkHttpRequest::new(Method::POST, "http://localhost:8080/items".parse().unwrap())
//!     .header("Content-Type", "application/json")
//!     .header("Accept", "application/json");
//!
//! let response = client
//!     .execute(ExecuteRequest::new(request).body(r#"{"name":"widget"}"#))
//!     .await?;
//!
//! let status = response.status();
//! println!("{} {}", status, response.text().await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Engine defaults and base configuration
//!
//! [`EngineDefaults::builtin`] holds the built-in values (connect timeout
//! 2s, read timeout 30s, idle timeout 60s, 50 connections, unbounded
//! lifetime) and backs options missing from an attribute map. The base
//! configuration comes from [`EngineDefaults::global`], the same values with
//! overrides from the environment:
//!
//! - `REACTIVE_HTTP_CONNECT_TIMEOUT_MS`
//! - `REACTIVE_HTTP_READ_TIMEOUT_MS`
//! - `REACTIVE_HTTP_POOLED_IDLE_TIMEOUT_MS`
//! - `REACTIVE_HTTP_MAX_CONNECTIONS`
//! - `REACTIVE_HTTP_CONNECTION_TTL_MS` (`0` is unbounded)
//!
//! An empty variable removes the entry, which makes loading the base
//! configuration fail.
//!
//! ## Optional Features
//!
//! - **rustls-tls** *(enabled by default)*: connect to `https` URIs using
//!   `rustls` with the webpki root certificates.
//!
//! [hyper]: https://hyper.rs

pub use http::{Method, StatusCode, Uri};

pub use self::body::{RequestBody, ResponseBody};
pub use self::client::{AsyncHttpClientFactory, Pending, ReactiveHttpClient};
pub use self::content_type::ContentType;
pub use self::error::{BoxError, Error, Result};
pub use self::header::HeaderSet;
pub use self::pool::{ConnectionPoolSettings, EngineDefaults};

pub mod attribute;
mod body;
mod client;
mod content_type;
mod error;
pub mod header;
pub mod pool;
pub mod spi;
