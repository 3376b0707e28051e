use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::header::{HeaderValue, CONTENT_TYPE};
use log::{debug, trace};
use pin_project_lite::pin_project;

pub use self::factory::AsyncHttpClientFactory;
use self::engine::Engine;
use crate::{
    error::TimedOut,
    header::{self, HeaderSet, Translated},
    pool::ConnectionPoolSettings,
    spi::{ExecuteRequest, SdkAsyncHttpClient, SdkResponse},
    Error, ResponseBody,
};

mod engine;
mod factory;

/// An asynchronous HTTP client executing SDK requests on a pooled engine.
///
/// The client is bound to the [`ConnectionPoolSettings`] it was built with and
/// never changes afterwards. It holds its engine handle in an `Arc`, so it is
/// cheap to clone and safe to share between tasks; clones use the same pool.
///
/// Clients are obtained from an [`AsyncHttpClientFactory`].
#[derive(Clone)]
pub struct ReactiveHttpClient {
    inner: Arc<ClientRef>,
}

struct ClientRef {
    settings: ConnectionPoolSettings,
    engine: Engine,
}

impl ReactiveHttpClient {
    /// Creates an `AsyncHttpClientFactory` to configure a client.
    ///
    /// This is the same as `AsyncHttpClientFactory::new()`.
    pub fn builder() -> AsyncHttpClientFactory {
        AsyncHttpClientFactory::new()
    }

    pub(crate) fn new(settings: ConnectionPoolSettings) -> ReactiveHttpClient {
        debug!("building client with {:?}", settings);
        let engine = Engine::new(&settings);
        ReactiveHttpClient {
            inner: Arc::new(ClientRef { settings, engine }),
        }
    }

    /// The settings this client is bound to.
    pub fn connection_pool_settings(&self) -> &ConnectionPoolSettings {
        &self.inner.settings
    }

    /// Executes a request.
    ///
    /// The headers are translated for the engine, the content type is
    /// attached as `Content-Type` and the body is streamed as given. The
    /// returned future resolves once the response head has arrived; the
    /// response body streams afterwards.
    ///
    /// While the exchange is in flight it holds one of the client's
    /// `max_connections` slots. If none is free the request waits for one.
    ///
    /// # Errors
    ///
    /// The future fails if the request cannot be represented for the engine
    /// (a URI that is not `http` or `https`, an invalid header), if the
    /// connection cannot be established, or if the response head does not
    /// arrive within the read timeout. Nothing is retried.
    pub fn execute(&self, request: ExecuteRequest) -> Pending {
        let (request, body) = request.into_parts();
        let (method, uri, headers) = request.into_parts();

        match uri.scheme_str() {
            Some("http") | Some("https") => (),
            _ => return Pending::new_err(Error::uri_bad_scheme(uri)),
        }

        let headers = match engine_headers(&headers) {
            Ok(headers) => headers,
            Err(err) => return Pending::new_err(err.with_uri(uri)),
        };

        let mut req = hyper::Request::new(body.unwrap_or_default());
        *req.method_mut() = method;
        *req.uri_mut() = uri.clone();
        *req.headers_mut() = headers;

        let client = self.inner.clone();
        Pending {
            inner: PendingInner::Request(Box::pin(async move {
                let permit = client
                    .engine
                    .permits()
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|err| Error::request(err).with_uri(uri.clone()))?;

                trace!("dispatching {} {}", req.method(), uri);
                let hyper = client.engine.checkout();
                let read_timeout = client.settings.read_timeout();

                let res = match tokio::time::timeout(read_timeout, hyper.request(req)).await {
                    Ok(Ok(res)) => res,
                    Ok(Err(err)) => return Err(Error::request(err).with_uri(uri)),
                    Err(_) => return Err(Error::request(TimedOut).with_uri(uri)),
                };

                trace!("response {} from {}", res.status(), uri);
                let (parts, body) = res.into_parts();
                Ok(SdkResponse::new(
                    parts.status,
                    HeaderSet::from(&parts.headers),
                    ResponseBody::new(body, permit),
                ))
            })),
        }
    }
}

fn engine_headers(headers: &HeaderSet) -> crate::Result<http::HeaderMap> {
    let Translated {
        content_type,
        headers,
    } = header::translate(headers)?;

    let mut map = headers.into_map();
    if let Some(content_type) = content_type {
        let value = HeaderValue::from_str(content_type.as_str()).map_err(Error::builder)?;
        map.insert(CONTENT_TYPE, value);
    }
    Ok(map)
}

impl fmt::Debug for ReactiveHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReactiveHttpClient")
            .field("settings", &self.inner.settings)
            .field(
                "available_connections",
                &self.inner.engine.permits().available_permits(),
            )
            .finish()
    }
}

impl SdkAsyncHttpClient for ReactiveHttpClient {
    fn execute(&self, request: ExecuteRequest) -> Pending {
        ReactiveHttpClient::execute(self, request)
    }

    fn client_name(&self) -> &'static str {
        "ReactiveHttpClient"
    }
}

impl tower_service::Service<ExecuteRequest> for ReactiveHttpClient {
    type Response = SdkResponse;
    type Error = crate::Error;
    type Future = Pending;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExecuteRequest) -> Self::Future {
        self.execute(req)
    }
}

impl tower_service::Service<ExecuteRequest> for &'_ ReactiveHttpClient {
    type Response = SdkResponse;
    type Error = crate::Error;
    type Future = Pending;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExecuteRequest) -> Self::Future {
        self.execute(req)
    }
}

type ResponseFuture = Pin<Box<dyn Future<Output = crate::Result<SdkResponse>> + Send>>;

pin_project! {
    /// A `Future` that will resolve to an [`SdkResponse`].
    #[must_use = "futures do nothing unless polled"]
    pub struct Pending {
        #[pin]
        inner: PendingInner,
    }
}

enum PendingInner {
    Request(ResponseFuture),
    Error(Option<crate::Error>),
}

impl Pending {
    pub(crate) fn new_err(err: crate::Error) -> Pending {
        Pending {
            inner: PendingInner::Error(Some(err)),
        }
    }

    fn inner(self: Pin<&mut Self>) -> Pin<&mut PendingInner> {
        self.project().inner
    }
}

impl Future for Pending {
    type Output = crate::Result<SdkResponse>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.inner();
        match inner.get_mut() {
            PendingInner::Request(ref mut req) => req.as_mut().poll(cx),
            PendingInner::Error(ref mut err) => Poll::Ready(Err(err
                .take()
                .expect("Pending error polled more than once"))),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner {
            PendingInner::Request(_) => f.debug_struct("Pending").finish_non_exhaustive(),
            PendingInner::Error(ref err) => f.debug_struct("Pending").field("error", err).finish(),
        }
    }
}
