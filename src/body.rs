use std::{
    fmt, mem,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures_core::{ready, Stream};
use futures_util::{StreamExt, TryStreamExt};
use http::HeaderMap;
use http_body::{Body as HttpBody, SizeHint};
use tokio::sync::OwnedSemaphorePermit;

use crate::error::{BoxError, Error};

type BoxStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + Sync>>;

/// A request body handed to the engine.
///
/// The engine derives the `Content-Length` of the outgoing request from this
/// body: buffered bodies always have an exact length, streaming bodies only
/// when one is supplied. Streams without a known length are sent with chunked
/// transfer-encoding on HTTP/1.1.
pub struct RequestBody {
    inner: Inner,
}

enum Inner {
    Reusable(Bytes),
    Streaming { stream: BoxStream, length: Option<u64> },
}

// ===== impl RequestBody =====

impl RequestBody {
    /// An empty body.
    #[inline]
    pub fn empty() -> RequestBody {
        RequestBody::reusable(Bytes::new())
    }

    /// Wrap a futures `Stream` of unknown length in a box inside `RequestBody`.
    ///
    /// # Example
    ///
    /// ```
    /// # use reactive_http_client::RequestBody;
    /// let chunks: Vec<Result<_, ::std::io::Error>> = vec![Ok("hello"), Ok(" "), Ok("world")];
    ///
    /// let stream = futures_util::stream::iter(chunks);
    ///
    /// let body = RequestBody::wrap_stream(stream);
    /// assert_eq!(body.content_length(), None);
    /// ```
    pub fn wrap_stream<S>(stream: S) -> RequestBody
    where
        S: futures_core::TryStream + Send + Sync + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        RequestBody::stream(stream, None)
    }

    /// Wrap a futures `Stream` producing exactly `length` bytes.
    ///
    /// The engine sends `length` as the request's `Content-Length` and fails
    /// the request if the stream yields a different amount.
    pub fn wrap_stream_with_length<S>(stream: S, length: u64) -> RequestBody
    where
        S: futures_core::TryStream + Send + Sync + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        RequestBody::stream(stream, Some(length))
    }

    fn stream<S>(stream: S, length: Option<u64>) -> RequestBody
    where
        S: futures_core::TryStream + Send + Sync + 'static,
        S::Error: Into<BoxError>,
        Bytes: From<S::Ok>,
    {
        let stream = stream
            .map_ok(Bytes::from)
            .map_err(Into::<BoxError>::into)
            .into_stream();
        RequestBody {
            inner: Inner::Streaming {
                stream: Box::pin(stream),
                length,
            },
        }
    }

    #[inline]
    pub(crate) fn reusable(chunk: Bytes) -> RequestBody {
        RequestBody {
            inner: Inner::Reusable(chunk),
        }
    }

    /// Returns a reference to the internal data of the body.
    ///
    /// `None` is returned if the underlying data is a stream.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.inner {
            Inner::Reusable(ref bytes) => Some(bytes.as_ref()),
            Inner::Streaming { .. } => None,
        }
    }

    /// The exact length of the body, if known.
    pub fn content_length(&self) -> Option<u64> {
        match self.inner {
            Inner::Reusable(ref bytes) => Some(bytes.len() as u64),
            Inner::Streaming { length, .. } => length,
        }
    }
}

impl HttpBody for RequestBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_data(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, BoxError>>> {
        match self.inner {
            Inner::Reusable(ref mut bytes) => {
                if bytes.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(mem::take(bytes))))
                }
            }
            Inner::Streaming { ref mut stream, .. } => stream.as_mut().poll_next(cx),
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap>, BoxError>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        match self.inner {
            Inner::Reusable(ref bytes) => bytes.is_empty(),
            Inner::Streaming { length, .. } => length == Some(0),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self.content_length() {
            Some(length) => SizeHint::with_exact(length),
            None => SizeHint::default(),
        }
    }
}

impl Default for RequestBody {
    #[inline]
    fn default() -> RequestBody {
        RequestBody::empty()
    }
}

impl From<Bytes> for RequestBody {
    #[inline]
    fn from(bytes: Bytes) -> RequestBody {
        RequestBody::reusable(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    #[inline]
    fn from(vec: Vec<u8>) -> RequestBody {
        RequestBody::reusable(vec.into())
    }
}

impl From<&'static [u8]> for RequestBody {
    #[inline]
    fn from(s: &'static [u8]) -> RequestBody {
        RequestBody::reusable(Bytes::from_static(s))
    }
}

impl From<String> for RequestBody {
    #[inline]
    fn from(s: String) -> RequestBody {
        RequestBody::reusable(s.into())
    }
}

impl From<&'static str> for RequestBody {
    #[inline]
    fn from(s: &'static str) -> RequestBody {
        s.as_bytes().into()
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("RequestBody");
        match self.inner {
            Inner::Reusable(ref bytes) => builder.field("len", &bytes.len()),
            Inner::Streaming { length, .. } => builder.field("streaming_len", &length),
        };
        builder.finish()
    }
}

/// A streaming response body.
///
/// While the body is alive it counts against the client's connection limit;
/// reading it to the end or dropping it gives the slot back.
pub struct ResponseBody {
    inner: hyper::Body,
    permit: Option<OwnedSemaphorePermit>,
}

// ===== impl ResponseBody =====

impl ResponseBody {
    pub(crate) fn new(inner: hyper::Body, permit: OwnedSemaphorePermit) -> ResponseBody {
        ResponseBody {
            inner,
            permit: Some(permit),
        }
    }

    /// The exact length of the body, if the engine knows it.
    pub fn content_length(&self) -> Option<u64> {
        HttpBody::size_hint(&self.inner).exact()
    }

    /// Collects the full body.
    ///
    /// # Errors
    ///
    /// Fails if the engine reports an error while the body is streamed.
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ResponseBody {
    type Item = crate::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match ready!(Pin::new(&mut self.inner).poll_data(cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Some(Err(err)) => {
                self.permit.take();
                Poll::Ready(Some(Err(Error::body(err))))
            }
            None => {
                self.permit.take();
                Poll::Ready(None)
            }
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_length", &self.content_length())
            .finish()
    }
}
