//! The request and response model exchanged with the host SDK.
//!
//! The SDK's pipeline knows nothing about the engine. It builds an
//! [`ExecuteRequest`], hands it to an [`SdkAsyncHttpClient`] and gets an
//! [`SdkResponse`] back.

use std::fmt;

use bytes::Bytes;
use encoding_rs::UTF_8;
use http::{Method, StatusCode, Uri};

use crate::{
    attribute::AttributeMap, header::HeaderSet, ContentType, Pending, RequestBody, ResponseBody,
};

/// An HTTP client the host SDK can execute requests with.
pub trait SdkAsyncHttpClient: Send + Sync + fmt::Debug {
    /// Starts executing `request`.
    ///
    /// Nothing happens until the returned future is polled; dropping it
    /// cancels the exchange.
    fn execute(&self, request: ExecuteRequest) -> Pending;

    /// A short name identifying the implementation.
    fn client_name(&self) -> &'static str;
}

/// Builds an [`SdkAsyncHttpClient`] from the SDK's service configuration.
pub trait SdkAsyncHttpClientBuilder {
    /// The client produced.
    type Client: SdkAsyncHttpClient;

    /// Builds a client, reading options from `attributes`.
    ///
    /// # Errors
    ///
    /// Fails when the connection pool settings cannot be resolved.
    fn build_with_defaults(&self, attributes: &AttributeMap) -> crate::Result<Self::Client>;
}

/// The head of a request: method, URI and headers.
#[derive(Clone, Debug)]
pub struct SdkHttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderSet,
}

impl SdkHttpRequest {
    /// A request without headers.
    pub fn new(method: Method, uri: Uri) -> SdkHttpRequest {
        SdkHttpRequest {
            method,
            uri,
            headers: HeaderSet::new(),
        }
    }

    /// Appends a header value.
    #[must_use]
    pub fn header<N, V>(mut self, name: N, value: V) -> SdkHttpRequest
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderSet) -> SdkHttpRequest {
        self.headers = headers;
        self
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Get the headers.
    pub fn header_set(&self) -> &HeaderSet {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    pub fn header_set_mut(&mut self) -> &mut HeaderSet {
        &mut self.headers
    }

    /// Breaks the request into its parts.
    pub fn into_parts(self) -> (Method, Uri, HeaderSet) {
        (self.method, self.uri, self.headers)
    }
}

/// A request together with its optional body.
#[derive(Debug)]
pub struct ExecuteRequest {
    request: SdkHttpRequest,
    body: Option<RequestBody>,
}

impl ExecuteRequest {
    /// A request without a body.
    pub fn new(request: SdkHttpRequest) -> ExecuteRequest {
        ExecuteRequest {
            request,
            body: None,
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn body<B: Into<RequestBody>>(mut self, body: B) -> ExecuteRequest {
        self.body = Some(body.into());
        self
    }

    /// Get the request head.
    pub fn request(&self) -> &SdkHttpRequest {
        &self.request
    }

    /// Get the body, if any.
    pub fn request_body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Breaks the request into its head and body.
    pub fn into_parts(self) -> (SdkHttpRequest, Option<RequestBody>) {
        (self.request, self.body)
    }
}

impl From<SdkHttpRequest> for ExecuteRequest {
    fn from(request: SdkHttpRequest) -> ExecuteRequest {
        ExecuteRequest::new(request)
    }
}

/// A response with a streaming body.
pub struct SdkResponse {
    status: StatusCode,
    headers: HeaderSet,
    body: ResponseBody,
}

impl SdkResponse {
    pub(crate) fn new(status: StatusCode, headers: HeaderSet, body: ResponseBody) -> SdkResponse {
        SdkResponse {
            status,
            headers,
            body,
        }
    }

    /// Get the `StatusCode` of this `SdkResponse`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers of this `SdkResponse`.
    #[inline]
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// The resolved `Content-Type` of the response, if any.
    pub fn content_type(&self) -> Option<ContentType> {
        self.headers
            .first(http::header::CONTENT_TYPE.as_str())
            .map(ContentType::resolve)
    }

    /// Get the content length of the response, if it is known.
    pub fn content_length(&self) -> Option<u64> {
        self.body.content_length()
    }

    /// Consumes the response, returning the body stream.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Get the full response body as `Bytes`.
    ///
    /// # Errors
    ///
    /// Fails if the body stream fails.
    pub async fn bytes(self) -> crate::Result<Bytes> {
        self.body.bytes().await
    }

    /// Get the full response text.
    ///
    /// The body is decoded with the `charset` parameter of the response's
    /// `Content-Type`, UTF-8 when there is none or it is not a known label.
    /// Malformed sequences are replaced with [`char::REPLACEMENT_CHARACTER`].
    ///
    /// # Errors
    ///
    /// Fails if the body stream fails.
    pub async fn text(self) -> crate::Result<String> {
        let encoding = self
            .content_type()
            .and_then(|content_type| content_type.encoding())
            .unwrap_or(UTF_8);

        let full = self.bytes().await?;

        let (text, _, _) = encoding.decode(&full);
        Ok(text.into_owned())
    }
}

impl fmt::Debug for SdkResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SdkResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_header_order() {
        let request = SdkHttpRequest::new(Method::PUT, Uri::from_static("http://localhost/a"))
            .header("Content-Type", "text/plain")
            .header("X-Tag", "one")
            .header("x-tag", "two");

        let names: Vec<_> = request.header_set().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Content-Type", "X-Tag"]);
        assert_eq!(request.header_set().get("X-TAG").unwrap(), ["one", "two"]);

        let execute = ExecuteRequest::new(request).body("hello");
        assert_eq!(
            execute.request_body().and_then(RequestBody::content_length),
            Some(5)
        );

        let (head, body) = execute.into_parts();
        assert_eq!(head.method(), &Method::PUT);
        assert!(body.is_some());
    }

    #[test]
    fn headers_can_be_edited_in_place() {
        let mut request = SdkHttpRequest::new(Method::GET, Uri::from_static("http://localhost/"))
            .header("Accept", "text/plain")
            .header("X-Tag", "one");

        let headers = request.header_set_mut();
        headers.append("x-tag", "two");
        headers.remove("accept");

        let (_, _, headers) = request.into_parts();
        assert!(!headers.contains("Accept"));
        assert_eq!(headers.get("X-Tag").unwrap(), ["one", "two"]);
    }
}
