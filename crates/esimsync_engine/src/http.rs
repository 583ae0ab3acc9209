//! HTTP client seam.
//!
//! The engine never talks to a concrete HTTP library directly: everything
//! goes through the [`HttpClient`] trait. Production wires in
//! [`ReqwestClient`]; tests wire in [`LoopbackClient`], which routes
//! requests to an in-process handler and can simulate unreachable
//! addresses.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A raw HTTP response, before protocol interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors from the raw HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The call exceeded its deadline. The in-flight request was aborted
    /// (its future dropped), not left running.
    TimedOut,
    /// The connection could not be established or broke mid-call.
    Connect(String),
}

/// Minimal async HTTP client.
///
/// Implementations must bound every call by the supplied deadline and
/// abort the in-flight request when it expires.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues a GET request.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;

    /// Issues a POST request with a JSON body.
    async fn post(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    async fn run(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let call = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        };

        // Dropping the future on expiry aborts the underlying request.
        match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(HttpError::TimedOut),
            Ok(Err(err)) if err.is_timeout() => Err(HttpError::TimedOut),
            Ok(Err(err)) => Err(HttpError::Connect(err.to_string())),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.run(self.inner.get(url), timeout).await
    }

    async fn post(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let request = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.run(request, timeout).await
    }
}

/// An in-process request handler standing in for the remote server.
pub trait LoopbackServer: Send + Sync {
    /// Serves one request, or `None` when the address is unreachable
    /// (the loopback client reports a connection failure).
    fn serve(&self, method: &str, url: &str, body: Option<&str>) -> Option<(u16, String)>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn serve(&self, method: &str, url: &str, body: Option<&str>) -> Option<(u16, String)> {
        (**self).serve(method, url, body)
    }
}

/// [`HttpClient`] that routes requests to a [`LoopbackServer`].
///
/// Used by tests to drive the full transport stack without sockets.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a loopback client over the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

#[async_trait]
impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        match self.server.serve("GET", url, None) {
            Some((status, body)) => Ok(HttpResponse { status, body }),
            None => Err(HttpError::Connect("connection refused".into())),
        }
    }

    async fn post(
        &self,
        url: &str,
        body: String,
        _timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        match self.server.serve("POST", url, Some(&body)) {
            Some((status, body)) => Ok(HttpResponse { status, body }),
            None => Err(HttpError::Connect("connection refused".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoServer;

    impl LoopbackServer for EchoServer {
        fn serve(&self, method: &str, url: &str, body: Option<&str>) -> Option<(u16, String)> {
            if url.starts_with("http://down") {
                return None;
            }
            Some((200, format!("{method} {}", body.unwrap_or(""))))
        }
    }

    #[tokio::test]
    async fn loopback_routes_requests() {
        let client = LoopbackClient::new(EchoServer);
        let response = client
            .get("http://up/ping", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, "GET ");

        let response = client
            .post("http://up/x", "{}".into(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.body, "POST {}");
    }

    #[tokio::test]
    async fn loopback_simulates_unreachable_base() {
        let client = LoopbackClient::new(EchoServer);
        let err = client
            .get("http://down/ping", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Connect(_)));
    }

    #[test]
    fn status_classification() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        assert!(ok.is_success());

        let client_error = HttpResponse {
            status: 404,
            body: String::new(),
        };
        assert!(!client_error.is_success());
    }
}
