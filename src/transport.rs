use std::fmt;
use std::future::Future;

use serde_json::Value as JsonValue;

use crate::error::Error;

/// HTTP methods used by the tracker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully prepared call, credentials already resolved.
#[derive(Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Bearer credential, if any.
    pub bearer: Option<String>,
    pub body: Option<JsonValue>,
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .finish()
    }
}

/// Status and raw body of a received response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The wire beneath the pipeline.
///
/// Implementations send exactly what they are given and report every received
/// response, whatever its status, as `Ok`. Only a failure to obtain a response
/// is an error, and it should be [`Error::Network`].
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use reqwest::header::CONTENT_TYPE;
    use url::Url;

    use super::{Method, OutboundRequest, RawResponse, Transport};
    use crate::config::ClientConfig;
    use crate::error::Error;

    /// `reqwest`-backed transport rooted at the API base URL.
    pub struct HttpTransport {
        base: Url,
        http: reqwest::Client,
    }

    impl HttpTransport {
        /// Create a transport for `config`'s base URL and timeout.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Config`] if the HTTP client cannot be built.
        pub fn new(config: &ClientConfig) -> Result<Self, Error> {
            let http = reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
            Ok(Self {
                base: config.api_url().clone(),
                http,
            })
        }

        /// Use a custom HTTP client (for connection pool reuse or testing).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }

        #[must_use]
        pub fn base_url(&self) -> &Url {
            &self.base
        }

        /// Append `path` to the base, keeping any base path prefix such as `/api`.
        pub(crate) fn url_for(&self, path: &str) -> Result<Url, Error> {
            let joined = format!(
                "{}/{}",
                self.base.as_str().trim_end_matches('/'),
                path.trim_start_matches('/')
            );
            joined
                .parse()
                .map_err(|e| Error::Config(format!("invalid request URL {joined:?}: {e}")))
        }
    }

    impl Transport for HttpTransport {
        async fn send(&self, request: OutboundRequest) -> Result<RawResponse, Error> {
            let url = self.url_for(&request.path)?;
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
                Method::Patch => reqwest::Method::PATCH,
                Method::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.http.request(method, url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(token) = &request.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.header(CONTENT_TYPE, "application/json").json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(RawResponse { status, body })
        }
    }

}
