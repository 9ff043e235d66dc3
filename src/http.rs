// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::CONTENT_LENGTH;

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// HTTP Basic credentials for feeds behind a login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials are only sent when both parts are present
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Fully buffered response, used for feed documents
pub struct BytesResponse {
    pub status: u16,
    pub body: Bytes,
}

/// HTTP response with status, content length, and body stream
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

/// Status and size reported by a HEAD request
#[derive(Debug, Clone, Copy)]
pub struct HeadResponse {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the entire response body as bytes
    async fn get_bytes(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<BytesResponse, reqwest::Error>;

    /// Get a streaming response for large downloads
    async fn get_stream(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HttpResponse, reqwest::Error>;

    /// Ask the server for the size of a resource without downloading it
    async fn head(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HeadResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client that gives up on unresponsive servers
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .build()?;
        Ok(Self { client })
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match credentials.filter(|c| c.is_complete()) {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bytes(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<BytesResponse, reqwest::Error> {
        let response = self
            .request(reqwest::Method::GET, url, credentials)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(BytesResponse { status, body })
    }

    async fn get_stream(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .request(reqwest::Method::GET, url, credentials)
            .send()
            .await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();

        let body: ByteStream = Box::pin(response.bytes_stream());

        Ok(HttpResponse {
            status,
            content_length,
            body,
        })
    }

    async fn head(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HeadResponse, reqwest::Error> {
        let response = self
            .request(reqwest::Method::HEAD, url, credentials)
            .send()
            .await?;

        // The body of a HEAD response is empty, so read the header itself
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length,
        })
    }
}
