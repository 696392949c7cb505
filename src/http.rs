//! HTTP transport for the generation service.
//!
//! This module builds the reqwest client from [`TransportOptions`], sends the
//! POST and hands back the body as a byte stream.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::client::{ByteStream, StreamError, Transport};
use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, StreamError> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Pull a readable message out of an error body.
///
/// Understands `{"detail": "..."}`, `{"error": "..."}` and
/// `{"error": {"message": "..."}}`; anything else is returned as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["/detail", "/error/message", "/error", "/message"]
                .iter()
                .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// [`Transport`] that POSTs JSON to the configured endpoint with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    options: TransportOptions,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self, StreamError> {
        let client = build_http_client(&options)?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn build_request(&self, body: &Value) -> Result<RequestBuilder, StreamError> {
        let mut req = self
            .client
            .post(&self.options.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &self.options.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
                .map_err(|_| StreamError::Config("Invalid API key".to_string()))?;
            req = req.header(AUTHORIZATION, value);
        }

        req = add_extra_headers(req, &self.options.extra_headers);
        Ok(req.json(body))
    }

    /// Send `body` and return the response once its status is successful.
    pub async fn send(&self, body: &Value) -> Result<reqwest::Response, StreamError> {
        debug!(endpoint = %self.options.endpoint, "sending generation request");
        let response = self.build_request(body)?.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status,
                message: error_message(&body),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Err(StreamError::BodyUnavailable);
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, body: &Value) -> Result<ByteStream, StreamError> {
        let response = self.send(body).await?;
        Ok(Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(StreamError::from))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_http_client() {
        let transport_options = TransportOptions::default().with_timeout(Duration::from_secs(30));
        assert!(build_http_client(&transport_options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let transport_options =
            TransportOptions::default().with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&transport_options).is_ok());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"detail": "Model not loaded"}"#), "Model not loaded");
        assert_eq!(error_message(r#"{"error": {"message": "quota"}}"#), "quota");
        assert_eq!(error_message(r#"{"error": "bad prompt"}"#), "bad prompt");
        assert_eq!(error_message("Internal Server Error\n"), "Internal Server Error");
    }

    #[test]
    fn test_request_carries_headers() {
        let options = TransportOptions::new("http://localhost:8000/generate")
            .with_api_key("sk-test")
            .with_header("X-Chat-Id".to_string(), "42".to_string());
        let transport = HttpTransport::new(options).unwrap();

        let request = transport
            .build_request(&serde_json::json!({"prompt": "hi"}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(request.headers()["x-chat-id"], "42");
    }
}
