use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self, extra: &[(&'static str, &str)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in extra {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_str(value)?);
        }

        Ok(headers)
    }

    /// Sends a request and returns the raw response once the status is a success.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        extra_headers: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(extra_headers)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    anyhow!("Authentication error: {}", error_text)
                }
                StatusCode::NOT_FOUND => anyhow!("Resource not found: {}", error_text),
                StatusCode::CONFLICT => anyhow!(DuplicateKey(error_text)),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, &[], body).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        extra_headers: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, extra_headers, body).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Sends a request whose response body is not needed.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        extra_headers: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, path, extra_headers, body).await?;
        Ok(())
    }

    /// Exact row count for a table query, read from the `Content-Range` header.
    pub async fn count(&self, path: &str) -> Result<u64> {
        let response = self
            .send(Method::HEAD, path, &[("prefer", "count=exact")], None)
            .await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|range| range.rsplit('/').next())
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| anyhow!("Missing or malformed Content-Range header"))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Unique constraint violation reported by PostgREST.
#[derive(Debug)]
pub struct DuplicateKey(pub String);

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Duplicate key: {}", self.0)
    }
}

impl std::error::Error for DuplicateKey {}
