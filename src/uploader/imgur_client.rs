use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// What the host hands back for a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub link: String,
    pub deletehash: String,
    pub id: String,
}

/// A remote service that stores one base64-encoded image per call.
///
/// Rate limiting must surface as [`AppError::RateLimit`] so the uploader can
/// honour the requested wait.
#[allow(async_fn_in_trait)]
pub trait ImageHost {
    async fn upload(&self, encoded_image: &str) -> AppResult<UploadedImage>;
}

pub struct ImgurClient {
    client: Client,
    endpoint: String,
    client_id: String,
}

impl ImgurClient {
    pub fn new(endpoint: &str, client_id: &str, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
        })
    }

    pub fn from_config(config: &Config, client_id: &str) -> AppResult<Self> {
        Self::new(&config.upload_endpoint, client_id, config.request_timeout())
    }

    fn authorization(&self) -> String {
        authorization_header(&self.client_id)
    }
}

impl ImageHost for ImgurClient {
    async fn upload(&self, encoded_image: &str) -> AppResult<UploadedImage> {
        log::debug!(
            "POST {} ({} base64 bytes)",
            self.endpoint,
            encoded_image.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.authorization())
            .form(&[("image", encoded_image), ("type", "base64")])
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        parse_upload_response(status, retry_after.as_deref(), &body)
    }
}

pub fn authorization_header(client_id: &str) -> String {
    format!("Client-ID {}", client_id)
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: ImgurData,
}

#[derive(Debug, Default, Deserialize)]
struct ImgurData {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    deletehash: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Map a raw upload response onto the outcome the uploader acts on.
pub fn parse_upload_response(
    status: u16,
    retry_after: Option<&str>,
    body: &str,
) -> AppResult<UploadedImage> {
    if status == 429 {
        return Err(AppError::RateLimit {
            retry_after_secs: retry_after.and_then(parse_retry_after),
        });
    }

    if !(200..300).contains(&status) {
        return Err(AppError::Http {
            status,
            body: body.chars().take(300).collect(),
        });
    }

    let response: ImgurResponse = serde_json::from_str(body)?;
    if !response.success {
        let message = response
            .data
            .error
            .as_ref()
            .map(error_message)
            .unwrap_or_else(|| "Upload failed".to_string());
        return Err(AppError::ApiFailure { message });
    }

    Ok(UploadedImage {
        link: response.data.link.unwrap_or_default(),
        deletehash: response.data.deletehash.unwrap_or_default(),
        id: response.data.id.unwrap_or_default(),
    })
}

/// `Retry-After` in whole seconds; HTTP-date values are not supported.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

// Imgur reports errors either as a string or as {"message": ...}.
fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
