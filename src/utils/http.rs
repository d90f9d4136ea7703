// src/utils/http.rs

//! HTTP client utilities.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::BackendConfig;

/// Create an HTTP client that authenticates every request to the backend.
pub fn create_client(config: &BackendConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .default_headers(auth_headers(&config.anon_key)?)
        .build()?;
    Ok(client)
}

/// `apikey` and bearer headers expected by the hosted REST gateway.
fn auth_headers(anon_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if anon_key.is_empty() {
        return Ok(headers);
    }

    let key = HeaderValue::from_str(anon_key)
        .map_err(|e| AppError::config(format!("backend.anon_key is not a valid header: {e}")))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {anon_key}"))
        .map_err(|e| AppError::config(format!("backend.anon_key is not a valid header: {e}")))?;

    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}
