use crate::error::{Error, Result};
use reqwest::{Client, Response};

const USER_AGENT: &str = concat!("runfetch/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by the dataset fetcher and the tracking client.
///
/// No request timeout is configured; every call blocks until the server
/// answers or the connection fails.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Sends a GET request and turns transport failures and non-success
/// statuses into errors.
pub async fn get(client: &Client, url: &str) -> Result<Response> {
    tracing::debug!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::DownloadFailed(describe(&e)))?;

    ensure_success(url, response)
}

pub fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// reqwest's Display hides the underlying cause ("error sending request"),
/// so walk the source chain for the operator.
pub fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
