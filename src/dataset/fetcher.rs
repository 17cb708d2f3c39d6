use crate::dataset::Table;
use crate::error::{Error, Result};
use crate::http;
use reqwest::Client;
use url::Url;

pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/vikashishere/Datasets/refs/heads/main/data.csv";

pub struct DatasetFetcher {
    client: Client,
}

impl DatasetFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http::build_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `url` and parses the body as a header-first CSV document.
    pub async fn fetch(&self, url: &str) -> Result<Table> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidInput(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "Unsupported URL scheme '{}' in {}",
                parsed.scheme(),
                url
            )));
        }

        tracing::info!("Fetching dataset from {}", url);

        let body = http::get(&self.client, url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::DownloadFailed(http::describe(&e)))?;

        tracing::debug!("Received {} bytes", body.len());

        let table = Table::from_csv(&body)?;
        tracing::info!("Parsed {} rows x {} columns", table.len(), table.headers().len());

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn serve_csv(body: &'static str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetch_and_save_writes_header_and_rows_only() {
        let server = serve_csv("a,b,c\n1,2,3\n").await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("data.csv");

        let fetcher = DatasetFetcher::new().unwrap();
        let table = fetcher.fetch(&format!("{}/data.csv", server.uri())).await.unwrap();
        table.save(&output).unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "a,b,c\n1,2,3\n");
    }

    #[tokio::test]
    async fn refetching_unchanged_resource_is_byte_identical() {
        let server = serve_csv("city,temp\n\"Paris, FR\",21.5\nOslo,12\n").await;
        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/data.csv", server.uri());
        let fetcher = DatasetFetcher::new().unwrap();

        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        fetcher.fetch(&url).await.unwrap().save(&first).unwrap();
        fetcher.fetch(&url).await.unwrap().save(&second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = DatasetFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("{}/missing.csv", server.uri())).await.unwrap_err();

        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let server = serve_csv("a,b,c\n1,2\n").await;

        let fetcher = DatasetFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("{}/data.csv", server.uri())).await.unwrap_err();

        assert!(matches!(err, Error::MalformedData(_)));
    }

    #[tokio::test]
    async fn unreachable_host_fails_to_download() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/data.csv", listener.local_addr().unwrap());
        drop(listener);

        let fetcher = DatasetFetcher::new().unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, Error::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let fetcher = DatasetFetcher::new().unwrap();

        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
