use crate::errors::RestoreServiceError;
use crate::shared::ui::create_download_progress_bar;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads release dumps over HTTP(S)
pub struct DumpFetcher {
    client: Client,
}

impl DumpFetcher {
    pub fn new() -> Result<Self, RestoreServiceError> {
        let client = Client::builder()
            .user_agent(concat!("moneybot-db-restore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Stream `url` into `destination`, returning the number of bytes written.
    /// A non-success status is an error and leaves no file behind.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, RestoreServiceError> {
        debug!(url = %url, destination = %destination.display(), "Requesting dump");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RestoreServiceError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let pb = create_download_progress_bar(response.content_length())?;
        let mut file = fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().await?;
        pb.finish_and_clear();

        info!(url = %url, bytes = written, path = %destination.display(), "Dump downloaded");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    const DUMP_BODY: &str = "CREATE TABLE scraped_chart (time timestamp, currency_pair text);\n\
                             INSERT INTO scraped_chart VALUES ('2017-07-14 00:00:00', 'BTC_ETH');\n";

    async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/releases/07-14-17/07-14-17.sql", get(|| async { DUMP_BODY }))
            .route(
                "/releases/missing/missing.sql",
                get(|| async { (StatusCode::NOT_FOUND, "Not Found") }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_fetch_writes_dump_to_destination() {
        let (addr, _handle) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("07-14-17.sql");
        let url = format!("http://{}/releases/07-14-17/07-14-17.sql", addr);

        let fetcher = DumpFetcher::new().unwrap();
        let written = fetcher.fetch(&url, &dest).await.unwrap();

        assert_eq!(written, DUMP_BODY.len() as u64);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), DUMP_BODY);
    }

    #[tokio::test]
    async fn test_fetch_reports_http_status() {
        let (addr, _handle) = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.sql");
        let url = format!("http://{}/releases/missing/missing.sql", addr);

        let fetcher = DumpFetcher::new().unwrap();
        let err = fetcher.fetch(&url, &dest).await.unwrap_err();

        assert!(matches!(err, RestoreServiceError::DownloadFailed { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("07-14-17.sql");
        let url = format!("http://{}/releases/07-14-17/07-14-17.sql", addr);

        let fetcher = DumpFetcher::new().unwrap();
        let err = fetcher.fetch(&url, &dest).await.unwrap_err();

        assert!(matches!(err, RestoreServiceError::Http(_)));
        assert!(!dest.exists());
    }
}
