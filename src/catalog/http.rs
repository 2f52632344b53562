// Catalog endpoint client: GET /api/audio -> [{ title, url }]

use super::{Catalog, Track};
use crate::error::FetchError;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const CATALOG_PATH: &str = "/api/audio";

#[derive(Debug, Deserialize)]
struct AudioEntry {
    title: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    base_url: Url,
    client: Client,
}

impl HttpCatalog {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn load(&self) -> Result<Catalog, FetchError> {
        let endpoint = self.resolve(CATALOG_PATH)?;
        debug!("Fetching catalog from {}", endpoint);

        let response = self.client.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let entries: Vec<AudioEntry> = serde_json::from_slice(&body)?;

        let mut tracks = Vec::with_capacity(entries.len());
        for entry in entries {
            // relative urls are served by the same host as the catalog
            match self.resolve(&entry.url) {
                Ok(locator) => tracks.push(Track::new(entry.title, locator.to_string())),
                Err(e) => warn!("Skipping catalog entry '{}': {}", entry.title, e),
            }
        }

        Ok(Catalog::new(tracks))
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url.join(path).map_err(|e| FetchError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response on a random local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    fn local_catalog(base: &str) -> HttpCatalog {
        let client = Client::builder().no_proxy().build().expect("client");
        HttpCatalog::with_client(base, client).expect("catalog client")
    }

    #[tokio::test]
    async fn test_loads_and_resolves_relative_urls() {
        let base = serve_once(
            "200 OK",
            r#"[{"title":"Rain","url":"/audio/rain.mp3"},{"title":"Snow","url":"http://cdn.example/snow.mp3"}]"#,
        )
        .await;

        let catalog = local_catalog(&base).load().await.expect("catalog");
        let tracks = catalog.tracks();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "Rain");
        assert_eq!(tracks[0].locator, format!("{}/audio/rain.mp3", base));
        assert_eq!(tracks[1].locator, "http://cdn.example/snow.mp3");
    }

    #[tokio::test]
    async fn test_unresolvable_url_skips_only_that_entry() {
        let base = serve_once(
            "200 OK",
            r#"[{"title":"Broken","url":"http://[nope/x.mp3"},{"title":"Rain","url":"/audio/rain.mp3"}]"#,
        )
        .await;

        let catalog = local_catalog(&base).load().await.expect("catalog");
        let tracks = catalog.tracks();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Rain");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let base = serve_once("500 Internal Server Error", "[]").await;

        let err = local_catalog(&base).load().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let base = serve_once("200 OK", r#"{"not":"a list"}"#).await;

        let err = local_catalog(&base).load().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpCatalog::new("not a url").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
