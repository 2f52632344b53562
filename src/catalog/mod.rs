// Track catalog - the ordered list of playable tracks
// Fetched once at startup, replaced wholesale on reload

pub mod http;
pub mod scanner;
pub mod title;

pub use http::HttpCatalog;
pub use scanner::DirectoryCatalog;
pub use title::format_filename;

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// A single playable item. Never mutated after the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Opaque playable locator: a URL or a local file path.
    pub locator: String,
}

impl Track {
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            locator: locator.into(),
        }
    }
}

/// Shared handle used by every derived list.
pub type TrackRef = Arc<Track>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<TrackRef>,
}

impl Catalog {
    /// Build a catalog, dropping blank titles and duplicate locators.
    pub fn new(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();

        for track in tracks {
            if track.title.trim().is_empty() {
                warn!("Dropping track with empty title: {}", track.locator);
                continue;
            }
            if !seen.insert(track.locator.clone()) {
                warn!("Dropping duplicate locator: {}", track.locator);
                continue;
            }
            kept.push(Arc::new(track));
        }

        Self { tracks: kept }
    }

    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<TrackRef> {
        self.tracks
    }
}

/// Where the catalog comes from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Http(HttpCatalog),
    Directory(DirectoryCatalog),
}

impl CatalogSource {
    pub async fn load(&self) -> Result<Catalog, FetchError> {
        let catalog = match self {
            CatalogSource::Http(source) => source.load().await?,
            CatalogSource::Directory(source) => {
                // walkdir is blocking; keep it off the event loop
                let source = source.clone();
                tokio::task::spawn_blocking(move || source.load())
                    .await
                    .map_err(|e| FetchError::Io {
                        path: "<scan task>".to_string(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e),
                    })??
            }
        };

        info!("Catalog loaded from {}: {} tracks", self.describe(), catalog.len());
        Ok(catalog)
    }

    pub fn describe(&self) -> String {
        match self {
            CatalogSource::Http(source) => source.base_url().to_string(),
            CatalogSource::Directory(source) => source
                .roots()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
