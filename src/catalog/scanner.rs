use super::{format_filename, Catalog, Track};
use crate::error::FetchError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "oga", "wav", "m4a", "aac", "mp4"];

/// Local stand-in for the catalog endpoint: walks music folders on disk.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    roots: Vec<PathBuf>,
}

impl DirectoryCatalog {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn load(&self) -> Result<Catalog, FetchError> {
        let mut files = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                return Err(FetchError::Io {
                    path: root.display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                });
            }
            let found = Self::scan_root(root);
            debug!("Scanned {}: {} audio files", root.display(), found.len());
            files.extend(found);
        }

        files.sort();

        let tracks = files.into_iter().filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            Some(Track::new(format_filename(name), path.to_string_lossy()))
        });

        Ok(Catalog::new(tracks))
    }

    fn scan_root(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| !is_hidden(path))
            .filter(|path| is_supported(path))
            // skip empty files, they never decode
            .filter(|path| fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false))
            .collect()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
