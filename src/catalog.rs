use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::utils::manifest::read_manifest;
use crate::utils::paths::secure_join;

/// One entry of the gallery manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    /// Subdirectory of the galleries root holding the images.
    #[serde(alias = "Directory")]
    pub directory: String,
    #[serde(alias = "Title")]
    pub title: String,
    /// Path of the cover image, relative to the gallery directory.
    #[serde(alias = "Cover")]
    pub cover: String,
}

/// Gallery metadata and image listings, read from disk on every call.
pub struct GalleryCatalog {
    root: PathBuf,
    manifest: PathBuf,
}

impl GalleryCatalog {
    pub fn new(root: impl Into<PathBuf>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest: manifest.into(),
        }
    }

    /// Galleries in manifest order. A missing or malformed manifest yields
    /// an empty list.
    pub async fn list_galleries(&self) -> Vec<Gallery> {
        match read_manifest::<Vec<Gallery>>(&self.manifest).await {
            Ok(galleries) => galleries,
            Err(e) => {
                warn!(target: "photo_site", "galleries error: {e}");
                Vec::new()
            }
        }
    }

    /// Base names of every file under the gallery directory, recursively,
    /// sorted by name. Unknown galleries and names escaping the galleries
    /// root yield an empty list.
    pub async fn list_images(&self, gallery: &str) -> Vec<String> {
        let Some(dir) = secure_join(&self.root, gallery) else {
            debug!(target: "photo_site", "gallery {gallery:?} not found under {}", self.root.display());
            return Vec::new();
        };
        let gallery = gallery.to_string();
        match tokio::task::spawn_blocking(move || walk_images(&dir)).await {
            Ok(images) => images,
            Err(e) => {
                warn!(target: "photo_site", "listing gallery {gallery:?} failed: {e}");
                Vec::new()
            }
        }
    }
}

fn walk_images(dir: &Path) -> Vec<String> {
    let mut images: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(target: "photo_site", "skipping entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    images.sort();
    images
}
