//! Byte backends for asset loaders
//!
//! Loaders only ever ask "give me the bytes for this key". Development
//! builds answer from the live filesystem, production builds from an
//! archive compiled into the binary.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::{AssetError, AssetKind};
use crate::core::config::{AssetMode, AssetSettings};

/// Read-only byte storage keyed by asset path
pub trait AssetSource: Send + Sync {
    /// Bytes of the asset of `kind` stored under `key`
    fn read_bytes(&self, kind: AssetKind, key: &str) -> Result<Vec<u8>, AssetError>;
}

impl<S: AssetSource + ?Sized> AssetSource for Arc<S> {
    fn read_bytes(&self, kind: AssetKind, key: &str) -> Result<Vec<u8>, AssetError> {
        (**self).read_bytes(kind, key)
    }
}

/// Build the backend selected by `settings.mode`.
///
/// `embedded` is consulted in [`AssetMode::Embedded`]; an empty archive is
/// used when none is supplied.
pub fn source_for(settings: &AssetSettings, embedded: Option<EmbeddedAssetSource>) -> Arc<dyn AssetSource> {
    match settings.mode {
        AssetMode::Filesystem => {
            log::info!("Reading assets from {}", settings.root.display());
            Arc::new(FileAssetSource::from_settings(settings))
        }
        AssetMode::Embedded => {
            let archive = embedded.unwrap_or_default();
            log::info!("Reading assets from embedded archive ({} files)", archive.len());
            Arc::new(archive)
        }
    }
}

/// Assets read from a directory tree, one sub-directory per kind
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    images: PathBuf,
    sounds: PathBuf,
}

impl FileAssetSource {
    /// Source reading images and sounds from the given directories
    pub fn new(images: impl Into<PathBuf>, sounds: impl Into<PathBuf>) -> Self {
        Self {
            images: images.into(),
            sounds: sounds.into(),
        }
    }

    /// Source laid out as configured
    pub fn from_settings(settings: &AssetSettings) -> Self {
        Self::new(settings.images_path(), settings.sounds_path())
    }

    fn dir(&self, kind: AssetKind) -> &PathBuf {
        match kind {
            AssetKind::Image => &self.images,
            AssetKind::Sound => &self.sounds,
        }
    }
}

impl AssetSource for FileAssetSource {
    fn read_bytes(&self, kind: AssetKind, key: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.dir(kind).join(key);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.display().to_string())
            } else {
                AssetError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        })
    }
}

/// In-memory archive of asset bytes.
///
/// Keys are stored per kind, so `"ship.png"` may exist both as an image and
/// as something else without clashing.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedAssetSource {
    files: Arc<RwLock<HashMap<(AssetKind, String), Arc<[u8]>>>>,
}

impl EmbeddedAssetSource {
    /// Empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive holding every file of a [`rust_embed::RustEmbed`] folder.
    ///
    /// Files below `images_dir/` become images and files below
    /// `sounds_dir/` become sounds, keyed by their path relative to that
    /// directory. Everything else is ignored.
    pub fn from_embed<E: rust_embed::RustEmbed>(images_dir: &str, sounds_dir: &str) -> Self {
        let archive = Self::new();
        for path in E::iter() {
            let Some(file) = E::get(&path) else {
                continue;
            };
            let entry = [(AssetKind::Image, images_dir), (AssetKind::Sound, sounds_dir)]
                .into_iter()
                .find_map(|(kind, dir)| {
                    path.strip_prefix(dir)
                        .and_then(|rest| rest.strip_prefix('/'))
                        .map(|key| (kind, key.to_string()))
                });
            if let Some((kind, key)) = entry {
                archive.insert(kind, key, file.data.into_owned());
            }
        }
        log::debug!("Embedded archive holds {} assets", archive.len());
        archive
    }

    /// Add or replace a file
    pub fn insert(&self, kind: AssetKind, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert((kind, key.into()), bytes.into());
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the archive is empty
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl AssetSource for EmbeddedAssetSource {
    fn read_bytes(&self, kind: AssetKind, key: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .read()
            .get(&(kind, key.to_string()))
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| AssetError::NotFound(format!("{kind}/{key}")))
    }
}
