//! Model downloading and caching utilities.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// File name used when a model URL has no usable last path segment.
const FALLBACK_MODEL_FILENAME: &str = "style_model.onnx";

/// Where to obtain the style-transfer model from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// An ONNX file already on disk.
    Path(PathBuf),
    /// An ONNX file served over HTTP(S), fetched once into the cache.
    Url(String),
}

impl ModelSource {
    /// Location of this source relative to the cache root.
    ///
    /// URLs map to `<host>/<path segments...>`, so two URLs only share a cache
    /// entry when host and path are equal. Query and fragment are ignored.
    #[must_use]
    pub fn cache_key(&self) -> PathBuf {
        match self {
            Self::Path(path) => PathBuf::from(path.file_name().map_or_else(
                || FALLBACK_MODEL_FILENAME.to_string(),
                |n| n.to_string_lossy().into_owned(),
            )),
            Self::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or_default();
                let after_scheme = without_query
                    .split_once("://")
                    .map_or(without_query, |(_, rest)| rest);
                let (host, path) = after_scheme.split_once('/').unwrap_or((after_scheme, ""));

                let mut key = PathBuf::from(sanitize_component(host));
                let segments: Vec<String> = path
                    .split('/')
                    .filter(|segment| !matches!(*segment, "" | "." | ".."))
                    .map(sanitize_component)
                    .collect();

                if segments.is_empty() {
                    key.push(FALLBACK_MODEL_FILENAME);
                } else {
                    key.extend(segments);
                }
                key
            }
        }
    }

    /// File name the model is stored under.
    #[must_use]
    pub fn filename(&self) -> String {
        self.cache_key()
            .file_name()
            .map_or_else(|| FALLBACK_MODEL_FILENAME.to_string(), |n| {
                n.to_string_lossy().into_owned()
            })
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so a URL part is a safe path component.
fn sanitize_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

impl FromStr for ModelSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\style-transfer\models`
    /// - Linux: `~/.cache/style-transfer/models`
    /// - macOS: `~/Library/Caches/style-transfer/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("style-transfer").join("models"))
    }

    /// Create a model cache rooted at `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self {
            cache_dir,
            client: reqwest::blocking::Client::new(),
        })
    }

    /// Use `client` for downloads instead of the default one.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.client = client;
        self
    }

    /// Directory holding cached models.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the local path of a model, downloading it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if a local model does not exist or a remote one cannot be
    /// downloaded.
    pub fn resolve(&self, source: &ModelSource) -> Result<PathBuf> {
        match source {
            ModelSource::Path(path) => {
                if path.exists() {
                    Ok(path.clone())
                } else {
                    Err(Error::ModelNotFound { path: path.clone() })
                }
            }
            ModelSource::Url(url) => {
                let path = self.cache_dir.join(source.cache_key());

                if path.exists() {
                    tracing::debug!("Using cached model {}", path.display());
                } else {
                    self.download_file(url, &path, &source.filename())?;
                }

                Ok(path)
            }
        }
    }

    /// Download a file from a URL to a path with progress indication.
    fn download_file(&self, url: &str, path: &Path, name: &str) -> Result<()> {
        tracing::info!("Downloading {name} from {url}");

        let dir = path.parent().unwrap_or(self.cache_dir.as_path());
        fs::create_dir_all(dir).map_err(|source| Error::CacheDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|source| Error::ModelDownload {
                name: name.to_string(),
                source,
            })?;

        let pb = response
            .content_length()
            .map_or_else(ProgressBar::new_spinner, ProgressBar::new);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(format!("Downloading {name}"));

        // Unique temp file next to the target; removed on drop if anything fails
        let mut file = NamedTempFile::new_in(dir)?;

        let mut downloaded = 0u64;
        let mut reader = response;

        loop {
            let mut buffer = [0u8; 8192];
            let bytes_read = std::io::Read::read(&mut reader, &mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            file.write_all(&buffer[..bytes_read])?;
            downloaded += bytes_read as u64;
            pb.set_position(downloaded);
        }

        file.flush()?;
        pb.finish_with_message(format!("Downloaded {name}"));

        file.persist(path).map_err(|err| Error::Io(err.error))?;

        Ok(())
    }
}
