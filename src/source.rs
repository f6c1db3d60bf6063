//! Image sources: where gap and background bytes come from.
//!
//! The solver only needs decoded pixels; sources decide how a locator string
//! maps to bytes. A failed fetch is reported once and never retried.

use crate::image::io::decode_rgb;
use crate::util::{SlideMatchResult, SolveError};
use image::RgbImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on a single download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Provides raw encoded bytes for a locator (URL, path, or key).
pub trait ImageSource: Sync {
    /// Fetches the encoded bytes behind `locator`.
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>>;

    /// Fetches and decodes `locator` into an RGB image.
    fn fetch(&self, locator: &str) -> SlideMatchResult<RgbImage> {
        let bytes = self.fetch_bytes(locator)?;
        decode_rgb(&bytes, locator)
    }
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>> {
        (**self).fetch_bytes(locator)
    }
}

/// Downloads images over HTTP(S) with a bounded timeout.
#[cfg(feature = "http")]
pub struct HttpSource {
    agent: ureq::Agent,
    timeout: Duration,
}

#[cfg(feature = "http")]
impl HttpSource {
    /// Creates a source whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, timeout }
    }

    /// Upper bound on one request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(feature = "http")]
impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

#[cfg(feature = "http")]
impl ImageSource for HttpSource {
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>> {
        let fetch_err = |reason: String| SolveError::Fetch {
            locator: locator.to_owned(),
            reason,
        };
        let mut response = self
            .agent
            .get(locator)
            .call()
            .map_err(|err| fetch_err(err.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|err| fetch_err(err.to_string()))
    }
}

/// Reads images from the local filesystem, optionally relative to a root.
#[derive(Clone, Debug, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    /// Resolves locators relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl ImageSource for FileSource {
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>> {
        let trimmed = locator.strip_prefix("file://").unwrap_or(locator);
        let path = match &self.root {
            Some(root) => root.join(trimmed),
            None => PathBuf::from(trimmed),
        };
        std::fs::read(&path).map_err(|err| SolveError::Fetch {
            locator: locator.to_owned(),
            reason: err.to_string(),
        })
    }
}

/// In-memory source keyed by locator.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    images: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers encoded bytes under `locator`.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(locator.into(), bytes);
    }
}

impl ImageSource for MemorySource {
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>> {
        self.images
            .get(locator)
            .cloned()
            .ok_or_else(|| SolveError::Fetch {
                locator: locator.to_owned(),
                reason: "no such image".into(),
            })
    }
}

/// Routes `http(s)://` locators to HTTP and everything else to files.
#[cfg(feature = "http")]
#[derive(Default)]
pub struct AnySource {
    http: HttpSource,
    files: FileSource,
}

#[cfg(feature = "http")]
impl AnySource {
    /// Creates a router whose HTTP requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpSource::new(timeout),
            files: FileSource::default(),
        }
    }

    /// Upper bound on one HTTP request.
    pub fn timeout(&self) -> Duration {
        self.http.timeout()
    }
}

#[cfg(feature = "http")]
impl ImageSource for AnySource {
    fn fetch_bytes(&self, locator: &str) -> SlideMatchResult<Vec<u8>> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            self.http.fetch_bytes(locator)
        } else {
            self.files.fetch_bytes(locator)
        }
    }
}
