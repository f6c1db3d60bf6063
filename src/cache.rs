//! Content-deduplicated on-disk store of extracted shapes.
//!
//! Entries live in one directory as `image_gap_<n>.png` (1-based). The cache
//! keeps an in-memory index (ordered ids plus a content hash → ids map) so
//! `put` hashes once and decodes at most the colliding entries instead of
//! rescanning the directory. Id allocation and the write happen under one
//! mutex, so concurrent `put`s of the same new shape yield one file.

use serde::{Serialize, Serializer};
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::image::io::{load_rgb, save_png};
use crate::shape::Shape;
use crate::trace::{trace_event, trace_warn};
use crate::util::{SlideMatchResult, SolveError};

const PREFIX: &str = "image_gap_";
const SUFFIX: &str = ".png";

/// Identity of a persisted shape; renders as its file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheEntryId(u32);

impl CacheEntryId {
    /// Sequence number of the entry (1-based).
    pub fn index(self) -> u32 {
        self.0
    }

    /// File name inside the cache directory.
    pub fn file_name(self) -> String {
        format!("{PREFIX}{}{SUFFIX}", self.0)
    }

    /// Parses `image_gap_<n>.png`; other names yield `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let n = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        n.parse::<u32>().ok().filter(|&n| n > 0).map(Self)
    }
}

impl fmt::Display for CacheEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}{SUFFIX}", self.0)
    }
}

impl Serialize for CacheEntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Default)]
struct CacheIndex {
    order: Vec<CacheEntryId>,
    by_hash: HashMap<u64, Vec<CacheEntryId>>,
    next: u32,
}

impl CacheIndex {
    fn insert(&mut self, id: CacheEntryId, hash: Option<u64>) {
        let pos = self.order.partition_point(|&e| e < id);
        self.order.insert(pos, id);
        if let Some(hash) = hash {
            self.by_hash.entry(hash).or_default().push(id);
        }
        self.next = self.next.max(id.0 + 1);
    }
}

/// Append-only shape store shared by concurrent solves.
pub struct ShapeCache {
    dir: PathBuf,
    index: Mutex<CacheIndex>,
}

impl ShapeCache {
    /// Opens the cache at `dir`, creating the directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> SlideMatchResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| SolveError::io(&dir, err))?;
        Self::scan(dir)
    }

    /// Opens an existing cache; a missing directory is a configuration error.
    pub fn open_existing(dir: impl Into<PathBuf>) -> SlideMatchResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SolveError::Configuration {
                reason: format!("cache directory {} does not exist", dir.display()),
            });
        }
        Self::scan(dir)
    }

    fn scan(dir: PathBuf) -> SlideMatchResult<Self> {
        let mut index = CacheIndex {
            next: 1,
            ..CacheIndex::default()
        };
        let entries = std::fs::read_dir(&dir).map_err(|err| SolveError::io(&dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| SolveError::io(&dir, err))?;
            let Some(id) = entry.file_name().to_str().and_then(CacheEntryId::parse) else {
                continue;
            };
            // Undecodable files stay listed but never take part in dedup.
            let hash = match load_rgb(entry.path()) {
                Ok(img) => Some(content_hash(img.width(), img.height(), img.as_raw())),
                Err(err) => {
                    trace_warn!("cache_entry_unreadable", entry = id.index(), stage = err.stage());
                    None
                }
            };
            index.insert(id, hash);
        }
        trace_event!("cache_opened", entries = index.order.len());
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores `shape` unless a pixel-identical entry exists; returns the
    /// identity of the stored or pre-existing entry.
    pub fn put(&self, shape: &Shape) -> SlideMatchResult<CacheEntryId> {
        let img = shape.image();
        let hash = content_hash(img.width(), img.height(), img.as_raw());

        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(candidates) = index.by_hash.get(&hash) {
            for &id in candidates {
                match self.load(id) {
                    Ok(existing) if existing.pixels_equal(shape) => {
                        trace_event!("cache_hit", entry = id.index());
                        return Ok(id);
                    }
                    _ => {}
                }
            }
        }

        let mut n = index.next.max(1);
        while self.path_of(CacheEntryId(n)).exists() {
            n += 1;
        }
        let id = CacheEntryId(n);
        let path = self.path_of(id);
        let tmp = self.dir.join(format!(".{}.tmp", id.file_name()));
        save_png(img, &tmp)?;
        std::fs::rename(&tmp, &path).map_err(|err| SolveError::io(&path, err))?;

        index.insert(id, Some(hash));
        trace_event!("cache_stored", entry = id.index());
        Ok(id)
    }

    /// Ids of all entries in ascending order.
    pub fn list(&self) -> Vec<CacheEntryId> {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    /// Returns true when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads an entry; missing or undecodable files are [`SolveError::NotFound`].
    pub fn load(&self, id: CacheEntryId) -> SlideMatchResult<Shape> {
        let path = self.path_of(id);
        if !path.is_file() {
            return Err(SolveError::NotFound {
                what: format!("cache entry {id}"),
            });
        }
        let img = load_rgb(&path)?;
        Shape::new(img).map_err(|_| SolveError::NotFound {
            what: format!("cache entry {id} has no foreground"),
        })
    }

    /// Absolute path of an entry.
    pub fn path_of(&self, id: CacheEntryId) -> PathBuf {
        self.dir.join(id.file_name())
    }
}

fn content_hash(width: u32, height: u32, raw: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(&width.to_le_bytes());
    hasher.write(&height.to_le_bytes());
    hasher.write(raw);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_and_parse() {
        let id = CacheEntryId::parse("image_gap_12.png").unwrap();
        assert_eq!(id.index(), 12);
        assert_eq!(id.to_string(), "image_gap_12.png");
        assert!(CacheEntryId::parse("image_gap_.png").is_none());
        assert!(CacheEntryId::parse("image_gap_0.png").is_none());
        assert!(CacheEntryId::parse("image_gap_3.jpg").is_none());
        assert!(CacheEntryId::parse("image_gap_+3.png").is_none());
        assert!(CacheEntryId::parse("other_3.png").is_none());
    }

    #[test]
    fn hash_depends_on_geometry() {
        let raw = [1u8; 12];
        assert_ne!(content_hash(2, 2, &raw), content_hash(4, 1, &raw));
        assert_eq!(content_hash(2, 2, &raw), content_hash(2, 2, &raw));
    }

    #[test]
    fn index_keeps_ids_sorted() {
        let mut index = CacheIndex::default();
        index.insert(CacheEntryId(5), None);
        index.insert(CacheEntryId(2), Some(7));
        index.insert(CacheEntryId(9), None);
        assert_eq!(
            index.order,
            vec![CacheEntryId(2), CacheEntryId(5), CacheEntryId(9)]
        );
        assert_eq!(index.next, 10);
        assert_eq!(index.by_hash[&7], vec![CacheEntryId(2)]);
    }
}
