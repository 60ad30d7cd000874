use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::writer::frame_path;

/// Maps every output frame name to the first frame with identical bytes.
///
/// Names that are not duplicates resolve to themselves. Order of
/// [`DuplicateMap::duplicates`] follows the output sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateMap {
    duplicates: Vec<(String, String)>,
    lookup: HashMap<String, usize>,
    canonical_count: usize,
}

impl DuplicateMap {
    /// A map in which every name is canonical
    pub fn identity(names: &[String]) -> Self {
        Self {
            duplicates: Vec::new(),
            lookup: HashMap::new(),
            canonical_count: names.len(),
        }
    }

    /// Build the map from precomputed content digests, first occurrence wins.
    ///
    /// Equal digests are treated as equal content; a collision between
    /// different frames would merge them.
    pub fn from_digests<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut first_seen: HashMap<String, &'a str> = HashMap::new();
        let mut map = Self::default();
        for (name, digest) in entries {
            match first_seen.get(&digest) {
                Some(original) => {
                    map.lookup.insert(name.to_string(), map.duplicates.len());
                    map.duplicates.push((name.to_string(), original.to_string()));
                }
                None => {
                    first_seen.insert(digest, name);
                    map.canonical_count += 1;
                }
            }
        }
        map
    }

    /// Canonical name for `name`
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        match self.lookup.get(name) {
            Some(&i) => &self.duplicates[i].1,
            None => name,
        }
    }

    pub fn is_duplicate(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// `(duplicate, original)` pairs in output order
    pub fn duplicates(&self) -> &[(String, String)] {
        &self.duplicates
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn canonical_count(&self) -> usize {
        self.canonical_count
    }
}

/// Hex-encoded SHA-256 of a file's bytes
pub fn content_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash every written frame in output order and build the duplicate map.
pub fn detect_duplicates(output_dir: &Path, names: &[String]) -> Result<DuplicateMap> {
    let mut digests: Vec<(&str, String)> = Vec::with_capacity(names.len());
    for name in names {
        let digest = content_digest(&frame_path(output_dir, name))?;
        digests.push((name.as_str(), digest));
    }
    let map = DuplicateMap::from_digests(digests);
    for (dup, original) in map.duplicates() {
        debug!("{} duplicates {}", dup, original);
    }
    Ok(map)
}

/// Delete the file of every duplicate frame.
pub fn remove_duplicates(output_dir: &Path, map: &DuplicateMap) -> Result<usize> {
    for (dup, _) in map.duplicates() {
        let path = frame_path(output_dir, dup);
        fs::remove_file(&path).with_context(|| format!("removing duplicate {}", path.display()))?;
    }
    Ok(map.duplicate_count())
}
