// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Resolution overrides for purchases the catalog does not match.
//!
//! Storefront naming and tag naming drift apart: a label uploads
//! "Artist - Album (Deluxe)", the files say "Album". When a purchase cannot be
//! matched it is written to a lookup file as an empty template:
//!
//! ```json
//! {"artist name - album title":{"artist":"","album":"","path":""}}
//! ```
//!
//! The user fills in the corrected artist and/or album, or the path of the
//! folder holding the album (absolute, or relative to the crawl root), and
//! the next run picks it up. Known corrections are written back every run so
//! the file stays complete.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::{AlbumKey, string_field};
use crate::crawler::CrawlObserver;
use crate::model::Track;

#[derive(Debug, Error)]
pub(crate) enum OverrideError {
    #[error("failed to read lookup file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lookup file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialise lookup file: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("refusing to write malformed lookup file: {0}")]
    Invalid(#[source] serde_json::Error),

    #[error("failed to write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One value of the lookup document. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OverrideEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) path: Option<String>,
}

impl OverrideEntry {
    /// An entry waiting to be filled in by hand.
    fn template(path: &str) -> Self {
        Self {
            artist: Some(String::new()),
            album: Some(String::new()),
            path: Some(path.to_string()),
        }
    }
}

/// Which album was found in which folder, and in which file.
#[derive(Debug, Default)]
pub(crate) struct PathIndex {
    albums: HashMap<PathBuf, AlbumKey>,
}

impl PathIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records an album under `path`, keeping the first album seen there.
    pub(crate) fn record(&mut self, path: &Path, album: AlbumKey) {
        self.albums.entry(path.to_path_buf()).or_insert(album);
    }

    /// Looks `path` up as given, then relative to `root`.
    pub(crate) fn lookup(&self, path: &str, root: &Path) -> Option<&AlbumKey> {
        self.albums
            .get(Path::new(path))
            .or_else(|| self.albums.get(&root.join(path.trim_start_matches('/'))))
    }

    pub(crate) fn len(&self) -> usize {
        self.albums.len()
    }
}

impl CrawlObserver for PathIndex {
    fn on_track(&mut self, path: &Path, track: &Track) {
        let album = AlbumKey::new(track.artist(), track.album());

        if let Some(folder) = path.parent() {
            self.record(folder, album.clone());
        }
        self.record(path, album);
    }
}

/// Outcome of looking a purchase up in the override store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// An override exists but changes nothing.
    Matched(AlbumKey),
    /// An override exists and yields a different album.
    Corrected(AlbumKey),
    /// No override exists for this album.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Correction {
    album: AlbumKey,
    path: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct OverrideStore {
    resolved: BTreeMap<String, Correction>,
    pending: BTreeMap<String, OverrideEntry>,
}

impl OverrideStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reads the lookup file at `path`, if any.
    ///
    /// A missing, unreadable or malformed file means no overrides; the
    /// reason is logged and an empty store is returned.
    pub(crate) fn load_file(path: Option<&Path>, index: &PathIndex, root: &Path) -> Self {
        let Some(path) = path else {
            return Self::new();
        };

        let loaded = fs::read_to_string(path)
            .map_err(|source| OverrideError::Read {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| Self::load(&text, index, root));

        match loaded {
            Ok(store) => store,
            Err(OverrideError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                info!("No lookup file at {}", path.display());
                Self::new()
            }
            Err(e) => {
                warn!("{}", e);
                Self::new()
            }
        }
    }

    /// Builds the store from a lookup document.
    ///
    /// Path entries are resolved against `index`, which must already hold
    /// the crawl results.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Parse`] if the document is not a JSON object.
    pub(crate) fn load(text: &str, index: &PathIndex, root: &Path) -> Result<Self, OverrideError> {
        let document: BTreeMap<String, Value> = serde_json::from_str(text).map_err(OverrideError::Parse)?;
        let total = document.len();
        let mut store = Self::new();

        for (key, value) in document {
            let key = key.to_lowercase();
            if !value.is_object() {
                warn!("Lookup entry {:?} is not an object, keeping it as a template", key);
            }

            let artist = string_field(&value, "artist");
            let album = string_field(&value, "album");
            let path = string_field(&value, "path");

            // Album and artist names are provided
            if !artist.is_empty() || !album.is_empty() {
                let correction = Correction {
                    album: AlbumKey::new(artist, album),
                    path: None,
                };
                store.resolved.insert(key, correction);
            // ...or the path to the folder is specified
            } else if let Some(found) = (!path.is_empty()).then(|| index.lookup(path, root)).flatten() {
                let correction = Correction {
                    album: found.clone(),
                    path: Some(path.to_string()),
                };
                store.resolved.insert(key, correction);
            } else {
                if !path.is_empty() {
                    warn!("Lookup path {} for {:?} matches no crawled folder", path, key);
                }
                store.pending.insert(key, OverrideEntry::template(path));
            }
        }

        info!("Lookup file has {}/{} albums", store.resolved.len(), total);

        Ok(store)
    }

    /// Looks `album` up without touching the store.
    ///
    /// Non-empty fields of the override replace the purchase's own, so an
    /// override may correct only the artist or only the album.
    pub(crate) fn resolve(&self, album: &AlbumKey) -> Resolution {
        let Some(correction) = self.resolved.get(&album.to_key()) else {
            return Resolution::Unresolved;
        };

        let corrected = album.overlay(&correction.album);
        if corrected == *album {
            Resolution::Matched(corrected)
        } else {
            Resolution::Corrected(corrected)
        }
    }

    /// Queues `album` to be written out as a template.
    pub(crate) fn record_unresolved(&mut self, album: &AlbumKey) {
        let key = album.to_key();

        if !self.resolved.contains_key(&key) {
            self.pending
                .entry(key)
                .or_insert_with(|| OverrideEntry::template(""));
        }
    }

    pub(crate) fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Serialises known corrections and pending templates to one line of JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails or the result does not read
    /// back as a lookup document.
    pub(crate) fn to_document(&self) -> Result<String, OverrideError> {
        let mut document: BTreeMap<&str, OverrideEntry> = self
            .resolved
            .iter()
            .map(|(key, c)| {
                let entry = OverrideEntry {
                    artist: Some(c.album.artist.clone()),
                    album: Some(c.album.album.clone()),
                    path: c.path.clone(),
                };
                (key.as_str(), entry)
            })
            .collect();

        for (key, entry) in &self.pending {
            document.entry(key.as_str()).or_insert_with(|| entry.clone());
        }

        let text = serde_json::to_string(&document).map_err(OverrideError::Serialize)?;
        serde_json::from_str::<BTreeMap<String, OverrideEntry>>(&text).map_err(OverrideError::Invalid)?;

        Ok(text)
    }

    /// Rewrites the lookup file.
    ///
    /// The document is validated before the file is opened, so a failure
    /// leaves the previous file as it was.
    ///
    /// # Errors
    ///
    /// See [`OverrideStore::to_document`]; also fails if the file cannot be
    /// written.
    pub(crate) fn persist(&self, path: &Path) -> Result<(), OverrideError> {
        let mut text = self.to_document()?;
        text.push('\n');

        info!(
            "Recorded {} unknown albums to the lookup file",
            self.pending.len()
        );
        info!("Writing {}", path.display());

        fs::write(path, text).map_err(|source| OverrideError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
