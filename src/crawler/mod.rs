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

//! Music collection crawling.
//!
//! This module walks a music directory depth-first and classifies every
//! regular file it finds through a [`TagReader`]. Tracks that carry both an
//! artist and a release year are copied into an [`ArtistGrouping`] and a
//! [`YearGrouping`], and optionally into a [`CoverCollection`].
//!
//! It utilizes `WalkDir` for the traversal. Hidden entries (names starting
//! with `.`) are never visited, and directories deeper than the configured
//! limit are skipped with a warning. Failures are local: an unreadable
//! directory only loses its own subtree.
//!
//! Other components can watch the crawl through a [`CrawlObserver`], which
//! is how the purchase reconciler learns which folder holds which album.

mod covers;

use std::path::Path;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::Settings,
    model::{
        SortMode, Track,
        grouping::{ArtistGrouping, CoverCollection, Playlist, YearGrouping},
    },
    tags::TagReader,
};

use covers::CoverMatcher;

/// Label of the playlists built from release years.
pub(crate) const YEAR_LABEL: &str = "Year";

#[derive(Debug, Error)]
pub(crate) enum CrawlError {
    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cover pattern: {0}")]
    CoverPattern(#[from] globset::Error),
}

/// Hooks invoked while crawling.
///
/// Both methods default to doing nothing, so observers only implement what
/// they care about.
pub(crate) trait CrawlObserver {
    /// Called for every track accepted into the groupings.
    fn on_track(&mut self, _path: &Path, _track: &Track) {}

    /// Called for every accepted track identified as a cover.
    fn on_cover(&mut self, _track: &Track) {}
}

impl CrawlObserver for () {}

/// Everything a crawl produces.
#[derive(Debug)]
pub(crate) struct CrawlResult {
    pub(crate) artists: ArtistGrouping,
    pub(crate) years: YearGrouping,
    pub(crate) covers: Option<CoverCollection>,
}

impl CrawlResult {
    fn new(identify_covers: bool) -> Self {
        Self {
            artists: ArtistGrouping::new(),
            years: YearGrouping::new(YEAR_LABEL),
            covers: identify_covers.then(CoverCollection::default),
        }
    }

    /// Sorted artist, year and cover playlists, in that order.
    pub(crate) fn into_playlists(self) -> impl Iterator<Item = Playlist> {
        self.artists
            .into_playlists()
            .chain(self.years.into_playlists())
            .chain(self.covers.and_then(CoverCollection::into_playlist))
    }
}

pub(crate) struct Crawler<'a> {
    settings: &'a Settings,
    reader: &'a dyn TagReader,
    covers: Option<CoverMatcher>,
}

impl<'a> Crawler<'a> {
    /// # Errors
    ///
    /// Returns [`CrawlError::CoverPattern`] if cover identification is enabled
    /// and its pattern cannot be compiled.
    pub(crate) fn new(settings: &'a Settings, reader: &'a dyn TagReader) -> Result<Self, CrawlError> {
        let covers = if settings.identify_covers {
            Some(CoverMatcher::new()?)
        } else {
            None
        };

        Ok(Self {
            settings,
            reader,
            covers,
        })
    }

    /// Crawls the configured root directory.
    ///
    /// No filesystem writes happen here; the groupings are returned to the
    /// caller who decides when to flush them.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist, is not a directory or
    /// cannot be listed. Anything that goes wrong below the root is logged
    /// and skipped.
    pub(crate) fn crawl(&self, observer: &mut dyn CrawlObserver) -> Result<CrawlResult, CrawlError> {
        let root = &self.settings.root;
        let display = root.display().to_string();

        if !root.exists() {
            return Err(CrawlError::PathNotFound(display));
        }
        if !root.is_dir() {
            return Err(CrawlError::NotADirectory(display));
        }
        std::fs::read_dir(root).map_err(|source| CrawlError::Unreadable {
            path: display.clone(),
            source,
        })?;

        let mut result = CrawlResult::new(self.covers.is_some());

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_visit(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                warn!("Unknown type {}", entry.path().display());
                continue;
            }

            self.classify(&entry, &mut result, observer);
        }

        info!(
            "Found {} artist(s), across {} year(s)",
            result.artists.len(),
            result.years.len()
        );
        if let Some(covers) = &result.covers {
            info!("Found {} cover(s)", covers.len());
        }

        Ok(result)
    }

    /// Decides whether the walker descends into, or yields, an entry.
    fn should_visit(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if entry.file_name().to_string_lossy().starts_with('.') {
            return false;
        }

        let max_depth = self.settings.max_depth;
        if entry.file_type().is_dir() && max_depth != 0 && entry.depth() > max_depth {
            warn!(
                "Directory {} is too deep, at depth {}",
                entry.path().display(),
                entry.depth()
            );
            return false;
        }

        true
    }

    fn classify(&self, entry: &DirEntry, result: &mut CrawlResult, observer: &mut dyn CrawlObserver) {
        let path = entry.path();

        let mtime = match entry.metadata() {
            Ok(metadata) => metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX)),
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                return;
            }
        };

        let tags = match self.reader.read_tags(path) {
            Ok(tags) => tags,
            Err(e) => {
                debug!("Skipping {}", e);
                return;
            }
        };

        if tags.artist.is_empty() || tags.year == 0 {
            debug!("Skipping {}: missing artist or year", path.display());
            return;
        }

        let uri = self.settings.uri_for(path);
        let mut track = Track::new(path.to_path_buf(), tags, mtime, uri);

        observer.on_track(path, &track);

        if let (Some(matcher), Some(covers)) = (&self.covers, result.covers.as_mut()) {
            if matcher.is_cover(track.title()) {
                let mut cover = track.clone();
                cover.set_sort(SortMode::Alphabetical);
                debug!("Cover {}", cover.path().display());
                observer.on_cover(&cover);
                covers.push(cover);
            }
        }

        if result.years.insert(track.year(), track.clone()) {
            info!("Yearly playlist {}", track.year());
        }

        // Artist playlists list albums in release order
        track.set_sort(SortMode::Year);

        let artist = track.artist_key().to_string();
        if result.artists.insert(track) {
            info!("Artist playlist {}", artist);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::tags::testing::StubTagReader;
    use std::fs;
    use std::path::PathBuf;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    fn settings(root: &Path) -> Settings {
        Settings::from_config(root, &AppConfig::default())
    }

    #[derive(Default)]
    struct Recorder {
        tracks: Vec<PathBuf>,
        covers: Vec<String>,
    }

    impl CrawlObserver for Recorder {
        fn on_track(&mut self, path: &Path, _track: &Track) {
            self.tracks.push(path.to_path_buf());
        }

        fn on_cover(&mut self, track: &Track) {
            self.covers.push(track.title().to_string());
        }
    }

    #[test]
    fn single_track_lands_in_artist_and_year_groupings() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Daft Punk/Discovery/01.mp3");
        let reader = StubTagReader::new().with("01.mp3", "Daft Punk", "Discovery", "One More Time", 1, 2001);
        let settings = settings(dir.path());

        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut ()).unwrap();

        let by_artist = result.artists.get("daft punk").unwrap();
        assert_eq!(by_artist.len(), 1);
        assert_eq!(by_artist[0].artist(), "Daft Punk");
        assert_eq!(by_artist[0].sort(), SortMode::Year);
        assert_eq!(
            by_artist[0].uri(),
            "music-library/INTERNAL/Daft Punk/Discovery/01.mp3"
        );

        let by_year = result.years.get(2001).unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].sort(), SortMode::Alphabetical);
        assert!(by_year[0].mtime() > 0);
        assert!(result.covers.is_none());
    }

    #[test]
    fn hidden_entries_are_never_visited() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".hidden/Air/01.mp3");
        touch(dir.path(), "Air/.02.mp3");
        let reader = StubTagReader::new()
            .with("01.mp3", "Air", "Moon Safari", "La Femme d'Argent", 1, 1998)
            .with(".02.mp3", "Air", "Moon Safari", "Sexy Boy", 2, 1998);
        let settings = settings(dir.path());
        let mut recorder = Recorder::default();

        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut recorder).unwrap();

        assert!(result.artists.is_empty());
        assert!(result.years.is_empty());
        assert!(recorder.tracks.is_empty());
    }

    #[test]
    fn tracks_without_artist_or_year_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "b.mp3");
        touch(dir.path(), "c.txt");
        let reader = StubTagReader::new()
            .with("a.mp3", "", "Album", "Title", 1, 1999)
            .with("b.mp3", "Artist", "Album", "Title", 1, 0);
        let settings = settings(dir.path());

        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut ()).unwrap();

        assert!(result.artists.is_empty());
        assert!(result.years.is_empty());
    }

    #[test]
    fn directories_beyond_max_depth_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A/shallow.mp3");
        touch(dir.path(), "A/B/deep.mp3");
        let reader = StubTagReader::new()
            .with("shallow.mp3", "Air", "One", "Shallow", 1, 2000)
            .with("deep.mp3", "Air", "Two", "Deep", 1, 2001);
        let mut settings = settings(dir.path());
        settings.max_depth = 1;

        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut ()).unwrap();
        assert_eq!(result.artists.get("air").map(<[Track]>::len), Some(1));
        assert!(result.years.get(2001).is_none());

        settings.max_depth = 0;
        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut ()).unwrap();
        assert_eq!(result.artists.get("air").map(<[Track]>::len), Some(2));
    }

    #[test]
    fn covers_are_collected_without_leaving_primary_groupings() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Cash/01.mp3");
        touch(dir.path(), "Cash/02.mp3");
        let reader = StubTagReader::new()
            .with("01.mp3", "Johnny Cash", "American IV", "Hurt (Nine Inch Nails cover)", 2, 2002)
            .with("02.mp3", "Johnny Cash", "American IV", "The Man Comes Around", 1, 2002);
        let mut settings = settings(dir.path());
        settings.identify_covers = true;
        let mut recorder = Recorder::default();

        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut recorder).unwrap();

        assert_eq!(recorder.tracks.len(), 2);
        assert_eq!(recorder.covers, ["Hurt (Nine Inch Nails cover)"]);
        assert_eq!(result.covers.as_ref().map(CoverCollection::len), Some(1));
        assert_eq!(result.artists.get("johnny cash").map(<[Track]>::len), Some(2));

        let names: Vec<_> = result.into_playlists().map(|p| p.name).collect();
        assert_eq!(names, ["Johnny Cash", "Year 2002", "Covers"]);
    }

    #[cfg(unix)]
    #[test]
    fn broken_entries_do_not_stop_siblings() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Air/z.mp3");
        symlink(root.join("nowhere.mp3"), root.join("Air/broken.mp3")).unwrap();
        symlink(root.join("Air"), root.join("Air/loop")).unwrap();
        let fifo = root.join("Air/pipe");
        let made_fifo = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .is_ok_and(|s| s.success());
        touch(root, "Locked/inner.mp3");
        fs::set_permissions(root.join("Locked"), fs::Permissions::from_mode(0o000)).unwrap();

        let reader = StubTagReader::new().with("z.mp3", "Air", "Moon Safari", "Kelly Watch the Stars", 4, 1998);
        let settings = settings(root);
        let result = Crawler::new(&settings, &reader).unwrap().crawl(&mut ());

        fs::set_permissions(root.join("Locked"), fs::Permissions::from_mode(0o755)).unwrap();

        let result = result.unwrap();
        assert_eq!(result.artists.get("air").map(<[Track]>::len), Some(1));
        assert_eq!(result.years.get(1998).map(<[Track]>::len), Some(1));
        if made_fifo {
            assert!(fifo.exists());
        }
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir.path().join("nope"));
        let reader = StubTagReader::new();

        let err = Crawler::new(&settings, &reader).unwrap().crawl(&mut ()).unwrap_err();
        assert!(matches!(err, CrawlError::PathNotFound(_)));
    }
}
