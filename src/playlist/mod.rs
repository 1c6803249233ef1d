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

//! Playlist serialisation.
//!
//! Playlists are written as a single-line JSON array of track objects in the
//! format the player daemon's web interface reads:
//!
//! ```json
//! [{"album":"Discovery","artist":"Daft Punk","service":"mpd","title":"One More Time","type":"song","uri":"music-library/INTERNAL/...","year":2001}]
//! ```
//!
//! Sorting is the caller's job; [`Playlist`] values arrive already sorted.

pub(crate) mod m3u;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Track, grouping::Playlist};

/// Characters that are replaced with `_` in playlist file names.
const ILLEGAL_CHARS: &str = "#$+%!`&'*?<>|/\\{}\"=:@";

#[derive(Debug, Error)]
pub(crate) enum PlaylistError {
    #[error("failed to serialise playlist: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
struct PlaylistEntry<'a> {
    album: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    albumart: Option<&'a str>,
    artist: &'a str,
    service: &'static str,
    title: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    uri: &'a str,
    year: i32,
}

impl<'a> From<&'a Track> for PlaylistEntry<'a> {
    fn from(track: &'a Track) -> Self {
        Self {
            album: track.album(),
            albumart: track.album_art().filter(|a| !a.is_empty()),
            artist: track.artist(),
            service: "mpd",
            title: track.title(),
            kind: "song",
            uri: track.uri(),
            year: track.year(),
        }
    }
}

/// Replaces characters that are unsafe in file names with underscores.
pub(crate) fn clean_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(c) { '_' } else { c })
        .collect()
}

/// Writes `tracks` to `path` as a JSON array followed by a newline.
///
/// # Errors
///
/// Returns an error if the tracks cannot be serialised or the file cannot be
/// written.
pub(crate) fn write_tracks(path: &Path, tracks: &[Track]) -> Result<(), PlaylistError> {
    let entries: Vec<PlaylistEntry> = tracks.iter().map(PlaylistEntry::from).collect();
    let mut contents = serde_json::to_string(&entries)?;
    contents.push('\n');

    fs::write(path, contents).map_err(|source| PlaylistError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes named playlists into one output directory.
#[derive(Debug, Clone)]
pub(crate) struct PlaylistWriter {
    output_directory: PathBuf,
}

impl PlaylistWriter {
    pub(crate) fn new(output_directory: PathBuf) -> Self {
        Self { output_directory }
    }

    /// Path a playlist with the given name ends up at.
    pub(crate) fn path_for(&self, name: &str) -> PathBuf {
        self.output_directory.join(clean_file_name(name))
    }

    /// # Errors
    ///
    /// See [`write_tracks`].
    pub(crate) fn write(&self, playlist: &Playlist) -> Result<PathBuf, PlaylistError> {
        let path = self.path_for(&playlist.name);

        info!("Writing {}", path.display());
        write_tracks(&path, &playlist.tracks)?;

        Ok(path)
    }

    /// Writes every non-empty playlist, logging and skipping failures.
    ///
    /// Returns the number of files written.
    pub(crate) fn write_all(&self, playlists: impl IntoIterator<Item = Playlist>) -> usize {
        let mut written = 0;

        for playlist in playlists {
            if playlist.name.is_empty() || playlist.tracks.is_empty() {
                continue;
            }

            match self.write(&playlist) {
                Ok(_) => written += 1,
                Err(e) => warn!("{}", e),
            }
        }

        written
    }
}
