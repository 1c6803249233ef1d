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

//! Embedded tag extraction.
//!
//! The crawler and the playlist converter only need five values out of an
//! audio file: title, artist, album, track number and release year. They are
//! obtained through the [`TagReader`] trait so that the container parsing
//! stays behind one seam; [`LoftyTagReader`] is the implementation used at
//! runtime.

use lofty::error::LoftyError;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum TagError {
    #[error("failed to load {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },

    #[error("no tags found in {0}")]
    NoTags(PathBuf),
}

/// The subset of embedded metadata a playlist entry is built from.
///
/// Missing textual values are empty strings, a missing track number or year
/// is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TrackTags {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) track_number: u32,
    pub(crate) year: i32,
}

/// Extracts [`TrackTags`] from a file.
pub(crate) trait TagReader {
    /// # Errors
    ///
    /// Returns a [`TagError`] when the file cannot be parsed or carries no
    /// usable tag. Callers treat any error as "skip this file".
    fn read_tags(&self, path: &Path) -> Result<TrackTags, TagError>;
}

/// [`TagReader`] backed by `lofty`, which understands ID3, Vorbis comments,
/// APE and MP4 atoms.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, TagError> {
        let tagged_file = Probe::open(path)
            .and_then(|p| p.read())
            .map_err(|source| TagError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TagError::NoTags(path.to_path_buf()))?;

        Ok(TrackTags {
            title: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.to_string()).unwrap_or_default(),
            album: tag.album().map(|s| s.to_string()).unwrap_or_default(),
            track_number: tag.track().unwrap_or(0),
            year: tag.year().and_then(|y| i32::try_from(y).ok()).unwrap_or(0),
        })
    }
}
