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

//! Domain models and core data structures.
//!
//! This module defines [`Track`], the record every playlist is made of, and
//! the ordering heuristics used to sort a playlist before it is written.
//!
//! # Ordering
//!
//! A track carries its own [`SortMode`] and the mode of the *left* operand
//! decides how two tracks compare. Groupings set one mode on every track they
//! hold, so within a playlist the comparison is consistent:
//!
//! * [`SortMode::Alphabetical`]: artist (case-folded), album, track number.
//! * [`SortMode::Year`]: artist (case-folded), release year, album, track number.
//! * [`SortMode::ModTime`]: modification time, with two fallbacks. Tracks by
//!   the same artist imported within [`MTIME_WINDOW_SECS`] of each other are
//!   ordered as in year mode, and exact ties are ordered alphabetically.

pub(crate) mod grouping;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::tags::TrackTags;

/// Imports by the same artist closer together than this are one batch.
pub(crate) const MTIME_WINDOW_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SortMode {
    #[default]
    #[value(name = "alpha")]
    Alphabetical,
    #[value(name = "year")]
    Year,
    #[value(name = "mtime")]
    ModTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Track {
    path: PathBuf,
    title: String,
    artist: String,
    artist_key: String,
    album: String,
    track_number: u32,
    year: i32,
    mtime: i64,
    uri: String,
    album_art: Option<String>,
    sort: SortMode,
}

impl Track {
    pub(crate) fn new(path: PathBuf, tags: TrackTags, mtime: i64, uri: String) -> Self {
        Self {
            path,
            title: tags.title,
            artist_key: tags.artist.to_lowercase(),
            artist: tags.artist,
            album: tags.album,
            track_number: tags.track_number,
            year: tags.year,
            mtime,
            uri,
            album_art: None,
            sort: SortMode::default(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    /// Artist as tagged, used for file naming.
    pub(crate) fn artist(&self) -> &str {
        &self.artist
    }

    /// Lower-cased artist, used for grouping and comparison.
    pub(crate) fn artist_key(&self) -> &str {
        &self.artist_key
    }

    pub(crate) fn album(&self) -> &str {
        &self.album
    }

    pub(crate) fn track_number(&self) -> u32 {
        self.track_number
    }

    pub(crate) fn year(&self) -> i32 {
        self.year
    }

    /// Seconds since the Unix epoch.
    #[cfg(test)]
    pub(crate) fn mtime(&self) -> i64 {
        self.mtime
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) fn album_art(&self) -> Option<&str> {
        self.album_art.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn sort(&self) -> SortMode {
        self.sort
    }

    pub(crate) fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    pub(crate) fn set_mtime(&mut self, mtime: i64) {
        self.mtime = mtime;
    }

    pub(crate) fn set_album_art(&mut self, album_art: String) {
        self.album_art = Some(album_art);
    }

    /// Compares two tracks according to `self`'s sort mode.
    pub(crate) fn compare(&self, other: &Track) -> Ordering {
        match self.sort {
            SortMode::Alphabetical => self.by_artist_then(other, Track::by_album),
            SortMode::Year => self.by_artist_then(other, Track::by_year),
            SortMode::ModTime => self.by_mtime(other),
        }
    }

    fn by_artist_then(&self, other: &Track, tie_break: fn(&Track, &Track) -> Ordering) -> Ordering {
        self.artist_key
            .cmp(&other.artist_key)
            .then_with(|| tie_break(self, other))
    }

    fn by_album(&self, other: &Track) -> Ordering {
        self.album
            .cmp(&other.album)
            .then(self.track_number.cmp(&other.track_number))
    }

    fn by_year(&self, other: &Track) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.by_album(other))
    }

    fn by_mtime(&self, other: &Track) -> Ordering {
        if self.artist_key == other.artist_key
            && (self.mtime - other.mtime).abs() < MTIME_WINDOW_SECS
        {
            return self.by_artist_then(other, Track::by_year);
        }

        self.mtime
            .cmp(&other.mtime)
            .then_with(|| self.by_artist_then(other, Track::by_album))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(artist: &str, album: &str, number: u32, year: i32, mtime: i64) -> Track {
        let tags = TrackTags {
            title: format!("{album} {number}"),
            artist: artist.to_string(),
            album: album.to_string(),
            track_number: number,
            year,
        };
        let path = PathBuf::from(format!("/music/{artist}/{album}/{number:02}.mp3"));
        let uri = format!("music-library/INTERNAL/{artist}/{album}/{number:02}.mp3");
        Track::new(path, tags, mtime, uri)
    }

    fn with_sort(mut t: Track, sort: SortMode) -> Track {
        t.set_sort(sort);
        t
    }

    #[test]
    fn alphabetical_ignores_artist_case() {
        let a = track("air", "Moon Safari", 1, 1998, 0);
        let b = track("Air", "Moon Safari", 2, 1998, 0);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn alphabetical_orders_album_before_track_number() {
        let a = track("Air", "Talkie Walkie", 1, 2004, 0);
        let b = track("Air", "Moon Safari", 9, 1998, 0);
        assert_eq!(a.compare(&b), Ordering::Greater);
    }

    #[test]
    fn year_mode_orders_by_release_year_first() {
        let a = with_sort(track("Air", "Talkie Walkie", 1, 2004, 0), SortMode::Year);
        let b = with_sort(track("Air", "Moon Safari", 9, 1998, 0), SortMode::Year);
        assert_eq!(a.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&a), Ordering::Less);
    }

    #[test]
    fn left_operand_mode_governs() {
        let alpha = track("Air", "Talkie Walkie", 1, 1990, 0);
        let year = with_sort(track("Air", "Moon Safari", 1, 2000, 0), SortMode::Year);
        // Alphabetically "Talkie Walkie" > "Moon Safari", by year 1990 < 2000.
        assert_eq!(alpha.compare(&year), Ordering::Greater);
        assert_eq!(year.compare(&alpha), Ordering::Greater);
    }

    #[test]
    fn mtime_window_falls_back_to_year_mode() {
        let pairs = [
            (track("Air", "B", 1, 2004, 1_000), track("air", "A", 2, 1998, 1_599)),
            (track("Air", "A", 1, 1998, 5_000), track("Air", "A", 2, 1998, 4_401)),
            (track("Air", "A", 3, 2001, 7_000), track("Air", "A", 3, 2001, 7_000)),
        ];

        for (a, b) in pairs {
            let year = with_sort(a.clone(), SortMode::Year).compare(&b);
            let mtime = with_sort(a, SortMode::ModTime).compare(&b);
            assert_eq!(mtime, year);
        }
    }

    #[test]
    fn mtime_outside_window_is_chronological() {
        let a = with_sort(track("Air", "B", 1, 2004, 1_000), SortMode::ModTime);
        let b = track("Air", "A", 1, 1998, 1_600);
        assert_eq!(a.compare(&b), Ordering::Less);

        let c = with_sort(track("Zoot", "Z", 1, 1970, 10), SortMode::ModTime);
        let d = track("Abba", "A", 1, 1970, 20);
        assert_eq!(c.compare(&d), Ordering::Less);
    }

    #[test]
    fn mtime_exact_tie_between_artists_is_alphabetical() {
        let a = with_sort(track("Zoot", "Z", 1, 1970, 42), SortMode::ModTime);
        let b = track("Abba", "A", 1, 1970, 42);
        assert_eq!(a.compare(&b), Ordering::Greater);
    }
}
