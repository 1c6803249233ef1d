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

//! Keyed track collections.
//!
//! Each grouping owns its own copies of the tracks it holds; the same file
//! may appear in the artist, year and purchase-year groupings at once. A
//! grouping is turned into named, sorted [`Playlist`]s exactly once, by
//! value, when the run is over.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::Track;

/// A named, sorted list of tracks ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Playlist {
    pub(crate) name: String,
    pub(crate) tracks: Vec<Track>,
}

impl Playlist {
    /// Sorts `tracks` and wraps them up under `name`.
    pub(crate) fn new(name: String, mut tracks: Vec<Track>) -> Self {
        sort_tracks(&mut tracks);
        Self { name, tracks }
    }
}

/// Stable merge sort driven by [`Track::compare`].
///
/// The modification-time ordering is not transitive across its 600 second
/// window, which the standard library sorts are allowed to reject, so the
/// merge is done by hand.
pub(crate) fn sort_tracks(tracks: &mut Vec<Track>) {
    if tracks.len() < 2 {
        return;
    }

    let mut right = tracks.split_off(tracks.len() / 2);
    let mut left = std::mem::take(tracks);
    sort_tracks(&mut left);
    sort_tracks(&mut right);

    tracks.reserve(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => r.compare(l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };

        let next = if take_right { right.next() } else { left.next() };
        tracks.extend(next);
    }
}

/// Tracks keyed by lower-cased artist name.
#[derive(Debug, Default)]
pub(crate) struct ArtistGrouping {
    artists: BTreeMap<String, Vec<Track>>,
}

impl ArtistGrouping {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a track, returning `true` when its artist was not seen before.
    pub(crate) fn insert(&mut self, track: Track) -> bool {
        match self.artists.get_mut(track.artist_key()) {
            Some(tracks) => {
                tracks.push(track);
                false
            }
            None => {
                self.artists
                    .insert(track.artist_key().to_string(), vec![track]);
                true
            }
        }
    }

    pub(crate) fn get(&self, artist_key: &str) -> Option<&[Track]> {
        self.artists.get(artist_key).map(Vec::as_slice)
    }

    pub(crate) fn len(&self) -> usize {
        self.artists.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    /// One playlist per artist, named after the first track's artist as it
    /// was tagged, with a leading capital.
    pub(crate) fn into_playlists(self) -> impl Iterator<Item = Playlist> {
        self.artists
            .into_values()
            .filter_map(|tracks| {
                let name = capitalize(tracks.first()?.artist());
                Some(Playlist::new(name, tracks))
            })
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => name.to_string(),
    }
}

/// Tracks keyed by a calendar year.
///
/// The label is the playlist name prefix, e.g. `Year` gives `Year 2001`.
#[derive(Debug)]
pub(crate) struct YearGrouping {
    label: String,
    years: BTreeMap<i32, Vec<Track>>,
}

impl YearGrouping {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            years: BTreeMap::new(),
        }
    }

    /// Adds a track, returning `true` when the year was not seen before.
    pub(crate) fn insert(&mut self, year: i32, track: Track) -> bool {
        let tracks = self.years.entry(year).or_default();
        tracks.push(track);
        tracks.len() == 1
    }

    #[cfg(test)]
    pub(crate) fn get(&self, year: i32) -> Option<&[Track]> {
        self.years.get(&year).map(Vec::as_slice)
    }

    pub(crate) fn len(&self) -> usize {
        self.years.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Total number of tracks across every year.
    pub(crate) fn track_count(&self) -> usize {
        self.years.values().map(Vec::len).sum()
    }

    /// Years at or before zero are never written.
    pub(crate) fn into_playlists(self) -> impl Iterator<Item = Playlist> {
        let label = self.label;
        self.years
            .into_iter()
            .filter(|(year, tracks)| *year > 0 && !tracks.is_empty())
            .map(move |(year, tracks)| Playlist::new(format!("{label} {year}"), tracks))
    }
}

/// Tracks whose title marks them as a cover version.
#[derive(Debug, Default)]
pub(crate) struct CoverCollection {
    tracks: Vec<Track>,
}

impl CoverCollection {
    pub(crate) const NAME: &'static str = "Covers";

    pub(crate) fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub(crate) fn len(&self) -> usize {
        self.tracks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub(crate) fn into_playlist(self) -> Option<Playlist> {
        if self.is_empty() {
            return None;
        }

        Some(Playlist::new(Self::NAME.to_string(), self.tracks))
    }
}
