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

//! M3U8 playlist conversion.
//!
//! Reads an extended M3U playlist exported by another player, maps its paths
//! onto the local library with [`PathRewrite::localize`](crate::config::PathRewrite::localize),
//! and writes the tracks it can tag as a daemon playlist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{PlaylistError, write_tracks};
use crate::{
    config::Settings,
    model::{SortMode, Track, grouping::sort_tracks},
    tags::TagReader,
};

const HEADER: &str = "#EXTM3U";
const INFO_PREFIX: &str = "#EXTINF:";

#[derive(Debug, Error)]
pub(crate) enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected #EXTM3U at line 1, found {0:?}")]
    MissingHeader(String),

    #[error("expected comma at line {0}")]
    MissingComma(usize),

    #[error("no usable tracks found")]
    NoTracks,

    #[error(transparent)]
    Write(#[from] PlaylistError),
}

/// One playlist item: the display name from `#EXTINF` and the path after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct M3uEntry {
    pub(crate) name: String,
    pub(crate) path: String,
}

/// Parses extended M3U text.
///
/// Carriage returns count as line breaks. Parsing stops quietly at the first
/// line that is neither an `#EXTINF` line nor the path following one.
///
/// # Errors
///
/// Returns an error if the header is missing or an `#EXTINF` line has no
/// name after its comma.
pub(crate) fn parse_m3u8(contents: &str) -> Result<Vec<M3uEntry>, ConvertError> {
    let normalised = contents.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalised
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    match lines.next() {
        Some((_, first)) if first.starts_with(HEADER) => {}
        Some((_, first)) => {
            return Err(ConvertError::MissingHeader(first.chars().take(HEADER.len()).collect()));
        }
        None => return Err(ConvertError::MissingHeader(String::new())),
    }

    let mut entries = Vec::new();
    let mut pending_name: Option<String> = None;

    for (number, line) in lines {
        if let Some(info) = line.strip_prefix(INFO_PREFIX) {
            let name = match info.split_once(',') {
                Some((_, name)) if !name.is_empty() => name,
                _ => return Err(ConvertError::MissingComma(number)),
            };

            debug!("Track name {}", name);
            pending_name = Some(name.to_string());
        } else if let Some(name) = pending_name.take() {
            entries.push(M3uEntry {
                name,
                path: line.to_string(),
            });
        } else {
            warn!("Expected {} at line {}", INFO_PREFIX, number);
            break;
        }
    }

    Ok(entries)
}

/// Converts the M3U8 playlist at `input` and writes the result to `output`.
///
/// Returns the number of tracks written.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, if none of its
/// tracks can be tagged, or if the output cannot be written.
pub(crate) fn convert_playlist(
    input: &Path,
    output: &Path,
    sort: SortMode,
    settings: &Settings,
    reader: &dyn TagReader,
) -> Result<usize, ConvertError> {
    info!("Opening {}", input.display());

    let contents = fs::read_to_string(input).map_err(|source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let mut tracks: Vec<Track> = parse_m3u8(&contents)?
        .into_iter()
        .filter_map(|entry| load_track(&entry, sort, settings, reader))
        .collect();

    info!("Found {} tracks", tracks.len());

    if tracks.is_empty() {
        return Err(ConvertError::NoTracks);
    }

    sort_tracks(&mut tracks);
    write_tracks(output, &tracks)?;

    Ok(tracks.len())
}

fn load_track(entry: &M3uEntry, sort: SortMode, settings: &Settings, reader: &dyn TagReader) -> Option<Track> {
    let path = PathBuf::from(settings.rewrite.localize(&entry.path));

    let tags = match reader.read_tags(&path) {
        Ok(tags) => tags,
        Err(e) => {
            warn!("Skipping {}: {}", entry.name, e);
            return None;
        }
    };

    let mtime = fs::metadata(&path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));

    let uri = settings.uri_for(&path);
    let mut track = Track::new(path, tags, mtime, uri);
    track.set_sort(sort);

    Some(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, PathRewrite};
    use crate::tags::testing::StubTagReader;
    use serde_json::Value;

    #[test]
    fn parses_entries_with_carriage_returns() {
        let text = "#EXTM3U\r#EXTINF:123,Air - Sexy Boy\r/music/Air/02.mp3\r\r#EXTINF:200,Beck - Loser\r\n/music/Beck/01.mp3\r\n";
        let entries = parse_m3u8(text).unwrap();
        assert_eq!(
            entries,
            vec![
                M3uEntry { name: "Air - Sexy Boy".into(), path: "/music/Air/02.mp3".into() },
                M3uEntry { name: "Beck - Loser".into(), path: "/music/Beck/01.mp3".into() },
            ]
        );
    }

    #[test]
    fn header_is_required() {
        let err = parse_m3u8("#EXTINF:1,A\n/a.mp3\n").unwrap_err();
        assert!(matches!(err, ConvertError::MissingHeader(_)));
        assert!(matches!(parse_m3u8("").unwrap_err(), ConvertError::MissingHeader(_)));
    }

    #[test]
    fn info_line_needs_a_name() {
        let err = parse_m3u8("#EXTM3U\n#EXTINF:123\n/a.mp3\n").unwrap_err();
        assert!(matches!(err, ConvertError::MissingComma(2)));

        let err = parse_m3u8("#EXTM3U\n#EXTINF:1,A\n/a.mp3\n#EXTINF:123,\n").unwrap_err();
        assert!(matches!(err, ConvertError::MissingComma(4)));
    }

    #[test]
    fn unexpected_line_stops_parsing() {
        let entries = parse_m3u8("#EXTM3U\n#EXTINF:1,A\n/a.mp3\n/stray.mp3\n#EXTINF:1,B\n/b.mp3\n").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn converts_localized_tracks_and_sorts_them() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.m3u8");
        let output = dir.path().join("out.json");
        fs::write(
            &input,
            "#EXTM3U\n#EXTINF:1,B\nC:/Music/Beck/b.mp3\n#EXTINF:1,A\nC:/Music/Air/a.mp3\n#EXTINF:1,X\nC:/Music/x.mp3\n",
        )
        .unwrap();

        let reader = StubTagReader::new()
            .with("a.mp3", "Air", "Moon Safari", "Sexy Boy", 2, 1998)
            .with("b.mp3", "Beck", "Odelay", "Devils Haircut", 1, 1996);
        let mut settings = Settings::from_config(Path::new("/unused"), &AppConfig::default());
        settings.rewrite = PathRewrite::new(Some("C:/Music".into()), Some("/mnt/music".into()));

        let count = convert_playlist(&input, &output, SortMode::Alphabetical, &settings, &reader).unwrap();
        assert_eq!(count, 2);

        let json: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json[0]["artist"], "Air");
        assert_eq!(json[0]["uri"], "music-library/INTERNAL/Air/a.mp3");
        assert_eq!(json[1]["artist"], "Beck");
    }

    #[test]
    fn nothing_taggable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.m3u8");
        fs::write(&input, "#EXTM3U\n#EXTINF:1,A\n/nowhere/a.mp3\n").unwrap();
        let settings = Settings::from_config(dir.path(), &AppConfig::default());

        let err = convert_playlist(
            &input,
            &dir.path().join("out"),
            SortMode::Year,
            &settings,
            &StubTagReader::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::NoTracks));
        assert!(!dir.path().join("out").exists());
    }
}
