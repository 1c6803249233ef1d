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

//! Application configuration.
//!
//! This module manages the persisted defaults file and the resolved
//! [`Settings`] value that is handed to the crawler, the reconciler and the
//! playlist writer for a single run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_NAME: &str = "mpdgen";

/// Library name used to build track URIs when nothing else is configured.
pub(crate) const DEFAULT_MUSIC_LIBRARY: &str = "INTERNAL";

/// Defaults persisted between runs.
///
/// Every value here can be overridden from the command line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub version: u32,
    pub music_library: String,
    pub output_directory: Option<String>,
    pub max_depth: usize,
    pub lookup_file: Option<String>,
    pub identify_covers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            music_library: DEFAULT_MUSIC_LIBRARY.to_string(),
            output_directory: None,
            max_depth: 0,
            lookup_file: None,
            identify_covers: false,
        }
    }
}

impl From<&Settings> for AppConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            version: 1,
            music_library: settings.music_library.clone(),
            output_directory: settings
                .output_directory
                .as_ref()
                .map(|d| d.to_string_lossy().into_owned()),
            max_depth: settings.max_depth,
            lookup_file: settings
                .lookup_file
                .as_ref()
                .map(|f| f.to_string_lossy().into_owned()),
            identify_covers: settings.identify_covers,
        }
    }
}

pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

pub fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}

/// Prefix substitution applied to track paths.
///
/// `from` is the prefix as it appears in crawled or imported paths, `to` is
/// what the player daemon sees instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PathRewrite {
    pub(crate) from: String,
    pub(crate) to: String,
}

impl PathRewrite {
    pub(crate) fn new(from: Option<String>, to: Option<String>) -> Self {
        Self {
            from: from.unwrap_or_default(),
            to: to.unwrap_or_default(),
        }
    }

    /// Replaces the first occurrence of `from` with `to`.
    ///
    /// Both prefixes must be set for anything to happen; the path is returned
    /// untouched otherwise.
    pub(crate) fn localize(&self, path: &str) -> String {
        if self.from.is_empty() || self.to.is_empty() {
            return path.to_string();
        }

        path.replacen(&self.from, &self.to, 1)
    }

    /// Drops the library prefix from a local path.
    ///
    /// When `to` is configured the path is assumed to have been localized
    /// already and `to` is the prefix removed, otherwise `from` is.
    fn strip<'a>(&self, path: &'a str) -> &'a str {
        let prefix = if self.to.is_empty() { &self.from } else { &self.to };

        if prefix.is_empty() {
            return path;
        }

        path.strip_prefix(prefix.as_str()).unwrap_or(path)
    }
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) root: PathBuf,
    /// Zero means unbounded.
    pub(crate) max_depth: usize,
    pub(crate) rewrite: PathRewrite,
    pub(crate) music_library: String,
    pub(crate) output_directory: Option<PathBuf>,
    pub(crate) lookup_file: Option<PathBuf>,
    pub(crate) identify_covers: bool,
}

impl Settings {
    /// Builds settings for `root` from the persisted defaults.
    ///
    /// The crawl root doubles as the prefix stripped from URIs until a
    /// `from` prefix is set explicitly.
    pub(crate) fn from_config(root: &Path, config: &AppConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            max_depth: config.max_depth,
            rewrite: PathRewrite {
                from: root.to_string_lossy().into_owned(),
                to: String::new(),
            },
            music_library: config.music_library.clone(),
            output_directory: config.output_directory.as_ref().map(PathBuf::from),
            lookup_file: config.lookup_file.as_ref().map(PathBuf::from),
            identify_covers: config.identify_covers,
        }
    }

    /// Builds the URI the player daemon uses to locate a track.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // root "/srv/music", library "INTERNAL"
    /// assert_eq!(settings.uri_for(Path::new("/srv/music/A/b.mp3")), "music-library/INTERNAL/A/b.mp3");
    /// ```
    pub(crate) fn uri_for(&self, path: &Path) -> String {
        let path = path.to_string_lossy();
        let relative = self.rewrite.strip(&path);

        if relative.starts_with('/') {
            format!("music-library/{}{}", self.music_library, relative)
        } else {
            format!("music-library/{}/{}", self.music_library, relative)
        }
    }

    /// Directory playlists are written to, the current one when unset.
    pub(crate) fn output_directory(&self) -> PathBuf {
        self.output_directory.clone().unwrap_or_default()
    }
}
