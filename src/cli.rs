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

//! Command line surface.
//!
//! Arguments are layered over the persisted [`AppConfig`]: anything given on
//! the command line wins, anything left out falls back to the stored default.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    config::{AppConfig, PathRewrite, Settings},
    model::SortMode,
    tasks::Task,
};

#[derive(Parser, Debug)]
#[command(name = "mpdgen", version, about = "Generate player playlists from a music collection")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Store the effective options as the new defaults
    #[arg(long, global = true)]
    pub(crate) save_config: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Write a playlist per artist and per release year
    Generate(CrawlArgs),

    /// Also write a playlist per purchase year from a Bandcamp collection
    Bandcamp {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Bandcamp collection JSON file
        ledger: PathBuf,

        /// Lookup file used to resolve unmatched albums
        #[arg(short, long)]
        lookup: Option<PathBuf>,
    },

    /// Convert an M3U8 playlist
    Convert {
        /// M3U8 playlist to read
        input: PathBuf,

        /// Playlist file to write
        output: PathBuf,

        /// Track ordering
        #[arg(short, long, value_enum, default_value_t = SortMode::Alphabetical)]
        sort: SortMode,

        /// Path prefix to replace in the M3U8 entries
        #[arg(short, long)]
        from: Option<String>,

        /// Replacement for the prefix, as seen locally
        #[arg(short, long)]
        to: Option<String>,

        /// Library name used in track URIs
        #[arg(short, long)]
        music_library: Option<String>,
    },
}

#[derive(Args, Debug)]
pub(crate) struct CrawlArgs {
    /// Top of the music collection
    pub(crate) root: PathBuf,

    /// Write a playlist of cover versions
    #[arg(short, long)]
    pub(crate) covers: bool,

    /// Deepest directory level to descend into, 0 for no limit
    #[arg(short = 'd', long)]
    pub(crate) max_depth: Option<usize>,

    /// Path prefix stripped from track URIs, the root by default
    #[arg(short, long)]
    pub(crate) from: Option<String>,

    /// Prefix already substituted for `from`
    #[arg(short, long)]
    pub(crate) to: Option<String>,

    /// Library name used in track URIs
    #[arg(short, long)]
    pub(crate) music_library: Option<String>,

    /// Directory the playlists are written to
    #[arg(short, long)]
    pub(crate) output_directory: Option<PathBuf>,
}

impl CrawlArgs {
    fn settings(self, config: &AppConfig) -> Settings {
        let mut settings = Settings::from_config(&self.root, config);

        if let Some(depth) = self.max_depth {
            settings.max_depth = depth;
        }
        if let Some(from) = self.from {
            settings.rewrite.from = from;
        }
        if let Some(to) = self.to {
            settings.rewrite.to = to;
        }
        if let Some(library) = self.music_library {
            settings.music_library = library;
        }
        if self.output_directory.is_some() {
            settings.output_directory = self.output_directory;
        }
        settings.identify_covers |= self.covers;

        settings
    }
}

impl Command {
    /// Resolves the command into a task and the settings it runs with.
    pub(crate) fn into_task(self, config: &AppConfig) -> (Task, Settings) {
        match self {
            Command::Generate(crawl) => (Task::Generate, crawl.settings(config)),
            Command::Bandcamp { crawl, ledger, lookup } => {
                let mut settings = crawl.settings(config);
                if lookup.is_some() {
                    settings.lookup_file = lookup;
                }
                (Task::Bandcamp { ledger }, settings)
            }
            Command::Convert {
                input,
                output,
                sort,
                from,
                to,
                music_library,
            } => {
                let mut settings = Settings::from_config(&PathBuf::new(), config);
                settings.rewrite = PathRewrite::new(from, to);
                if let Some(library) = music_library {
                    settings.music_library = library;
                }
                (Task::Convert { input, output, sort }, settings)
            }
        }
    }
}
