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

//! # Music Player Playlist Generator.
//!
//! Builds JSON playlists for a music player daemon from a tagged music
//! collection.
//!
//! A run is a single pass through three phases:
//!
//! * The **Crawler** walks the collection, reads each file's tags and groups
//!   tracks by artist, by release year and optionally as cover versions.
//! * The **Reconciler** (Bandcamp only) matches a purchase history against
//!   the crawled artists, consulting a lookup file for albums whose names
//!   differ, and groups the matched tracks by purchase year.
//! * The **Writer** sorts each grouping and writes one playlist file per
//!   group.
//!
//! ## Configuration
//!
//! Defaults are persisted with `confy` and overridden per run from the
//! command line. Logging goes to standard error and honours `RUST_LOG`.

mod bandcamp;
mod cli;
mod config;
mod crawler;
mod model;
mod playlist;
mod tags;
mod tasks;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{cli::Cli, config::AppConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = config::load_config();
    let (task, settings) = cli.command.into_task(&config);
    debug!("Running {:?} with {:?}", task, settings);

    if cli.save_config {
        config::save_config(&AppConfig::from(&settings)).context("Failed to save configuration")?;
    }

    tasks::run_task(task, &settings).context("Playlist generation failed")
}

/// Installs the global log subscriber.
///
/// `RUST_LOG` takes precedence, otherwise informational messages are shown,
/// or debug messages when `verbose` is set.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
