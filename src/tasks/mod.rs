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

//! Top-level jobs.
//!
//! Each [`Task`] runs to completion on the calling thread, strictly in the
//! order crawl, reconcile, write. Groupings are handed from one phase to the
//! next by value and flushed to disk exactly once, at the end of the task,
//! whether or not reconciliation matched anything.

mod handlers;

use anyhow::Result;
use std::path::PathBuf;

use crate::{
    config::Settings,
    model::SortMode,
    playlist::PlaylistWriter,
    tags::{LoftyTagReader, TagReader},
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Task {
    /// Crawl the collection and write artist and year playlists.
    Generate,

    /// Crawl, then match a purchase ledger against the collection.
    Bandcamp { ledger: PathBuf },

    /// Convert an M3U8 playlist.
    Convert {
        input: PathBuf,
        output: PathBuf,
        sort: SortMode,
    },
}

/// Bundles shared resources required by task handlers to simplify resource
/// passing when invoking those handler functions.
struct TaskContext<'a> {
    settings: &'a Settings,
    reader: &'a dyn TagReader,
    writer: PlaylistWriter,
}

/// Runs a task with the `lofty` tag reader.
pub(crate) fn run_task(task: Task, settings: &Settings) -> Result<()> {
    let reader = LoftyTagReader;
    let ctx = TaskContext {
        settings,
        reader: &reader,
        writer: PlaylistWriter::new(settings.output_directory()),
    };

    handle_task(task, &ctx)
}

fn handle_task(task: Task, ctx: &TaskContext) -> Result<()> {
    match task {
        Task::Generate => handlers::generate(ctx),
        Task::Bandcamp { ledger } => handlers::reconcile_purchases(ctx, &ledger),
        Task::Convert { input, output, sort } => handlers::convert(ctx, &input, &output, sort),
    }
}
