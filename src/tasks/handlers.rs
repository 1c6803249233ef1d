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

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::{
    bandcamp::{
        self,
        ledger::Ledger,
        lookup::{OverrideStore, PathIndex},
    },
    crawler::Crawler,
    model::SortMode,
    playlist::m3u,
    tasks::TaskContext,
};

pub(super) fn generate(ctx: &TaskContext) -> Result<()> {
    let crawler = Crawler::new(ctx.settings, ctx.reader)?;
    let result = crawler
        .crawl(&mut ())
        .with_context(|| format!("Failed to crawl {}", ctx.settings.root.display()))?;

    if result.artists.is_empty() {
        warn!("No tagged tracks found under {}", ctx.settings.root.display());
    }

    let written = ctx.writer.write_all(result.into_playlists());
    info!("Wrote {} playlist(s)", written);

    Ok(())
}

pub(super) fn reconcile_purchases(ctx: &TaskContext, ledger_path: &Path) -> Result<()> {
    info!("Opening collection file {}", ledger_path.display());

    // Nothing is crawled or written for a ledger that cannot be trusted
    let ledger = match Ledger::load(ledger_path) {
        Ok(ledger) => ledger,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let mut index = PathIndex::new();
    let crawler = Crawler::new(ctx.settings, ctx.reader)?;
    let result = crawler
        .crawl(&mut index)
        .with_context(|| format!("Failed to crawl {}", ctx.settings.root.display()))?;

    debug!("Indexed {} crawled path(s)", index.len());

    let lookup_file = ctx.settings.lookup_file.as_deref();
    let mut store = OverrideStore::load_file(lookup_file, &index, &ctx.settings.root);
    debug!("{} lookup correction(s) available", store.resolved_count());

    let outcome = bandcamp::reconcile(&ledger, &result.artists, &mut store);
    info!(
        "Matched {} album(s) by {} artist(s)",
        outcome.matched_albums, outcome.matched_artists
    );
    if outcome.purchases.is_empty() {
        warn!("No purchases matched the collection");
    }
    if outcome.unmatched > 0 {
        warn!(
            "{} purchase(s) could not be matched, {} awaiting a lookup entry",
            outcome.unmatched,
            store.pending_count()
        );
    }

    let written = ctx
        .writer
        .write_all(result.into_playlists().chain(outcome.purchases.into_playlists()));
    info!("Wrote {} playlist(s)", written);

    if let Some(path) = lookup_file {
        if let Err(e) = store.persist(path) {
            error!("{}", e);
        }
    }

    Ok(())
}

pub(super) fn convert(ctx: &TaskContext, input: &Path, output: &Path, sort: SortMode) -> Result<()> {
    let count = m3u::convert_playlist(input, output, sort, ctx.settings, ctx.reader)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    info!("Wrote {} track(s) to {}", count, output.display());

    Ok(())
}
