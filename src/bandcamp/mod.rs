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

//! Purchase reconciliation.
//!
//! Matches a storefront purchase ledger against a crawled collection and
//! builds one playlist per purchase year, ordered by purchase time.
//!
//! Matching is a two-step lookup on lower-cased names: the purchase's artist
//! must be a key of the [`ArtistGrouping`], then the purchase's album must
//! equal the album tag of at least one of that artist's tracks. When either
//! step fails the [`OverrideStore`] is consulted and, if it supplies a
//! different artist/album pair, the lookup is retried. At most
//! [`MAX_RESOLUTIONS`] overrides are applied per purchase. Purchases nothing
//! can be found for are queued in the store so the user can fix them up
//! before the next run.
//!
//! The crawl must be complete before reconciliation starts, both because the
//! artist grouping is the catalog and because path overrides are resolved
//! against the folders the crawl saw.

pub(crate) mod ledger;
pub(crate) mod lookup;

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::model::{
    SortMode, Track,
    grouping::{ArtistGrouping, YearGrouping},
};
use ledger::{Ledger, PurchaseDate, PurchaseRecord};
use lookup::{OverrideStore, Resolution};

/// Label of the playlists built from purchase years.
pub(crate) const PURCHASE_LABEL: &str = "Bandcamp";

/// How many overrides may be applied to a single purchase.
pub(crate) const MAX_RESOLUTIONS: usize = 2;

/// Reads `key` from a JSON object as text.
///
/// Missing fields and values that are not strings read as empty, so one
/// mistyped field never costs the whole record.
pub(crate) fn string_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// A lower-cased artist/album pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct AlbumKey {
    pub(crate) artist: String,
    pub(crate) album: String,
}

impl AlbumKey {
    pub(crate) fn new(artist: &str, album: &str) -> Self {
        Self {
            artist: artist.to_lowercase(),
            album: album.to_lowercase(),
        }
    }

    /// The `artist - album` form used as the lookup file key.
    pub(crate) fn to_key(&self) -> String {
        format!("{} - {}", self.artist, self.album)
    }

    /// Copies the non-empty fields of `correction` over this key's.
    pub(crate) fn overlay(&self, correction: &AlbumKey) -> AlbumKey {
        let pick = |corrected: &String, original: &String| {
            if corrected.is_empty() {
                original.clone()
            } else {
                corrected.clone()
            }
        };

        AlbumKey {
            artist: pick(&correction.artist, &self.artist),
            album: pick(&correction.album, &self.album),
        }
    }
}

/// What reconciliation produced.
#[derive(Debug)]
pub(crate) struct ReconcileOutcome {
    pub(crate) purchases: YearGrouping,
    /// Distinct catalog artists at least one purchase pointed at.
    pub(crate) matched_artists: usize,
    pub(crate) matched_albums: usize,
    pub(crate) unmatched: usize,
}

/// Matches every ledger record against the crawled artists.
///
/// Matched tracks are copied into the purchase-year grouping with the
/// purchase's art, its timestamp as their modification time (when it could
/// be parsed) and modification-time ordering.
pub(crate) fn reconcile(ledger: &Ledger, artists: &ArtistGrouping, store: &mut OverrideStore) -> ReconcileOutcome {
    let mut purchases = YearGrouping::new(PURCHASE_LABEL);
    let mut matched_artists: HashSet<String> = HashSet::new();
    let mut matched_albums = 0;
    let mut unmatched = 0;

    for record in &ledger.records {
        let (album, track_count) = match_purchase(record, artists, store, &mut matched_artists, &mut purchases);

        if track_count == 0 {
            warn!("No tracks for {}", album.to_key());
            unmatched += 1;
            continue;
        }

        matched_albums += 1;
        match record.date {
            PurchaseDate::Parsed { year, month, .. } => info!(
                "Bandcamp album {} purchased {}/{} has {} tracks",
                album.to_key(),
                month,
                year,
                track_count
            ),
            PurchaseDate::Unparsed => info!(
                "Bandcamp album {} purchased on an unknown date has {} tracks",
                album.to_key(),
                track_count
            ),
        }
    }

    info!(
        "Found {} Bandcamp artist(s), across {} year(s), {} track(s)",
        matched_artists.len(),
        purchases.len(),
        purchases.track_count()
    );

    ReconcileOutcome {
        purchases,
        matched_artists: matched_artists.len(),
        matched_albums,
        unmatched,
    }
}

/// Runs the lookup/override loop for one purchase.
///
/// Returns the album that was last tried and how many tracks it matched.
fn match_purchase(
    record: &PurchaseRecord,
    artists: &ArtistGrouping,
    store: &mut OverrideStore,
    matched_artists: &mut HashSet<String>,
    purchases: &mut YearGrouping,
) -> (AlbumKey, usize) {
    let mut album = record.album.clone();
    let mut resolutions = 0;

    loop {
        match artists.get(&album.artist) {
            Some(tracks) => {
                matched_artists.insert(album.artist.clone());

                let count = add_album_tracks(tracks, &album, record, purchases);
                if count > 0 {
                    return (album, count);
                }
                debug!("No tracks for album {}", album.to_key());
            }
            None => debug!("No tracks for artist {}", album.to_key()),
        }

        if resolutions == MAX_RESOLUTIONS {
            return (album, 0);
        }
        resolutions += 1;

        match store.resolve(&album) {
            Resolution::Corrected(corrected) => {
                info!("Resolved {} to {}", album.to_key(), corrected.to_key());
                album = corrected;
            }
            Resolution::Matched(same) => {
                debug!("Lookup entry for {} changes nothing", same.to_key());
                return (album, 0);
            }
            Resolution::Unresolved => {
                store.record_unresolved(&album);
                return (album, 0);
            }
        }
    }
}

/// Copies `album`'s tracks into `purchases`, tagged with the purchase.
fn add_album_tracks(tracks: &[Track], album: &AlbumKey, record: &PurchaseRecord, purchases: &mut YearGrouping) -> usize {
    let year = record.date.bucket_year();
    let mut count = 0;

    for track in tracks.iter().filter(|t| t.album().to_lowercase() == album.album) {
        let mut purchased = track.clone();

        if let Some(art) = &record.art_url {
            purchased.set_album_art(art.clone());
        }
        if let Some(secs) = record.date.epoch_secs() {
            purchased.set_mtime(secs);
        }
        purchased.set_sort(SortMode::ModTime);

        if purchases.insert(year, purchased) {
            info!("Bandcamp playlist {}", year);
        }
        count += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bandcamp::ledger::EPOCH_BASE_YEAR;
    use crate::bandcamp::lookup::PathIndex;
    use crate::model::tests::track;
    use std::path::Path;

    fn catalog() -> ArtistGrouping {
        let mut artists = ArtistGrouping::new();
        for t in [
            track("Daft Punk", "Discovery", 1, 2001, 100),
            track("Daft Punk", "Discovery", 2, 2001, 100),
            track("Daft Punk", "Homework", 1, 1997, 100),
            track("Air", "Moon Safari", 1, 1998, 100),
        ] {
            artists.insert(t);
        }
        artists
    }

    fn ledger(text: &str) -> Ledger {
        Ledger::parse(text).unwrap()
    }

    fn overrides(text: &str) -> OverrideStore {
        OverrideStore::load(text, &PathIndex::new(), Path::new("/music")).unwrap()
    }

    #[test]
    fn purchase_matches_album_and_is_tagged() {
        let ledger = ledger(
            r#"{"items": [{"band_name": "daft punk", "album_title": "discovery", "purchased": "01 Jan 2021 10:00:00 UTC", "item_art_url": "https://example.org/a.jpg"}]}"#,
        );
        let mut store = OverrideStore::new();

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.matched_artists, 1);
        assert_eq!(outcome.matched_albums, 1);
        assert_eq!(outcome.unmatched, 0);
        assert_eq!(store.pending_count(), 0);

        let tracks = outcome.purchases.get(2021).unwrap();
        assert_eq!(tracks.len(), 2);
        for t in tracks {
            assert_eq!(t.album(), "Discovery");
            assert_eq!(t.album_art(), Some("https://example.org/a.jpg"));
            assert_eq!(t.mtime(), 1_609_495_200);
            assert_eq!(t.sort(), SortMode::ModTime);
        }

        let names: Vec<_> = outcome.purchases.into_playlists().map(|p| p.name).collect();
        assert_eq!(names, ["Bandcamp 2021"]);
    }

    #[test]
    fn unknown_artist_is_recorded_for_the_lookup_file() {
        let ledger = ledger(r#"{"items": [{"band_name": "Unknown Artist", "album_title": "Unknown Album", "purchased": "01 Jan 2021 10:00:00 UTC"}]}"#);
        let mut store = OverrideStore::new();

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.unmatched, 1);
        assert!(outcome.purchases.is_empty());
        assert_eq!(store.pending_count(), 1);
        assert!(store.to_document().unwrap().contains("unknown artist - unknown album"));
    }

    #[test]
    fn known_artist_with_unknown_album_is_recorded_for_the_lookup_file() {
        let ledger = ledger(r#"{"items": [{"band_name": "Air", "album_title": "Talkie Walkie", "purchased": "01 Jan 2021 10:00:00 UTC"}]}"#);
        let mut store = OverrideStore::new();

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.matched_artists, 1);
        assert_eq!(outcome.matched_albums, 0);
        assert_eq!(outcome.unmatched, 1);
        assert!(outcome.purchases.is_empty());
        assert_eq!(
            store.to_document().unwrap(),
            r#"{"air - talkie walkie":{"artist":"","album":"","path":""}}"#
        );
    }

    #[test]
    fn purchase_with_mistyped_art_still_matches() {
        let ledger = ledger(r#"{"items": [{"band_name": "Air", "album_title": "Moon Safari", "purchased": "01 Jan 2021 10:00:00 UTC", "item_art_url": 0}]}"#);
        let mut store = OverrideStore::new();

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.matched_albums, 1);
        let tracks = outcome.purchases.get(2021).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].album_art(), None);
    }

    #[test]
    fn corrected_pair_is_used_for_the_retry() {
        let ledger = ledger(r#"{"items": [{"band_name": "DP", "album_title": "Disco", "purchased": "02 Mar 2019 08:00:00 GMT"}]}"#);
        let mut store = overrides(r#"{"dp - disco": {"artist": "Daft Punk", "album": "Discovery"}}"#);

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.matched_albums, 1);
        assert_eq!(outcome.purchases.get(2019).map(<[Track]>::len), Some(2));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn album_only_correction_after_artist_match() {
        let ledger = ledger(r#"{"items": [{"band_name": "Air", "album_title": "Moon Safari (Remastered)", "purchased": "02 Mar 2019 08:00:00 GMT"}]}"#);
        let mut store = overrides(r#"{"air - moon safari (remastered)": {"album": "Moon Safari"}}"#);

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.matched_artists, 1);
        assert_eq!(outcome.purchases.get(2019).map(<[Track]>::len), Some(1));
    }

    #[test]
    fn self_referencing_override_does_not_loop() {
        let ledger = ledger(r#"{"items": [{"band_name": "Air", "album_title": "Talkie Walkie", "purchased": "02 Mar 2019 08:00:00 GMT"}]}"#);
        let mut store = overrides(r#"{"air - talkie walkie": {"artist": "air", "album": "talkie walkie"}}"#);

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.unmatched, 1);
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn override_chains_stop_after_two_resolutions() {
        let ledger = ledger(r#"{"items": [{"band_name": "a", "album_title": "x", "purchased": "02 Mar 2019 08:00:00 GMT"}]}"#);
        let mut store = overrides(
            r#"{"a - x": {"artist": "b"}, "b - x": {"artist": "c"}, "c - x": {"artist": "daft punk", "album": "discovery"}}"#,
        );

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        assert_eq!(outcome.unmatched, 1);
        assert!(outcome.purchases.is_empty());
    }

    #[test]
    fn unparsed_date_keeps_file_mtime() {
        let ledger = ledger(r#"{"items": [{"band_name": "Air", "album_title": "Moon Safari", "purchased": "yesterday"}]}"#);
        let mut store = OverrideStore::new();

        let outcome = reconcile(&ledger, &catalog(), &mut store);

        let tracks = outcome.purchases.get(EPOCH_BASE_YEAR).unwrap();
        assert_eq!(tracks[0].mtime(), 100);
        assert_eq!(tracks[0].album_art(), None);
        assert_eq!(ledger.records[0].date, PurchaseDate::Unparsed);
    }

    #[test]
    fn overlay_keeps_fields_left_empty() {
        let key = AlbumKey::new("A", "B");
        assert_eq!(key.overlay(&AlbumKey::new("", "c")), AlbumKey::new("a", "c"));
        assert_eq!(key.overlay(&AlbumKey::new("", "")), key);
        assert_eq!(key.to_key(), "a - b");
    }
}
