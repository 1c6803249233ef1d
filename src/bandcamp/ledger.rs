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

//! Purchase ledger parsing.
//!
//! The ledger is the JSON collection export of a music storefront:
//!
//! ```json
//! {"more_available": false, "items": [{"band_name": "...", "album_title": "...", "purchased": "01 Jan 2021 10:00:00 GMT", "item_art_url": "..."}]}
//! ```
//!
//! Pagination is the exporter's problem. A ledger that says more items are
//! available is rejected outright, as is an empty one.

use chrono::{DateTime, Datelike, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{AlbumKey, string_field};

/// Year unparseable purchases are filed under.
pub(crate) const EPOCH_BASE_YEAR: i32 = 1970;

const PURCHASE_FORMAT: &str = "%d %b %Y %H:%M:%S";

#[derive(Debug, Error)]
pub(crate) enum LedgerError {
    #[error("failed to read collection {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse collection: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("collection is incomplete, adjust older_than_token and/or count")]
    Incomplete,

    #[error("collection is empty")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    more_available: Option<bool>,
    #[serde(default)]
    items: Option<Vec<Value>>,
}

/// When a purchase was made, if the ledger's timestamp could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PurchaseDate {
    Parsed { year: i32, month: u32, epoch_secs: i64 },
    Unparsed,
}

impl PurchaseDate {
    /// Parses `day month-abbrev year HH:MM:SS zone`, e.g. `01 Jan 2021 10:00:00 GMT`.
    ///
    /// A numeric zone offset is honoured. A zone name is accepted but the
    /// time is read as UTC.
    pub(crate) fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Ok(dt) = DateTime::parse_from_str(text, &format!("{PURCHASE_FORMAT} %z")) {
            return Self::Parsed {
                year: dt.year(),
                month: dt.month(),
                epoch_secs: dt.timestamp(),
            };
        }

        let without_zone = match text.rsplit_once(' ') {
            Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
            _ => text,
        };

        match NaiveDateTime::parse_from_str(without_zone, PURCHASE_FORMAT) {
            Ok(dt) => Self::Parsed {
                year: dt.year(),
                month: dt.month(),
                epoch_secs: dt.and_utc().timestamp(),
            },
            Err(e) => {
                debug!("Failed to parse purchase date {:?}: {}", text, e);
                Self::Unparsed
            }
        }
    }

    /// Year the purchase is grouped under.
    pub(crate) fn bucket_year(&self) -> i32 {
        match self {
            Self::Parsed { year, .. } => *year,
            Self::Unparsed => EPOCH_BASE_YEAR,
        }
    }

    pub(crate) fn epoch_secs(&self) -> Option<i64> {
        match self {
            Self::Parsed { epoch_secs, .. } => Some(*epoch_secs),
            Self::Unparsed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PurchaseRecord {
    pub(crate) album: AlbumKey,
    pub(crate) date: PurchaseDate,
    pub(crate) art_url: Option<String>,
}

/// A complete, non-empty purchase history.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    pub(crate) records: Vec<PurchaseRecord>,
}

impl Ledger {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, see also [`Ledger::parse`].
    pub(crate) fn load(path: &Path) -> Result<Self, LedgerError> {
        let text = fs::read_to_string(path).map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text)
    }

    /// Parses a ledger document.
    ///
    /// Items that are not objects are skipped. Missing or mistyped fields read
    /// as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON, announces more
    /// items than it holds, or holds none.
    pub(crate) fn parse(text: &str) -> Result<Self, LedgerError> {
        let document: LedgerDocument = serde_json::from_str(text)?;

        if document.more_available.unwrap_or(false) {
            return Err(LedgerError::Incomplete);
        }

        let items = document.items.unwrap_or_default();
        if items.is_empty() {
            return Err(LedgerError::Empty);
        }

        let records = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                if !item.is_object() {
                    debug!("Skipping collection item {}: not an object", i);
                    return None;
                }

                let art_url = string_field(item, "item_art_url");
                Some(PurchaseRecord {
                    album: AlbumKey::new(string_field(item, "band_name"), string_field(item, "album_title")),
                    date: PurchaseDate::parse(string_field(item, "purchased")),
                    art_url: (!art_url.is_empty()).then(|| art_url.to_string()),
                })
            })
            .collect();

        Ok(Self { records })
    }
}
