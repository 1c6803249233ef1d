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

//! Cover version detection.
//!
//! Covers are recognised by title convention only: `Title (Artist cover)`.

use globset::{Glob, GlobBuilder, GlobMatcher};

const COVER_PATTERN: &str = "* cover)";

#[derive(Debug, Clone)]
pub(crate) struct CoverMatcher {
    matcher: GlobMatcher,
}

impl CoverMatcher {
    /// # Errors
    ///
    /// Returns a [`globset::Error`] if the built-in pattern fails to compile.
    pub(crate) fn new() -> Result<Self, globset::Error> {
        let glob: Glob = GlobBuilder::new(COVER_PATTERN)
            .case_insensitive(true)
            .literal_separator(false)
            .build()?;

        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub(crate) fn is_cover(&self, title: &str) -> bool {
        self.matcher.is_match(title)
    }
}
