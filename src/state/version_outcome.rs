//! Outcome of storing one freshly extracted article
//!
//! The version store returns exactly one of these per crawl of a URL; both
//! the listing crawl and the single-article crawl consume it the same way.

use std::fmt;

/// What the version store did with an extracted article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionOutcome {
    /// No article existed for the URL; one was inserted
    Created,

    /// Headline, sub-headline and content matched the stored article exactly;
    /// only the last-crawled timestamp moved
    Unchanged,

    /// At least one text field differed; the previous text was archived as a
    /// version and the article overwritten
    Changed,
}

impl VersionOutcome {
    /// Returns true if this outcome produced a new article version
    ///
    /// `Created` and `Changed` both count; `Unchanged` does not.
    pub fn is_new_version(&self) -> bool {
        matches!(self, Self::Created | Self::Changed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
        }
    }
}

impl fmt::Display for VersionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
