// entry/mod.rs

//! Segmentation and parsing of PostgreSQL log entries.
//!
//! PostgreSQL writes entries with a `log_line_prefix` of the form:
//!
//! ```text
//! 2018-03-27 09:25:22 CEST myapp bob mydb 5abc1234.7 LOG:  connection received
//! ```
//!
//! An entry's message may span several lines (DDL statements, `DETAIL` blocks), so a file is first
//! split into entries at each line that starts with a timestamp ([`segment`]), and each entry is
//! then parsed on its own ([`parse`]).
//!
//! Everything in this module is pure: no I/O, no shared mutable state.

mod grammar;
mod parse;
mod segment;

use lazy_static::lazy_static;

use crate::archive::FileMetadata;
use crate::LogRecord;

pub use grammar::{Grammar, DEFAULT_TIMEZONE};
pub use parse::Tier;
pub use segment::{RawEntrySpan, Segments};

lazy_static! {
    static ref DEFAULT_GRAMMAR: Grammar =
        Grammar::new(DEFAULT_TIMEZONE).expect("default grammar patterns are valid");
}

/// Split `text` into entries using the [`DEFAULT_TIMEZONE`] grammar.
///
/// See [`Grammar::segment`].
#[must_use]
pub fn segment(text: &str) -> Segments<'static, '_> {
    DEFAULT_GRAMMAR.segment(text)
}

/// Parse `span` using the [`DEFAULT_TIMEZONE`] grammar.
///
/// See [`Grammar::parse`].
#[must_use]
pub fn parse(metadata: &FileMetadata, span: &RawEntrySpan<'_>) -> LogRecord {
    DEFAULT_GRAMMAR.parse(metadata, span)
}
