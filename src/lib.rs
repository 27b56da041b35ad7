// lib.rs

//! The elements that drive the `pg-log-ingest` binary.
//!
//! Archived PostgreSQL server logs are unpacked ([`archive`]), split into entries and parsed into
//! [`LogRecord`]s ([`entry`]), and appended to a partitioned Parquet store ([`writer`]). The
//! [`pipeline`] module ties these together.

#![warn(
    explicit_outlives_requirements,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_crate_level_docs,
    missing_docs,
    private_doc_tests,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_lifetimes,
    variant_size_differences,
    clippy::cargo,
    clippy::pedantic
)]

pub mod archive;
pub mod config;
pub mod entry;
pub mod pipeline;
pub mod writer;


use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

/// The severity tag of a [`LogRecord`].
///
/// All variants except [`Severity::NotParsed`] correspond to a keyword PostgreSQL writes before the
/// message body. `NotParsed` marks entries whose prefix could not be parsed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    /// `INFO`
    Info,
    /// `STATEMENT`
    Statement,
    /// `ERROR`
    Error,
    /// `LOG`
    Log,
    /// `DETAIL`
    Detail,
    /// `FATAL`
    Fatal,
    /// `NOT_PARSED`
    NotParsed,
}

impl Severity {
    /// The severities that can appear as a keyword in a log line.
    pub const KEYWORDS: [Severity; 6] = [
        Severity::Info,
        Severity::Statement,
        Severity::Error,
        Severity::Log,
        Severity::Detail,
        Severity::Fatal,
    ];

    /// The tag for this severity, as written in logs and stored in output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Statement => "STATEMENT",
            Severity::Error => "ERROR",
            Severity::Log => "LOG",
            Severity::Detail => "DETAIL",
            Severity::Fatal => "FATAL",
            Severity::NotParsed => "NOT_PARSED",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when parsing an unknown severity tag.
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownSeverity(String);

impl fmt::Display for UnknownSeverity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown severity: {}", self.0)
    }
}

impl std::error::Error for UnknownSeverity {}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::KEYWORDS
            .iter()
            .chain(std::iter::once(&Severity::NotParsed))
            .find(|severity| severity.as_str() == input)
            .copied()
            .ok_or_else(|| UnknownSeverity(input.to_string()))
    }
}

/// A parsed log entry.
///
/// Identity fields that could not be parsed are empty strings. `timestamp` is `None` only when the
/// entry had no parseable timestamp at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogRecord {
    /// When the entry was logged, in the server's local time.
    pub timestamp: Option<NaiveDateTime>,

    /// The `application_name` of the session.
    pub application: String,

    /// The user name of the session.
    pub user: String,

    /// The database name of the session.
    pub database: String,

    /// The session identifier (`<start time>.<pid>` in hex).
    pub session_id: String,

    /// The entry's severity.
    pub severity: Severity,

    /// The message body, possibly spanning several lines.
    pub message: String,

    /// The log family of the archive the entry came from.
    pub source_type: String,

    /// The server the entry came from.
    pub server_name: String,
}
