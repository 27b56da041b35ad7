use chrono::NaiveDateTime;

use crate::archive::FileMetadata;
use crate::{LogRecord, Severity};

use super::{Grammar, RawEntrySpan};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The parsing tier that produced a [`LogRecord`].
///
/// Tiers are tried in order and the first that matches wins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tier {
    /// The full prefix was parsed.
    Structured,

    /// Only the timestamp was parsed; the rest of the entry is the message.
    Timestamped,

    /// Nothing was parsed; the whole span is the message.
    Fallback,
}

impl Grammar {
    /// Parse one entry into a [`LogRecord`].
    ///
    /// This never fails: entries that don't have the expected prefix are returned with
    /// [`Severity::NotParsed`].
    #[must_use]
    pub fn parse(&self, metadata: &FileMetadata, span: &RawEntrySpan<'_>) -> LogRecord {
        self.parse_with_tier(metadata, span).0
    }

    /// Parse one entry, also returning the [`Tier`] that matched.
    #[must_use]
    pub fn parse_with_tier(
        &self,
        metadata: &FileMetadata,
        span: &RawEntrySpan<'_>,
    ) -> (LogRecord, Tier) {
        if let Some(record) = self.parse_structured(metadata, span.text) {
            return (record, Tier::Structured);
        }
        if let Some(record) = self.parse_timestamped(metadata, span.text) {
            return (record, Tier::Timestamped);
        }
        (fallback(metadata, span.text), Tier::Fallback)
    }

    fn parse_structured(&self, metadata: &FileMetadata, text: &str) -> Option<LogRecord> {
        let captures = self.structured.captures(text)?;
        let timestamp = parse_timestamp(&captures[1])?;
        let severity: Severity = captures[6].parse().ok()?;

        Some(LogRecord {
            timestamp: Some(timestamp),
            application: captures[2].to_string(),
            user: captures[3].to_string(),
            database: captures[4].to_string(),
            session_id: captures[5].to_string(),
            severity,
            message: strip_line_terminator(&captures[7]).to_string(),
            source_type: metadata.source_type.clone(),
            server_name: metadata.server_name.clone(),
        })
    }

    fn parse_timestamped(&self, metadata: &FileMetadata, text: &str) -> Option<LogRecord> {
        let captures = self.timestamped.captures(text)?;
        let timestamp = parse_timestamp(&captures[1])?;

        Some(unparsed(
            metadata,
            Some(timestamp),
            strip_line_terminator(&captures[2]),
        ))
    }
}

fn fallback(metadata: &FileMetadata, text: &str) -> LogRecord {
    unparsed(metadata, None, text)
}

fn unparsed(metadata: &FileMetadata, timestamp: Option<NaiveDateTime>, message: &str) -> LogRecord {
    LogRecord {
        timestamp,
        application: String::new(),
        user: String::new(),
        database: String::new(),
        session_id: String::new(),
        severity: Severity::NotParsed,
        message: message.to_string(),
        source_type: metadata.source_type.clone(),
        server_name: metadata.server_name.clone(),
    }
}

// Out-of-range values (e.g. month 13) match the pattern but fail here.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn strip_line_terminator(message: &str) -> &str {
    message.trim_end_matches(|c| c == '\n' || c == '\r')
}
