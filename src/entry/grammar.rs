use regex::Regex;

use crate::Severity;

/// The timezone abbreviation the servers write after each timestamp.
pub const DEFAULT_TIMEZONE: &str = "CEST";

/// The `log_line_prefix` timestamp, `%Y-%m-%d %H:%M:%S`.
const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}";

/// The compiled patterns for one timezone literal.
///
/// The timezone literal is matched verbatim and then discarded; timestamps are kept as local time.
#[derive(Debug)]
pub struct Grammar {
    timezone: String,
    pub(super) entry_start: Regex,
    pub(super) structured: Regex,
    pub(super) timestamped: Regex,
}

impl Grammar {
    /// Compile the patterns for entries whose timestamps are followed by `timezone`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern exceeds the regex size limits. `timezone` is escaped, so this
    /// does not happen for any reasonable abbreviation.
    pub fn new(timezone: &str) -> Result<Self, regex::Error> {
        let zone = regex::escape(timezone);
        let severities = Severity::KEYWORDS
            .iter()
            .map(|severity| severity.as_str())
            .collect::<Vec<_>>()
            .join("|");

        let entry_start = Regex::new(&format!(r"(?m)^{} {} ", TIMESTAMP_PATTERN, zone))?;

        // application (greedy, one line) / user / database / session id / severity / message
        let structured = Regex::new(&format!(
            r"\A({ts}) {zone} (.*) (\S+) (\S+) (\w{{1,8}}\.\w+) ({severities}):  (?s:(.*))\z",
            ts = TIMESTAMP_PATTERN,
            zone = zone,
            severities = severities,
        ))?;

        let timestamped = Regex::new(&format!(
            r"\A({ts}) {zone} (?s:(.*))\z",
            ts = TIMESTAMP_PATTERN,
            zone = zone,
        ))?;

        Ok(Grammar {
            timezone: timezone.to_string(),
            entry_start,
            structured,
            timestamped,
        })
    }

    /// The timezone literal this grammar matches.
    #[must_use]
    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}
