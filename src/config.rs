//! Command-line configuration for the ingest pipeline.

use std::path::PathBuf;

use regex::Regex;
use structopt::StructOpt;

use crate::writer::PartitionKey;

/// Segment and parse archived PostgreSQL logs into a partitioned Parquet store.
#[derive(Debug, StructOpt)]
#[structopt(name = "pg-log-ingest")]
pub struct Config {
    /// The directory to search (recursively) for log archives.
    #[structopt(parse(from_os_str))]
    pub input: PathBuf,

    /// Only archives whose file name matches this regex are ingested.
    #[structopt(long, default_value = r"\.zip$")]
    pub archive_pattern: Regex,

    /// The root directory of the Parquet store.
    #[structopt(long, parse(from_os_str), default_value = ".data")]
    pub output: PathBuf,

    /// The field to partition stored records by (`server-name` or `source-type`).
    #[structopt(long, default_value = "server-name")]
    pub partition_by: PartitionKey,

    /// The timezone abbreviation that follows each log timestamp.
    #[structopt(long, default_value = "CEST")]
    pub timezone: String,

    /// The number of archives to process concurrently.
    #[structopt(long, default_value = "4")]
    pub jobs: usize,

    /// The number of records buffered per partition before a part file is written.
    #[structopt(long, default_value = "100000")]
    pub batch_size: usize,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use structopt::StructOpt;

    use crate::writer::PartitionKey;

    use super::Config;

    #[test]
    fn defaults() {
        let config = Config::from_iter(&["pg-log-ingest", "/srv/logs"]);

        assert_eq!(config.input, PathBuf::from("/srv/logs"));
        assert_eq!(config.archive_pattern.as_str(), r"\.zip$");
        assert_eq!(config.output, PathBuf::from(".data"));
        assert_eq!(config.partition_by, PartitionKey::ServerName);
        assert_eq!(config.timezone, "CEST");
        assert_eq!(config.jobs, 4);
        assert_eq!(config.batch_size, 100_000);
    }

    #[test]
    fn overrides() {
        let config = Config::from_iter(&[
            "pg-log-ingest",
            "in",
            "--archive-pattern",
            "^POSTGRESQL__",
            "--output",
            "out",
            "--partition-by",
            "source-type",
            "--timezone",
            "UTC",
            "--jobs",
            "1",
            "--batch-size",
            "10",
        ]);

        assert!(config.archive_pattern.is_match("POSTGRESQL__a__b.zip"));
        assert_eq!(config.output, PathBuf::from("out"));
        assert_eq!(config.partition_by, PartitionKey::SourceType);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.jobs, 1);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn invalid_partition_key() {
        let result = Config::from_iter_safe(&["pg-log-ingest", "in", "--partition-by", "host"]);
        assert!(result.is_err());
    }
}
