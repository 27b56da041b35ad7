// pipeline.rs

//! The ingest pipeline: discover archives, unpack, segment, parse and write.

use std::fmt;
use std::io;
use std::ops::AddAssign;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::archive::{directory, zip, LogFile};
use crate::config::Config;
use crate::entry::{Grammar, Tier};
use crate::writer::{self, PartitionedWriter, WriteError};
use crate::{LogRecord, Severity};

/// Counters describing what a run ingested.
///
/// The `not_parsed` count is the main signal that the servers' log format has drifted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Archives processed, including failed ones.
    pub archives: usize,

    /// Archives that could not be opened, e.g. because of a malformed name.
    pub failed_archives: usize,

    /// Files unpacked from archives.
    pub files: usize,

    /// Archive members that could not be read.
    pub skipped_files: usize,

    /// Files in which no entry start was found. These contribute no records.
    pub empty_files: usize,

    /// Records produced.
    pub records: usize,

    /// Records with [`Severity::NotParsed`].
    pub not_parsed: usize,

    /// Records that didn't even have a timestamp.
    pub fallback: usize,
}

impl AddAssign for Summary {
    fn add_assign(&mut self, other: Self) {
        self.archives += other.archives;
        self.failed_archives += other.failed_archives;
        self.files += other.files;
        self.skipped_files += other.skipped_files;
        self.empty_files += other.empty_files;
        self.records += other.records;
        self.not_parsed += other.not_parsed;
        self.fallback += other.fallback;
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} archives ({} failed), {} files ({} skipped, {} without entries), \
             {} records ({} not parsed, {} without timestamp)",
            self.archives,
            self.failed_archives,
            self.files,
            self.skipped_files,
            self.empty_files,
            self.records,
            self.not_parsed,
            self.fallback,
        )
    }
}

/// The records parsed from one archive, in file and entry order.
#[derive(Debug, Default)]
pub struct ArchiveOutput {
    /// The parsed records.
    pub records: Vec<LogRecord>,

    /// Counters for this archive alone.
    pub summary: Summary,
}

/// Possible error situations that abort a run.
///
/// Problems with individual archives, files or entries never abort a run; they are logged and
/// counted in the [`Summary`].
#[derive(Debug)]
pub enum RunError {
    /// The timezone could not be compiled into a [`Grammar`].
    Grammar(regex::Error),

    /// The input directory could not be searched.
    Discover(io::Error),

    /// Records could not be written to the store.
    Write(WriteError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunError::Grammar(error) => write!(f, "invalid timezone pattern: {}", error),
            RunError::Discover(error) => write!(f, "error discovering archives: {}", error),
            RunError::Write(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Grammar(error) => Some(error),
            RunError::Discover(error) => Some(error),
            RunError::Write(error) => Some(error),
        }
    }
}

impl From<WriteError> for RunError {
    fn from(error: WriteError) -> Self {
        RunError::Write(error)
    }
}

/// Parse every entry of one unpacked file.
///
/// Records are returned in the order their entries appear in the file.
#[must_use]
pub fn assemble(grammar: &Grammar, file: &LogFile) -> (Vec<LogRecord>, Summary) {
    let mut summary = Summary {
        files: 1,
        ..Summary::default()
    };

    let mut records = Vec::new();
    for span in grammar.segment(&file.text) {
        let (record, tier) = grammar.parse_with_tier(&file.metadata, &span);
        if record.severity == Severity::NotParsed {
            summary.not_parsed += 1;
        }
        if tier == Tier::Fallback {
            summary.fallback += 1;
        }
        records.push(record);
    }
    summary.records = records.len();

    if records.is_empty() {
        warn!(
            "No entries found in {} from {}",
            file.metadata.file_name, file.metadata.archive_name
        );
        summary.empty_files = 1;
    } else {
        debug!(
            "Parsed {} records from {} in {}",
            records.len(),
            file.metadata.file_name,
            file.metadata.archive_name
        );
    }

    (records, summary)
}

/// Unpack and parse the archive at `path`.
///
/// This never fails: an archive that can't be opened is logged and counted as failed, and members
/// that can't be read are logged and skipped.
#[must_use]
pub fn process_archive(grammar: &Grammar, path: &Path) -> ArchiveOutput {
    let mut output = ArchiveOutput::default();
    output.summary.archives = 1;

    let unpacker = match zip::open(path) {
        Ok(unpacker) => unpacker,
        Err(error) => {
            error!("Skipping archive {}: {}", path.display(), error);
            output.summary.failed_archives = 1;
            return output;
        }
    };

    for file in unpacker {
        match file {
            Ok(file) => {
                let (records, summary) = assemble(grammar, &file);
                output.records.extend(records);
                output.summary += summary;
            }
            Err(error) => {
                warn!("Skipping member of {}: {}", path.display(), error);
                output.summary.skipped_files += 1;
            }
        }
    }

    output
}

/// Run the pipeline described by `config`.
///
/// Archives are processed on the blocking thread pool, up to `config.jobs` at a time, and their
/// records are written in the order the archives were discovered.
///
/// # Errors
///
/// - If `config.timezone` can't be compiled, a [`RunError::Grammar`] is returned.
/// - If `config.input` can't be searched, a [`RunError::Discover`] is returned.
/// - If writing to the store fails, a [`RunError::Write`] is returned.
pub async fn run(config: Config) -> Result<Summary, RunError> {
    let grammar = Arc::new(Grammar::new(&config.timezone).map_err(RunError::Grammar)?);
    let archives = directory::discover(&config.input, &config.archive_pattern)
        .map_err(RunError::Discover)?;

    if archives.is_empty() {
        warn!(
            "No archives matching {} found in {}",
            config.archive_pattern,
            config.input.display()
        );
    }

    let mut writer = PartitionedWriter::open(writer::Config {
        data_directory: config.output,
        partition_by: config.partition_by,
        batch_size: config.batch_size,
    })?;

    let mut summary = Summary::default();
    for batch in archives.chunks(config.jobs.max(1)) {
        let tasks = batch
            .iter()
            .cloned()
            .map(|path| {
                let grammar = Arc::clone(&grammar);
                blocking::unblock(move || process_archive(&grammar, &path))
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let output = task.await;
            summary += output.summary;
            writer.append(output.records)?;
        }
    }
    writer.finish()?;

    info!("Ingested {}", summary);
    Ok(summary)
}
