// src/writer/mod.rs
//! A partitioned, append-only Parquet store for [`LogRecord`]s.
//!
//! Records are grouped by a [`PartitionKey`] and written as part files under
//! `<data_directory>/<column>=<value>/`. Existing part files are never opened for writing, so each
//! run adds to the data written by previous runs.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, trace};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::TypePtr;

use crate::LogRecord;

const PART_FILE_EXTENSION: &str = "parquet";

/// The directory name used for empty partition values.
const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// The stored columns, in schema order.
const COLUMNS: [Column; 9] = [
    Column::Timestamp,
    Column::Application,
    Column::User,
    Column::Database,
    Column::SessionId,
    Column::Severity,
    Column::Message,
    Column::SourceType,
    Column::ServerName,
];

/// The record field used to partition stored data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartitionKey {
    /// Partition by [`LogRecord::server_name`].
    ServerName,

    /// Partition by [`LogRecord::source_type`].
    SourceType,
}

impl PartitionKey {
    /// The column name used in partition directory names.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            PartitionKey::ServerName => Column::ServerName.name(),
            PartitionKey::SourceType => Column::SourceType.name(),
        }
    }

    /// The partition value of `record`.
    #[must_use]
    pub fn value(self, record: &LogRecord) -> &str {
        match self {
            PartitionKey::ServerName => &record.server_name,
            PartitionKey::SourceType => &record.source_type,
        }
    }
}

impl FromStr for PartitionKey {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "server-name" => Ok(PartitionKey::ServerName),
            "source-type" => Ok(PartitionKey::SourceType),
            _ => Err(format!("unrecognised partition key: {}", input)),
        }
    }
}

/// Configuration for [`PartitionedWriter::open`].
pub struct Config {
    /// The root directory of the store. It is created if it doesn't exist.
    pub data_directory: PathBuf,

    /// The field to partition records by.
    pub partition_by: PartitionKey,

    /// The number of records buffered for a partition before a part file is written.
    pub batch_size: usize,
}

/// Possible error situations when writing records.
#[derive(Debug)]
pub enum WriteError {
    /// An I/O error occurred when creating directories or part files.
    Io(io::Error),

    /// An error occurred when encoding a part file.
    Parquet(ParquetError),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WriteError::Io(error) => write!(f, "error writing records: {}", error),
            WriteError::Parquet(error) => write!(f, "error encoding records: {}", error),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io(error) => Some(error),
            WriteError::Parquet(error) => Some(error),
        }
    }
}

impl From<io::Error> for WriteError {
    fn from(error: io::Error) -> Self {
        WriteError::Io(error)
    }
}

impl From<ParquetError> for WriteError {
    fn from(error: ParquetError) -> Self {
        WriteError::Parquet(error)
    }
}

/// Accumulates records per partition and writes them out as Parquet part files.
pub struct PartitionedWriter {
    data_directory: PathBuf,
    partition_by: PartitionKey,
    batch_size: usize,
    schema: TypePtr,
    run_id: String,
    next_part: usize,
    buffers: BTreeMap<String, Vec<LogRecord>>,
}

impl PartitionedWriter {
    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error`s that occur when creating the data directory.
    pub fn open(config: Config) -> Result<Self, WriteError> {
        fs::create_dir_all(&config.data_directory)?;

        Ok(PartitionedWriter {
            data_directory: config.data_directory,
            partition_by: config.partition_by,
            batch_size: config.batch_size.max(1),
            schema: Arc::new(parse_message_type(&schema_message())?),
            run_id: Utc::now().format("%Y%m%dT%H%M%S%6f").to_string(),
            next_part: 0,
            buffers: BTreeMap::new(),
        })
    }

    /// Add `records` to the store.
    ///
    /// Records are buffered, and a partition's buffer is written out once it holds `batch_size`
    /// records. Call [`finish`](Self::finish) to write the rest.
    ///
    /// # Errors
    ///
    /// Any errors from writing a part file are returned. The records of that part are lost.
    pub fn append(
        &mut self,
        records: impl IntoIterator<Item = LogRecord>,
    ) -> Result<Vec<PathBuf>, WriteError> {
        let mut written = Vec::new();
        for record in records {
            let partition = self.partition_by.value(&record).to_string();
            let buffer = self.buffers.entry(partition.clone()).or_insert_with(Vec::new);
            buffer.push(record);

            if buffer.len() >= self.batch_size {
                if let Some(path) = self.flush_partition(&partition)? {
                    written.push(path);
                }
            }
        }
        Ok(written)
    }

    /// Write out all buffered records, returning the paths of the part files written.
    ///
    /// # Errors
    ///
    /// Any errors from writing a part file are returned.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, WriteError> {
        let partitions = self.buffers.keys().cloned().collect::<Vec<_>>();
        let mut written = Vec::new();
        for partition in partitions {
            if let Some(path) = self.flush_partition(&partition)? {
                written.push(path);
            }
        }
        Ok(written)
    }

    fn flush_partition(&mut self, partition: &str) -> Result<Option<PathBuf>, WriteError> {
        let records = match self.buffers.get_mut(partition) {
            Some(buffer) if !buffer.is_empty() => mem::take(buffer),
            _ => return Ok(None),
        };

        let mut path = self.data_directory.clone();
        path.push(format!(
            "{}={}",
            self.partition_by.column(),
            partition_directory(partition)
        ));
        fs::create_dir_all(&path)?;

        path.push(format!("part-{}-{:05}", self.run_id, self.next_part));
        path.set_extension(PART_FILE_EXTENSION);
        self.next_part += 1;

        debug!("Writing {} records to {}", records.len(), path.display());
        write_part(&path, &self.schema, &records)?;

        Ok(Some(path))
    }
}

fn write_part(path: &Path, schema: &TypePtr, records: &[LogRecord]) -> Result<(), WriteError> {
    // `create_new` so that data from earlier runs is never overwritten.
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let properties = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(file, Arc::clone(schema), properties)?;

    let mut row_group = writer.next_row_group()?;
    let mut columns = COLUMNS.iter();
    while let Some(mut column_writer) = row_group.next_column()? {
        let column = columns.next().ok_or_else(|| {
            ParquetError::General("schema has more columns than records".to_string())
        })?;
        trace!("Writing column {}", column.name());

        match (column, column_writer.untyped()) {
            (Column::Timestamp, ColumnWriter::Int64ColumnWriter(typed)) => {
                let mut values = Vec::with_capacity(records.len());
                let mut definition_levels = Vec::with_capacity(records.len());
                for record in records {
                    match record.timestamp {
                        Some(timestamp) => {
                            values.push(timestamp.and_utc().timestamp_micros());
                            definition_levels.push(1);
                        }
                        None => definition_levels.push(0),
                    }
                }
                typed.write_batch(&values, Some(&definition_levels), None)?;
            }
            (column, ColumnWriter::ByteArrayColumnWriter(typed)) => {
                let values = records
                    .iter()
                    .map(|record| ByteArray::from(column.text(record)))
                    .collect::<Vec<_>>();
                typed.write_batch(&values, None, None)?;
            }
            (column, _) => {
                return Err(ParquetError::General(format!(
                    "unexpected column writer for {}",
                    column.name()
                ))
                .into())
            }
        }
        column_writer.close()?;
    }
    row_group.close()?;
    writer.close()?;

    Ok(())
}

fn schema_message() -> String {
    let fields = COLUMNS
        .iter()
        .map(|column| format!("  {};\n", column.definition()))
        .collect::<String>();
    format!("message log_record {{\n{}}}", fields)
}

/// Map a partition value to a directory name.
///
/// Characters that aren't safe in a file name are replaced with `_`.
fn partition_directory(value: &str) -> String {
    let name = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if name.chars().all(|c| c == '.') {
        DEFAULT_PARTITION.to_string()
    } else {
        name
    }
}

#[derive(Clone, Copy, Debug)]
enum Column {
    Timestamp,
    Application,
    User,
    Database,
    SessionId,
    Severity,
    Message,
    SourceType,
    ServerName,
}

impl Column {
    fn name(self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::Application => "application",
            Column::User => "user",
            Column::Database => "database",
            Column::SessionId => "session_id",
            Column::Severity => "severity",
            Column::Message => "message",
            Column::SourceType => "source_type",
            Column::ServerName => "server_name",
        }
    }

    fn definition(self) -> String {
        match self {
            // Local time: the source timezone is not recorded.
            Column::Timestamp => format!("OPTIONAL INT64 {} (TIMESTAMP(MICROS,false))", self.name()),
            _ => format!("REQUIRED BYTE_ARRAY {} (UTF8)", self.name()),
        }
    }

    fn text(self, record: &LogRecord) -> &str {
        match self {
            Column::Timestamp => "",
            Column::Application => &record.application,
            Column::User => &record.user,
            Column::Database => &record.database,
            Column::SessionId => &record.session_id,
            Column::Severity => record.severity.as_str(),
            Column::Message => &record.message,
            Column::SourceType => &record.source_type,
            Column::ServerName => &record.server_name,
        }
    }
}
