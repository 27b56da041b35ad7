// archive/mod.rs

//! The interface for unpacking log archives in `pg-log-ingest`.
//!
//! Archives are named `<source type>__<server name>__<stamp>.zip`. The name is decomposed into an
//! [`ArchiveName`] before any member is read, and every member becomes a [`LogFile`] carrying
//! [`FileMetadata`] derived from it.

pub mod directory;
pub mod zip;

use std::fmt;
use std::io;
use std::path::Path;

/// The delimiter between the fields of an archive name.
pub const ARCHIVE_NAME_DELIMITER: &str = "__";

/// The fields encoded in an archive's file name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveName {
    /// The archive's file name, as given.
    pub name: String,

    /// The log family, e.g. `POSTGRESQL`.
    pub source_type: String,

    /// The server whose logs are in the archive.
    pub server_name: String,

    /// The delivery stamp, e.g. `2018-10-02_120852`, if present.
    pub stamp: Option<String>,
}

impl ArchiveName {
    /// Decompose the base name of `archive_name`.
    ///
    /// Any leading directories and the final extension are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the base name does not split into at least two non-empty
    /// fields.
    pub fn parse(archive_name: &str) -> Result<Self, MetadataError> {
        let path = Path::new(archive_name);
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| MetadataError::new(archive_name))?;

        let mut fields = stem.split(ARCHIVE_NAME_DELIMITER);
        let source_type = fields.next().filter(|field| !field.is_empty());
        let server_name = fields.next().filter(|field| !field.is_empty());

        match (source_type, server_name) {
            (Some(source_type), Some(server_name)) => Ok(ArchiveName {
                name: path
                    .file_name()
                    .map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
                source_type: source_type.to_string(),
                server_name: server_name.to_string(),
                stamp: fields.next().map(str::to_string),
            }),
            _ => Err(MetadataError::new(archive_name)),
        }
    }

    /// Build the [`FileMetadata`] for a member of this archive.
    #[must_use]
    pub fn file(&self, file_name: &str) -> FileMetadata {
        FileMetadata {
            source_type: self.source_type.clone(),
            server_name: self.server_name.clone(),
            stamp: self.stamp.clone(),
            archive_name: self.name.clone(),
            file_name: file_name.to_string(),
        }
    }
}

/// Metadata attached to every entry of one unpacked log file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileMetadata {
    /// The log family of the archive.
    pub source_type: String,

    /// The server the file came from.
    pub server_name: String,

    /// The archive's delivery stamp, if its name had one.
    pub stamp: Option<String>,

    /// The archive's file name.
    pub archive_name: String,

    /// The member's name within the archive.
    pub file_name: String,
}

impl FileMetadata {
    /// Derive the metadata for `file_name` within the archive called `archive_name`.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if `archive_name` is malformed (see [`ArchiveName::parse`]).
    pub fn from_archive_name(archive_name: &str, file_name: &str) -> Result<Self, MetadataError> {
        Ok(ArchiveName::parse(archive_name)?.file(file_name))
    }
}

/// A log file unpacked from an archive.
#[derive(Debug, PartialEq)]
pub struct LogFile {
    /// Where the file came from.
    pub metadata: FileMetadata,

    /// The decoded contents of the file.
    pub text: String,
}

/// An unpacker can be any type that can be used as an `Iterator` of [`LogFile`]s.
///
/// An `Err` item concerns one member only; iteration can continue past it.
pub trait Unpacker: Iterator<Item = Result<LogFile, UnpackError>> {}

/// An archive name that does not decompose into a source type and a server name.
#[derive(Debug, Eq, PartialEq)]
pub struct MetadataError {
    archive_name: String,
}

impl MetadataError {
    fn new(archive_name: &str) -> Self {
        MetadataError {
            archive_name: archive_name.to_string(),
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "malformed archive name {}: expected `<source type>{delim}<server name>[{delim}<stamp>]`",
            self.archive_name,
            delim = ARCHIVE_NAME_DELIMITER
        )
    }
}

impl std::error::Error for MetadataError {}

/// Possible error situations when unpacking an archive.
#[derive(Debug)]
pub enum UnpackError {
    /// The archive name is malformed.
    Metadata(MetadataError),

    /// An I/O error occurred when reading the archive.
    Io(io::Error),

    /// The archive, or one of its members, is not a valid zip file.
    Zip(::zip::result::ZipError),
}

impl fmt::Display for UnpackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnpackError::Metadata(error) => write!(f, "{}", error),
            UnpackError::Io(error) => write!(f, "error reading archive: {}", error),
            UnpackError::Zip(error) => write!(f, "invalid zip archive: {}", error),
        }
    }
}

impl std::error::Error for UnpackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UnpackError::Metadata(error) => Some(error),
            UnpackError::Io(error) => Some(error),
            UnpackError::Zip(error) => Some(error),
        }
    }
}

impl From<MetadataError> for UnpackError {
    fn from(error: MetadataError) -> Self {
        UnpackError::Metadata(error)
    }
}

impl From<io::Error> for UnpackError {
    fn from(error: io::Error) -> Self {
        UnpackError::Io(error)
    }
}

impl From<::zip::result::ZipError> for UnpackError {
    fn from(error: ::zip::result::ZipError) -> Self {
        UnpackError::Zip(error)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveName, FileMetadata, MetadataError};

    #[test]
    fn parse_archive_name() {
        let name = ArchiveName::parse("POSTGRESQL__myserver__2018-10-02_120852.zip")
            .expect("valid archive name");

        assert_eq!(name.source_type, "POSTGRESQL");
        assert_eq!(name.server_name, "myserver");
        assert_eq!(name.stamp.as_deref(), Some("2018-10-02_120852"));
        assert_eq!(name.name, "POSTGRESQL__myserver__2018-10-02_120852.zip");
    }

    #[test]
    fn parse_archive_name_ignores_directories() {
        let name = ArchiveName::parse("/srv/drop/POSTGRESQL__db-01.zip").expect("valid name");

        assert_eq!(name.source_type, "POSTGRESQL");
        assert_eq!(name.server_name, "db-01");
        assert_eq!(name.stamp, None);
        assert_eq!(name.name, "POSTGRESQL__db-01.zip");
    }

    #[test]
    fn parse_archive_name_too_few_fields() {
        let error = ArchiveName::parse("postgresql-logs.zip").err().unwrap();
        assert_eq!(error, MetadataError::new("postgresql-logs.zip"));
        assert_eq!(
            &format!("{}", error),
            "malformed archive name postgresql-logs.zip: expected \
             `<source type>__<server name>[__<stamp>]`"
        );
    }

    #[test]
    fn parse_archive_name_empty_field() {
        assert!(ArchiveName::parse("__myserver__2018.zip").is_err());
        assert!(ArchiveName::parse("POSTGRESQL____2018.zip").is_err());
        assert!(ArchiveName::parse("").is_err());
    }

    #[test]
    fn file_metadata_from_archive_name() {
        let metadata =
            FileMetadata::from_archive_name("POSTGRESQL__myserver__2018.zip", "pg/postgresql.log")
                .expect("valid archive name");

        assert_eq!(metadata.source_type, "POSTGRESQL");
        assert_eq!(metadata.server_name, "myserver");
        assert_eq!(metadata.archive_name, "POSTGRESQL__myserver__2018.zip");
        assert_eq!(metadata.file_name, "pg/postgresql.log");
    }
}
