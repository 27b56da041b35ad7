//! An unpacker for zip archives of log files.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::{debug, trace, warn};

use super::{ArchiveName, LogFile, UnpackError};

struct ZipUnpacker<R: Read + Seek> {
    name: ArchiveName,
    archive: ::zip::ZipArchive<R>,
    next_index: usize,
}

/// Open the zip archive at `path`.
///
/// The archive's file name must decompose into an [`ArchiveName`].
///
/// # Errors
///
/// - If the file name is malformed, an [`UnpackError::Metadata`] is returned before the file is
///   opened.
/// - Any `io::Error`s that occur when opening the file are propagated.
/// - If the file is not a zip archive, an [`UnpackError::Zip`] is returned.
pub fn open(path: &Path) -> Result<impl super::Unpacker, UnpackError> {
    let name = ArchiveName::parse(&path.to_string_lossy())?;
    let file = File::open(path)?;
    ZipUnpacker::new(name, BufReader::new(file))
}

/// Unpack a zip archive called `archive_name` from `reader`.
///
/// # Errors
///
/// - If `archive_name` is malformed, an [`UnpackError::Metadata`] is returned.
/// - If `reader` does not contain a zip archive, an [`UnpackError::Zip`] is returned.
pub fn unpack<R: Read + Seek>(
    archive_name: &str,
    reader: R,
) -> Result<impl super::Unpacker, UnpackError> {
    ZipUnpacker::new(ArchiveName::parse(archive_name)?, reader)
}

impl<R: Read + Seek> ZipUnpacker<R> {
    fn new(name: ArchiveName, reader: R) -> Result<Self, UnpackError> {
        let archive = ::zip::ZipArchive::new(reader)?;
        debug!("Opened archive {} with {} members", name.name, archive.len());

        Ok(Self {
            name,
            archive,
            next_index: 0,
        })
    }

    fn read_member(&mut self, index: usize) -> Result<Option<LogFile>, UnpackError> {
        let mut member = self.archive.by_index(index)?;
        if member.is_dir() {
            trace!("Skipping directory {} in {}", member.name(), self.name.name);
            return Ok(None);
        }

        let file_name = member.name().to_string();
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    "{} in {} is not valid UTF-8 ({}), decoding lossily",
                    file_name, self.name.name, error
                );
                String::from_utf8_lossy(error.as_bytes()).into_owned()
            }
        };

        trace!("Read {} bytes from {}", text.len(), file_name);
        Ok(Some(LogFile {
            metadata: self.name.file(&file_name),
            text,
        }))
    }
}

impl<R: Read + Seek> super::Unpacker for ZipUnpacker<R> {}

impl<R: Read + Seek> Iterator for ZipUnpacker<R> {
    type Item = Result<LogFile, UnpackError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;

            match self.read_member(index) {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => continue,
                Err(error) => return Some(Err(error)),
            }
        }
        None
    }
}
