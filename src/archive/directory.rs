//! Discovery of archives in a directory tree.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use regex::Regex;
use walkdir::WalkDir;

/// Find the archives under `root_path` whose file name matches `pattern`.
///
/// The directory tree is walked recursively. Paths are returned sorted so that runs over the same
/// tree see archives in the same order.
///
/// # Errors
///
/// Propagates any `io::Error`s that occur when walking the tree.
pub fn discover(root_path: &Path, pattern: &Regex) -> io::Result<Vec<PathBuf>> {
    debug!("Discovering archives matching {} in {:?}", pattern, root_path);

    let mut archives = Vec::new();
    for entry in WalkDir::new(root_path).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matched = entry
            .file_name()
            .to_str()
            .map_or(false, |name| pattern.is_match(name));
        trace!("{} {}", if matched { "Found" } else { "Ignoring" }, entry.path().display());

        if matched {
            archives.push(entry.into_path());
        }
    }

    archives.sort();
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use regex::Regex;

    use crate::test;

    use super::discover;

    #[test]
    fn discover_matching_archives() -> test::Result {
        let tempdir = tempfile::tempdir()?;
        fs::create_dir(tempdir.path().join("2018"))?;
        fs::write(tempdir.path().join("POSTGRESQL__b__2018.zip"), "")?;
        fs::write(tempdir.path().join("2018").join("POSTGRESQL__a__2018.zip"), "")?;
        fs::write(tempdir.path().join("README.txt"), "")?;

        let archives = discover(tempdir.path(), &Regex::new(r"\.zip$")?)?;
        assert_eq!(
            archives,
            vec![
                tempdir.path().join("2018").join("POSTGRESQL__a__2018.zip"),
                tempdir.path().join("POSTGRESQL__b__2018.zip"),
            ]
        );

        Ok(())
    }

    #[test]
    fn discover_nothing() -> test::Result {
        let tempdir = tempfile::tempdir()?;
        fs::write(tempdir.path().join("MYSQL__a__2018.zip"), "")?;

        let archives = discover(tempdir.path(), &Regex::new(r"^POSTGRESQL__.*\.zip$")?)?;
        assert!(archives.is_empty());

        Ok(())
    }

    #[test]
    fn discover_missing_root() -> test::Result {
        let tempdir = tempfile::tempdir()?;
        let result = discover(&tempdir.path().join("missing"), &Regex::new(r"\.zip$")?);
        assert!(result.is_err());

        Ok(())
    }
}
