//! Write-to-temporary-then-rename commits.
//!
//! Output is staged in a hidden, uniquely named file next to the destination and
//! renamed over it in one step, so readers see either the old or the new file.
//! A stage that is dropped without [`StagedWrite::commit`] deletes its temporary
//! file; one left behind by a crashed process is never renamed into place.
//! Directories created for the destination are removed again if the write fails.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Error;

/// Suffix of every temporary artifact.
pub const TEMP_SUFFIX: &str = ".locwriter-tmp";

/// Fully written content waiting to replace its destination.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    destination: PathBuf,
    /// Outermost directory created by [`StagedWrite::stage`], if any.
    created_dir: Option<PathBuf>,
}

impl StagedWrite {
    /// Writes `bytes` to a temporary file in the destination's directory
    /// (created if missing) and syncs it to disk.
    pub fn stage<P: AsRef<Path>>(destination: P, bytes: &[u8]) -> Result<Self, Error> {
        let destination = destination.as_ref();
        let file_name = destination.file_name().ok_or_else(|| {
            Error::invalid_input(format!(
                "destination `{}` has no file name",
                destination.display()
            ))
        })?;
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let created_dir = first_missing_ancestor(parent);
        fs::create_dir_all(parent)?;

        let prefix = format!(".{}.", file_name.to_string_lossy());
        let temp = match write_temp(parent, &prefix, destination, bytes) {
            Ok(temp) => temp,
            Err(e) => {
                if let Some(created) = &created_dir {
                    remove_created_dirs(parent, created);
                }
                return Err(e);
            }
        };

        debug!(
            event = "staged",
            destination = %destination.display(),
            temporary = %temp.path().display(),
            bytes = bytes.len()
        );

        Ok(StagedWrite {
            temp,
            destination: destination.to_path_buf(),
            created_dir,
        })
    }

    /// Where the content currently lives.
    pub fn temporary_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically replaces the destination with the staged content.
    pub fn commit(self) -> Result<PathBuf, Error> {
        if let Err(e) = self.temp.persist(&self.destination) {
            // Deletes the temporary file before its directory is cleaned up
            drop(e.file);
            if let (Some(created), Some(parent)) =
                (&self.created_dir, self.destination.parent())
            {
                remove_created_dirs(parent, created);
            }
            return Err(Error::Io(e.error));
        }
        Ok(self.destination)
    }
}

fn write_temp(
    parent: &Path,
    prefix: &str,
    destination: &Path,
    bytes: &[u8],
) -> Result<NamedTempFile, Error> {
    let mut temp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;

    // Keep the mode of the file being replaced
    if let Ok(metadata) = fs::metadata(destination) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// The outermost ancestor of `dir` (itself included) that does not exist yet.
fn first_missing_ancestor(dir: &Path) -> Option<PathBuf> {
    let mut missing = None;
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() || ancestor.exists() {
            break;
        }
        missing = Some(ancestor.to_path_buf());
    }
    missing
}

/// Removes `dir` and its ancestors up to `created`, stopping at the first one
/// that is not empty.
fn remove_created_dirs(dir: &Path, created: &Path) {
    for ancestor in dir.ancestors() {
        if fs::remove_dir(ancestor).is_err() || ancestor == created {
            break;
        }
    }
    debug!(event = "cleaned_up", directory = %created.display());
}

/// Returns `true` if `path` names a temporary artifact of [`StagedWrite`].
pub fn is_temporary_artifact<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.ends_with(TEMP_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("en.txt");
        fs::write(&destination, "old").unwrap();

        let staged = StagedWrite::stage(&destination, b"new").unwrap();
        assert!(is_temporary_artifact(staged.temporary_path()));
        assert_eq!(staged.temporary_path().parent(), Some(dir.path()));
        assert_eq!(fs::read_to_string(&destination).unwrap(), "old");

        let committed = staged.commit().unwrap();
        assert_eq!(committed, destination);
        assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("en.txt");

        let staged = StagedWrite::stage(&destination, b"never committed").unwrap();
        let temporary = staged.temporary_path().to_path_buf();
        assert!(temporary.exists());
        drop(staged);

        assert!(!temporary.exists());
        assert!(!destination.exists());
    }

    #[test]
    fn test_stage_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("fr.lproj").join("Localizable.strings");
        StagedWrite::stage(&destination, b"x").unwrap().commit().unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"x");
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("en.txt");
        fs::write(&destination, "old").unwrap();
        fs::set_permissions(&destination, fs::Permissions::from_mode(0o644)).unwrap();

        StagedWrite::stage(&destination, b"new").unwrap().commit().unwrap();
        let mode = fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_first_missing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        assert_eq!(first_missing_ancestor(&nested), Some(dir.path().join("a")));
        assert_eq!(first_missing_ancestor(dir.path()), None);
    }

    #[test]
    fn test_remove_created_dirs_stops_at_created_and_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        remove_created_dirs(&nested, &dir.path().join("a").join("b"));
        assert!(!dir.path().join("a").join("b").exists());
        assert!(dir.path().join("a").exists());

        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a").join("b").join("keep.txt"), "x").unwrap();
        remove_created_dirs(&nested, &dir.path().join("a"));
        assert!(!nested.exists());
        assert!(dir.path().join("a").join("b").join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_commit_removes_created_directories() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("new").join("en.txt");
        let staged = StagedWrite::stage(&destination, b"x").unwrap();
        assert!(dir.path().join("new").exists());

        // A non-empty directory cannot be replaced by a file
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("occupied"), "x").unwrap();
        assert!(staged.commit().is_err());

        assert!(destination.join("occupied").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("new"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("en.txt")]);
    }

    #[test]
    fn test_is_temporary_artifact() {
        assert!(is_temporary_artifact(".en.txt.a1B2c3.locwriter-tmp"));
        assert!(!is_temporary_artifact("en.txt"));
        assert!(!is_temporary_artifact("notes.locwriter-tmp"));
    }
}
