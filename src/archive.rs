//! Zip member extraction.
//!
//! The clinical-trial archives hold many tables; only one member is kept.
//! It is stored directly under its new name, never under the member name
//! first, so two archives extracted into the same folder cannot collide.

use crate::error::ScrapeError;
use crate::storage::Storage;
use std::io::{Cursor, Read};
use tracing::{info, instrument};
use zip::result::ZipError;

/// Cap on the buffer reserved up front from a member's declared size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Buffer to reserve for a member that claims `declared` bytes. The header
/// value is untrusted, so anything above [`MAX_PREALLOC`] grows on demand.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

/// Read `member` out of the zip in `archive`.
///
/// # Errors
///
/// [`ScrapeError::MissingMember`] when the archive has no such member,
/// [`ScrapeError::Zip`] when `archive` is not a readable zip.
pub fn read_member(archive_name: &str, archive: &[u8], member: &str) -> Result<Vec<u8>, ScrapeError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut entry = match zip.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ScrapeError::MissingMember {
                archive: archive_name.to_string(),
                member: member.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::with_capacity(initial_capacity(entry.size()));
    entry.read_to_end(&mut out)?;
    Ok(out)
}

/// Extract `member` from the archive stored under `archive_key`, store it as
/// `dest_key`, then delete the archive.
///
/// The archive is removed even when extraction fails.
///
/// # Arguments
///
/// * `storage` - Folder holding the staged archive and receiving the member.
/// * `archive_key` - Key of the staged zip.
/// * `member` - Name of the member to keep, e.g. `studies.txt`.
/// * `dest_key` - Key the member is stored under.
///
/// # Returns
///
/// Number of bytes written under `dest_key`.
///
/// # Errors
///
/// Anything [`read_member`] reports, plus storage I/O failures. A failure to
/// remove the archive is reported even when extraction succeeded.
#[instrument(level = "info", skip(storage))]
pub async fn extract_renamed<S: Storage>(
    storage: &S,
    archive_key: &str,
    member: &str,
    dest_key: &str,
) -> Result<u64, ScrapeError> {
    let result = async {
        let data = {
            let archive = storage.read(archive_key).await?;
            read_member(archive_key, &archive, member)?
        };
        storage.write(dest_key, &data).await?;
        Ok::<u64, ScrapeError>(data.len() as u64)
    }
    .await;

    storage.remove(archive_key).await?;
    let bytes = result?;
    info!(bytes, "Extracted member");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use crate::testing::zip_bytes;

    #[test]
    fn test_read_member() {
        let zip = zip_bytes(&[("studies.txt", "a|b\n"), ("other.txt", "zzz")]);
        assert_eq!(read_member("x.zip", &zip, "studies.txt").unwrap(), b"a|b\n");
    }

    #[test]
    fn test_missing_member() {
        let zip = zip_bytes(&[("other.txt", "zzz")]);
        let err = read_member("x.zip", &zip, "studies.txt").unwrap_err();
        assert!(matches!(err, ScrapeError::MissingMember { .. }));
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(4), 4);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOC as usize);
        assert_eq!(initial_capacity(u64::from(u32::MAX)), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_member("x.zip", b"<html>404</html>", "studies.txt").unwrap_err();
        assert!(matches!(err, ScrapeError::Zip(_)));
    }

    #[tokio::test]
    async fn test_extract_renames_and_removes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let zip = zip_bytes(&[("studies.txt", "rows")]);
        storage.write("20230101_clinical.zip", &zip).await.unwrap();

        let bytes = extract_renamed(&storage, "20230101_clinical.zip", "studies.txt", "20230101.txt")
            .await
            .unwrap();

        assert_eq!(bytes, 4);
        assert_eq!(storage.list().await.unwrap(), vec!["20230101.txt".to_string()]);
        assert_eq!(storage.read("20230101.txt").await.unwrap(), b"rows");
    }

    #[tokio::test]
    async fn test_archive_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        storage.write("bad.zip", b"not a zip").await.unwrap();

        assert!(extract_renamed(&storage, "bad.zip", "studies.txt", "bad.txt").await.is_err());
        assert!(storage.list().await.unwrap().is_empty());
    }
}
