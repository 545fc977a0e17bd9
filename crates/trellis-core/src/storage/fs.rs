use crate::{
    error::InternalError,
    storage::{AttachmentKey, AttachmentStore, StoredFile},
};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

// Root-level directory for content being written; never a namespace.
const STAGING_DIR: &str = ".staging";

///
/// FsStore
///
/// Directory-backed attachment store. Layout:
/// `<root>/<namespace>/<id>/<property>/<file_name>`, one file per
/// attachment directory. New content is staged under `<root>/.staging`
/// and renamed into place, so a failed write leaves prior content intact.
///

#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, InternalError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(|e| io_error("create storage root", &staging, &e))?;

        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Directory holding the content of one attachment.
    fn dir(&self, key: &AttachmentKey) -> Result<PathBuf, InternalError> {
        if key.namespace == STAGING_DIR {
            return Err(InternalError::storage(format!(
                "namespace '{STAGING_DIR}' is reserved"
            )));
        }

        let mut dir = self.root.clone();
        for segment in [&key.namespace, &key.id, &key.property] {
            check_segment(segment)?;
            dir.push(segment);
        }

        Ok(dir)
    }

    // The single file inside an attachment directory, if any.
    fn existing_file(dir: &Path) -> Result<Option<PathBuf>, InternalError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("list attachment directory", dir, &e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| io_error("list attachment directory", dir, &e))?;
            if entry.path().is_file() {
                return Ok(Some(entry.path()));
            }
        }

        Ok(None)
    }
}

impl AttachmentStore for FsStore {
    fn read(&self, key: &AttachmentKey) -> Result<Option<StoredFile>, InternalError> {
        let dir = self.dir(key)?;
        let Some(path) = Self::existing_file(&dir)? else {
            return Ok(None);
        };

        let bytes = fs::read(&path).map_err(|e| io_error("read attachment", &path, &e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(StoredFile { file_name, bytes }))
    }

    fn write(&self, key: &AttachmentKey, file: StoredFile) -> Result<(), InternalError> {
        check_segment(&file.file_name)?;
        let dir = self.dir(key)?;
        fs::create_dir_all(&dir).map_err(|e| io_error("create attachment directory", &dir, &e))?;
        let previous = Self::existing_file(&dir)?;

        let staging = self.root.join(STAGING_DIR);
        let mut staged = tempfile::Builder::new()
            .prefix("attachment-")
            .tempfile_in(&staging)
            .map_err(|e| io_error("stage attachment", &staging, &e))?;
        staged
            .write_all(&file.bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| io_error("stage attachment", staged.path(), &e))?;

        // Dropping the staged file on failure removes it.
        let path = dir.join(&file.file_name);
        staged
            .persist(&path)
            .map_err(|e| io_error("move attachment into place", &path, &e.error))?;

        if let Some(previous) = previous.filter(|previous| *previous != path) {
            fs::remove_file(&previous)
                .map_err(|e| io_error("remove previous attachment", &previous, &e))?;
        }

        tracing::debug!(path = %path.display(), bytes = file.bytes.len(), "attachment written");

        Ok(())
    }

    fn clear(&self, key: &AttachmentKey) -> Result<(), InternalError> {
        let dir = self.dir(key)?;

        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove attachment directory", &dir, &e)),
        }
    }
}

// Path segments come from request data and must stay inside the root.
fn check_segment(segment: &str) -> Result<(), InternalError> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(&['/', '\\', '\0'][..]);

    if invalid {
        return Err(InternalError::storage(format!(
            "invalid storage path segment: '{segment}'"
        )));
    }

    Ok(())
}

fn io_error(action: &str, path: &Path, err: &io::Error) -> InternalError {
    InternalError::storage(format!("failed to {action} '{}': {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorOrigin;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsStore) {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = FsStore::open(dir.path().join("attachments")).expect("store should open");

        (dir, store)
    }

    #[test]
    fn write_then_read_keeps_file_name_and_bytes() {
        let (_dir, store) = store();
        let key = AttachmentKey::new("invoices", "42", "scan");

        store
            .write(&key, StoredFile::new("scan.pdf", b"%PDF-1.7".to_vec()))
            .expect("write should succeed");

        let file = store
            .read(&key)
            .expect("read should succeed")
            .expect("content should exist");
        assert_eq!(file.file_name, "scan.pdf");
        assert_eq!(file.bytes, b"%PDF-1.7");
        assert!(store.root().join("invoices/42/scan/scan.pdf").is_file());
    }

    #[test]
    fn rewrite_replaces_the_previous_file() {
        let (_dir, store) = store();
        let key = AttachmentKey::new("invoices", "42", "scan");
        store
            .write(&key, StoredFile::new("old.pdf", vec![1]))
            .expect("write should succeed");
        store
            .write(&key, StoredFile::new("new.png", vec![2]))
            .expect("rewrite should succeed");

        let file = store
            .read(&key)
            .expect("read should succeed")
            .expect("content should exist");
        assert_eq!(file.file_name, "new.png");
        assert!(!store.root().join("invoices/42/scan/old.pdf").exists());
    }

    #[test]
    fn failed_write_keeps_previous_content() {
        let (_dir, store) = store();
        let key = AttachmentKey::new("invoices", "42", "scan");
        store
            .write(&key, StoredFile::new("old.pdf", vec![1, 2, 3]))
            .expect("write should succeed");

        // A directory squatting on the target name makes the final rename fail.
        fs::create_dir(store.root().join("invoices/42/scan/blocked.pdf"))
            .expect("blocking directory should be created");
        store
            .write(&key, StoredFile::new("blocked.pdf", vec![9]))
            .expect_err("rename onto a directory should fail");

        let file = store
            .read(&key)
            .expect("read should succeed")
            .expect("previous content should survive");
        assert_eq!(file, StoredFile::new("old.pdf", vec![1, 2, 3]));

        let staged = fs::read_dir(store.root().join(STAGING_DIR))
            .expect("staging directory should exist")
            .count();
        assert_eq!(staged, 0, "failed write should not leave staged content");
    }

    #[test]
    fn staging_namespace_is_reserved() {
        let (_dir, store) = store();
        let key = AttachmentKey::new(STAGING_DIR, "42", "scan");

        store
            .write(&key, StoredFile::new("a.pdf", vec![1]))
            .expect_err("staging namespace should be rejected");
    }

    #[test]
    fn clear_is_idempotent_and_read_after_clear_is_empty() {
        let (_dir, store) = store();
        let key = AttachmentKey::new("invoices", "42", "scan");
        store
            .write(&key, StoredFile::new("scan.pdf", vec![1, 2]))
            .expect("write should succeed");

        store.clear(&key).expect("first clear should succeed");
        store.clear(&key).expect("second clear should succeed");

        assert!(store.read(&key).expect("read should succeed").is_none());
    }

    #[test]
    fn traversal_segments_are_rejected() {
        let (_dir, store) = store();
        let key = AttachmentKey::new("invoices", "..", "scan");

        let err = store.read(&key).expect_err("traversal should be rejected");
        assert_eq!(err.origin, ErrorOrigin::Storage);

        let key = AttachmentKey::new("invoices", "42", "scan");
        let err = store
            .write(&key, StoredFile::new("../escape.pdf", vec![0]))
            .expect_err("file name with separator should be rejected");
        assert!(err.message.contains("invalid storage path segment"));
    }
}
