use crate::{content_segments, ContentError, ContentProvider, DeliveryRoute};
use async_trait::async_trait;
use bytes::Bytes;
use doc_model::{DirectoryListing, FileEntry, FileKind};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Content tree rooted at a local directory.
///
/// An optional mirror directory serves the alternate delivery route; without
/// one, alternate fetches read from the root again.
#[derive(Debug, Clone)]
pub struct LocalContentTree {
    root: PathBuf,
    mirror: Option<PathBuf>,
}

impl LocalContentTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), mirror: None }
    }

    pub fn with_mirror(mut self, mirror: impl Into<PathBuf>) -> Self {
        self.mirror = Some(mirror.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(base: &Path, path: &str) -> Result<(PathBuf, String), ContentError> {
        let segments = content_segments(path)?;
        let absolute = segments.iter().fold(base.to_path_buf(), |acc, segment| acc.join(segment));
        Ok((absolute, segments.join("/")))
    }
}

fn io_error(path: &str, source: io::Error) -> ContentError {
    if source.kind() == io::ErrorKind::NotFound {
        ContentError::NotFound(path.to_owned())
    } else {
        ContentError::Io { path: path.to_owned(), source }
    }
}

#[async_trait]
impl ContentProvider for LocalContentTree {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ContentError> {
        let (absolute, relative) = Self::resolve(&self.root, path)?;

        let metadata = fs::metadata(&absolute).await.map_err(|err| io_error(path, err))?;
        if !metadata.is_dir() {
            return Err(ContentError::NotADirectory(relative));
        }

        let mut dir = fs::read_dir(&absolute).await.map_err(|err| io_error(path, err))?;
        let mut entries = Vec::new();

        while let Some(item) = dir.next_entry().await.map_err(|err| io_error(path, err))? {
            let Some(name) = item.file_name().to_str().map(str::to_owned) else {
                tracing::debug!(dir = %relative, "skipping non UTF-8 file name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            // Follows symlinks so linked directories list as directories.
            let item_metadata = match fs::metadata(item.path()).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(
                        dir = %relative,
                        name = %name,
                        error = %err,
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };

            let kind = if item_metadata.is_dir() {
                FileKind::Directory
            } else {
                let extension = Path::new(&name).extension().and_then(|ext| ext.to_str());
                FileKind::from_extension(extension.unwrap_or_default())
            };

            let item_path =
                if relative.is_empty() { name.clone() } else { format!("{relative}/{name}") };
            entries.push(FileEntry::new(kind, name, item_path));
        }

        entries.sort_by(|a, b| {
            b.is_directory()
                .cmp(&a.is_directory())
                .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
                .then_with(|| a.name().cmp(b.name()))
        });

        tracing::debug!(dir = %relative, entries = entries.len(), "directory listed");
        Ok(DirectoryListing::new(relative, entries))
    }

    async fn fetch(&self, path: &str, route: DeliveryRoute) -> Result<Bytes, ContentError> {
        let base = match (route, &self.mirror) {
            (DeliveryRoute::Alternate, Some(mirror)) => mirror,
            _ => &self.root,
        };
        let (absolute, relative) = Self::resolve(base, path)?;

        let metadata = fs::metadata(&absolute).await.map_err(|err| io_error(path, err))?;
        if metadata.is_dir() {
            return Err(ContentError::Unsupported(format!("{relative} is a directory")));
        }

        let bytes = fs::read(&absolute).await.map_err(|err| io_error(path, err))?;
        tracing::debug!(path = %relative, ?route, bytes = bytes.len(), "content read");
        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    fn sample_tree() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let root = temp.path();
        std_fs::create_dir_all(root.join("Book 1/unit")).expect("mkdir");
        std_fs::create_dir_all(root.join("alpha")).expect("mkdir");
        std_fs::write(root.join("Book 1/lesson.pdf"), b"%PDF-1.5").expect("write");
        std_fs::write(root.join("Book 1/Lesson.MP3"), b"ID3").expect("write");
        std_fs::write(root.join("Book 1/notes.txt"), b"notes").expect("write");
        std_fs::write(root.join("Book 1/.DS_Store"), b"").expect("write");
        std_fs::write(root.join("zeta.pdf"), b"%PDF-1.5").expect("write");
        std_fs::write(root.join("Apple.mp3"), b"ID3").expect("write");
        temp
    }

    #[tokio::test]
    async fn lists_directories_first_then_case_insensitive_names() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let listing = tree.list_directory("").await.expect("root should list");
        let names: Vec<_> = listing.entries.iter().map(FileEntry::name).collect();

        assert_eq!(names, vec!["alpha", "Book 1", "Apple.mp3", "zeta.pdf"]);
        assert!(listing.entries[0].is_directory());
    }

    #[tokio::test]
    async fn nested_listing_types_entries_and_skips_dotfiles() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let listing = tree.list_directory("Book 1").await.expect("dir should list");

        assert_eq!(listing.path, "Book 1");
        let kinds: Vec<_> =
            listing.entries.iter().map(|entry| (entry.path(), entry.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                ("Book 1/unit", FileKind::Directory),
                ("Book 1/Lesson.MP3", FileKind::Mp3),
                ("Book 1/lesson.pdf", FileKind::Pdf),
                ("Book 1/notes.txt", FileKind::File),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_symlink_is_skipped_without_failing_the_listing() {
        let temp = sample_tree();
        let book = temp.path().join("Book 1");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), book.join("link.mp3"))
            .expect("symlink should be created");
        let tree = LocalContentTree::new(temp.path());

        let listing = tree.list_directory("Book 1").await.expect("dir should still list");

        let names: Vec<_> = listing.entries.iter().map(FileEntry::name).collect();
        assert_eq!(names, vec!["unit", "Lesson.MP3", "lesson.pdf", "notes.txt"]);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let err = tree.list_directory("nope").await.expect_err("should fail");
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_a_file_is_not_a_directory() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let err = tree.list_directory("zeta.pdf").await.expect_err("should fail");
        assert!(matches!(err, ContentError::NotADirectory(path) if path == "zeta.pdf"));
    }

    #[tokio::test]
    async fn escaping_the_root_is_not_found() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path().join("alpha"));

        let err = tree.fetch("../zeta.pdf", DeliveryRoute::Primary).await.expect_err("rejected");
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn fetch_reads_file_bytes() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let bytes = tree.fetch("Book 1/lesson.pdf", DeliveryRoute::Primary).await.expect("read");
        assert_eq!(&bytes[..], b"%PDF-1.5");
    }

    #[tokio::test]
    async fn alternate_route_reads_from_mirror() {
        let temp = sample_tree();
        let mirror = tempfile::tempdir().expect("temp dir should be created");
        std_fs::write(mirror.path().join("zeta.pdf"), b"mirror copy").expect("write");

        let tree = LocalContentTree::new(temp.path()).with_mirror(mirror.path());

        let primary = tree.fetch("zeta.pdf", DeliveryRoute::Primary).await.expect("primary");
        let alternate = tree.fetch("zeta.pdf", DeliveryRoute::Alternate).await.expect("mirror");

        assert_eq!(&primary[..], b"%PDF-1.5");
        assert_eq!(&alternate[..], b"mirror copy");
    }

    #[tokio::test]
    async fn alternate_route_without_mirror_uses_root() {
        let temp = sample_tree();
        let tree = LocalContentTree::new(temp.path());

        let bytes = tree.fetch("zeta.pdf", DeliveryRoute::Alternate).await.expect("read");
        assert_eq!(&bytes[..], b"%PDF-1.5");
    }
}
