mod progress;

pub use progress::{
    apply_progress_action, Persistence, ProgressAction, ReadingProgress, ReadingProgressRecord,
    MAX_RECENT_READINGS,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Directory,
    Pdf,
    Mp3,
    File,
}

impl FileKind {
    /// Classifies a leaf file by its extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "mp3" => Self::Mp3,
            _ => Self::File,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Pdf => "pdf",
            Self::Mp3 => "mp3",
            Self::File => "file",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry {path} is flagged as a directory but typed {kind}")]
    InconsistentDirectoryFlag { path: String, kind: &'static str },
}

/// One item of a directory listing.
///
/// Serialized in the provider's wire shape `{name, path, isDirectory, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "WireEntry", try_from = "WireEntry")]
pub enum FileEntry {
    Directory { name: String, path: String },
    Pdf { name: String, path: String },
    Audio { name: String, path: String },
    Other { name: String, path: String },
}

impl FileEntry {
    pub fn new(kind: FileKind, name: impl Into<String>, path: impl Into<String>) -> Self {
        let (name, path) = (name.into(), path.into());
        match kind {
            FileKind::Directory => Self::Directory { name, path },
            FileKind::Pdf => Self::Pdf { name, path },
            FileKind::Mp3 => Self::Audio { name, path },
            FileKind::File => Self::Other { name, path },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. }
            | Self::Pdf { name, .. }
            | Self::Audio { name, .. }
            | Self::Other { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Directory { path, .. }
            | Self::Pdf { path, .. }
            | Self::Audio { path, .. }
            | Self::Other { path, .. } => path,
        }
    }

    pub fn kind(&self) -> FileKind {
        match self {
            Self::Directory { .. } => FileKind::Directory,
            Self::Pdf { .. } => FileKind::Pdf,
            Self::Audio { .. } => FileKind::Mp3,
            Self::Other { .. } => FileKind::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    name: String,
    path: String,
    /// Older servers omit the flag; `type` alone decides then.
    #[serde(default)]
    is_directory: Option<bool>,
    #[serde(rename = "type")]
    kind: FileKind,
}

impl From<FileEntry> for WireEntry {
    fn from(entry: FileEntry) -> Self {
        let kind = entry.kind();
        let (name, path) = match entry {
            FileEntry::Directory { name, path }
            | FileEntry::Pdf { name, path }
            | FileEntry::Audio { name, path }
            | FileEntry::Other { name, path } => (name, path),
        };

        Self { name, path, is_directory: Some(kind == FileKind::Directory), kind }
    }
}

impl TryFrom<WireEntry> for FileEntry {
    type Error = EntryError;

    fn try_from(wire: WireEntry) -> Result<Self, Self::Error> {
        let is_directory = wire.kind == FileKind::Directory;
        if wire.is_directory.is_some_and(|flag| flag != is_directory) {
            return Err(EntryError::InconsistentDirectoryFlag {
                path: wire.path,
                kind: wire.kind.as_str(),
            });
        }

        Ok(Self::new(wire.kind, wire.name, wire.path))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub entries: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn new(path: impl Into<String>, entries: Vec<FileEntry>) -> Self {
        Self { path: path.into(), entries }
    }

    pub fn audio_entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|entry| matches!(entry, FileEntry::Audio { .. }))
    }

    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.path() == path)
    }
}

/// Directory part of a `/`-separated content path; empty for top-level items.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|index| &path[..index]).unwrap_or("")
}

/// Final path segment.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map(|index| &path[index + 1..]).unwrap_or(path)
}

/// Final path segment with its extension stripped.
pub fn base_name(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_provider_contract() {
        let entry = FileEntry::new(FileKind::Mp3, "unit1.mp3", "book/unit1.mp3");
        let json = serde_json::to_value(&entry).expect("entry should serialize");

        assert_eq!(json["name"], "unit1.mp3");
        assert_eq!(json["path"], "book/unit1.mp3");
        assert_eq!(json["isDirectory"], false);
        assert_eq!(json["type"], "mp3");
    }

    #[test]
    fn wire_entries_decode_into_tagged_variants() {
        let json = r#"[
            {"name":"book","path":"book","isDirectory":true,"type":"directory"},
            {"name":"a.pdf","path":"a.pdf","isDirectory":false,"type":"pdf"},
            {"name":"notes.txt","path":"notes.txt","isDirectory":false,"type":"file"}
        ]"#;

        let entries: Vec<FileEntry> = serde_json::from_str(json).expect("listing should decode");
        assert!(matches!(entries[0], FileEntry::Directory { .. }));
        assert!(matches!(entries[1], FileEntry::Pdf { .. }));
        assert!(matches!(entries[2], FileEntry::Other { .. }));
    }

    #[test]
    fn entries_without_directory_flag_decode_from_type() {
        let json = r#"[
            {"name":"book","path":"book","type":"directory"},
            {"name":"a.mp3","path":"a.mp3","type":"mp3","extension":"mp3"}
        ]"#;

        let entries: Vec<FileEntry> = serde_json::from_str(json).expect("listing should decode");
        assert!(entries[0].is_directory());
        assert!(matches!(entries[1], FileEntry::Audio { .. }));
        assert_eq!(serde_json::to_value(&entries[1]).expect("serialize")["isDirectory"], false);
    }

    #[test]
    fn unknown_type_is_rejected_instead_of_falling_through() {
        let json = r#"{"name":"x.wav","path":"x.wav","isDirectory":false,"type":"wav"}"#;
        assert!(serde_json::from_str::<FileEntry>(json).is_err());
    }

    #[test]
    fn directory_flag_must_agree_with_type() {
        let json = r#"{"name":"a.pdf","path":"a.pdf","isDirectory":true,"type":"pdf"}"#;
        assert!(serde_json::from_str::<FileEntry>(json).is_err());
    }

    #[test]
    fn extension_classification_is_case_insensitive() {
        assert_eq!(FileKind::from_extension("PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_extension("Mp3"), FileKind::Mp3);
        assert_eq!(FileKind::from_extension("m4a"), FileKind::File);
    }

    #[test]
    fn path_helpers_split_on_forward_slash() {
        assert_eq!(parent_dir("book/unit1/lesson.pdf"), "book/unit1");
        assert_eq!(parent_dir("lesson.pdf"), "");
        assert_eq!(file_name("book/unit1/lesson.pdf"), "lesson.pdf");
        assert_eq!(base_name("book/unit1/lesson.pdf"), "lesson");
        assert_eq!(base_name("book/archive.tar.gz"), "archive.tar");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn audio_entries_skip_other_kinds() {
        let listing = DirectoryListing::new(
            "book",
            vec![
                FileEntry::new(FileKind::Directory, "extra", "book/extra"),
                FileEntry::new(FileKind::Mp3, "a.mp3", "book/a.mp3"),
                FileEntry::new(FileKind::Pdf, "a.pdf", "book/a.pdf"),
                FileEntry::new(FileKind::Mp3, "b.mp3", "book/b.mp3"),
            ],
        );

        let names: Vec<_> = listing.audio_entries().map(FileEntry::name).collect();
        assert_eq!(names, vec!["a.mp3", "b.mp3"]);
    }
}
