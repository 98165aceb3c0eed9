use std::fmt;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
    Moved { from: PathBuf },
}

/// A normalized filesystem notification. For moves, `path` is the
/// destination and the source rides along in the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: PathBuf, kind: FileEventKind) -> Self {
        Self { path, kind }
    }

    /// The record that goes into a block's `data` field.
    pub fn to_record(&self) -> EventRecord {
        let (event, src) = match &self.kind {
            FileEventKind::Created => (ChangeKind::Created, None),
            FileEventKind::Modified => (ChangeKind::Modified, None),
            FileEventKind::Deleted => (ChangeKind::Deleted, None),
            FileEventKind::Moved { from } => {
                (ChangeKind::Moved, Some(from.display().to_string()))
            }
        };
        EventRecord {
            event,
            file: self.path.display().to_string(),
            src,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Deleted,
    Modified,
    Moved,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Moved => "moved",
        };
        f.write_str(s)
    }
}

/// Event payload as persisted inside a block. Field order is fixed:
/// the JSON form of this struct feeds the block digest, so reordering
/// or renaming fields breaks every downstream hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: ChangeKind,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}
