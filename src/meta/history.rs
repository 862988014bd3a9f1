// Commit information document.
//
// A JSON document listing commits; each commit names one or more snapshot
// paths that share an author and a log message:
//
//   { "history": [ { "path": ["src/a.c.0"], "author": "alice", "log": "..." } ] }
//
// `--generate-info` writes one commit per snapshot for a human to edit;
// `--info` reads it back for the import.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CommitInfo, MetadataResolver, owner};
use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct History {
    pub history: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    #[serde(rename = "path")]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub log: String,
}

impl History {
    /// Parse and validate a document.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let history: Self = serde_json::from_slice(data).map_err(|e| e.to_string())?;
        if let Some(i) = history.history.iter().position(|c| c.paths.is_empty()) {
            return Err(format!("commit {} has no paths", i + 1));
        }
        Ok(history)
    }

    /// Read a document from disk.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let malformed = |reason: String| ImportError::MalformedMetadataDocument {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read(path).map_err(|e| malformed(e.to_string()))?;
        let history = Self::parse(&data).map_err(malformed)?;
        log::debug!(
            "{}: {} commits of commit information",
            path.display(),
            history.history.len()
        );
        Ok(history)
    }

    /// Skeleton document for the given snapshot groups (each oldest first):
    /// one commit per snapshot, authored by the file owner, with a log
    /// message naming the files to compare.
    pub fn generate<'a>(groups: impl IntoIterator<Item = &'a [PathBuf]>) -> Self {
        let mut history = Vec::new();
        for group in groups {
            let mut previous: Option<&Path> = None;
            for copy in group {
                let log = match previous {
                    Some(prev) => format!("changes from {} to {}", prev.display(), copy.display()),
                    None => format!("initial copy {}", copy.display()),
                };
                history.push(Commit {
                    paths: vec![copy.to_path_buf()],
                    author: owner::file_owner(copy).unwrap_or_default(),
                    log,
                });
                previous = Some(copy.as_path());
            }
        }
        Self { history }
    }

    /// Write the document pretty-printed, with a trailing newline.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n")?;
        out.flush()
    }

    /// Index the document by path. A path listed by several commits takes
    /// the information of the last one.
    pub fn into_resolver(self) -> HistoryResolver {
        let mut entries = HashMap::new();
        for commit in self.history {
            let info = CommitInfo::new(commit.author, commit.log);
            for path in commit.paths {
                entries.insert(path, info.clone());
            }
        }
        HistoryResolver { entries }
    }
}

/// In-memory resolver built from a [`History`] document.
#[derive(Debug, Clone, Default)]
pub struct HistoryResolver {
    entries: HashMap<PathBuf, CommitInfo>,
}

impl HistoryResolver {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataResolver for HistoryResolver {
    fn resolve(&self, path: &Path) -> Option<CommitInfo> {
        self.entries.get(path).cloned()
    }
}
