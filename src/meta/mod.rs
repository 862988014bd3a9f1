// Per-revision commit information (author, log message).
//
// - `history` : the editable commit information document
// - `owner`   : file owner lookup used for default authors
//
// Resolvers answer by snapshot path; `commit_info_for` fills in defaults
// when a resolver has no entry.

pub mod history;
pub mod owner;

use std::path::Path;

pub use history::{Commit, History, HistoryResolver};

/// Log message used when no commit information is available.
pub const EMPTY_LOG: &str = "*** empty log message ***";

/// Author and log message of one revision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitInfo {
    pub author: String,
    pub log: String,
}

impl CommitInfo {
    pub fn new(author: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            log: log.into(),
        }
    }
}

/// Maps snapshot paths to commit information.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Option<CommitInfo>;
}

/// Resolver with no entries; every revision gets the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl MetadataResolver for NullResolver {
    fn resolve(&self, _path: &Path) -> Option<CommitInfo> {
        None
    }
}

/// Defaults for a snapshot without commit information: the file's owner
/// (empty if unknown) and [`EMPTY_LOG`].
pub fn default_commit_info(path: &Path) -> CommitInfo {
    CommitInfo::new(owner::file_owner(path).unwrap_or_default(), EMPTY_LOG)
}

/// Resolve `path`, falling back to [`default_commit_info`].
pub fn commit_info_for(resolver: &dyn MetadataResolver, path: &Path) -> CommitInfo {
    resolver.resolve(path).unwrap_or_else(|| {
        log::debug!("{}: no commit information, using defaults", path.display());
        default_commit_info(path)
    })
}
