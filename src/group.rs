// Snapshot grouping.
//
// Backup copies of a file live next to it as `<base>.<digits>`; the file
// without a numeric suffix is the current copy. A directory tree is grouped
// into one ordered snapshot list per logical file, oldest first.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ImportError;

// ---------------------------------------------------------------------------
// Ordinal
// ---------------------------------------------------------------------------

/// Position of a snapshot within its group.
///
/// `Numbered` compares by numeric value (of arbitrary length) and every
/// `Numbered` sorts before `Current`, the suffix-less file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ordinal {
    /// Decimal digits with leading zeros stripped (`"0"` for zero).
    Numbered(String),
    Current,
}

impl Ordinal {
    pub fn numbered(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Self::Numbered(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    }
}

impl Ord for Ordinal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numbered(a), Self::Numbered(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Numbered(_), Self::Current) => Ordering::Less,
            (Self::Current, Self::Numbered(_)) => Ordering::Greater,
            (Self::Current, Self::Current) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Ordinal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split a file name into its base name and ordinal.
///
/// `foo.c.12` -> (`foo.c`, 12); `foo.c` -> (`foo.c`, Current). A name that
/// is nothing but `.<digits>` keeps its full name as the base. Names need
/// not be UTF-8; the base keeps the original bytes.
pub fn split_backup_name(name: &OsStr) -> (&OsStr, Ordinal) {
    let as_path = Path::new(name);
    if let (Some(base), Some(suffix)) = (
        as_path.file_stem(),
        as_path.extension().and_then(OsStr::to_str),
    ) && !base.is_empty()
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return (base, Ordinal::numbered(suffix));
    }
    (name, Ordinal::Current)
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Snapshots of one logical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyGroup {
    /// Directory of the group relative to the source root (empty at the root).
    pub rel_dir: PathBuf,
    /// Base path relative to the source root, e.g. `src/main.c`.
    pub base: PathBuf,
    /// Snapshot paths, oldest first; the current copy (if any) is last.
    pub copies: Vec<PathBuf>,
}

impl CopyGroup {
    /// Output path of this group's revision file under `output_dir`.
    pub fn rcs_path(&self, output_dir: &Path) -> PathBuf {
        let mut name = self.base.clone().into_os_string();
        name.push(",v");
        output_dir.join(name)
    }
}

/// Order the snapshots of one group by `(ordinal, path)`.
///
/// Fails if two snapshots share a numeric ordinal (`foo.1`, `foo.01`).
pub fn order_copies(mut copies: Vec<(Ordinal, PathBuf)>) -> Result<Vec<PathBuf>, ImportError> {
    copies.sort();
    for pair in copies.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(ImportError::AmbiguousRevisionOrder {
                first: pair[0].1.clone(),
                second: pair[1].1.clone(),
            });
        }
    }
    Ok(copies.into_iter().map(|(_, path)| path).collect())
}

/// Walk `root` and group every regular file by directory and base name.
///
/// Groups are returned sorted by base path; traversal order does not affect
/// the result.
pub fn find_copies(root: &Path) -> Result<Vec<CopyGroup>, ImportError> {
    let mut groups: BTreeMap<PathBuf, (PathBuf, Vec<(Ordinal, PathBuf)>)> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel_dir = path
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let (base, ordinal) = split_backup_name(entry.file_name());

        groups
            .entry(rel_dir.join(base))
            .or_insert_with(|| (rel_dir.clone(), Vec::new()))
            .1
            .push((ordinal, path.to_path_buf()));
    }

    groups
        .into_iter()
        .map(|(base, (rel_dir, copies))| -> Result<CopyGroup, ImportError> {
            let copies = order_copies(copies)?;
            log::debug!("{}: {} snapshots", base.display(), copies.len());
            Ok(CopyGroup {
                rel_dir,
                base,
                copies,
            })
        })
        .collect()
}

fn walk_error(root: &Path, err: walkdir::Error) -> ImportError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    ImportError::ContentUnreadable { path, source }
}

/// Order an explicit list of snapshot files of one logical file the way
/// [`find_copies`] orders a group.
pub fn order_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ImportError> {
    let keyed = paths
        .iter()
        .map(|p| {
            let ordinal = p
                .file_name()
                .map_or(Ordinal::Current, |name| split_backup_name(name).1);
            (ordinal, p.clone())
        })
        .collect();
    order_copies(keyed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
