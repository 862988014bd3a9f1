// Revision chain builder.
//
// Turns the ordered snapshots of one logical file into trunk revisions
// `1.1 ..= 1.N`. The newest snapshot is the head and carries its full text;
// every older snapshot carries a reverse delta from its next-newer
// neighbour. All payloads are produced here, before anything is written.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::delta::{DeltaError, DeltaProvider};
use crate::error::ImportError;
use crate::meta::{MetadataResolver, commit_info_for};
use crate::rcs::{RcsDate, RevisionNumber, RevisionRecord, State};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One snapshot file and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    pub modified: RcsDate,
}

impl Snapshot {
    /// Stat `path`, which must be a regular file (or a link to one).
    pub fn stat(path: &Path) -> Result<Self, ImportError> {
        let meta = std::fs::metadata(path).map_err(|e| ImportError::unreadable(path, e))?;
        if !meta.is_file() {
            return Err(ImportError::unreadable(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let modified = meta.modified().map_err(|e| ImportError::unreadable(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: modified.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Text of a revision: the head's content, streamed from its open file, or
/// a reverse delta script held in memory.
#[derive(Debug)]
pub enum Payload {
    FullText {
        path: PathBuf,
        reader: BufReader<File>,
    },
    Delta(Cursor<Vec<u8>>),
}

impl Payload {
    pub fn is_full_text(&self) -> bool {
        matches!(self, Self::FullText { .. })
    }
}

impl Read for Payload {
    /// Head file errors carry a [`SnapshotReadError`] naming the file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::FullText { path, reader } => reader.read(buf).map_err(|source| {
                io::Error::new(
                    source.kind(),
                    SnapshotReadError {
                        path: path.clone(),
                        source,
                    },
                )
            }),
            Self::Delta(r) => r.read(buf),
        }
    }
}

/// A head snapshot failed while its text was being streamed out.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .path.display())]
pub struct SnapshotReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Revision {
    pub record: RevisionRecord,
    pub payload: Payload,
}

/// Revisions of one file, newest first.
#[derive(Debug)]
pub struct RevisionChain {
    pub head: RevisionNumber,
    pub revisions: Vec<Revision>,
}

impl RevisionChain {
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Split into the `(record, text)` pairs taken by
    /// [`write_rcs`](crate::rcs::write_rcs).
    pub fn into_parts(self) -> Vec<(RevisionRecord, Payload)> {
        self.revisions
            .into_iter()
            .map(|r| (r.record, r.payload))
            .collect()
    }
}

/// Build the chain for `paths`, ordered oldest first.
///
/// The i-th path becomes revision `1.(i+1)`. The chain is walked newest to
/// oldest, diffing each snapshot against the one processed before it.
pub fn build_chain(
    paths: &[PathBuf],
    resolver: &dyn MetadataResolver,
    diff: &dyn DeltaProvider,
) -> Result<RevisionChain, ImportError> {
    let Some(newest) = paths.last() else {
        return Err(ImportError::EmptyChain);
    };
    let head = RevisionNumber::trunk(paths.len() - 1);

    let mut revisions = Vec::with_capacity(paths.len());
    let mut newer: Option<&Path> = None;

    for (index, path) in paths.iter().enumerate().rev() {
        let snapshot = Snapshot::stat(path)?;
        let number = RevisionNumber::trunk(index);

        let payload = match newer {
            None => {
                let file = File::open(path).map_err(|e| ImportError::unreadable(path, e))?;
                Payload::FullText {
                    path: path.clone(),
                    reader: BufReader::with_capacity(BUF_SIZE, file),
                }
            }
            Some(newer) => {
                let script = diff.delta(newer, path).map_err(|e| diff_error(newer, path, e))?;
                log::debug!(
                    "{}: revision {number}, {} byte delta from {}",
                    path.display(),
                    script.len(),
                    newer.display()
                );
                Payload::Delta(Cursor::new(script))
            }
        };

        let info = commit_info_for(resolver, path);

        revisions.push(Revision {
            record: RevisionRecord {
                number,
                date: snapshot.modified,
                author: info.author,
                log: info.log,
                state: State::Exp,
                branches: Vec::new(),
                next: index.checked_sub(1).map(RevisionNumber::trunk),
                is_head: number == head,
            },
            payload,
        });
        newer = Some(path.as_path());
    }

    log::debug!(
        "{}: {} revisions, head {head}",
        newest.display(),
        revisions.len()
    );
    Ok(RevisionChain { head, revisions })
}

fn diff_error(from: &Path, to: &Path, err: DeltaError) -> ImportError {
    match err {
        DeltaError::Read { path, source } => ImportError::ContentUnreadable { path, source },
        other => ImportError::DiffUnavailable {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: other,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{ExternalDiff, LineDiff, apply};
    use crate::meta::{CommitInfo, EMPTY_LOG, NullResolver};

    struct Fixed(Vec<(PathBuf, CommitInfo)>);

    impl MetadataResolver for Fixed {
        fn resolve(&self, path: &Path) -> Option<CommitInfo> {
            self.0.iter().find(|(p, _)| p == path).map(|(_, i)| i.clone())
        }
    }

    fn snapshots(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, body)| {
                let path = dir.join(name);
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    fn read_all(payload: Payload) -> Vec<u8> {
        let mut out = Vec::new();
        let mut payload = payload;
        payload.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn report_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let paths = snapshots(
            dir.path(),
            &[("report.txt.0", "A\n"), ("report.txt.1", "A\nB\n"), ("report.txt", "A\nB\nC\n")],
        );
        let resolver = Fixed(vec![(
            paths[1].clone(),
            CommitInfo::new("alice", "added B"),
        )]);

        let chain = build_chain(&paths, &resolver, &LineDiff).unwrap();
        assert_eq!(chain.head, RevisionNumber::new(1, 3));
        assert_eq!(chain.len(), 3);

        let numbers: Vec<String> = chain.revisions.iter().map(|r| r.record.number.to_string()).collect();
        assert_eq!(numbers, ["1.3", "1.2", "1.1"]);
        let next: Vec<Option<String>> = chain
            .revisions
            .iter()
            .map(|r| r.record.next.map(|n| n.to_string()))
            .collect();
        assert_eq!(next, [Some("1.2".into()), Some("1.1".into()), None]);
        assert!(chain.revisions[0].record.is_head);
        assert!(chain.revisions[0].payload.is_full_text());
        assert!(!chain.revisions[1].record.is_head);

        assert_eq!(chain.revisions[1].record.author, "alice");
        assert_eq!(chain.revisions[1].record.log, "added B");
        assert_eq!(chain.revisions[2].record.log, EMPTY_LOG);

        let mut parts = chain.into_parts().into_iter();
        let head_text = read_all(parts.next().unwrap().1);
        assert_eq!(head_text, b"A\nB\nC\n");
        let rev2 = apply(&head_text, &read_all(parts.next().unwrap().1)).unwrap();
        assert_eq!(rev2, b"A\nB\n");
        let rev1 = apply(&rev2, &read_all(parts.next().unwrap().1)).unwrap();
        assert_eq!(rev1, b"A\n");
    }

    #[test]
    fn single_snapshot_is_head_without_next() {
        let dir = tempfile::tempdir().unwrap();
        let paths = snapshots(dir.path(), &[("only", "content")]);
        let chain = build_chain(&paths, &NullResolver, &LineDiff).unwrap();

        assert_eq!(chain.head.to_string(), "1.1");
        assert_eq!(chain.len(), 1);
        let rev = &chain.revisions[0];
        assert!(rev.record.is_head);
        assert_eq!(rev.record.next, None);
        assert_eq!(rev.record.state, State::Exp);
        assert!(rev.record.branches.is_empty());
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = build_chain(&[], &NullResolver, &LineDiff).unwrap_err();
        assert!(matches!(err, ImportError::EmptyChain));
    }

    #[test]
    fn unreadable_snapshot_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = snapshots(dir.path(), &[("f", "x")]);
        paths.insert(0, dir.path().join("f.0"));

        let err = build_chain(&paths, &NullResolver, &LineDiff).unwrap_err();
        match err {
            ImportError::ContentUnreadable { path, .. } => assert_eq!(path, dir.path().join("f.0")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_diff_program_is_diff_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let paths = snapshots(dir.path(), &[("f.0", "a\n"), ("f", "b\n")]);
        let diff = ExternalDiff::new("/nonexistent/oxircs-test-diff");

        let err = build_chain(&paths, &NullResolver, &diff).unwrap_err();
        assert!(matches!(err, ImportError::DiffUnavailable { .. }), "{err}");
    }

    #[test]
    fn records_keep_the_resolved_author() {
        let dir = tempfile::tempdir().unwrap();
        let paths = snapshots(dir.path(), &[("f", "x")]);
        let resolver = Fixed(vec![(paths[0].clone(), CommitInfo::new("Jane Doe", "log"))]);
        let chain = build_chain(&paths, &resolver, &LineDiff).unwrap();
        assert_eq!(chain.revisions[0].record.author, "Jane Doe");
    }

    #[test]
    fn directory_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = snapshots(dir.path(), &[("f.0", "x\n")]);
        let sub = dir.path().join("f");
        std::fs::create_dir(&sub).unwrap();
        paths.push(sub.clone());

        let err = build_chain(&paths, &NullResolver, &LineDiff).unwrap_err();
        match err {
            ImportError::ContentUnreadable { path, .. } => assert_eq!(path, sub),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dates_come_from_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let paths = snapshots(dir.path(), &[("f", "x")]);
        let expected = RcsDate::from(std::fs::metadata(&paths[0]).unwrap().modified().unwrap());
        let chain = build_chain(&paths, &NullResolver, &LineDiff).unwrap();
        assert_eq!(chain.revisions[0].record.date, expected);
    }
}
