// Import error taxonomy.
//
// Every variant is fatal for the file being converted, and a recursive run
// stops at the first failing file.

use std::io;
use std::path::{Path, PathBuf};

use crate::chain::SnapshotReadError;
use crate::delta::DeltaError;
use crate::rcs::{ReadError, RevisionNumber};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A snapshot (or the source tree) could not be opened or read.
    #[error("{}: cannot read snapshot: {source}", .path.display())]
    ContentUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The delta provider could not produce a script.
    #[error("cannot diff {} against {}: {source}", .from.display(), .to.display())]
    DiffUnavailable {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: DeltaError,
    },

    /// The commit information document cannot be read or parsed.
    #[error("{}: malformed commit information: {reason}", .path.display())]
    MalformedMetadataDocument { path: PathBuf, reason: String },

    /// The destination cannot be created or written.
    #[error("{}: cannot write output: {source}", .path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two snapshots of one file carry the same numeric suffix.
    #[error(
        "{} and {} have the same backup number; revision order is ambiguous",
        .first.display(),
        .second.display()
    )]
    AmbiguousRevisionOrder { first: PathBuf, second: PathBuf },

    #[error("no snapshot files given")]
    EmptyChain,

    #[error("{}: output file exists, use --force to overwrite", .path.display())]
    OutputExists { path: PathBuf },

    /// A written file does not reproduce one of its snapshots.
    #[error("{}: verification of revision {revision} failed: {reason}", .path.display())]
    VerificationFailed {
        path: PathBuf,
        revision: RevisionNumber,
        reason: String,
    },

    /// A written file could not be parsed back.
    #[error("{}: cannot read back revision file: {source}", .path.display())]
    Unparsable {
        path: PathBuf,
        #[source]
        source: ReadError,
    },
}

impl ImportError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ContentUnreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OutputWriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Classify an error from serializing to `dest`: a head snapshot that
    /// failed mid-read stays a snapshot error.
    pub(crate) fn from_emit(dest: &Path, err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<SnapshotReadError>()) {
            return Self::write_failure(dest, err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<SnapshotReadError>()) {
            Some(Ok(read)) => {
                let SnapshotReadError { path, source } = *read;
                Self::unreadable(path, source)
            }
            Some(Err(inner)) => Self::write_failure(dest, io::Error::new(kind, inner)),
            None => Self::write_failure(dest, kind.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_path() {
        let err = ImportError::unreadable("a/b.1", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "a/b.1: cannot read snapshot: gone");

        let err = ImportError::AmbiguousRevisionOrder {
            first: "x.1".into(),
            second: "x.01".into(),
        };
        assert_eq!(
            err.to_string(),
            "x.1 and x.01 have the same backup number; revision order is ambiguous"
        );

        let err = ImportError::OutputExists { path: "x,v".into() };
        assert_eq!(err.to_string(), "x,v: output file exists, use --force to overwrite");
    }

    #[test]
    fn snapshot_read_errors_keep_the_snapshot_path() {
        let inner = SnapshotReadError {
            path: "r/head".into(),
            source: io::Error::other("bad sector"),
        };
        let err = ImportError::from_emit(Path::new("out,v"), io::Error::other(inner));
        match err {
            ImportError::ContentUnreadable { path, source } => {
                assert_eq!(path, PathBuf::from("r/head"));
                assert_eq!(source.to_string(), "bad sector");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = ImportError::from_emit(Path::new("out,v"), io::Error::other("disk full"));
        assert!(matches!(err, ImportError::OutputWriteFailure { ref path, .. } if path == Path::new("out,v")));
    }

    #[test]
    fn diff_failure_keeps_source() {
        use std::error::Error;
        let err = ImportError::DiffUnavailable {
            from: "f".into(),
            to: "f.0".into(),
            source: DeltaError::Spawn {
                program: "diff".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "missing"),
            },
        };
        assert_eq!(err.to_string(), "cannot diff f against f.0: cannot run diff: missing");
        assert!(err.source().is_some());
    }
}
