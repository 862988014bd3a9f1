// Reverse-delta providers.
//
// A delta is an RCS edit script (the `diff -n` command language) that turns
// the content of one file into another:
//
// - `external` : runs an external `diff -n -a --binary` process
// - `lines`    : in-process line diff (Myers, via `similar`)
// - `apply`    : interprets an edit script against a base text
//
// The chain builder only sees the `DeltaProvider` trait.

pub mod apply;
pub mod external;
pub mod lines;

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

pub use apply::{ScriptError, apply};
pub use external::ExternalDiff;
pub use lines::{LineDiff, diff_bytes};

/// Program used by the external backend when none is configured.
pub const DEFAULT_DIFF_PROGRAM: &str = "diff";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// One of the input files could not be read.
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The diff program could not be started.
    #[error("cannot run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The diff program ran but reported trouble.
    #[error("{} exited with {status}{}", .program.display(), fmt_stderr(.stderr))]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

fn fmt_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Computes the edit script that transforms the file at `from` into the file
/// at `to`.
///
/// Implementations must be deterministic and must not retry on failure.
pub trait DeltaProvider: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    fn delta(&self, from: &Path, to: &Path) -> Result<Vec<u8>, DeltaError>;
}

impl<P: DeltaProvider + ?Sized> DeltaProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn delta(&self, from: &Path, to: &Path) -> Result<Vec<u8>, DeltaError> {
        (**self).delta(from, to)
    }
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Which delta provider an import uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBackend {
    /// External `diff` compatible program.
    External { program: PathBuf },
    /// In-process line diff.
    Builtin,
}

impl Default for DiffBackend {
    fn default() -> Self {
        Self::External {
            program: PathBuf::from(DEFAULT_DIFF_PROGRAM),
        }
    }
}

impl DiffBackend {
    pub fn provider(&self) -> Box<dyn DeltaProvider> {
        match self {
            Self::External { program } => Box::new(ExternalDiff::new(program.clone())),
            Self::Builtin => Box::new(LineDiff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_external_diff() {
        let backend = DiffBackend::default();
        assert_eq!(
            backend,
            DiffBackend::External {
                program: PathBuf::from("diff")
            }
        );
        assert_eq!(backend.provider().name(), "diff");
        assert_eq!(DiffBackend::Builtin.provider().name(), "builtin");
    }

    #[test]
    fn spawn_error_message_names_program() {
        let err = DeltaError::Spawn {
            program: PathBuf::from("/no/such/diff"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot run /no/such/diff: not found");
    }
}
