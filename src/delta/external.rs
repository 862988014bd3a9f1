// External `diff` backend.
//
// Runs `<program> -n -a --binary <from> <to>` and captures the RCS-format
// script from stdout. Exit status 0 (identical) and 1 (different) are
// success; anything else, including failure to start the program, is an
// error. There is no retry.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{DEFAULT_DIFF_PROGRAM, DeltaError, DeltaProvider};

const DIFF_ARGS: [&str; 3] = ["-n", "-a", "--binary"];

#[derive(Debug, Clone)]
pub struct ExternalDiff {
    program: PathBuf,
}

impl Default for ExternalDiff {
    fn default() -> Self {
        Self::new(DEFAULT_DIFF_PROGRAM)
    }
}

impl ExternalDiff {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl DeltaProvider for ExternalDiff {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or(DEFAULT_DIFF_PROGRAM)
    }

    fn delta(&self, from: &Path, to: &Path) -> Result<Vec<u8>, DeltaError> {
        log::trace!(
            "running {} {} {} {}",
            self.program.display(),
            DIFF_ARGS.join(" "),
            from.display(),
            to.display()
        );
        let output = Command::new(&self.program)
            .args(DIFF_ARGS)
            .arg(from)
            .arg(to)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| DeltaError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match output.status.code() {
            Some(0 | 1) => Ok(output.stdout),
            _ => Err(DeltaError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}
