// File-level import driver.
//
// Provides `import_to_writer()`, `import_to_path()` and `import_tree()`,
// which build revision chains and stream them through the RCS serializer
// with buffered I/O. File outputs go through a temporary file in the
// destination directory and only replace the destination on success.
// Optionally computes a streaming SHA-256 of the output (feature-gated
// behind `file-io`).

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::chain::{RevisionChain, build_chain};
use crate::delta::{DeltaProvider, DiffBackend};
use crate::error::ImportError;
use crate::group::{CopyGroup, find_copies};
use crate::meta::MetadataResolver;
use crate::rcs::{DEFAULT_COMMENT_LEADER, RcsFile, RcsHeader, RevisionNumber, write_rcs};

// ---------------------------------------------------------------------------
// Options and stats
// ---------------------------------------------------------------------------

/// Settings shared by every file of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub diff: DiffBackend,
    /// Replace existing output files.
    pub force: bool,
    /// Re-read each output and check every revision against its snapshot.
    pub verify: bool,
    /// Comment leader written to the admin header.
    pub comment: String,
    /// Descriptive text written to the `desc` section.
    pub description: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            diff: DiffBackend::default(),
            force: false,
            verify: false,
            comment: DEFAULT_COMMENT_LEADER.to_string(),
            description: String::new(),
        }
    }
}

impl ImportOptions {
    fn header(&self, head: RevisionNumber) -> RcsHeader {
        RcsHeader {
            comment: self.comment.clone(),
            description: self.description.clone(),
            ..RcsHeader::for_head(head)
        }
    }
}

/// Statistics of one written revision file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStats {
    /// Destination file; `None` when writing to a caller-supplied writer.
    pub output: Option<PathBuf>,
    /// Number of revisions written.
    pub revisions: usize,
    pub head: RevisionNumber,
    /// Size of the revision file in bytes.
    pub bytes_written: u64,
    /// SHA-256 of the revision file (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Name used in errors about caller-supplied writers.
const WRITER_NAME: &str = "-";

// ---------------------------------------------------------------------------
// import_to_writer
// ---------------------------------------------------------------------------

/// Build the revision file for `copies` (oldest first) and write it to `out`.
///
/// With `verify` set the file is assembled in memory and checked before the
/// first byte reaches `out`.
pub fn import_to_writer<W: Write>(
    copies: &[PathBuf],
    mut out: W,
    resolver: &dyn MetadataResolver,
    opts: &ImportOptions,
) -> Result<ImportStats, ImportError> {
    let provider = opts.diff.provider();
    let chain = build_chain(copies, resolver, &*provider)?;
    let name = Path::new(WRITER_NAME);

    if !opts.verify {
        return write_unverified(chain, out, opts, name);
    }

    let mut buf = Vec::new();
    let stats = emit(chain, &mut buf, opts, name)?;
    verify_bytes(&buf, copies, name)?;
    out.write_all(&buf)
        .and_then(|()| out.flush())
        .map_err(|e| ImportError::write_failure(name, e))?;
    Ok(stats)
}

/// Stream `chain` to `out`. On failure the unflushed part of the buffer is
/// discarded, so an error before the first `BUF_SIZE` bytes writes nothing.
fn write_unverified<W: Write>(
    chain: RevisionChain,
    out: W,
    opts: &ImportOptions,
    name: &Path,
) -> Result<ImportStats, ImportError> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, out);
    let result = emit(chain, &mut writer, opts, name);
    if result.is_err() {
        let _ = writer.into_parts();
    }
    result
}

// ---------------------------------------------------------------------------
// import_to_path
// ---------------------------------------------------------------------------

/// Build the revision file for `copies` (oldest first) at `path`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn import_to_path(
    copies: &[PathBuf],
    path: &Path,
    resolver: &dyn MetadataResolver,
    opts: &ImportOptions,
) -> Result<ImportStats, ImportError> {
    let provider = opts.diff.provider();
    write_file(copies, path, resolver, &*provider, opts)
}

fn write_file(
    copies: &[PathBuf],
    path: &Path,
    resolver: &dyn MetadataResolver,
    provider: &dyn DeltaProvider,
    opts: &ImportOptions,
) -> Result<ImportStats, ImportError> {
    if !opts.force && path.exists() {
        return Err(ImportError::OutputExists {
            path: path.to_path_buf(),
        });
    }

    let chain = build_chain(copies, resolver, provider)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| ImportError::write_failure(path, e))?;

    let mut stats = emit(
        chain,
        BufWriter::with_capacity(BUF_SIZE, tmp.as_file()),
        opts,
        path,
    )?;

    if opts.verify {
        verify_output(tmp.path(), copies).map_err(|e| rename_verified(e, path))?;
    }

    // RCS files are kept read-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o444))
            .map_err(|e| ImportError::write_failure(path, e))?;
    }

    let persisted = if opts.force {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map_err(|e| match e.error.kind() {
        io::ErrorKind::AlreadyExists if !opts.force => ImportError::OutputExists {
            path: path.to_path_buf(),
        },
        _ => ImportError::write_failure(path, e.error),
    })?;

    stats.output = Some(path.to_path_buf());
    Ok(stats)
}

/// Errors from verifying the temporary file name the destination instead.
fn rename_verified(err: ImportError, path: &Path) -> ImportError {
    match err {
        ImportError::VerificationFailed {
            revision, reason, ..
        } => ImportError::VerificationFailed {
            path: path.to_path_buf(),
            revision,
            reason,
        },
        ImportError::Unparsable { source, .. } => ImportError::Unparsable {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// import_tree
// ---------------------------------------------------------------------------

/// Import every snapshot group under `source_dir` into a mirrored tree of
/// revision files under `output_dir`.
///
/// Stops at the first failing file. With the `parallel` feature, groups are
/// imported concurrently; results keep the group order either way.
pub fn import_tree(
    source_dir: &Path,
    output_dir: &Path,
    resolver: &dyn MetadataResolver,
    opts: &ImportOptions,
) -> Result<Vec<ImportStats>, ImportError> {
    let groups = find_copies(source_dir)?;
    let provider = opts.diff.provider();
    let provider = &*provider;

    #[cfg(feature = "parallel")]
    let results = {
        use rayon::prelude::*;
        groups
            .par_iter()
            .map(|group| import_group(group, output_dir, resolver, provider, opts))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results = groups
        .iter()
        .map(|group| import_group(group, output_dir, resolver, provider, opts))
        .collect();

    results
}

fn import_group(
    group: &CopyGroup,
    output_dir: &Path,
    resolver: &dyn MetadataResolver,
    provider: &dyn DeltaProvider,
    opts: &ImportOptions,
) -> Result<ImportStats, ImportError> {
    let dest = group.rcs_path(output_dir);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ImportError::write_failure(parent, e))?;
    }
    log::info!(
        "Writing {} [{} revisions]",
        dest.display(),
        group.copies.len()
    );
    write_file(&group.copies, &dest, resolver, provider, opts)
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn emit<W: Write>(
    chain: RevisionChain,
    out: W,
    opts: &ImportOptions,
    dest: &Path,
) -> Result<ImportStats, ImportError> {
    let head = chain.head;
    let revisions = chain.len();
    let header = opts.header(head);
    let fail = |e: io::Error| ImportError::from_emit(dest, e);

    #[cfg(feature = "file-io")]
    let (bytes_written, output_sha256) = {
        let mut writer = HashingWriter {
            inner: out,
            hasher: sha2::Sha256::new(),
        };
        let n = write_rcs(&mut writer, &header, chain.into_parts()).map_err(fail)?;
        (n, Some(writer.hasher.finalize().into()))
    };

    #[cfg(not(feature = "file-io"))]
    let (bytes_written, output_sha256) = {
        let mut out = out;
        let n = write_rcs(&mut out, &header, chain.into_parts()).map_err(fail)?;
        (n, None)
    };

    log::debug!("{}: {bytes_written} bytes, head {head}", dest.display());
    Ok(ImportStats {
        output: None,
        revisions,
        head,
        bytes_written,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Parse the revision file at `path` and check that every trunk revision
/// reproduces the snapshot it was built from (`copies`, oldest first).
pub fn verify_output(path: &Path, copies: &[PathBuf]) -> Result<(), ImportError> {
    let data = std::fs::read(path).map_err(|e| ImportError::unreadable(path, e))?;
    verify_bytes(&data, copies, path)
}

fn verify_bytes(data: &[u8], copies: &[PathBuf], path: &Path) -> Result<(), ImportError> {
    let unparsable = |source| ImportError::Unparsable {
        path: path.to_path_buf(),
        source,
    };
    let failed = |revision, reason| ImportError::VerificationFailed {
        path: path.to_path_buf(),
        revision,
        reason,
    };

    let file = RcsFile::parse(data).map_err(unparsable)?;
    let revisions = file.reconstruct().map_err(unparsable)?;
    if revisions.len() != copies.len() {
        return Err(failed(
            file.header.head,
            format!("{} revisions, expected {}", revisions.len(), copies.len()),
        ));
    }

    for (number, text) in &revisions {
        let Some(copy) = (number.minor as usize)
            .checked_sub(1)
            .filter(|_| number.major == 1)
            .and_then(|i| copies.get(i))
        else {
            return Err(failed(*number, "not a trunk revision of this file".into()));
        };
        let expected = std::fs::read(copy).map_err(|e| ImportError::unreadable(copy, e))?;
        if *text != expected {
            return Err(failed(
                *number,
                format!("content differs from {}", copy.display()),
            ));
        }
    }

    log::debug!("{}: verified {} revisions", path.display(), revisions.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<W: Write> {
    inner: W,
    hasher: sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
