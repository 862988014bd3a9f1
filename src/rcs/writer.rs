// RCS file serializer.
//
// Emission order is fixed by the format:
//   admin header -> delta metadata (newest first) -> desc -> delta texts
//   (newest first)
// The whole chain's metadata is known before the first byte is written;
// only the text payloads are streamed.

use std::io::{self, Read, Write};

use super::quote::{write_quoted, write_quoted_str};
use super::revision::{RevisionNumber, RevisionRecord, sanitize_author};

/// Comment leader written when none is configured.
pub const DEFAULT_COMMENT_LEADER: &str = "# ";

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Admin section of an RCS file plus the description text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcsHeader {
    pub head: RevisionNumber,
    pub branch: Option<RevisionNumber>,
    pub access: Vec<String>,
    pub symbols: Vec<(String, RevisionNumber)>,
    pub locks: Vec<(String, RevisionNumber)>,
    pub strict: bool,
    pub comment: String,
    pub expand: Option<String>,
    /// Extra `name value;` phrases written after the standard fields.
    pub keywords: Vec<(String, String)>,
    pub description: String,
}

impl RcsHeader {
    /// Header of a plain trunk history: no access list, symbols or locks.
    pub fn for_head(head: RevisionNumber) -> Self {
        Self {
            head,
            branch: None,
            access: Vec::new(),
            symbols: Vec::new(),
            locks: Vec::new(),
            strict: false,
            comment: DEFAULT_COMMENT_LEADER.to_string(),
            expand: None,
            keywords: Vec::new(),
            description: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// Write a complete RCS file to `out`.
///
/// `revisions` must be ordered newest first, each paired with its text: the
/// full content for the head, a reverse delta script for every other
/// revision. Payload readers are consumed and dropped as soon as their text
/// has been copied. Returns the number of bytes written.
pub fn write_rcs<W, R>(
    out: &mut W,
    header: &RcsHeader,
    revisions: Vec<(RevisionRecord, R)>,
) -> io::Result<u64>
where
    W: Write + ?Sized,
    R: Read,
{
    let mut out = CountingWriter { inner: out, count: 0 };

    write_admin(&mut out, header)?;
    out.write_all(b"\n")?;

    for (record, _) in &revisions {
        write_delta_meta(&mut out, record)?;
    }

    out.write_all(b"\n\ndesc\n")?;
    write_quoted_str(&mut out, &header.description)?;
    out.write_all(b"\n\n")?;

    for (record, text) in revisions {
        log::trace!("writing text of revision {}", record.number);
        write!(out, "\n{}\nlog\n", record.number)?;
        write_quoted_str(&mut out, &record.log)?;
        out.write_all(b"\ntext\n")?;
        write_quoted(&mut out, text)?;
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(out.count)
}

fn write_admin<W: Write>(out: &mut W, header: &RcsHeader) -> io::Result<()> {
    writeln!(out, "head\t{};", header.head)?;
    if let Some(branch) = header.branch {
        writeln!(out, "branch\t{branch};")?;
    }

    out.write_all(b"access")?;
    if !header.access.is_empty() {
        write!(out, "\t{}", header.access.join(" "))?;
    }
    out.write_all(b";\n")?;

    out.write_all(b"symbols")?;
    for (name, rev) in &header.symbols {
        write!(out, "\n\t{name}:{rev}")?;
    }
    out.write_all(b";\n")?;

    out.write_all(b"locks")?;
    for (user, rev) in &header.locks {
        write!(out, "\n\t{user}:{rev}")?;
    }
    out.write_all(b";")?;
    if header.strict {
        out.write_all(b" strict;")?;
    }
    out.write_all(b"\n")?;

    out.write_all(b"comment ")?;
    write_quoted_str(out, &header.comment)?;
    out.write_all(b";\n")?;

    if let Some(expand) = &header.expand {
        out.write_all(b"expand\t")?;
        write_quoted_str(out, expand)?;
        out.write_all(b";\n")?;
    }

    for (name, value) in &header.keywords {
        writeln!(out, "{name}\t{value};")?;
    }
    Ok(())
}

fn write_delta_meta<W: Write>(out: &mut W, record: &RevisionRecord) -> io::Result<()> {
    let author = sanitize_author(&record.author);
    if author != record.author {
        log::warn!(
            "revision {}: author {:?} written as {:?}",
            record.number,
            record.author,
            author
        );
    }
    write!(
        out,
        "\n{}\ndate\t{};\tauthor {author};\tstate {};\nbranches",
        record.number, record.date, record.state
    )?;
    for branch in &record.branches {
        write!(out, "\n\t{branch}")?;
    }
    out.write_all(b";\nnext\t")?;
    if let Some(next) = record.next {
        write!(out, "{next}")?;
    }
    out.write_all(b";\n")
}

struct CountingWriter<'a, W: Write + ?Sized> {
    inner: &'a mut W,
    count: u64,
}

impl<W: Write + ?Sized> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
