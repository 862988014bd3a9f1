// RCS `@` string quoting.
//
// RCS strings are wrapped in `@` delimiters and every `@` inside the string
// is doubled. Payloads can be large or binary, so escaping is done by a
// filtering writer that never buffers a whole field.

use std::io::{self, Read, Write};

/// String delimiter byte.
pub const DELIM: u8 = b'@';

const DOUBLED: &[u8] = b"@@";

// ---------------------------------------------------------------------------
// Escaping writer
// ---------------------------------------------------------------------------

/// Writer adapter that doubles every `@` byte on its way to `inner`.
///
/// The adapter does not write delimiters; see [`write_quoted`].
pub struct AtEscaper<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> AtEscaper<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes emitted to the inner writer so far (after escaping).
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for AtEscaper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while let Some(pos) = rest.iter().position(|&b| b == DELIM) {
            self.inner.write_all(&rest[..pos])?;
            self.inner.write_all(DOUBLED)?;
            self.written += pos as u64 + 2;
            rest = &rest[pos + 1..];
        }
        self.inner.write_all(rest)?;
        self.written += rest.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Scoped quoting
// ---------------------------------------------------------------------------

/// Write `@<escaped contents of source>@` to `out`.
///
/// `source` is taken by value so it is dropped (and its file or pipe closed)
/// on every exit path, including errors. Returns the number of bytes written
/// to `out`, delimiters included.
pub fn write_quoted<W: Write + ?Sized, R: Read>(out: &mut W, mut source: R) -> io::Result<u64> {
    out.write_all(&[DELIM])?;
    let mut escaper = AtEscaper::new(&mut *out);
    io::copy(&mut source, &mut escaper)?;
    let body = escaper.bytes_written();
    out.write_all(&[DELIM])?;
    Ok(body + 2)
}

/// Quote an in-memory string field.
pub fn write_quoted_str<W: Write + ?Sized>(out: &mut W, value: &str) -> io::Result<u64> {
    write_quoted(out, value.as_bytes())
}

/// Escape `data` into a new buffer, without delimiters.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|&&b| b == DELIM).count();
    let mut out = Vec::with_capacity(data.len() + extra);
    for &b in data {
        out.push(b);
        if b == DELIM {
            out.push(DELIM);
        }
    }
    out
}

/// Inverse of [`write_quoted`]: strip the outer delimiters of a complete
/// quoted field and collapse `@@` pairs.
///
/// Returns `None` if `quoted` is not a well-formed RCS string.
pub fn unquote(quoted: &[u8]) -> Option<Vec<u8>> {
    let body = quoted.strip_prefix(&[DELIM])?.strip_suffix(&[DELIM])?;
    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.iter().copied();
    while let Some(b) = iter.next() {
        if b == DELIM {
            // A lone `@` inside the body would have terminated the string.
            if iter.next() != Some(DELIM) {
                return None;
            }
        }
        out.push(b);
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
