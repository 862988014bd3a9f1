// In-process line diff producing RCS edit scripts.
//
// Lines keep their terminators, so a final line without `\n` never compares
// equal to the same text with one. Only the two files being compared are
// held in memory.

use std::io::Write;
use std::path::Path;

use similar::{Algorithm, DiffOp};

use super::apply::split_lines;
use super::{DeltaError, DeltaProvider};

/// Delta provider backed by a Myers line diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDiff;

impl DeltaProvider for LineDiff {
    fn name(&self) -> &str {
        "builtin"
    }

    fn delta(&self, from: &Path, to: &Path) -> Result<Vec<u8>, DeltaError> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|source| DeltaError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        let from_data = read(from)?;
        let to_data = read(to)?;
        Ok(diff_bytes(&from_data, &to_data))
    }
}

/// Edit script that turns `from` into `to`.
///
/// Commands are anchored on running positions in both texts, advanced by
/// the length of each diff op, never on the op's reported indices.
/// Insertions are held back until the next command so that one directly
/// followed by a deletion at the same position is written after it. The
/// last line of `to` may lack `\n`; it must be the last thing in the script.
pub fn diff_bytes(from: &[u8], to: &[u8]) -> Vec<u8> {
    let old = split_lines(from);
    let new = split_lines(to);
    let ops = similar::capture_diff_slices(Algorithm::Myers, &old, &new);

    let mut script = Vec::new();
    // (old line count to insert after, lines)
    let mut pending: Option<(usize, &[&[u8]])> = None;
    // Lines of `old` and `new` consumed so far.
    let (mut old_pos, mut new_pos) = (0usize, 0usize);

    for op in ops {
        match op {
            DiffOp::Equal { len, .. } => {
                flush(&mut script, &mut pending);
                old_pos += len;
                new_pos += len;
            }
            DiffOp::Delete { old_len, .. } => {
                match pending.take() {
                    Some((after, lines)) if after == old_pos => {
                        delete(&mut script, old_pos, old_len);
                        pending = Some((old_pos + old_len, lines));
                    }
                    other => {
                        pending = other;
                        flush(&mut script, &mut pending);
                        delete(&mut script, old_pos, old_len);
                    }
                }
                old_pos += old_len;
            }
            DiffOp::Insert { new_len, .. } => {
                flush(&mut script, &mut pending);
                pending = Some((old_pos, &new[new_pos..new_pos + new_len]));
                new_pos += new_len;
            }
            DiffOp::Replace {
                old_len, new_len, ..
            } => {
                flush(&mut script, &mut pending);
                delete(&mut script, old_pos, old_len);
                old_pos += old_len;
                pending = Some((old_pos, &new[new_pos..new_pos + new_len]));
                new_pos += new_len;
            }
        }
    }
    flush(&mut script, &mut pending);
    script
}

fn flush(script: &mut Vec<u8>, pending: &mut Option<(usize, &[&[u8]])>) {
    if let Some((after, lines)) = pending.take() {
        add(script, after, lines);
    }
}

fn delete(script: &mut Vec<u8>, old_index: usize, len: usize) {
    // Writing into a Vec cannot fail.
    let _ = writeln!(script, "d{} {len}", old_index + 1);
}

fn add(script: &mut Vec<u8>, after: usize, lines: &[&[u8]]) {
    let _ = writeln!(script, "a{after} {}", lines.len());
    for line in lines {
        script.extend_from_slice(line);
    }
}
