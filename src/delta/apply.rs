// RCS edit script interpreter.
//
// Commands (line numbers refer to the base text, 1-based):
//   d<line> <count>\n            delete <count> lines starting at <line>
//   a<line> <count>\n<text...>   insert <count> lines after <line>
// Commands must appear in ascending, non-overlapping order, which is what
// `diff -n` and the in-process backend both emit.

/// Error returned when an edit script cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("malformed command at script offset {offset}: {command:?}")]
    Malformed { offset: usize, command: String },
    #[error("command at script offset {offset} addresses line {line} of a {lines}-line text")]
    OutOfRange {
        offset: usize,
        line: usize,
        lines: usize,
    },
    #[error("command at script offset {offset} goes backwards (line {line}, already at {cursor})")]
    Unordered {
        offset: usize,
        line: usize,
        cursor: usize,
    },
    #[error("insert at script offset {offset} expects {expected} lines, found {found}")]
    ShortText {
        offset: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Delete,
}

/// Split `data` into lines, keeping `\n` terminators. The last line may lack
/// one.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split_inclusive(|&b| b == b'\n').collect()
}

/// Apply the edit `script` to `base`, returning the edited text.
pub fn apply(base: &[u8], script: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let lines = split_lines(base);
    let mut out = Vec::with_capacity(base.len());
    let mut cursor = 0usize;
    let mut pos = 0usize;

    while pos < script.len() {
        let offset = pos;
        let (command, next) = take_line(script, pos);
        pos = next;
        let (op, line, count) = parse_command(command).ok_or_else(|| ScriptError::Malformed {
            offset,
            command: String::from_utf8_lossy(command).trim_end().to_string(),
        })?;

        match op {
            Op::Delete => {
                if line == 0 || (line - 1).saturating_add(count) > lines.len() {
                    return Err(ScriptError::OutOfRange {
                        offset,
                        line,
                        lines: lines.len(),
                    });
                }
                let start = line - 1;
                if start < cursor {
                    return Err(ScriptError::Unordered {
                        offset,
                        line,
                        cursor,
                    });
                }
                copy_lines(&mut out, &lines[cursor..start]);
                cursor = start + count;
            }
            Op::Add => {
                if line > lines.len() {
                    return Err(ScriptError::OutOfRange {
                        offset,
                        line,
                        lines: lines.len(),
                    });
                }
                if line < cursor {
                    return Err(ScriptError::Unordered {
                        offset,
                        line,
                        cursor,
                    });
                }
                copy_lines(&mut out, &lines[cursor..line]);
                cursor = line;
                for found in 0..count {
                    if pos >= script.len() {
                        return Err(ScriptError::ShortText {
                            offset,
                            expected: count,
                            found,
                        });
                    }
                    let (text, next) = take_line_inclusive(script, pos);
                    out.extend_from_slice(text);
                    pos = next;
                }
            }
        }
    }

    copy_lines(&mut out, &lines[cursor..]);
    Ok(out)
}

fn copy_lines(out: &mut Vec<u8>, lines: &[&[u8]]) {
    for line in lines {
        out.extend_from_slice(line);
    }
}

/// Line starting at `pos` without its terminator, and the offset after it.
fn take_line(data: &[u8], pos: usize) -> (&[u8], usize) {
    let (line, next) = take_line_inclusive(data, pos);
    (line.strip_suffix(b"\n").unwrap_or(line), next)
}

fn take_line_inclusive(data: &[u8], pos: usize) -> (&[u8], usize) {
    match data[pos..].iter().position(|&b| b == b'\n') {
        Some(i) => (&data[pos..pos + i + 1], pos + i + 1),
        None => (&data[pos..], data.len()),
    }
}

fn parse_command(command: &[u8]) -> Option<(Op, usize, usize)> {
    let (&kind, rest) = command.split_first()?;
    let op = match kind {
        b'a' => Op::Add,
        b'd' => Op::Delete,
        _ => return None,
    };
    let rest = std::str::from_utf8(rest).ok()?;
    let (line, count) = rest.split_once(' ')?;
    Some((op, line.parse().ok()?, count.trim_end_matches('\r').parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_script_is_identity() {
        assert_eq!(apply(b"a\nb\n", b"").unwrap(), b"a\nb\n");
        assert_eq!(apply(b"", b"").unwrap(), b"");
    }

    #[test]
    fn delete_lines() {
        assert_eq!(apply(b"1\n2\n3\n4\n", b"d2 2\n").unwrap(), b"1\n4\n");
        assert_eq!(apply(b"1\n2\n", b"d1 2\n").unwrap(), b"");
    }

    #[test]
    fn add_lines() {
        assert_eq!(apply(b"1\n2\n", b"a0 1\n0\n").unwrap(), b"0\n1\n2\n");
        assert_eq!(apply(b"1\n2\n", b"a1 2\nx\ny\n").unwrap(), b"1\nx\ny\n2\n");
        assert_eq!(apply(b"1\n", b"a1 1\n2\n").unwrap(), b"1\n2\n");
    }

    #[test]
    fn replace_is_delete_then_add() {
        let script = b"d2 1\na2 2\nB\nC\n";
        assert_eq!(apply(b"a\nb\nc\n", script).unwrap(), b"a\nB\nC\nc\n");
    }

    #[test]
    fn added_text_without_final_newline() {
        assert_eq!(apply(b"a\n", b"d1 1\na1 1\nA").unwrap(), b"A");
        assert_eq!(apply(b"a\nb", b"a2 1\nc").unwrap(), b"a\nbc");
    }

    #[test]
    fn last_base_line_without_newline_is_kept() {
        assert_eq!(apply(b"a\nb", b"d1 1\n").unwrap(), b"b");
    }

    #[test]
    fn added_text_may_contain_command_like_lines() {
        assert_eq!(apply(b"", b"a0 2\nd1 1\na0 1\n").unwrap(), b"d1 1\na0 1\n");
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(matches!(apply(b"a\n", b"x1 1\n"), Err(ScriptError::Malformed { .. })));
        assert!(matches!(apply(b"a\n", b"d1\n"), Err(ScriptError::Malformed { .. })));
        assert!(matches!(apply(b"a\n", b"d one 1\n"), Err(ScriptError::Malformed { .. })));
    }

    #[test]
    fn out_of_range_commands_are_rejected() {
        assert_eq!(
            apply(b"a\n", b"d2 1\n"),
            Err(ScriptError::OutOfRange {
                offset: 0,
                line: 2,
                lines: 1
            })
        );
        assert!(matches!(apply(b"a\n", b"d0 1\n"), Err(ScriptError::OutOfRange { .. })));
        assert!(matches!(apply(b"a\n", b"a5 1\nz\n"), Err(ScriptError::OutOfRange { .. })));
    }

    #[test]
    fn unordered_commands_are_rejected() {
        assert!(matches!(
            apply(b"a\nb\nc\n", b"d3 1\nd1 1\n"),
            Err(ScriptError::Unordered { .. })
        ));
    }

    #[test]
    fn short_insert_text_is_rejected() {
        assert_eq!(
            apply(b"a\n", b"a1 3\nx\n"),
            Err(ScriptError::ShortText {
                offset: 0,
                expected: 3,
                found: 1
            })
        );
    }
}
