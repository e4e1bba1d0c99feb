//! Position-anchored, exact-match multi-edit file rewriting.
//!
//! Every replacement carries the text it expects to overwrite. The whole set
//! is validated against a buffered copy of the file before anything touches
//! disk: either all replacements verify and the buffer is committed in one
//! atomic write, or the file is left byte-identical to what it was.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A single planned substitution, anchored at a 1-based (line, column)
/// position captured during the tree walk.
///
/// `old_text` is what the file must still contain at that position;
/// `new_text` is what replaces it. Neither may span lines.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a Replacement does nothing until apply_replacements() is called"]
pub struct Replacement {
    pub line: u32,
    pub column: u32,
    pub old_text: String,
    pub new_text: String,
}

impl Replacement {
    /// True when applying this replacement would change nothing. Callers are
    /// expected to drop these before invoking the patcher.
    pub fn is_noop(&self) -> bool {
        self.old_text == self.new_text
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    /// The file no longer contains the expected text at the recorded
    /// position. Either the file changed since the tree was built, or the
    /// column heuristic miscomputed; re-run once the file is stable rather
    /// than rewriting blind.
    #[error("{path}:{line}:{column}: expected {expected:?}, found {found:?}")]
    ContentMismatch {
        path: PathBuf,
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },

    /// A replacement targets a line past the end of the file.
    #[error("{path} has {lines} lines, but a replacement targets line {line}")]
    FileTooShort {
        path: PathBuf,
        lines: u32,
        line: u32,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Apply `replacements` to the file at `path`.
///
/// Replacements are applied ascending by line and, within one line,
/// descending by column: the right-most edit lands first, so earlier edits
/// on the line cannot shift the offsets later ones still need to verify.
/// The rewritten content is buffered in full and committed with a single
/// atomic write; any verification failure leaves the file untouched.
pub fn apply_replacements(path: &Path, replacements: &[Replacement]) -> Result<(), PatchError> {
    let mut sorted: Vec<&Replacement> = replacements.iter().collect();
    sorted.sort_by(|a, b| a.line.cmp(&b.line).then(b.column.cmp(&a.column)));

    let source = fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let patched = patch_lines(path, &source, &sorted)?;

    atomic_write(path, patched.as_bytes()).map_err(|source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        path = %path.display(),
        replacements = sorted.len(),
        "applied replacements"
    );
    Ok(())
}

/// Produce the patched content without touching the file system.
///
/// `sorted` must already be in application order (line ascending, column
/// descending within a line).
fn patch_lines(
    path: &Path,
    source: &str,
    sorted: &[&Replacement],
) -> Result<String, PatchError> {
    let mut output = String::with_capacity(source.len());
    let mut pending = sorted.iter().peekable();
    let mut line_number: u32 = 0;

    // split_inclusive keeps each line's terminator, so a run with zero
    // replacements reproduces the input byte for byte.
    for raw_line in source.split_inclusive('\n') {
        line_number += 1;
        let mut line = raw_line.to_string();

        while let Some(replacement) = pending.peek() {
            if replacement.line != line_number {
                break;
            }
            splice_line(path, &mut line, replacement)?;
            pending.next();
        }

        output.push_str(&line);
    }

    if let Some(unconsumed) = pending.next() {
        return Err(PatchError::FileTooShort {
            path: path.to_path_buf(),
            lines: line_number,
            line: unconsumed.line,
        });
    }

    Ok(output)
}

/// Verify `old_text` at the replacement's column, then substitute in place.
fn splice_line(path: &Path, line: &mut String, r: &Replacement) -> Result<(), PatchError> {
    let start = r.column.saturating_sub(1) as usize;
    let end = start + r.old_text.len();

    let found = line.get(start..end);
    if found != Some(r.old_text.as_str()) {
        return Err(PatchError::ContentMismatch {
            path: path.to_path_buf(),
            line: r.line,
            column: r.column,
            expected: r.old_text.clone(),
            found: found
                .unwrap_or_else(|| line.get(start..).unwrap_or("").trim_end_matches('\n'))
                .to_string(),
        });
    }

    line.replace_range(start..end, &r.new_text);
    Ok(())
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut temp = match parent {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn replacement(line: u32, column: u32, old: &str, new: &str) -> Replacement {
        Replacement {
            line,
            column,
            old_text: old.to_string(),
            new_text: new.to_string(),
        }
    }

    fn write_fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.nix");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn rev_replacement_on_ten_line_file() {
        let mut content = String::new();
        for i in 1..=10 {
            if i == 6 {
                content.push_str("  rev = \"abc123\";\n");
            } else {
                content.push_str(&format!("line {i}\n"));
            }
        }
        let (_dir, path) = write_fixture(&content);

        // Attribute `rev` starts at column 3; the literal sits at
        // 3 + len("rev") + 3 = 9, on the opening quote.
        let r = replacement(6, 9, "\"abc123\"", "\"def456\"");
        apply_replacements(&path, &[r]).unwrap();

        let patched = fs::read_to_string(&path).unwrap();
        let expected = content.replace("\"abc123\"", "\"def456\"");
        assert_eq!(patched, expected);
        assert!(patched.contains("  rev = \"def456\";\n"));
    }

    #[test]
    fn zero_replacements_round_trip_byte_identical() {
        let content = "first\nsecond without trailing newline";
        let (_dir, path) = write_fixture(content);

        apply_replacements(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn mismatch_leaves_file_untouched() {
        let content = "aaa\nbbb\nccc\n";
        let (_dir, path) = write_fixture(content);

        let edits = [
            replacement(1, 1, "aaa", "AAA"),
            replacement(2, 1, "zzz", "ZZZ"),
        ];
        let err = apply_replacements(&path, &edits).unwrap_err();

        assert!(matches!(err, PatchError::ContentMismatch { line: 2, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn replacement_past_eof_is_short_file() {
        let (_dir, path) = write_fixture("only line\n");

        let err = apply_replacements(&path, &[replacement(3, 1, "x", "y")]).unwrap_err();

        assert!(matches!(
            err,
            PatchError::FileTooShort { lines: 1, line: 3, .. }
        ));
    }

    #[test]
    fn same_line_edits_apply_right_most_first() {
        // col 5 len 3, col 20 len 4 — per the documented ordering contract.
        let content = "0123abc89012345678!wxyz rest\n";
        let (_dir, path) = write_fixture(content);

        let left = replacement(1, 5, "abc", "ABCDEF");
        let right = replacement(1, 20, "wxyz", "WX");

        // Input order must not matter.
        for edits in [vec![left.clone(), right.clone()], vec![right, left]] {
            fs::write(&path, content).unwrap();
            apply_replacements(&path, &edits).unwrap();
            assert_eq!(
                fs::read_to_string(&path).unwrap(),
                "0123ABCDEF89012345678!WX rest\n"
            );
        }
    }

    #[test]
    fn noop_detection() {
        assert!(replacement(1, 1, "same", "same").is_noop());
        assert!(!replacement(1, 1, "old", "new").is_noop());
    }

    proptest! {
        /// Two disjoint same-line edits commute under the sort, whatever
        /// order they arrive in.
        #[test]
        fn same_line_edit_order_is_irrelevant(
            left_new in "[a-z]{1,8}",
            right_new in "[a-z]{1,8}",
            swap in proptest::bool::ANY,
        ) {
            let content = "prefix OLDL middle OLDR suffix\n";
            let (_dir, path) = write_fixture(content);

            let left = replacement(1, 8, "OLDL", &left_new);
            let right = replacement(1, 20, "OLDR", &right_new);
            let edits = if swap { vec![right, left] } else { vec![left, right] };

            apply_replacements(&path, &edits).unwrap();

            let expected = format!("prefix {left_new} middle {right_new} suffix\n");
            prop_assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        }
    }
}
