//! Unified-diff text parser (§4.B).
//!
//! Parses a blob that is either empty, a single-file unified diff, or a
//! multi-file concatenated diff into an ordered sequence of [`Hunk`]s. Only
//! the hunk bodies (lines following an `@@ ... @@` header) are interpreted;
//! everything else — `diff --git` lines, `index` lines, `--- a/x` / `+++
//! b/x` file headers — is skipped, whether or not it happens to appear
//! between hunks. That uniformity is what lets this module stay ignorant of
//! file boundaries entirely: splitting multi-file diffs into per-file chunks
//! is the source adapters' job (§4.D / §4.E), not this parser's.

use super::{Hunk, LineDiff};
use crate::error::EngineError;
use regex::Regex;
use std::sync::OnceLock;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("static regex is valid")
    })
}

enum RawOp {
    Untouched(String),
    Insert(String),
    Delete(String),
}

struct InProgressHunk {
    original_start: u64,
    original_length: u64,
    updated_start: u64,
    updated_length: u64,
    body: Vec<RawOp>,
}

/// Parse unified-diff text into an ordered sequence of hunks.
///
/// Fails with [`EngineError::InvalidPatch`] if a line beginning with `@@`
/// does not match the hunk header grammar.
pub fn parse(text: &str) -> Result<Vec<Hunk>, EngineError> {
    let mut hunks = Vec::new();
    let mut current: Option<InProgressHunk> = None;

    for line in text.lines() {
        if line.starts_with("@@") {
            if let Some(h) = current.take() {
                hunks.push(finish_hunk(h));
            }
            current = Some(parse_header(line)?);
            continue;
        }

        let Some(h) = current.as_mut() else {
            // Outside any hunk (diff --git / index / file header lines, or
            // leading garbage before the first @@). Not interpreted.
            continue;
        };

        if line.starts_with("+++") || line.starts_with("---") {
            // Stray file-header line that wandered between hunks.
            continue;
        } else if let Some(rest) = line.strip_prefix('+') {
            h.body.push(RawOp::Insert(rest.to_string()));
        } else if let Some(rest) = line.strip_prefix('-') {
            h.body.push(RawOp::Delete(rest.to_string()));
        } else if let Some(rest) = line.strip_prefix(' ') {
            h.body.push(RawOp::Untouched(rest.to_string()));
        } else if line.is_empty() {
            h.body.push(RawOp::Untouched(String::new()));
        } else if line.starts_with('\\') {
            // "\ No newline at end of file" and similar — ignored.
        } else {
            // Unrecognized prefix: forward-compatibility skip.
        }
    }

    if let Some(h) = current.take() {
        hunks.push(finish_hunk(h));
    }

    Ok(hunks)
}

fn parse_header(line: &str) -> Result<InProgressHunk, EngineError> {
    let caps = header_re()
        .captures(line)
        .ok_or_else(|| EngineError::InvalidPatch(format!("malformed hunk header: {line:?}")))?;

    let parse_u64 = |m: regex::Match| -> Result<u64, EngineError> {
        m.as_str()
            .parse::<u64>()
            .map_err(|e| EngineError::InvalidPatch(format!("bad integer in hunk header: {e}")))
    };

    let orig_start_raw = parse_u64(caps.get(1).expect("group 1 always matches"))?;
    let orig_len = match caps.get(2) {
        Some(m) => parse_u64(m)?,
        None => 1,
    };
    let upd_start_raw = parse_u64(caps.get(3).expect("group 3 always matches"))?;
    let upd_len = match caps.get(4) {
        Some(m) => parse_u64(m)?,
        None => 1,
    };

    Ok(InProgressHunk {
        original_start: if orig_len == 0 { 0 } else { orig_start_raw },
        original_length: orig_len,
        updated_start: if upd_len == 0 { 0 } else { upd_start_raw },
        updated_length: upd_len,
        body: Vec::new(),
    })
}

fn finish_hunk(h: InProgressHunk) -> Hunk {
    Hunk {
        original_start: h.original_start,
        original_length: h.original_length,
        updated_start: h.updated_start,
        updated_length: h.updated_length,
        diff_operations: coalesce(h.body),
    }
}

/// Pair up a maximal run of Deletes with an immediately-following,
/// equal-or-different-length run of Inserts. The shared prefix (length
/// `min(deletes, inserts)`) becomes `Modified` entries; whichever side has
/// surplus lines keeps its original op. Pairing never crosses an Untouched
/// boundary because Untouched entries are never collected into a run here.
fn coalesce(raw: Vec<RawOp>) -> Vec<LineDiff> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();

    while let Some(op) = iter.next() {
        match op {
            RawOp::Untouched(text) => out.push(LineDiff::untouched(text)),
            RawOp::Delete(first) => {
                let mut deletes = vec![first];
                while let Some(RawOp::Delete(_)) = iter.peek() {
                    if let Some(RawOp::Delete(t)) = iter.next() {
                        deletes.push(t);
                    }
                }
                let mut inserts = Vec::new();
                while let Some(RawOp::Insert(_)) = iter.peek() {
                    if let Some(RawOp::Insert(t)) = iter.next() {
                        inserts.push(t);
                    }
                }
                let pairs = deletes.len().min(inserts.len());
                for (d, i) in deletes.iter().zip(inserts.iter()).take(pairs) {
                    out.push(LineDiff::modified(d.clone(), i.clone()));
                }
                for d in deletes.into_iter().skip(pairs) {
                    out.push(LineDiff::delete(d));
                }
                for i in inserts.into_iter().skip(pairs) {
                    out.push(LineDiff::insert(i));
                }
            }
            RawOp::Insert(first) => {
                out.push(LineDiff::insert(first));
                while let Some(RawOp::Insert(_)) = iter.peek() {
                    if let Some(RawOp::Insert(t)) = iter.next() {
                        out.push(LineDiff::insert(t));
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::LineOp;

    #[test]
    fn empty_input_yields_no_hunks() {
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn malformed_header_fails() {
        let err = parse("@@ garbage @@\n+line\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidPatch(_)));
    }

    #[test]
    fn single_line_modification_pairs_as_modified() {
        // S1-style: one changed line surrounded by untouched context.
        let real = "\
@@ -1,5 +1,5 @@
 line1
 line2
-  \"subapp\": \"v1.1.0\",
+  \"subapp\": \"v1.2.0\",
 line4
";
        let hunks = parse(real).unwrap();
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.original_start, 1);
        assert_eq!(h.original_length, 5);
        assert_eq!(h.updated_start, 1);
        assert_eq!(h.updated_length, 5);
        assert_eq!(h.diff_operations.len(), 4);
        assert_eq!(h.diff_operations[2].op, LineOp::Modified);
        assert_eq!(h.diff_operations[2].text, "  \"subapp\": \"v1.1.0\",");
        assert_eq!(h.diff_operations[2].new_text, "  \"subapp\": \"v1.2.0\",");
    }

    #[test]
    fn pure_insertion_has_no_object_modified_entries() {
        // S2-style: two-line append to a 3-line file.
        let text = "\
@@ -1,3 +1,5 @@
 line1
 line2
 line3
+line4
+line5
";
        let hunks = parse(text).unwrap();
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.original_length, 3);
        assert_eq!(h.updated_length, 5);
        let inserts = h
            .diff_operations
            .iter()
            .filter(|d| d.op == LineOp::Insert)
            .count();
        assert_eq!(inserts, 2);
        let untouched = h
            .diff_operations
            .iter()
            .filter(|d| d.op == LineOp::Untouched)
            .count();
        assert_eq!(untouched, 3);
    }

    #[test]
    fn unequal_runs_emit_surplus_unpaired() {
        let text = "\
@@ -1,3 +1,2 @@
-a
-b
-c
+x
";
        let hunks = parse(text).unwrap();
        let ops = &hunks[0].diff_operations;
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].op, LineOp::Modified);
        assert_eq!(ops[0].text, "a");
        assert_eq!(ops[0].new_text, "x");
        assert_eq!(ops[1].op, LineOp::Delete);
        assert_eq!(ops[1].text, "b");
        assert_eq!(ops[2].op, LineOp::Delete);
        assert_eq!(ops[2].text, "c");
    }

    #[test]
    fn zero_length_side_reports_zero_start() {
        let text = "\
@@ -0,0 +1,2 @@
+a
+b
";
        let hunks = parse(text).unwrap();
        assert_eq!(hunks[0].original_start, 0);
        assert_eq!(hunks[0].updated_start, 1);
    }

    #[test]
    fn multi_file_concatenated_diff_yields_hunks_from_both_files() {
        let text = "\
diff --git a/x b/x
index 111..222 100644
--- a/x
+++ b/x
@@ -1,1 +1,1 @@
-old
+new
diff --git a/y b/y
index 333..444 100644
--- a/y
+++ b/y
@@ -1,1 +1,2 @@
 kept
+added
";
        let hunks = parse(text).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].diff_operations.len(), 1);
        assert_eq!(hunks[1].diff_operations.len(), 2);
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let text = "\
@@ -1,1 +1,1 @@
-old
+new
\\ No newline at end of file
";
        let hunks = parse(text).unwrap();
        assert_eq!(hunks[0].diff_operations.len(), 1);
    }
}
