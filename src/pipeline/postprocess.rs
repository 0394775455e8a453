//! Post-processing: deterministic cleanup of model-generated markdown.
//!
//! Even with an explicit output format in the instruction template, models
//! occasionally wrap the whole report in ```` ```markdown ```` fences, emit
//! CRLF line endings, or drop the separator row of the item table. These
//! are cheap string fixes; doing them here keeps the template focused on
//! *what to grade* instead of formatting edge cases, and keeps each rule
//! independently testable.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output, in order:
///
/// 1. Strip an outer markdown fence wrapping the whole report
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of 3+ blank lines down to 2
/// 5. Insert a missing GFM table separator row after a header row
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Ensure the text ends with exactly one newline
pub fn clean_report(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = s.replace("\r\n", "\n").replace('\r', "\n");
    let s = s
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let s = collapse_blank_runs(&s);
    let s = repair_table_separators(&s);
    let s = strip_invisible(&s);
    let trimmed = s.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

/// A GFM table needs `| --- | --- |` on its second line; without it the
/// whole table renders as paragraphs and the report loses its item grid.
fn repair_table_separators(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 2);

    for (i, line) in lines.iter().enumerate() {
        out.push((*line).to_string());

        let starts_table = is_table_line(line)
            && !is_separator_line(line)
            && (i == 0 || !is_table_line(lines[i - 1]));
        if starts_table {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if is_table_line(next) && !is_separator_line(next) {
                let cols = line.matches('|').count().saturating_sub(1).max(1);
                let mut sep = String::from("|");
                for _ in 0..cols {
                    sep.push_str(" --- |");
                }
                out.push(sep);
            }
        }
    }

    out.join("\n")
}

fn is_table_line(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn strip_invisible(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}'],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fence_with_language() {
        assert_eq!(
            strip_outer_fence("```markdown\n# Report\nbody\n```"),
            "# Report\nbody"
        );
    }

    #[test]
    fn leaves_unfenced_input_alone() {
        assert_eq!(strip_outer_fence("# Report"), "# Report");
    }

    #[test]
    fn inner_fences_survive() {
        let input = "text\n```\ncode\n```\nmore";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn repairs_headerless_table() {
        let out = repair_table_separators("| Item | Result |\n| 1 | ✅ |");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(is_separator_line(lines[1]));
    }

    #[test]
    fn intact_table_unchanged() {
        let input = "| A | B |\n|:---:|:---|\n| 1 | ok |";
        assert_eq!(repair_table_separators(input), input);
    }

    #[test]
    fn full_pipeline_normalises() {
        let input = "```markdown\n# 📨 MESSAGE\r\n\r\ntext   \n\n\n\n\n| A | B |\n| 1 | 2 |\n```";
        let out = clean_report(input);
        assert!(out.starts_with("# 📨 MESSAGE"));
        assert!(out.ends_with('\n'));
        assert!(!out.contains('\r'));
        assert!(!out.contains("\n\n\n\n"));
        assert!(out.lines().any(is_separator_line));
    }

    #[test]
    fn strips_invisible_chars() {
        assert_eq!(strip_invisible("a\u{200B}b\u{FEFF}c"), "abc");
    }

    #[test]
    fn empty_input_becomes_single_newline() {
        assert_eq!(clean_report("   "), "\n");
    }
}
