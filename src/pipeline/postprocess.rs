//! Post-processing: deterministic cleanup of model-generated Terraform.
//!
//! Only runs when [`crate::config::PipelineConfig::clean_output`] is set,
//! and never on diagnostic artifacts.
//!
//! Even when told otherwise, models sometimes wrap HCL in ` ```hcl ` fences,
//! emit CRLF line endings or leave zero-width characters behind. None of
//! that changes what the configuration means, but a fenced file does not
//! parse.
//!
//! ## Rule Order
//!
//! The fence is stripped first so the line rules see bare HCL; the
//! final-newline rule runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to generated Terraform text.
///
/// 1. Strip one outer fence (` ``` `, ` ```hcl `, ` ```terraform `, ` ```tf `)
/// 2. Tidy lines: LF endings, no trailing whitespace, no invisible Unicode
/// 3. Collapse runs of blank lines to at most two
/// 4. End with exactly one newline
pub fn clean_terraform(input: &str) -> String {
    let body = strip_outer_fence(input);
    let tidy = tidy_lines(body);
    let compact = collapse_blank_runs(&tidy);
    with_single_final_newline(&compact)
}

// ── Rule 1: Outer fence ──────────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[ \t]*(?:hcl|terraform|tf)?[ \t]*\r?\n(.*?)\r?\n```\s*$")
        .expect("fence regex is valid")
});

/// Fences inside the file (heredocs, comments) are left alone; only a fence
/// wrapping the whole answer is removed.
fn strip_outer_fence(input: &str) -> &str {
    RE_OUTER_FENCE
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map_or(input, |m| m.as_str())
}

// ── Rule 2: Line tidy ────────────────────────────────────────────────────────

/// Zero-width space, BOM, soft hyphen, ZWNJ, ZWJ, word joiner.
const INVISIBLE: [char; 6] = ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'];

fn tidy_lines(input: &str) -> String {
    let unix = input.replace("\r\n", "\n").replace('\r', "\n");
    unix.split('\n')
        .map(|line| {
            line.chars()
                .filter(|c| !INVISIBLE.contains(c))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 3: Blank runs ───────────────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("blank-run regex is valid"));

fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

// ── Rule 4: Final newline ────────────────────────────────────────────────────

fn with_single_final_newline(input: &str) -> String {
    let mut s = input.trim_end().to_string();
    s.push('\n');
    s
}
