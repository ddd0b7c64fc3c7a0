//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Fenced code blocks pass through every stage untouched, and heading levels
//! are never rewritten.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = strip_leftover_html(md);
    result = trim_trailing_whitespace(&result);
    result = clean_blank_lines(&result);
    ensure_trailing_newline(&result)
}

/// Tracks whether successive lines sit inside a fenced code block.
#[derive(Debug, Default)]
struct Fences {
    open: Option<usize>,
}

impl Fences {
    /// Feed the next line; returns whether it belongs to a fence (markers included).
    fn step(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let run = trimmed.chars().take_while(|&c| c == '`').count();
        match self.open {
            None if run >= 3 => {
                self.open = Some(run);
                true
            }
            None => false,
            Some(len) => {
                if run >= len && trimmed[run..].trim().is_empty() {
                    self.open = None;
                }
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove layout tags that survived the conversion, keeping their content.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|font|center|tbody|thead|tr|td|th)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    let mut fences = Fences::default();
    md.lines()
        .map(|line| {
            if fences.step(line) {
                line.to_string()
            } else {
                HTML_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Trim trailing whitespace
// ---------------------------------------------------------------------------

fn trim_trailing_whitespace(md: &str) -> String {
    let mut fences = Fences::default();
    md.lines()
        .map(|line| if fences.step(line) { line } else { line.trim_end() })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines outside code to a single blank line.
fn clean_blank_lines(md: &str) -> String {
    let mut fences = Fences::default();
    let mut out: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in md.lines() {
        if fences.step(line) {
            blank_run = 0;
            out.push(line);
            continue;
        }
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push("");
        } else {
            blank_run = 0;
            out.push(line);
        }
    }
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Ensure trailing newline
// ---------------------------------------------------------------------------

/// Drop leading blank lines and end the file with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_start_matches('\n').trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
