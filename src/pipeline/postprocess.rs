//! Post-processing: deterministic cleanup of recognised page text.
//!
//! Vision models occasionally wrap a transcription in code fences despite the
//! prompt, emit CRLF line endings, or leak zero-width characters from the
//! rendered glyphs. These passes fix that without touching the content.
//!
//! Rules (applied in order):
//! 1. Strip outer code fences
//! 2. Normalise line endings (CRLF → LF)
//! 3. Trim trailing whitespace per line
//! 4. Collapse 3+ consecutive blank lines down to one
//! 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 6. Trim leading and trailing blank lines

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of recognised text.
pub fn clean_page_text(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    trim_blank_edges(&s)
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Trim blank edges ─────────────────────────────────────────────────

fn trim_blank_edges(input: &str) -> String {
    input.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        let input = "```text\n銘柄 価格\nセブンスター 600円\n```";
        assert_eq!(clean_page_text(input), "銘柄 価格\nセブンスター 600円");
    }

    #[test]
    fn keeps_inner_fences() {
        let input = "前文\n```\ncode\n```\n後文";
        assert_eq!(clean_page_text(input), input);
    }

    #[test]
    fn normalises_crlf_and_trailing_spaces() {
        assert_eq!(clean_page_text("a  \r\nb\t\r\n"), "a\nb");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(clean_page_text("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_page_text("小\u{200B}売\u{FEFF}定価"), "小売定価");
    }

    #[test]
    fn empty_page_stays_empty() {
        assert_eq!(clean_page_text("  \n\n "), "");
    }

    #[test]
    fn keeps_leading_indentation() {
        assert_eq!(clean_page_text("\n\n  表1\n"), "  表1");
    }
}
