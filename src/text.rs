//! Transcript clean-up before extraction.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

struct Patterns {
    control_chars: Regex,
    code_fence: Regex,
    inline_code: Regex,
    bold_stars: Regex,
    bold_underscores: Regex,
    italic_stars: Regex,
    italic_underscores: Regex,
    heading: Regex,
    list_marker: Regex,
    blockquote: Regex,
    horizontal_space: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("sanitize pattern is valid");
        Patterns {
            control_chars: re(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]+"),
            code_fence: re(r"(?s)```(?:[\w+-]*\n)?(.*?)```"),
            inline_code: re(r"`([^`]*)`"),
            bold_stars: re(r"(?s)\*\*(.*?)\*\*"),
            bold_underscores: re(r"(?s)__(.*?)__"),
            italic_stars: re(r"(?s)\*(.*?)\*"),
            italic_underscores: re(r"(?s)_(.*?)_"),
            heading: re(r"(?m)^\s{0,3}#{1,6}\s*"),
            list_marker: re(r"(?m)^\s*[-*+]\s+"),
            blockquote: re(r"(?m)^\s{0,3}>\s?"),
            horizontal_space: re(r"[ \t]+"),
            blank_lines: re(r"\n{3,}"),
        }
    })
}

/// Clean raw transcript text for the generation service.
///
/// Pure and total: the same input always yields the same output, and empty
/// input yields an empty string. Steps, in order:
///
/// - Unicode NFC composition
/// - line endings normalized to `\n`
/// - control characters other than tab and newline replaced by a space
/// - code fences removed (content kept), inline code, bold and italic unwrapped
/// - heading, list and blockquote markers removed at line start
/// - backslashes removed
/// - runs of spaces/tabs collapsed to one space, 3+ newlines collapsed to two
/// - leading/trailing whitespace trimmed
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let p = patterns();

    let text: String = raw.nfc().collect();
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = p.control_chars.replace_all(&text, " ");

    let text = p.code_fence.replace_all(&text, "$1");
    let text = p.inline_code.replace_all(&text, "$1");
    let text = p.bold_stars.replace_all(&text, "$1");
    let text = p.bold_underscores.replace_all(&text, "$1");
    let text = p.italic_stars.replace_all(&text, "$1");
    let text = p.italic_underscores.replace_all(&text, "$1");

    let text = p.heading.replace_all(&text, "");
    let text = p.list_marker.replace_all(&text, "");
    let text = p.blockquote.replace_all(&text, "");

    let text = text.replace('\\', "");

    let text = p.horizontal_space.replace_all(&text, " ");
    let text = p.blank_lines.replace_all(&text, "\n\n");

    text.trim().to_string()
}
